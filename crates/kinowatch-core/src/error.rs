//! Unified error types for kinowatch.

use thiserror::Error;

/// Result type alias using KinowatchError.
pub type Result<T> = std::result::Result<T, KinowatchError>;

#[derive(Error, Debug)]
pub enum KinowatchError {
    // Channel errors
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    // Registry errors
    #[error("Registry error: {0}")]
    Registry(String),

    // Guide errors
    #[error("Guide error: {0}")]
    Guide(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{0}")]
    Other(String),
}

impl KinowatchError {
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    pub fn guide(msg: impl Into<String>) -> Self {
        Self::Guide(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KinowatchError::Channel("timeout".into());
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_error_constructors() {
        let e1 = KinowatchError::channel("test");
        assert!(matches!(e1, KinowatchError::Channel(_)));

        let e2 = KinowatchError::registry("test");
        assert!(matches!(e2, KinowatchError::Registry(_)));

        let e3 = KinowatchError::guide("test");
        assert!(matches!(e3, KinowatchError::Guide(_)));

        let e4 = KinowatchError::config("test");
        assert!(matches!(e4, KinowatchError::Config(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: KinowatchError = io_err.into();
        assert!(matches!(err, KinowatchError::Io(_)));
    }
}
