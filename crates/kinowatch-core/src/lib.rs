//! # kinowatch-core
//!
//! Core traits, types, and configuration shared by every kinowatch crate.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::KinowatchConfig;
pub use error::{KinowatchError, Result};
pub use traits::{Channel, ScheduleSource};
pub use types::{CallbackAction, ChatId, InboundEvent, Keyboard, OutgoingMessage};
