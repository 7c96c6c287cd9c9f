//! # kinowatch-registry
//!
//! Subscriber registry: an in-memory set of chat ids backed by an
//! append-only plain-text log, one decimal id per line. The file is the
//! source of truth across restarts; the set is a cache rebuilt at startup.
//!
//! The set and the log are guarded by a single async mutex, so concurrent
//! `add` calls from different event handlers can neither race the set nor
//! interleave log records.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use kinowatch_core::ChatId;
use tokio::io::AsyncWriteExt;

/// Persisted set of broadcast subscribers.
pub struct Registry {
    path: PathBuf,
    inner: tokio::sync::Mutex<HashSet<ChatId>>,
}

impl Registry {
    /// Rebuild the in-memory set from the durable log.
    ///
    /// A missing file is an empty registry; unreadable files or malformed
    /// lines degrade to warnings, never errors.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut ids = HashSet::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                for line in content.lines() {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match line.parse::<ChatId>() {
                        Ok(id) => {
                            ids.insert(id);
                        }
                        Err(_) => {
                            tracing::warn!(path = %path.display(), line, "skipping malformed registry record");
                        }
                    }
                }
                tracing::info!(count = ids.len(), path = %path.display(), "loaded subscribers");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no subscriber file yet, starting empty");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to read subscriber file: {e}");
            }
        }

        Self {
            path,
            inner: tokio::sync::Mutex::new(ids),
        }
    }

    /// Register a subscriber. Returns false if already present.
    ///
    /// New ids are appended to the log before the lock is released. An
    /// append failure is logged and the in-memory insert is kept: the
    /// subscriber stays registered for this process lifetime and can
    /// re-subscribe after a restart.
    pub async fn add(&self, id: ChatId) -> bool {
        let mut ids = self.inner.lock().await;
        if !ids.insert(id) {
            return false;
        }

        if let Err(e) = self.append_record(id).await {
            tracing::error!(id, path = %self.path.display(), "failed to persist subscriber: {e}");
        } else {
            tracing::info!(id, "new subscriber registered");
        }
        true
    }

    /// Membership test.
    pub async fn contains(&self, id: ChatId) -> bool {
        self.inner.lock().await.contains(&id)
    }

    /// Point-in-time copy for broadcast iteration. An `add` completing
    /// concurrently may or may not be included; the returned list never
    /// changes under the iterator.
    pub async fn snapshot(&self) -> Vec<ChatId> {
        self.inner.lock().await.iter().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append_record(&self, id: ChatId) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{id}\n").as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("users.txt");
        (dir, path)
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let (_dir, path) = temp_log();
        let registry = Registry::load(&path).await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let (_dir, path) = temp_log();
        let registry = Registry::load(&path).await;

        assert!(registry.add(42).await);
        assert!(!registry.add(42).await);
        assert!(!registry.add(42).await);

        assert!(registry.contains(42).await);
        assert_eq!(registry.len().await, 1);

        // Exactly one record in the log regardless of call count.
        let content = tokio::fs::read_to_string(&path).await.expect("log exists");
        assert_eq!(content, "42\n");
    }

    #[tokio::test]
    async fn test_start_scenario_registers_and_persists() {
        // Scenario: empty log, /start from id 42.
        let (_dir, path) = temp_log();
        let registry = Registry::load(&path).await;
        assert!(registry.is_empty().await);

        assert!(registry.add(42).await);

        let content = tokio::fs::read_to_string(&path).await.expect("log exists");
        assert_eq!(content.lines().collect::<Vec<_>>(), vec!["42"]);
    }

    #[tokio::test]
    async fn test_reload_restores_members() {
        let (_dir, path) = temp_log();
        {
            let registry = Registry::load(&path).await;
            registry.add(1).await;
            registry.add(2).await;
            registry.add(3).await;
        }

        let reloaded = Registry::load(&path).await;
        assert_eq!(reloaded.len().await, 3);
        assert!(reloaded.contains(2).await);
    }

    #[tokio::test]
    async fn test_malformed_lines_skipped() {
        let (_dir, path) = temp_log();
        tokio::fs::write(&path, "1\nnot-a-number\n\n2\n9999999999999999999999\n")
            .await
            .expect("write log");

        let registry = Registry::load(&path).await;
        assert_eq!(registry.len().await, 2);
        assert!(registry.contains(1).await);
        assert!(registry.contains(2).await);
    }

    #[tokio::test]
    async fn test_duplicate_log_records_collapse() {
        // A log with duplicates (e.g. written by an older build) still
        // loads as a set.
        let (_dir, path) = temp_log();
        tokio::fs::write(&path, "7\n7\n7\n").await.expect("write log");

        let registry = Registry::load(&path).await;
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_adds_no_lost_records() {
        let (_dir, path) = temp_log();
        let registry = std::sync::Arc::new(Registry::load(&path).await);

        let mut handles = Vec::new();
        for id in 0..20 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                // Same id hammered twice from separate tasks.
                registry.add(id % 10).await;
            }));
        }
        for handle in handles {
            handle.await.expect("task");
        }

        assert_eq!(registry.len().await, 10);
        let content = tokio::fs::read_to_string(&path).await.expect("log exists");
        let mut lines: Vec<i64> = content.lines().map(|l| l.parse().expect("id")).collect();
        lines.sort_unstable();
        assert_eq!(lines, (0..10).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_snapshot_is_isolated() {
        let (_dir, path) = temp_log();
        let registry = Registry::load(&path).await;
        registry.add(1).await;
        registry.add(2).await;

        let snapshot = registry.snapshot().await;
        registry.add(3).await;

        // The earlier snapshot is unaffected by the later add.
        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len().await, 3);
    }
}
