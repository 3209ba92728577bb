//! Maildir-style spool directory
//!
//! Messages delivered into `new/` are unseen; acknowledging one renames it
//! into `cur/` with the seen flag, the way mail clients do.

use super::{MailSource, PendingMessage, RawMessage};
use crate::error::{BugmonitorError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct MaildirSource {
    root: PathBuf,
}

impl MaildirSource {
    /// Open a spool directory, creating `new/`, `cur/` and `tmp/` if missing
    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for sub in ["new", "cur", "tmp"] {
            tokio::fs::create_dir_all(root.join(sub)).await?;
        }
        info!("Watching spool directory: {}", root.display());
        Ok(Self { root })
    }

    fn new_dir(&self) -> PathBuf {
        self.root.join("new")
    }

    fn cur_dir(&self) -> PathBuf {
        self.root.join("cur")
    }
}

#[async_trait]
impl MailSource for MaildirSource {
    async fn fetch_unseen(&self) -> Result<Vec<PendingMessage>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(self.new_dir()).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        // Maildir names start with the delivery time
        names.sort();

        let mut pending = Vec::with_capacity(names.len());
        for name in names {
            let path = self.new_dir().join(&name);
            let bytes = tokio::fs::read(&path).await?;
            let mut message = RawMessage::parse(&bytes);
            if let Ok(modified) = tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
                message = message.with_received_at(DateTime::<Utc>::from(modified));
            }
            pending.push(PendingMessage {
                handle: name,
                message,
            });
        }

        debug!("Found {} unseen message(s)", pending.len());
        Ok(pending)
    }

    async fn mark_seen(&self, handle: &str) -> Result<()> {
        if handle.contains('/') || handle.contains("..") {
            return Err(BugmonitorError::InvalidOperation(format!(
                "invalid message handle: {}",
                handle
            )));
        }
        let from = self.new_dir().join(handle);
        let to = self.cur_dir().join(format!("{}:2,S", handle));
        tokio::fs::rename(&from, &to).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fetch_and_mark_seen() {
        let dir = TempDir::new().unwrap();
        let source = MaildirSource::open(dir.path()).await.unwrap();

        std::fs::write(
            dir.path().join("new").join("2-b"),
            "Subject: second\n\nbody",
        )
        .unwrap();
        std::fs::write(dir.path().join("new").join("1-a"), "Subject: first\n\nbody").unwrap();

        let pending = source.fetch_unseen().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].message.subject(), "first");
        assert!(pending[0].message.received_at.is_some());

        source.mark_seen(&pending[0].handle).await.unwrap();
        let pending = source.fetch_unseen().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].handle, "2-b");
        assert!(dir.path().join("cur").join("1-a:2,S").exists());
    }

    #[tokio::test]
    async fn test_mark_seen_rejects_path_handles() {
        let dir = TempDir::new().unwrap();
        let source = MaildirSource::open(dir.path()).await.unwrap();
        assert!(source.mark_seen("../escape").await.is_err());
    }
}
