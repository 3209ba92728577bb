//! One-shot processing of raw notification files

use bugmonitor_core::{error::Result, EvaluationCache, RawMessage, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::debug;

use super::helpers::build_monitor;

/// Handle process command
///
/// Each file holds one RFC 822 message. Without files a single message is
/// read from stdin.
pub async fn handle(settings: &Settings, files: Vec<PathBuf>) -> Result<()> {
    let mut messages = Vec::with_capacity(files.len().max(1));
    if files.is_empty() {
        let mut raw = Vec::new();
        tokio::io::stdin().read_to_end(&mut raw).await?;
        messages.push(RawMessage::parse(&raw));
    } else {
        for file in &files {
            debug!("Reading {}", file.display());
            let raw = tokio::fs::read(file)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file.display(), e))?;
            messages.push(RawMessage::parse(&raw));
        }
    }

    let monitor = build_monitor(settings, Arc::new(EvaluationCache::new())).await?;
    let report = monitor.process_batch(&messages).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
