//! Storage layer for the bug monitor
//!
//! Provides abstractions and implementations for the three persisted
//! structures: the timeline archive of raw events, the per-person ranking and
//! the append-only ranking log.

pub mod sqlite;

use crate::error::Result;
use crate::ranking::{RankingLogEntry, RankingRow, Standing};
use crate::types::{Category, ChangeEvent, EvaluationTier};
use async_trait::async_trait;

pub use sqlite::SqliteRankingStore;

/// Storage backend trait defining all required operations
#[async_trait]
pub trait RankingBackend: Send + Sync {
    /// Drop and recreate every table
    async fn reset(&self) -> Result<()>;

    /// Archive a normalised event verbatim, for events that are not scored
    async fn archive(&self, event: &ChangeEvent) -> Result<()>;

    /// Count one classified event for its reporter
    ///
    /// Archives the event, loads (or zero-initialises) the reporter's row,
    /// increments the counter selected by `(category, tier)`, upserts the row
    /// and appends a log entry, all in one transaction. Returns the updated row. Calling this
    /// twice for the same event counts it twice.
    async fn record(
        &self,
        event: &ChangeEvent,
        category: Category,
        tier: EvaluationTier,
    ) -> Result<RankingRow>;

    /// All ranking rows in insertion order
    async fn rows(&self) -> Result<Vec<RankingRow>>;

    /// Row of a single participant
    async fn row(&self, name: &str) -> Result<Option<RankingRow>>;

    /// Ranking log, optionally filtered by participant, oldest first
    async fn log_entries(&self, name: Option<&str>) -> Result<Vec<RankingLogEntry>>;

    /// Number of archived events
    async fn timeline_len(&self) -> Result<usize>;

    /// Rows scored and sorted by score, ties in insertion order
    async fn leaderboard(&self) -> Result<Vec<Standing>> {
        Ok(crate::ranking::leaderboard(self.rows().await?))
    }
}
