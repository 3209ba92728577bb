//! Tracker query service
//!
//! The [`TrackerClient`] trait is the seam between the scoring core and the
//! bug tracker. Evaluation lookup only reads whiteboards; the tag import tool
//! also writes them.

pub mod bugzilla;

use crate::error::Result;
use crate::types::BugId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use bugzilla::BugzillaClient;

/// The subset of a tracker record the monitor cares about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerBug {
    pub id: BugId,
    /// Free-text evaluation tag field; `None` when unset or empty
    pub whiteboard: Option<String>,
    pub classification: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// Whiteboard text of one bug, `None` when the field is absent
    async fn whiteboard(&self, id: BugId) -> Result<Option<String>>;

    /// Fetch several bugs in one request; unknown ids are omitted
    async fn fetch_bugs(&self, ids: &[BugId]) -> Result<Vec<TrackerBug>>;

    /// Replace the whiteboard of one bug
    async fn update_whiteboard(&self, id: BugId, whiteboard: &str) -> Result<()>;
}
