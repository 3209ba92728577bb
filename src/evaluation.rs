//! Evaluation lookup
//!
//! Resolves a bug to its contest tier by reading the tracker whiteboard.
//! Results are memoised in an [`EvaluationCache`] for as long as the cache
//! lives, including `None` results, so a tag edited after the first lookup
//! stays invisible until an operator clears the cache.

use crate::config::UnmatchedTagPolicy;
use crate::error::Result;
use crate::tracker::TrackerClient;
use crate::types::{BugId, EvaluationTier};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Map a whiteboard value to a tier
///
/// Ranked tier names are tested as substrings in GOLD > SILVER > BRONZE
/// order; the first one present wins.
pub fn tier_from_whiteboard(whiteboard: Option<&str>, policy: UnmatchedTagPolicy) -> EvaluationTier {
    let Some(text) = whiteboard else {
        return EvaluationTier::None;
    };

    EvaluationTier::RANKED
        .into_iter()
        .find(|tier| text.contains(tier.as_str()))
        .unwrap_or(match policy {
            UnmatchedTagPolicy::Other => EvaluationTier::Other,
            UnmatchedTagPolicy::None => EvaluationTier::None,
        })
}

/// Process-lifetime tier cache keyed by bug id
///
/// Entries never expire; [`EvaluationCache::clear`] and
/// [`EvaluationCache::invalidate`] are the only way to drop them.
#[derive(Debug, Default)]
pub struct EvaluationCache {
    entries: RwLock<HashMap<BugId, EvaluationTier>>,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
}

impl EvaluationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bug_id: BugId) -> Option<EvaluationTier> {
        let entries = self.entries.read().ok()?;
        entries.get(&bug_id).copied()
    }

    pub fn insert(&self, bug_id: BugId, tier: EvaluationTier) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(bug_id, tier);
        }
    }

    /// Forget one bug so the next lookup queries the tracker again
    pub fn invalidate(&self, bug_id: BugId) -> bool {
        self.entries
            .write()
            .map(|mut entries| entries.remove(&bug_id).is_some())
            .unwrap_or(false)
    }

    /// Clear the cache
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            let dropped = entries.len();
            entries.clear();
            info!("Evaluation cache cleared ({} entries dropped)", dropped);
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.read().map(|e| e.len()).unwrap_or(0),
        }
    }
}

/// Resolves bug ids to tiers through the cache, falling back to the tracker
pub struct EvaluationLookup {
    tracker: Arc<dyn TrackerClient>,
    cache: Arc<EvaluationCache>,
    policy: UnmatchedTagPolicy,
}

impl EvaluationLookup {
    pub fn new(
        tracker: Arc<dyn TrackerClient>,
        cache: Arc<EvaluationCache>,
        policy: UnmatchedTagPolicy,
    ) -> Self {
        Self {
            tracker,
            cache,
            policy,
        }
    }

    pub fn cache(&self) -> &Arc<EvaluationCache> {
        &self.cache
    }

    /// Tier of a bug
    ///
    /// Tracker failures are returned as errors and nothing is cached, so the
    /// event can be retried instead of being scored with a guessed tier.
    pub async fn resolve(&self, bug_id: BugId) -> Result<EvaluationTier> {
        if let Some(tier) = self.cache.get(bug_id) {
            debug!("Evaluation cache hit for bug {}: {}", bug_id, tier);
            return Ok(tier);
        }

        // No lock is held across the tracker call
        let whiteboard = self.tracker.whiteboard(bug_id).await?;
        let tier = tier_from_whiteboard(whiteboard.as_deref(), self.policy);
        debug!(
            "Bug {} whiteboard {:?} resolved to {}",
            bug_id, whiteboard, tier
        );

        self.cache.insert(bug_id, tier);
        Ok(tier)
    }
}
