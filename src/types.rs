//! Core data types for the bug monitor
//!
//! This module defines the fundamental data structures:
//! - ChangeEvent: one normalised tracker notification
//! - EvaluationTier: contest weight class of a bug
//! - Category: classifier output bucket

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Tracker bug number, as extracted from the notification subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BugId(pub u64);

impl fmt::Display for BugId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BugId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(BugId)
    }
}

/// Contest weight class manually assigned to a bug through its whiteboard tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EvaluationTier {
    Gold,
    Silver,
    Bronze,
    /// Tagged, but with none of the ranked tier names
    Other,
    /// No evaluation known for the bug
    None,
}

impl EvaluationTier {
    /// Ranked tiers in lookup priority order
    pub const RANKED: [EvaluationTier; 3] = [
        EvaluationTier::Gold,
        EvaluationTier::Silver,
        EvaluationTier::Bronze,
    ];

    /// Tag text used in the tracker whiteboard and in the ranking log
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationTier::Gold => "GOLD",
            EvaluationTier::Silver => "SILVER",
            EvaluationTier::Bronze => "BRONZE",
            EvaluationTier::Other => "OTHER",
            EvaluationTier::None => "NONE",
        }
    }
}

impl fmt::Display for EvaluationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output; exactly one per event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Fix,
    ScreenedOrNew,
    SuspiciousOrReopen,
    Other,
}

impl Category {
    /// Label written into the ranking log
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fix => "FIX",
            Category::ScreenedOrNew => "SCR/NEW",
            Category::SuspiciousOrReopen => "SUSPICIOUS/REOPEN",
            Category::Other => "OTHER",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the notification reports a new bug or a change to an existing one
///
/// Other tracker mail types (`dep_changed`, `request`, `whine`) are kept
/// verbatim; no classification rule matches them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleType {
    New,
    Changed,
    Other(String),
}

impl LifecycleType {
    pub fn as_str(&self) -> &str {
        match self {
            LifecycleType::New => "new",
            LifecycleType::Changed => "changed",
            LifecycleType::Other(raw) => raw,
        }
    }
}

impl From<&str> for LifecycleType {
    fn from(s: &str) -> Self {
        match s.trim() {
            "new" => LifecycleType::New,
            "changed" => LifecycleType::Changed,
            other => LifecycleType::Other(other.to_string()),
        }
    }
}

/// Record attributes altered by one notification
///
/// Keeps the header text verbatim for archiving; membership tests run
/// against the whitespace-separated field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFields {
    raw: String,
    fields: BTreeSet<String>,
}

impl ChangedFields {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_string();
        let fields = raw.split_whitespace().map(str::to_string).collect();
        Self { raw, fields }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// True when every name in `required` is present
    pub fn contains_all(&self, required: &[&str]) -> bool {
        required.iter().all(|f| self.contains(f))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<const N: usize> From<[&str; N]> for ChangedFields {
    fn from(fields: [&str; N]) -> Self {
        Self::parse(&fields.join(" "))
    }
}

/// Tracker metadata carried through to the timeline but not used for scoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationMeta {
    pub classification: String,
    pub component: String,
    pub found_by: String,
    pub keywords: String,
    pub priority: String,
    pub product: String,
    pub severity: String,
    pub target_milestone: String,
    pub version: String,
}

/// One normalised tracker notification
///
/// Built once per inbound message by the normalizer and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub timestamp: DateTime<Utc>,
    /// Person credited with the change (the tracker's `Who` header)
    pub reporter_name: String,
    pub subject: String,
    pub bug_id: BugId,
    pub lifecycle_type: LifecycleType,
    pub status: String,
    pub changed_fields: ChangedFields,
    pub body_text: String,
    pub assignee: String,
    pub classification_meta: ClassificationMeta,
}

impl ChangeEvent {
    /// Status value is one of the terminal states
    pub fn is_closed(&self) -> bool {
        matches!(self.status.as_str(), "CLOSED" | "RESOLVED")
    }

    /// Subject with the `[Bug N]` prefix and `New:` marker stripped
    pub fn title(&self) -> &str {
        let rest = match self.subject.find(']') {
            Some(i) if self.subject.trim_start().starts_with("[Bug") => &self.subject[i + 1..],
            _ => self.subject.as_str(),
        };
        let rest = rest.trim_start();
        rest.strip_prefix("New:").unwrap_or(rest).trim()
    }
}
