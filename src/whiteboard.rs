//! Evaluation tag import
//!
//! Pushes tiers from a judges' spreadsheet export into the tracker
//! whiteboard. The CSV has the bug number in the first column and the
//! desired tag in the ninth; header and comment rows are skipped because
//! their first column is not a number.

use crate::error::Result;
use crate::tracker::{TrackerBug, TrackerClient};
use crate::types::{BugId, EvaluationTier};
use std::collections::BTreeMap;
use std::io::Read;
use tracing::{debug, info, warn};

/// Zero-based column holding the desired tag
pub const TAG_COLUMN: usize = 8;

/// Desired tag per bug; later rows win
pub fn read_evaluations<R: Read>(reader: R) -> Result<BTreeMap<BugId, String>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut evaluations = BTreeMap::new();
    for record in csv.records() {
        let record = record?;
        let Some(first) = record.get(0) else { continue };
        if first.is_empty() || !first.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(bug_id) = first.parse::<BugId>() else {
            warn!("Bug number {} does not fit, skipping", first);
            continue;
        };
        match record.get(TAG_COLUMN) {
            Some(tag) => {
                evaluations.insert(bug_id, tag.trim().to_string());
            }
            None => warn!("Row for bug {} has no tag column, skipping", bug_id),
        }
    }
    Ok(evaluations)
}

/// What to do with one whiteboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagAction {
    Keep,
    Update { whiteboard: String },
}

/// Plan the whiteboard change that makes `desired` the only ranked tier
///
/// A non-empty desired tag already present leaves the whiteboard alone.
/// Otherwise every ranked tier name is removed and the desired tag, if any,
/// is appended.
pub fn plan_update(current: Option<&str>, desired: &str) -> TagAction {
    let current = current.unwrap_or("");
    if !desired.is_empty() && current.contains(desired) {
        return TagAction::Keep;
    }

    let mut stripped = current.to_string();
    for tier in EvaluationTier::RANKED {
        stripped = stripped.replace(tier.as_str(), "");
    }
    let mut tokens: Vec<&str> = stripped.split_whitespace().collect();
    if !desired.is_empty() {
        tokens.push(desired);
    }
    let whiteboard = tokens.join(" ");

    if whiteboard == current.trim() {
        TagAction::Keep
    } else {
        TagAction::Update { whiteboard }
    }
}

/// How a whiteboard is shown to the operator
pub fn describe_whiteboard(whiteboard: Option<&str>) -> String {
    match whiteboard {
        Some(text) => format!("[{}]", text),
        None => "--EMPTY--".to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub unchanged: usize,
    /// Bugs whose whiteboard was (or in a dry run would be) rewritten
    pub updated: Vec<(BugId, String)>,
    /// Requested bugs the tracker did not return
    pub missing: Vec<BugId>,
    pub failed: usize,
}

/// Apply an evaluation sheet to the tracker
///
/// With `dry_run` the plan is computed and reported but nothing is written.
/// A failed update is logged and counted; the remaining bugs still run.
pub async fn import(
    tracker: &dyn TrackerClient,
    evaluations: &BTreeMap<BugId, String>,
    dry_run: bool,
) -> Result<ImportReport> {
    let ids: Vec<BugId> = evaluations.keys().copied().collect();
    let bugs = tracker.fetch_bugs(&ids).await?;
    let mut report = ImportReport::default();

    for bug in &bugs {
        let Some(desired) = evaluations.get(&bug.id) else {
            continue;
        };
        debug!(
            "Bug {} whiteboard {}",
            bug.id,
            describe_whiteboard(bug.whiteboard.as_deref())
        );

        match plan_update(bug.whiteboard.as_deref(), desired) {
            TagAction::Keep => report.unchanged += 1,
            TagAction::Update { whiteboard } => {
                if dry_run {
                    info!("Would set whiteboard of bug {} to {:?}", bug.id, whiteboard);
                } else if let Err(e) = tracker.update_whiteboard(bug.id, &whiteboard).await {
                    warn!("Failed to update whiteboard of bug {}: {}", bug.id, e);
                    report.failed += 1;
                    continue;
                } else {
                    info!("Set whiteboard of bug {} to {:?}", bug.id, whiteboard);
                }
                report.updated.push((bug.id, whiteboard));
            }
        }
    }

    report.missing = missing_ids(&ids, &bugs);
    Ok(report)
}

/// Current tracker state of every bug in an evaluation sheet
pub async fn check(
    tracker: &dyn TrackerClient,
    evaluations: &BTreeMap<BugId, String>,
) -> Result<Vec<TrackerBug>> {
    let ids: Vec<BugId> = evaluations.keys().copied().collect();
    tracker.fetch_bugs(&ids).await
}

fn missing_ids(requested: &[BugId], returned: &[TrackerBug]) -> Vec<BugId> {
    requested
        .iter()
        .filter(|id| !returned.iter().any(|bug| bug.id == **id))
        .copied()
        .collect()
}
