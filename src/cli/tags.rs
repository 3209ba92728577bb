//! Evaluation tag import and check commands

use bugmonitor_core::{error::Result, whiteboard, BugId, BugzillaClient, Settings};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

fn read_sheet(file: &Path) -> Result<BTreeMap<BugId, String>> {
    let reader = std::fs::File::open(file)?;
    let evaluations = whiteboard::read_evaluations(reader)?;
    info!("{} bugs in {}", evaluations.len(), file.display());
    Ok(evaluations)
}

/// Handle tag import command
pub async fn import(settings: &Settings, file: PathBuf, dry_run: bool) -> Result<()> {
    let evaluations = read_sheet(&file)?;
    let tracker = BugzillaClient::new(&settings.tracker)?;
    let report = whiteboard::import(&tracker, &evaluations, dry_run).await?;

    let verb = if dry_run { "WOULD SET" } else { "SET" };
    for (bug_id, value) in &report.updated {
        println!("{} {} [{}]", bug_id, verb, value);
    }
    for bug_id in &report.missing {
        println!("{} NOT FOUND", bug_id);
    }
    println!(
        "{} unchanged, {} updated, {} missing, {} failed",
        report.unchanged,
        report.updated.len(),
        report.missing.len(),
        report.failed
    );
    Ok(())
}

/// Handle tag check command
pub async fn check(settings: &Settings, file: PathBuf) -> Result<()> {
    let evaluations = read_sheet(&file)?;
    let tracker = BugzillaClient::new(&settings.tracker)?;

    for bug in whiteboard::check(&tracker, &evaluations).await? {
        println!(
            "{} {} {}",
            bug.id,
            whiteboard::describe_whiteboard(bug.whiteboard.as_deref()),
            bug.classification.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
