//! Leaderboard command

use bugmonitor_core::{
    error::Result,
    render::{self, OutputFormat},
    RankingBackend, Settings,
};
use std::path::PathBuf;
use tracing::debug;

use super::helpers::open_store;

/// Handle leaderboard command
pub async fn handle(settings: &Settings, format: OutputFormat, output: Option<PathBuf>) -> Result<()> {
    let store = open_store(settings).await?;
    let standings = store.leaderboard().await?;
    let rendered = render::render(&standings, format)?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, rendered).await?;
            debug!("Wrote {} standings to {}", standings.len(), path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}
