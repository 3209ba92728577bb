//! Database reset command

use bugmonitor_core::{error::Result, RankingBackend, Settings};
use tracing::debug;

use super::helpers::open_store;

/// Handle database reset command
pub async fn handle(settings: &Settings) -> Result<()> {
    debug!("Resetting database...");

    let store = open_store(settings).await?;
    store.reset().await?;

    println!("Database initialized: {}", settings.database.path.display());
    Ok(())
}
