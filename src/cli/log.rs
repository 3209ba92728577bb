//! Ranking audit log command

use bugmonitor_core::{error::Result, render, RankingBackend, Settings};

use super::helpers::open_store;

pub async fn handle(settings: &Settings, name: Option<String>) -> Result<()> {
    let store = open_store(settings).await?;
    let entries = store.log_entries(name.as_deref()).await?;
    print!("{}", render::render_log(&entries));
    Ok(())
}
