//! Shared helper functions for CLI commands
//!
//! Configuration resolution and construction of the store, tracker client
//! and pipeline from [`Settings`].

use bugmonitor_core::{
    error::Result,
    notify::{AnnouncementSink, IrcSink, LogSink, Notifier},
    render, BugzillaClient, EvaluationCache, EvaluationLookup, Monitor, RankingBackend, Settings,
    SqliteRankingStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Configuration file name looked up in the working directory first
const CONFIG_FILE: &str = "bugmonitor.toml";

/// Get the default configuration path
///
/// `./bugmonitor.toml` when present, otherwise the per-user config dir.
pub fn get_default_config_path() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bugmonitor")
        .join(CONFIG_FILE)
}

/// Load settings and apply CLI overrides
pub fn load_settings(config: Option<PathBuf>, db_path: Option<PathBuf>) -> Result<Settings> {
    let config_path = config.unwrap_or_else(get_default_config_path);
    debug!("Config path: {}", config_path.display());

    let mut settings = Settings::load(Some(config_path.as_path()))?;
    if let Some(path) = db_path {
        settings.database.path = path;
    }
    settings.validate()?;
    debug!("Database path: {}", settings.database.path.display());
    Ok(settings)
}

/// Open the ranking store, creating its directory if needed
pub async fn open_store(settings: &Settings) -> Result<Arc<SqliteRankingStore>> {
    if let Some(parent) = settings.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(Arc::new(SqliteRankingStore::open(&settings.database.path).await?))
}

/// Wire the pipeline from settings
///
/// The cache is passed in so the caller can clear it while the monitor runs.
pub async fn build_monitor(settings: &Settings, cache: Arc<EvaluationCache>) -> Result<Monitor> {
    let store = open_store(settings).await?;
    let tracker = Arc::new(BugzillaClient::new(&settings.tracker)?);
    let lookup = EvaluationLookup::new(tracker, cache, settings.evaluation.unmatched_tag);

    let sink: Arc<dyn AnnouncementSink> = if settings.announce.enabled {
        debug!(
            "Announcing on {}:{} {}",
            settings.announce.irc_host, settings.announce.irc_port, settings.announce.channel
        );
        Arc::new(IrcSink::new(&settings.announce))
    } else {
        Arc::new(LogSink)
    };
    let notifier = Notifier::new(sink, settings.announce.classification_filter.clone());

    Ok(Monitor::new(store, lookup)
        .with_notifier(notifier)
        .with_window(settings.contest)
        .with_sender_filter(settings.mail.sender_filter.clone()))
}

/// Render the leaderboard page to `path`
pub async fn write_html(store: &dyn RankingBackend, path: &Path) -> Result<()> {
    let standings = store.leaderboard().await?;
    let page = render::render_html(&standings);
    tokio::fs::write(path, page).await?;
    debug!("Ranking page written to {}", path.display());
    Ok(())
}
