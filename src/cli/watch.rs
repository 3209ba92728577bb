//! Watch loop
//!
//! Polls the mail spool, re-rendering the ranking page after every batch
//! that changed it. Ctrl-C stops the loop; SIGHUP clears the evaluation
//! cache so retagged bugs are looked up again.

use bugmonitor_core::{error::Result, EvaluationCache, MaildirSource, Settings};
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use super::helpers::{build_monitor, write_html};

/// Handle watch command
pub async fn handle(settings: &Settings) -> Result<()> {
    let cache = Arc::new(EvaluationCache::new());
    let monitor = build_monitor(settings, cache.clone()).await?;
    let source = MaildirSource::open(&settings.mail.spool_dir).await?;
    let html_path = &settings.output.html_path;

    info!(
        "Watching {} every {}s, ranking page at {}",
        settings.mail.spool_dir.display(),
        settings.mail.poll_interval_secs,
        html_path.display()
    );

    // Render once up front so the page exists before the first change
    write_html(monitor.store().as_ref(), html_path).await?;

    let mut timer = interval(settings.mail.poll_interval());
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut hangup = Hangup::new()?;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = timer.tick() => {
                match monitor.poll_once(&source).await {
                    Ok(report) if report.changed_ranking() => {
                        if let Err(e) = write_html(monitor.store().as_ref(), html_path).await {
                            error!("Failed to write ranking page: {}", e);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => error!("Polling the mail spool failed: {}", e),
                }
            }

            _ = hangup.recv() => {
                info!(
                    "Received SIGHUP, clearing {} cached evaluations",
                    cache.stats().size
                );
                cache.clear();
            }

            _ = &mut shutdown => {
                info!("Received shutdown signal, stopping watch loop");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(unix)]
struct Hangup(tokio::signal::unix::Signal);

#[cfg(unix)]
impl Hangup {
    fn new() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self(signal(SignalKind::hangup())?))
    }

    async fn recv(&mut self) {
        if self.0.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
struct Hangup;

#[cfg(not(unix))]
impl Hangup {
    fn new() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) {
        std::future::pending::<()>().await;
    }
}
