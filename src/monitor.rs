//! Event pipeline
//!
//! Drives one message at a time through sender filtering, normalisation,
//! the contest window, tier lookup, classification, the ranking transaction
//! and finally the announcement. Every collaborator is injected.
//!
//! An event is archived exactly once: on its final outcome, never on a
//! deferral. Scored events are archived inside the ranking transaction.

use crate::classifier::Classifier;
use crate::config::ContestWindow;
use crate::error::{BugmonitorError, MalformedEventError, Result};
use crate::evaluation::EvaluationLookup;
use crate::mail::{MailSource, RawMessage};
use crate::normalizer::normalize;
use crate::notify::Notifier;
use crate::ranking::RankingRow;
use crate::storage::RankingBackend;
use crate::types::{BugId, Category, ChangeEvent, EvaluationTier};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// What happened to one message
#[derive(Debug)]
pub enum Outcome {
    /// Classified and counted
    Scored {
        bug_id: BugId,
        category: Category,
        tier: EvaluationTier,
        row: RankingRow,
    },
    /// Not from the tracker
    Ignored,
    Malformed(MalformedEventError),
    /// Archived, but outside the contest window
    OutOfWindow(BugId),
    /// Tier lookup failed transiently; nothing stored, safe to retry
    Deferred(BugId, BugmonitorError),
    /// Archived, but the tracker refused the lookup for good (private or
    /// deleted bug); not scored
    Rejected(BugId, BugmonitorError),
    /// Archive or ranking write failed; nothing was counted
    StoreFailed(BugmonitorError),
}

impl Outcome {
    /// Whether the message may be acknowledged at the source
    ///
    /// Deferred and failed messages stay pending so the next poll retries them.
    pub fn is_final(&self) -> bool {
        !matches!(self, Outcome::Deferred(..) | Outcome::StoreFailed(_))
    }
}

/// Tally of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub ignored: usize,
    pub malformed: usize,
    pub out_of_window: usize,
    pub deferred: usize,
    pub rejected: usize,
    pub failed: usize,
    #[serde(skip)]
    pub duration: Duration,
}

impl BatchReport {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Scored { .. } => self.processed += 1,
            Outcome::Ignored => self.ignored += 1,
            Outcome::Malformed(_) => self.malformed += 1,
            Outcome::OutOfWindow(_) => self.out_of_window += 1,
            Outcome::Deferred(..) => self.deferred += 1,
            Outcome::Rejected(..) => self.rejected += 1,
            Outcome::StoreFailed(_) => self.failed += 1,
        }
    }

    /// Total number of messages seen
    pub fn total(&self) -> usize {
        self.processed
            + self.ignored
            + self.malformed
            + self.out_of_window
            + self.deferred
            + self.rejected
            + self.failed
    }

    /// Whether any message changed the ranking
    pub fn changed_ranking(&self) -> bool {
        self.processed > 0
    }
}

pub struct Monitor {
    store: Arc<dyn RankingBackend>,
    evaluation: EvaluationLookup,
    classifier: Classifier,
    notifier: Option<Notifier>,
    window: ContestWindow,
    sender_filter: String,
}

impl Monitor {
    pub fn new(store: Arc<dyn RankingBackend>, evaluation: EvaluationLookup) -> Self {
        Self {
            store,
            evaluation,
            classifier: Classifier::default(),
            notifier: None,
            window: ContestWindow::default(),
            sender_filter: String::new(),
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_window(mut self, window: ContestWindow) -> Self {
        self.window = window;
        self
    }

    /// Only messages whose `From` contains this are processed; empty accepts all
    pub fn with_sender_filter(mut self, filter: impl Into<String>) -> Self {
        self.sender_filter = filter.into();
        self
    }

    pub fn store(&self) -> &Arc<dyn RankingBackend> {
        &self.store
    }

    pub fn evaluation(&self) -> &EvaluationLookup {
        &self.evaluation
    }

    /// Run one message through the pipeline
    ///
    /// Never fails as a whole: each failure mode is reported as an
    /// [`Outcome`] and affects this message only.
    pub async fn process_message(&self, message: &RawMessage) -> Outcome {
        if !self.sender_filter.is_empty() && !message.sender().contains(&self.sender_filter) {
            debug!("Ignoring message from {:?}", message.sender());
            return Outcome::Ignored;
        }

        let event = match normalize(message) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping malformed notification {:?}: {}", message.subject(), e);
                return Outcome::Malformed(e);
            }
        };

        if !self.window.contains(event.timestamp) {
            debug!(
                "Bug {} at {} is outside the contest window",
                event.bug_id, event.timestamp
            );
            let bug_id = event.bug_id;
            return self.archive_only(&event, Outcome::OutOfWindow(bug_id)).await;
        }

        let tier = match self.evaluation.resolve(event.bug_id).await {
            Ok(tier) => tier,
            Err(e) if e.is_retryable() => {
                warn!("Deferring bug {}: tier lookup failed: {}", event.bug_id, e);
                return Outcome::Deferred(event.bug_id, e);
            }
            Err(e) => {
                warn!("Skipping bug {}: tracker refused lookup: {}", event.bug_id, e);
                let bug_id = event.bug_id;
                return self.archive_only(&event, Outcome::Rejected(bug_id, e)).await;
            }
        };

        let category = self.classifier.classify(&event, tier);
        debug!(
            "Bug {} by {} classified as {} ({})",
            event.bug_id, event.reporter_name, category, tier
        );

        let row = match self.store.record(&event, category, tier).await {
            Ok(row) => row,
            Err(e) => {
                error!("Failed to record bug {} for {}: {}", event.bug_id, event.reporter_name, e);
                return Outcome::StoreFailed(e);
            }
        };

        if let Some(notifier) = &self.notifier {
            notifier.announce(&event, category, tier).await;
        }

        Outcome::Scored {
            bug_id: event.bug_id,
            category,
            tier,
            row,
        }
    }

    /// Archive an event that will not be scored, then report `outcome`
    async fn archive_only(&self, event: &ChangeEvent, outcome: Outcome) -> Outcome {
        match self.store.archive(event).await {
            Ok(()) => outcome,
            Err(e) => {
                error!("Failed to archive bug {}: {}", event.bug_id, e);
                Outcome::StoreFailed(e)
            }
        }
    }

    /// Process messages in order and tally the outcomes
    pub async fn process_batch(&self, messages: &[RawMessage]) -> BatchReport {
        let start = Instant::now();
        let mut report = BatchReport::default();
        for message in messages {
            let outcome = self.process_message(message).await;
            report.record(&outcome);
        }
        report.duration = start.elapsed();
        log_report(&report);
        report
    }

    /// Fetch pending messages from a source, process them and acknowledge
    /// the ones that reached a final outcome
    pub async fn poll_once(&self, source: &dyn MailSource) -> Result<BatchReport> {
        let start = Instant::now();
        let pending = source.fetch_unseen().await?;
        let mut report = BatchReport::default();

        for item in pending {
            let outcome = self.process_message(&item.message).await;
            report.record(&outcome);
            if outcome.is_final() {
                source.mark_seen(&item.handle).await?;
            }
        }

        report.duration = start.elapsed();
        log_report(&report);
        Ok(report)
    }
}

fn log_report(report: &BatchReport) {
    if report.total() == 0 {
        debug!("No pending notifications");
        return;
    }
    info!(
        "Batch done in {:?}: {} scored, {} ignored, {} malformed, {} out of window, {} deferred, {} rejected, {} failed",
        report.duration,
        report.processed,
        report.ignored,
        report.malformed,
        report.out_of_window,
        report.deferred,
        report.rejected,
        report.failed
    );
}
