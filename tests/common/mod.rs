//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use bugmonitor_core::{
    config::UnmatchedTagPolicy,
    error::{BugmonitorError, Result},
    normalizer, BugId, EvaluationCache, EvaluationLookup, Monitor, RawMessage, SqliteRankingStore,
    TrackerBug, TrackerClient,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const TRACKER_SENDER: &str = "bugzilla_noreply@novell.com";

/// In-memory tracker with per-bug whiteboards and injectable failures
#[derive(Default)]
pub struct FakeTracker {
    whiteboards: Mutex<HashMap<BugId, String>>,
    failing: Mutex<HashSet<BugId>>,
    denied: Mutex<HashSet<BugId>>,
    queries: AtomicUsize,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(self, bug: u64, whiteboard: &str) -> Self {
        self.set_tag(bug, whiteboard);
        self
    }

    pub fn set_tag(&self, bug: u64, whiteboard: &str) {
        self.whiteboards
            .lock()
            .unwrap()
            .insert(BugId(bug), whiteboard.to_string());
    }

    pub fn fail_for(&self, bug: u64) {
        self.failing.lock().unwrap().insert(BugId(bug));
    }

    /// Answer lookups of `bug` with a permanent error, like a private bug
    pub fn deny_for(&self, bug: u64) {
        self.denied.lock().unwrap().insert(BugId(bug));
    }

    pub fn recover(&self, bug: u64) {
        self.failing.lock().unwrap().remove(&BugId(bug));
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackerClient for FakeTracker {
    async fn whiteboard(&self, id: BugId) -> Result<Option<String>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&id) {
            return Err(BugmonitorError::tracker_retryable("503 Service Unavailable"));
        }
        if self.denied.lock().unwrap().contains(&id) {
            return Err(BugmonitorError::Tracker {
                message: "401 You are not authorized to access bug".to_string(),
                retryable: false,
            });
        }
        Ok(self.whiteboards.lock().unwrap().get(&id).cloned())
    }

    async fn fetch_bugs(&self, ids: &[BugId]) -> Result<Vec<TrackerBug>> {
        let whiteboards = self.whiteboards.lock().unwrap();
        Ok(ids
            .iter()
            .map(|id| TrackerBug {
                id: *id,
                whiteboard: whiteboards.get(id).cloned(),
                classification: Some("openSUSE".to_string()),
            })
            .collect())
    }

    async fn update_whiteboard(&self, id: BugId, whiteboard: &str) -> Result<()> {
        self.set_tag(id.0, whiteboard);
        Ok(())
    }
}

/// Builder for tracker notification messages
pub struct Notification {
    bug: u64,
    title: String,
    who: String,
    kind: String,
    status: String,
    changed_fields: String,
    body: String,
    from: String,
    date: String,
    classification: String,
}

impl Notification {
    pub fn changed(bug: u64, who: &str) -> Self {
        Self {
            bug,
            title: "installer hangs at partitioning".to_string(),
            who: who.to_string(),
            kind: "changed".to_string(),
            status: "NEW".to_string(),
            changed_fields: String::new(),
            body: String::new(),
            from: format!("Bugzilla <{}>", TRACKER_SENDER),
            date: "Fri, 27 Sep 2013 10:15:00 +0200".to_string(),
            classification: "openSUSE".to_string(),
        }
    }

    pub fn new_bug(bug: u64, who: &str) -> Self {
        Self {
            kind: "new".to_string(),
            ..Self::changed(bug, who)
        }
    }

    /// Override the notification type header
    pub fn kind(mut self, kind: &str) -> Self {
        self.kind = kind.to_string();
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn changed_fields(mut self, fields: &str) -> Self {
        self.changed_fields = fields.to_string();
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn sender(mut self, from: &str) -> Self {
        self.from = from.to_string();
        self
    }

    pub fn date(mut self, date: &str) -> Self {
        self.date = date.to_string();
        self
    }

    pub fn classification(mut self, classification: &str) -> Self {
        self.classification = classification.to_string();
        self
    }

    /// The message as it arrives on the wire
    pub fn to_bytes(&self) -> Vec<u8> {
        let subject = if self.kind == "new" {
            format!("[Bug {}] New: {}", self.bug, self.title)
        } else {
            format!("[Bug {}] {}", self.bug, self.title)
        };
        let headers = [
            ("From", self.from.as_str()),
            ("Subject", subject.as_str()),
            ("Date", self.date.as_str()),
            (normalizer::TYPE, self.kind.as_str()),
            (normalizer::WHO, self.who.as_str()),
            (normalizer::STATUS, self.status.as_str()),
            (normalizer::CHANGED_FIELDS, self.changed_fields.as_str()),
            (normalizer::ASSIGNED_TO, "bnc-team-screening@forge.provo.novell.com"),
            (normalizer::CLASSIFICATION, self.classification.as_str()),
            (normalizer::COMPONENT, "Installation"),
            (normalizer::FOUND_BY, "---"),
            (normalizer::KEYWORDS, ""),
            (normalizer::PRIORITY, "P5 - None"),
            (normalizer::PRODUCT, "openSUSE 13.1"),
            (normalizer::SEVERITY, "Normal"),
            (normalizer::TARGET_MILESTONE, "---"),
            (normalizer::VERSION, "Beta 1"),
        ];

        let mut raw = String::new();
        for (name, value) in headers {
            raw.push_str(name);
            raw.push_str(": ");
            raw.push_str(value);
            raw.push_str("\r\n");
        }
        raw.push_str("\r\n");
        raw.push_str(&self.body);
        raw.into_bytes()
    }

    pub fn build(&self) -> RawMessage {
        RawMessage::parse(&self.to_bytes())
    }
}

/// A fresh store in a temporary directory
pub async fn create_test_store() -> (TempDir, Arc<SqliteRankingStore>) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = SqliteRankingStore::open(dir.path().join("ranking.db"))
        .await
        .expect("Failed to open test store");
    (dir, Arc::new(store))
}

/// Monitor wired to a store and fake tracker, accepting only tracker mail
pub fn create_test_monitor(store: Arc<SqliteRankingStore>, tracker: Arc<FakeTracker>) -> Monitor {
    let lookup = EvaluationLookup::new(
        tracker,
        Arc::new(EvaluationCache::new()),
        UnmatchedTagPolicy::Other,
    );
    Monitor::new(store, lookup).with_sender_filter(TRACKER_SENDER)
}
