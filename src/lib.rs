//! Bugmonitor - Hackathon ranking from bug tracker notification mail
//!
//! Watches the stream of Bugzilla change notifications during a bug-fixing
//! contest and keeps a per-participant leaderboard:
//! - Normalises each notification into a typed change event
//! - Looks up the bug's contest tier from its tracker whiteboard (cached)
//! - Classifies the event with an ordered rule table
//! - Counts it for the participant in a transactional SQLite store
//! - Optionally announces fixes and new bugs on IRC
//!
//! # Architecture
//!
//! - **Mail**: raw messages and the [`mail::MailSource`] seam
//! - **Normalizer / Classifier**: pure functions over [`types::ChangeEvent`]
//! - **Evaluation**: tier lookup through [`tracker::TrackerClient`]
//! - **Storage**: timeline archive, ranking and ranking log
//! - **Monitor**: the pipeline wiring all of the above together
//!
//! # Example
//!
//! ```ignore
//! use bugmonitor_core::{EvaluationCache, EvaluationLookup, Monitor, RawMessage};
//!
//! let store = Arc::new(SqliteRankingStore::open("ranking.db").await?);
//! let tracker = Arc::new(BugzillaClient::new(&settings.tracker)?);
//! let lookup = EvaluationLookup::new(tracker, Arc::new(EvaluationCache::new()), policy);
//! let monitor = Monitor::new(store, lookup);
//!
//! let report = monitor.process_batch(&[RawMessage::parse(&bytes)]).await;
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod mail;
pub mod monitor;
pub mod normalizer;
pub mod notify;
pub mod ranking;
pub mod render;
pub mod storage;
pub mod tracker;
pub mod types;
pub mod whiteboard;

// Re-export commonly used types
pub use classifier::Classifier;
pub use config::Settings;
pub use error::{BugmonitorError, MalformedEventError, Result};
pub use evaluation::{EvaluationCache, EvaluationLookup};
pub use mail::{MailSource, MaildirSource, RawMessage};
pub use monitor::{BatchReport, Monitor, Outcome};
pub use notify::{Announcement, AnnouncementSink, IrcSink, LogSink, Notifier};
pub use ranking::{RankingLogEntry, RankingRow, Standing};
pub use storage::{RankingBackend, SqliteRankingStore};
pub use tracker::{BugzillaClient, TrackerBug, TrackerClient};
pub use types::{BugId, Category, ChangeEvent, ChangedFields, EvaluationTier, LifecycleType};
