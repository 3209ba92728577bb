//! Announcements
//!
//! Turns classified events into chat lines and hands them to an
//! [`AnnouncementSink`]. Delivery is best-effort: a failing sink is logged
//! and never touches the ranking.

pub mod irc;

use crate::error::Result;
use crate::types::{BugId, Category, ChangeEvent, EvaluationTier, LifecycleType};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use irc::IrcSink;

fn changer_line() -> &'static Regex {
    static PATTERN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^(.+?) <[^>]*> changed:").expect("Valid changer regex")
    });
    &PATTERN
}

/// Display name of whoever made the change
///
/// Taken from the `Name <address> changed:` line of the mail body; falls
/// back to the tracker's `Who` address.
pub fn changer_name(event: &ChangeEvent) -> &str {
    changer_line()
        .captures(&event.body_text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(event.reporter_name.as_str())
}

/// One chat line about a bug
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub bug_id: BugId,
    pub text: String,
}

impl Announcement {
    /// Announcement for a classified event, if it deserves one
    ///
    /// Only fixes and newly filed bugs are announced. Ranked tiers are
    /// appended in brackets.
    pub fn from_event(event: &ChangeEvent, category: Category, tier: EvaluationTier) -> Option<Self> {
        let line = match category {
            Category::Fix => format!(
                "Bug number {} about '{}' was closed by {}! Yay!",
                event.bug_id,
                event.title(),
                changer_name(event)
            ),
            Category::ScreenedOrNew if event.lifecycle_type == LifecycleType::New => format!(
                "We have new bug! It's number is {} and it is about '{}'. Who is up for the challenge?",
                event.bug_id,
                event.title()
            ),
            _ => return None,
        };

        let text = match tier {
            EvaluationTier::Gold | EvaluationTier::Silver | EvaluationTier::Bronze => {
                format!("{} [{}]", line, tier)
            }
            EvaluationTier::Other | EvaluationTier::None => line,
        };
        Some(Self {
            bug_id: event.bug_id,
            text,
        })
    }
}

impl fmt::Display for Announcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// External channel announcements are delivered to
#[async_trait]
pub trait AnnouncementSink: Send + Sync {
    async fn deliver(&self, message: &str) -> Result<()>;
}

/// Writes announcements to the log only
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl AnnouncementSink for LogSink {
    async fn deliver(&self, message: &str) -> Result<()> {
        info!("Announcement: {}", message);
        Ok(())
    }
}

/// Filters, renders and delivers announcements
pub struct Notifier {
    sink: Arc<dyn AnnouncementSink>,
    classification_filter: Option<String>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn AnnouncementSink>, classification_filter: Option<String>) -> Self {
        Self {
            sink,
            classification_filter,
        }
    }

    /// Announce an event; returns whether a message was delivered
    pub async fn announce(&self, event: &ChangeEvent, category: Category, tier: EvaluationTier) -> bool {
        if let Some(filter) = &self.classification_filter {
            if &event.classification_meta.classification != filter {
                debug!(
                    "Not announcing bug {} ({} is not {})",
                    event.bug_id, event.classification_meta.classification, filter
                );
                return false;
            }
        }

        let Some(announcement) = Announcement::from_event(event, category, tier) else {
            return false;
        };

        match self.sink.deliver(&announcement.text).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to deliver announcement for bug {}: {}", event.bug_id, e);
                false
            }
        }
    }
}
