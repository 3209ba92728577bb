//! Configuration for the bug monitor
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `BUGMONITOR__*` environment variables (e.g. `BUGMONITOR__TRACKER__PASSWORD`).
//! The CLI applies flag overrides on top.

use crate::error::{BugmonitorError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix
const ENV_PREFIX: &str = "BUGMONITOR";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub mail: MailConfig,
    pub tracker: TrackerConfig,
    pub evaluation: EvaluationConfig,
    pub contest: ContestWindow,
    pub announce: AnnounceConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("bugmonitor.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Maildir-style spool the tracker notifications are delivered into
    pub spool_dir: PathBuf,
    /// Only messages whose From header contains this are processed
    pub sender_filter: String,
    pub poll_interval_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            spool_dir: PathBuf::from("spool"),
            sender_filter: "bugzilla_noreply@novell.com".to_string(),
            poll_interval_secs: 30,
        }
    }
}

impl MailConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub base_url: String,
    pub username: Option<String>,
    /// Wrapped in a `SecretString` as soon as a client is built
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl fmt::Debug for TrackerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://apibugzilla.novell.com".to_string(),
            username: None,
            password: None,
            timeout_secs: 30,
        }
    }
}

/// Tier reported for a bug whose whiteboard has text but no ranked tier name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedTagPolicy {
    #[default]
    Other,
    None,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub unmatched_tag: UnmatchedTagPolicy,
}

/// Time box of the contest; events outside it are archived but not scored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContestWindow {
    pub start: Option<DateTime<Utc>>,
    pub stop: Option<DateTime<Utc>>,
}

impl ContestWindow {
    /// Whether `at` falls inside `[start, stop)`; open ends always match
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.stop.map_or(true, |stop| at < stop)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnnounceConfig {
    pub enabled: bool,
    pub irc_host: String,
    pub irc_port: u16,
    pub nick: String,
    pub channel: String,
    /// Only bugs of this tracker classification are announced
    pub classification_filter: Option<String>,
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            irc_host: "irc.libera.chat".to_string(),
            irc_port: 6667,
            nick: "Furcifer".to_string(),
            channel: "#opensuse-pizza-hackaton".to_string(),
            classification_filter: Some("openSUSE".to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where the watch loop writes the HTML ranking
    pub html_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            html_path: std::env::temp_dir().join("table.html"),
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a TOML string (no environment layering)
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(toml_str)
            .map_err(|e| BugmonitorError::Config(config::ConfigError::Message(e.to_string())))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(invalid("database.path must not be empty"));
        }

        if self.mail.poll_interval_secs == 0 {
            return Err(invalid("mail.poll_interval_secs must be at least 1"));
        }

        if let (Some(start), Some(stop)) = (self.contest.start, self.contest.stop) {
            if stop <= start {
                return Err(invalid("contest.stop must be after contest.start"));
            }
        }

        Ok(())
    }
}

fn invalid(message: &str) -> BugmonitorError {
    BugmonitorError::Config(config::ConfigError::Message(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.evaluation.unmatched_tag, UnmatchedTagPolicy::Other);
        assert!(!settings.announce.enabled);
    }

    #[test]
    fn test_from_toml_overrides_defaults() {
        let settings = Settings::from_toml(
            r#"
            [database]
            path = "/var/lib/bugmonitor/hackathon.db"

            [tracker]
            username = "bot"
            password = "hunter2"

            [evaluation]
            unmatched_tag = "none"

            [contest]
            start = "2013-09-27T00:00:00Z"
            stop = "2013-09-28T00:00:00Z"
            "#,
        )
        .unwrap();

        assert_eq!(
            settings.database.path,
            PathBuf::from("/var/lib/bugmonitor/hackathon.db")
        );
        assert_eq!(settings.tracker.username.as_deref(), Some("bot"));
        assert_eq!(settings.tracker.password.as_deref(), Some("hunter2"));
        assert!(!format!("{:?}", settings.tracker).contains("hunter2"));
        assert_eq!(settings.evaluation.unmatched_tag, UnmatchedTagPolicy::None);
        assert_eq!(settings.mail.poll_interval_secs, 30);
    }

    #[test]
    fn test_validate_inverted_contest_window() {
        let result = Settings::from_toml(
            r#"
            [contest]
            start = "2013-09-28T00:00:00Z"
            stop = "2013-09-27T00:00:00Z"
            "#,
        );
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("contest.stop must be after contest.start"));
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let mut settings = Settings::default();
        settings.mail.poll_interval_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_contest_window_bounds() {
        let window = ContestWindow {
            start: Some("2013-09-27T00:00:00Z".parse().unwrap()),
            stop: Some("2013-09-28T00:00:00Z".parse().unwrap()),
        };
        assert!(window.contains("2013-09-27T00:00:00Z".parse().unwrap()));
        assert!(window.contains("2013-09-27T23:59:59Z".parse().unwrap()));
        assert!(!window.contains("2013-09-28T00:00:00Z".parse().unwrap()));
        assert!(!window.contains("2013-09-26T12:00:00Z".parse().unwrap()));
        assert!(ContestWindow::default().contains("1999-01-01T00:00:00Z".parse().unwrap()));
    }
}
