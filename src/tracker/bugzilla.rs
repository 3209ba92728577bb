//! Bugzilla REST client
//!
//! Talks to the `/rest/bug` endpoints of a Bugzilla 5 instance. Server-side
//! failures (5xx, 429) and transport errors are reported as retryable; the
//! caller decides whether to defer the event.

use super::{TrackerBug, TrackerClient};
use crate::config::TrackerConfig;
use crate::error::{BugmonitorError, Result};
use crate::types::BugId;
use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const INCLUDE_FIELDS: &str = "id,whiteboard,classification";

pub struct BugzillaClient {
    base_url: String,
    username: Option<String>,
    password: Option<SecretString>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct BugsResponse {
    #[serde(default)]
    bugs: Vec<BugRecord>,
}

#[derive(Debug, Deserialize)]
struct BugRecord {
    id: u64,
    #[serde(default)]
    whiteboard: Option<String>,
    #[serde(default)]
    classification: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
}

impl From<BugRecord> for TrackerBug {
    fn from(record: BugRecord) -> Self {
        TrackerBug {
            id: BugId(record.id),
            whiteboard: record.whiteboard.filter(|w| !w.trim().is_empty()),
            classification: record.classification,
        }
    }
}

impl BugzillaClient {
    /// Create a client for the configured tracker
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone().map(SecretString::from),
            client,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.username {
            Some(user) => request.basic_auth(
                user,
                self.password.as_ref().map(|p| p.expose_secret().to_string()),
            ),
            None => request,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or(body);

        Err(BugmonitorError::Tracker {
            message: format!("{}: {}", status, message),
            retryable: status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS,
        })
    }

    async fn get_bugs(&self, ids: &[BugId]) -> Result<Vec<TrackerBug>> {
        let id_list = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        debug!("Querying tracker for bug(s) {}", id_list);

        let request = self
            .client
            .get(format!("{}/rest/bug", self.base_url))
            .query(&[("id", id_list.as_str()), ("include_fields", INCLUDE_FIELDS)]);
        let response = Self::check(self.authorize(request).send().await?).await?;
        let parsed: BugsResponse = response.json().await?;

        Ok(parsed.bugs.into_iter().map(TrackerBug::from).collect())
    }
}

#[async_trait]
impl TrackerClient for BugzillaClient {
    async fn whiteboard(&self, id: BugId) -> Result<Option<String>> {
        let bugs = self.get_bugs(&[id]).await?;
        Ok(bugs
            .into_iter()
            .find(|bug| bug.id == id)
            .and_then(|bug| bug.whiteboard))
    }

    async fn fetch_bugs(&self, ids: &[BugId]) -> Result<Vec<TrackerBug>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.get_bugs(ids).await
    }

    async fn update_whiteboard(&self, id: BugId, whiteboard: &str) -> Result<()> {
        debug!("Setting whiteboard of bug {} to {:?}", id, whiteboard);
        let request = self
            .client
            .put(format!("{}/rest/bug/{}", self.base_url, id))
            .json(&serde_json::json!({ "whiteboard": whiteboard }));
        Self::check(self.authorize(request).send().await?).await?;
        Ok(())
    }
}
