//! Portal source adapter (browser-agent service).
//!
//! The portal has no API of its own: a separate browser-agent service
//! drives a real browser session and reports the events it can read off
//! each configured page. Pages are visited in order; a page that needs a
//! fresh login is skipped with a warning so the rest of the run proceeds.

use async_trait::async_trait;
use reqwest::Method;
use satchel_core::SourceAdapter;
use satchel_domain::config::PortalSettings;
use satchel_domain::{RawItem, Result, SatchelError, SourceKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::http::HttpClient;

const STATUS_OK: &str = "OK";
const STATUS_LOGIN_REQUIRED: &str = "LOGIN_REQUIRED";

pub struct PortalAdapter {
    http_client: HttpClient,
    agent_url: String,
    pages: Vec<String>,
}

impl PortalAdapter {
    pub fn new(settings: &PortalSettings, http_client: HttpClient) -> Self {
        Self {
            http_client,
            agent_url: settings.agent_url.trim_end_matches('/').to_string(),
            pages: settings.pages.clone(),
        }
    }

    async fn extract_page(&self, page: &str) -> Result<Vec<RawItem>> {
        let url = format!("{}/extract", self.agent_url);
        let request = self
            .http_client
            .request(Method::POST, &url)
            .json(&ExtractRequest { url: page.to_string() });

        let response = self.http_client.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SatchelError::Source(format!("portal agent returned {status}")));
        }

        let body: AgentResponse = response
            .json()
            .await
            .map_err(|err| SatchelError::Source(format!("invalid agent payload: {err}")))?;

        match body.status.as_str() {
            STATUS_OK => {
                debug!(page, events = body.events.len(), "portal page extracted");
                Ok(body.events.into_iter().map(|event| event.into_item(page)).collect())
            }
            STATUS_LOGIN_REQUIRED => {
                // Session expired server-side; nothing the pipeline can do
                // until someone logs in again.
                warn!(page, "portal session expired, page skipped");
                Ok(vec![])
            }
            other => Err(SatchelError::Source(format!("unexpected agent status: {other}"))),
        }
    }
}

#[async_trait]
impl SourceAdapter for PortalAdapter {
    fn name(&self) -> &str {
        "portal"
    }

    async fn scan(&self, _lookback_days: i64) -> Result<Vec<RawItem>> {
        if self.agent_url.is_empty() {
            return Err(SatchelError::Source("portal agent URL not configured".into()));
        }

        let mut items = Vec::new();
        for page in &self.pages {
            match self.extract_page(page).await {
                Ok(batch) => items.extend(batch),
                // page isolation: the next page still gets its chance
                Err(err) => warn!(page, error = %err, "portal page failed"),
            }
        }
        info!(items = items.len(), "portal scan complete");
        Ok(items)
    }
}

#[derive(Debug, Serialize)]
struct ExtractRequest {
    url: String,
}

#[derive(Debug, Deserialize)]
struct AgentResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    events: Vec<AgentEvent>,
}

/// One event as reported by the browser agent. Dates come through as
/// free text and are left for the extraction stage to interpret.
#[derive(Debug, Deserialize)]
struct AgentEvent {
    #[serde(default)]
    title: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl AgentEvent {
    fn into_item(self, page: &str) -> RawItem {
        let mut body = String::new();
        if let Some(date) = &self.date {
            body.push_str(&format!("Date: {date}\n"));
        }
        if let Some(location) = &self.location {
            body.push_str(&format!("Location: {location}\n"));
        }
        if let Some(description) = &self.description {
            body.push_str(description);
        }
        body.push_str(&format!("\nSource page: {page}"));

        // Portal events carry no stable provider id.
        RawItem { id: None, title: self.title, body, source: SourceKind::Portal }
    }
}
