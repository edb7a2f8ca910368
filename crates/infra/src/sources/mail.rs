//! Mail source adapter (Gmail REST contract).
//!
//! Searches the mailbox with a keyword query scoped to the lookback
//! window, then fetches each hit in full. A failure on one message is
//! logged and skipped; a rejected credential fails the whole scan so the
//! pipeline can count it against the fatal-auth rule.

use async_trait::async_trait;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use reqwest::Method;
use satchel_core::classify::fallback::strip_markup;
use satchel_core::SourceAdapter;
use satchel_domain::config::{MailSettings, PipelineConfig};
use satchel_domain::{RawItem, Result, SatchelError, SourceKind};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::http::HttpClient;

pub struct MailAdapter {
    http_client: HttpClient,
    base_url: String,
    token: String,
    max_results: u32,
    search_terms: Vec<String>,
    exclude_terms: Vec<String>,
}

impl MailAdapter {
    pub fn new(settings: &MailSettings, rules: &PipelineConfig, http_client: HttpClient) -> Self {
        let search = &rules.search_settings;
        let mut search_terms: Vec<String> = Vec::new();
        for term in search
            .general_keywords
            .iter()
            .chain(search.schools.iter())
            .chain(search.clubs.iter())
        {
            search_terms.push(term.clone());
        }
        for child in &search.children {
            search_terms.push(child.name.clone());
        }

        Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            max_results: settings.max_results,
            search_terms,
            exclude_terms: rules.filtering_logic.exclude_keywords.clone(),
        }
    }

    /// Gmail search expression: keyword disjunction scoped to the window,
    /// with bulk-mail categories and excluded terms filtered server-side.
    fn build_query(&self, lookback_days: i64) -> String {
        let terms = self
            .search_terms
            .iter()
            .map(|term| format!("\"{term}\""))
            .collect::<Vec<_>>()
            .join(" OR ");

        let mut query = format!(
            "({terms}) newer_than:{lookback_days}d -category:promotions -category:social"
        );
        for term in &self.exclude_terms {
            query.push_str(&format!(" -\"{term}\""));
        }
        query
    }

    async fn list_message_ids(&self, query: &str) -> Result<Vec<String>> {
        let url = format!("{}/gmail/v1/users/me/messages", self.base_url);
        let request = self
            .http_client
            .request(Method::GET, &url)
            .bearer_auth(&self.token)
            .query(&[("q", query), ("maxResults", &self.max_results.to_string())]);

        let response = self.http_client.send(request).await?;
        let status = response.status();
        if status == 401 || status == 403 {
            return Err(SatchelError::Auth(format!("mailbox rejected credentials ({status})")));
        }
        if !status.is_success() {
            return Err(SatchelError::Source(format!("mailbox search failed ({status})")));
        }

        let body: MessageList = response
            .json()
            .await
            .map_err(|err| SatchelError::Source(format!("invalid mailbox listing: {err}")))?;
        Ok(body.messages.into_iter().map(|m| m.id).collect())
    }

    async fn fetch_message(&self, id: &str) -> Result<RawItem> {
        let url = format!("{}/gmail/v1/users/me/messages/{id}", self.base_url);
        let request = self
            .http_client
            .request(Method::GET, &url)
            .bearer_auth(&self.token)
            .query(&[("format", "full")]);

        let response = self.http_client.send(request).await?;
        let status = response.status();
        if status == 401 || status == 403 {
            return Err(SatchelError::Auth(format!("mailbox rejected credentials ({status})")));
        }
        if !status.is_success() {
            return Err(SatchelError::Source(format!("message fetch failed ({status})")));
        }

        let message: Message = response
            .json()
            .await
            .map_err(|err| SatchelError::Source(format!("invalid message payload: {err}")))?;

        let subject = message
            .payload
            .headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case("subject"))
            .map(|header| header.value.clone())
            .unwrap_or_default();
        let body = extract_body(&message.payload).unwrap_or_default();

        Ok(RawItem { id: Some(message.id), title: subject, body, source: SourceKind::Email })
    }
}

#[async_trait]
impl SourceAdapter for MailAdapter {
    fn name(&self) -> &str {
        "mail"
    }

    async fn scan(&self, lookback_days: i64) -> Result<Vec<RawItem>> {
        if self.token.is_empty() {
            return Err(SatchelError::Auth("no mailbox token configured".into()));
        }

        let query = self.build_query(lookback_days);
        debug!(%query, "searching mailbox");

        let ids = self.list_message_ids(&query).await?;
        info!(hits = ids.len(), "mailbox search complete");

        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            match self.fetch_message(&id).await {
                Ok(item) => items.push(item),
                // one undecodable message must not sink the batch
                Err(err) => warn!(message_id = %id, error = %err, "skipping message"),
            }
        }
        Ok(items)
    }
}

/// Prefer a `text/plain` part, fall back to `text/html` reduced to plain
/// text, then to the top-level body. `RawItem.body` is always markup-free.
fn extract_body(payload: &MessagePart) -> Option<String> {
    if let Some(part) = find_part(payload, "text/plain") {
        return part.body.data.as_deref().and_then(decode_body);
    }
    if let Some(part) = find_part(payload, "text/html") {
        return part
            .body
            .data
            .as_deref()
            .and_then(decode_body)
            .map(|html| strip_markup(&html));
    }
    payload.body.data.as_deref().and_then(decode_body)
}

fn find_part<'a>(part: &'a MessagePart, mime_type: &str) -> Option<&'a MessagePart> {
    if part.mime_type == mime_type && part.body.data.is_some() {
        return Some(part);
    }
    part.parts.iter().find_map(|child| find_part(child, mime_type))
}

/// Message bodies arrive base64url encoded, with or without padding.
fn decode_body(data: &str) -> Option<String> {
    let bytes = URL_SAFE
        .decode(data)
        .or_else(|_| URL_SAFE_NO_PAD.decode(data))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Message {
    id: String,
    payload: MessagePart,
}

#[derive(Debug, Default, Deserialize)]
struct MessagePart {
    #[serde(default, rename = "mimeType")]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: PartBody,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct PartBody {
    #[serde(default)]
    data: Option<String>,
}
