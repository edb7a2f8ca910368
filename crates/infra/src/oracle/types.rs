//! Gemini API wire types

use chrono::NaiveDateTime;
use satchel_domain::{ExtractedEvent, SatchelError};
use serde::{Deserialize, Serialize};

/// Gemini API error types
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    /// Network-level error (connection failed, timeout, etc.)
    #[error("network error: {0}")]
    Network(String),

    /// Gemini returned an error response
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Authentication failed (invalid or missing API key)
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Response body doesn't match the requested schema
    #[error("invalid response schema: {0}")]
    InvalidSchema(String),
}

impl From<GeminiError> for SatchelError {
    fn from(err: GeminiError) -> Self {
        SatchelError::Oracle(err.to_string())
    }
}

/// Request payload for `models/{model}:generateContent`.
#[derive(Debug, Serialize)]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Part {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerationConfig {
    pub temperature: f32,
    #[serde(rename = "responseMimeType")]
    pub response_mime_type: String,
}

/// Response from `models/{model}:generateContent`.
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Candidate {
    pub content: CandidateContent,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidatePart {
    #[serde(default)]
    pub text: String,
}

/// The JSON document the model is asked to produce.
#[derive(Debug, Deserialize)]
pub(crate) struct OracleVerdict {
    #[serde(default)]
    pub event_found: bool,
    #[serde(default)]
    pub title: Option<String>,
    /// Local date-time, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`.
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
}

impl OracleVerdict {
    /// Convert the verdict into an extracted event. A verdict without a
    /// usable start time counts as "no event found".
    pub fn into_event(self, fallback_title: &str) -> Option<ExtractedEvent> {
        if !self.event_found {
            return None;
        }
        let start_time = parse_local_timestamp(self.start_time.as_deref()?)?;
        let end_time = self.end_time.as_deref().and_then(parse_local_timestamp);

        let title = match self.title {
            Some(title) if !title.trim().is_empty() => title,
            _ => fallback_title.to_string(),
        };

        Some(ExtractedEvent {
            title,
            start_time,
            end_time,
            location: self.location,
            description: self.description.unwrap_or_default(),
            subjects: self.subjects,
            source_url: None,
        })
    }
}

/// Accepts a full local timestamp or a bare date (which gets the 09:00
/// default start).
fn parse_local_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(ts);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Some(ts);
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(satchel_domain::constants::DEFAULT_START_HOUR, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_with_full_timestamp_becomes_event() {
        let verdict: OracleVerdict = serde_json::from_str(
            r#"{
                "event_found": true,
                "title": "Sports Day",
                "start_time": "2026-06-14T10:30:00",
                "location": "School field",
                "description": "Annual sports day"
            }"#,
        )
        .expect("should deserialize");

        let event = verdict.into_event("fallback").expect("event expected");
        assert_eq!(event.title, "Sports Day");
        assert_eq!(event.start_time.to_string(), "2026-06-14 10:30:00");
        assert_eq!(event.location.as_deref(), Some("School field"));
        assert!(event.end_time.is_none());
    }

    #[test]
    fn bare_date_gets_default_start_hour() {
        let verdict: OracleVerdict = serde_json::from_str(
            r#"{"event_found": true, "start_time": "2026-06-14"}"#,
        )
        .expect("should deserialize");

        let event = verdict.into_event("Summer fair").expect("event expected");
        assert_eq!(event.title, "Summer fair");
        assert_eq!(event.start_time.to_string(), "2026-06-14 09:00:00");
    }

    #[test]
    fn negative_verdict_yields_no_event() {
        let verdict: OracleVerdict =
            serde_json::from_str(r#"{"event_found": false}"#).expect("should deserialize");
        assert!(verdict.into_event("x").is_none());
    }

    #[test]
    fn found_verdict_without_date_yields_no_event() {
        let verdict: OracleVerdict = serde_json::from_str(
            r#"{"event_found": true, "title": "Something", "start_time": "next Tuesday"}"#,
        )
        .expect("should deserialize");
        assert!(verdict.into_event("x").is_none());
    }
}
