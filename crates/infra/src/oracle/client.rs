//! Gemini client implementing the extraction oracle port.

use async_trait::async_trait;
use reqwest::Method;
use satchel_core::ExtractionOracle;
use satchel_domain::config::OracleSettings;
use satchel_domain::{ExtractedEvent, RawItem, Result, SatchelError};
use tracing::{debug, info};

use super::types::{
    Content, GeminiError, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    OracleVerdict, Part,
};
use crate::http::HttpClient;

const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Gemini `generateContent` client.
pub struct GeminiOracle {
    http_client: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiOracle {
    pub fn new(settings: &OracleSettings, http_client: HttpClient) -> Self {
        Self {
            http_client,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Prompt asking for a strict JSON verdict on one notice.
    fn build_prompt(&self, item: &RawItem, context_labels: &[String]) -> String {
        let mut prompt = String::from(
            "You are reading a school notice sent to a parent. Decide whether it \
             announces a single dated event the parent must put in the family \
             calendar.\n\n",
        );

        if !context_labels.is_empty() {
            prompt.push_str(&format!(
                "The notice concerns: {}.\n\n",
                context_labels.join(", ")
            ));
        }

        prompt.push_str(&format!("Subject: {}\n\nBody:\n{}\n\n", item.title, item.body));

        prompt.push_str(
            "Return JSON only, no prose, with fields: event_found (bool), title, \
             start_time (\"YYYY-MM-DDTHH:MM:SS\", local UK time; use 09:00:00 when the \
             notice gives no time), end_time (same format, or null), location \
             (or null), description (one short sentence), subjects (array of names \
             mentioned). When no concrete dated event exists, return \
             {\"event_found\": false}.",
        );

        prompt
    }

    async fn call_api(&self, prompt: String) -> std::result::Result<OracleVerdict, GeminiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let payload = GenerateContentRequest {
            contents: vec![Content { parts: vec![Part { text: prompt }] }],
            generation_config: GenerationConfig {
                temperature: DEFAULT_TEMPERATURE,
                response_mime_type: "application/json".to_string(),
            },
        };

        let request = self
            .http_client
            .request(Method::POST, &url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&payload);

        let response = self
            .http_client
            .send(request)
            .await
            .map_err(|err| GeminiError::Network(err.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), "received Gemini response");

        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(match status.as_u16() {
                401 | 403 => GeminiError::Authentication(format!("API key rejected ({status})")),
                code => GeminiError::Api { status: code, message },
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| GeminiError::InvalidSchema(format!("failed to parse response: {err}")))?;

        let text = body
            .candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
            .map(|part| part.text.as_str())
            .ok_or_else(|| GeminiError::InvalidSchema("response contained no candidates".into()))?;

        let cleaned = strip_json_fences(text);
        serde_json::from_str(cleaned).map_err(|err| {
            GeminiError::InvalidSchema(format!("failed to parse verdict: {err}. Content: {cleaned}"))
        })
    }
}

/// Models sometimes wrap JSON output in a markdown code fence even when
/// asked not to.
fn strip_json_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

#[async_trait]
impl ExtractionOracle for GeminiOracle {
    async fn extract(
        &self,
        item: &RawItem,
        context_labels: &[String],
    ) -> Result<Option<ExtractedEvent>> {
        if self.api_key.is_empty() {
            return Err(SatchelError::Oracle("no API key configured".into()));
        }

        let prompt = self.build_prompt(item, context_labels);
        let verdict = self.call_api(prompt).await?;

        let event = verdict.into_event(&item.title);
        match &event {
            Some(event) => info!(title = %event.title, start = %event.start_time, "oracle extracted event"),
            None => debug!(title = %item.title, "oracle found no event"),
        }
        Ok(event)
    }
}
