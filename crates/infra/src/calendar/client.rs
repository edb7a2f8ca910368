//! Calendar REST client implementing the gateway port.
//!
//! Event times are local wall-clock values; they are pinned to the
//! household timezone both in the conflict window query and on the
//! committed event, so a DST change never shifts a school run.

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use reqwest::Method;
use satchel_core::CalendarGateway;
use satchel_domain::config::CalendarSettings;
use satchel_domain::constants::CALENDAR_TIMEZONE;
use satchel_domain::{EnrichedEvent, Result, SatchelError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::http::HttpClient;

pub struct CalendarClient {
    http_client: HttpClient,
    base_url: String,
    token: String,
    calendar_id: String,
    timezone: Tz,
}

impl CalendarClient {
    pub fn new(settings: &CalendarSettings, http_client: HttpClient) -> Self {
        let timezone: Tz = CALENDAR_TIMEZONE.parse().unwrap_or(chrono_tz::UTC);
        Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            calendar_id: settings.calendar_id.clone(),
            timezone,
        }
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.base_url, self.calendar_id)
    }

    /// RFC 3339 instant for a local wall-clock time. During the autumn
    /// DST fold the earlier instant wins.
    fn to_instant(&self, local: NaiveDateTime) -> String {
        match self.timezone.from_local_datetime(&local).earliest() {
            Some(ts) => ts.to_rfc3339(),
            // spring-forward gap: nudge an hour ahead
            None => self
                .timezone
                .from_local_datetime(&(local + chrono::Duration::hours(1)))
                .earliest()
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_else(|| format!("{}Z", local.format("%Y-%m-%dT%H:%M:%S"))),
        }
    }
}

#[async_trait]
impl CalendarGateway for CalendarClient {
    /// Summaries of events overlapping the window.
    async fn find_conflicts(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<String>> {
        let request = self
            .http_client
            .request(Method::GET, self.events_url())
            .bearer_auth(&self.token)
            .query(&[
                ("timeMin", self.to_instant(start)),
                ("timeMax", self.to_instant(end)),
                ("singleEvents", "true".to_string()),
            ]);

        let response = self
            .http_client
            .send(request)
            .await
            .map_err(|err| SatchelError::ConflictCheck(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SatchelError::ConflictCheck(format!("calendar query failed ({status})")));
        }

        let body: EventList = response
            .json()
            .await
            .map_err(|err| SatchelError::ConflictCheck(format!("invalid calendar listing: {err}")))?;

        let summaries: Vec<String> =
            body.items.into_iter().filter_map(|item| item.summary).collect();
        debug!(window_start = %start, conflicts = summaries.len(), "conflict window checked");
        Ok(summaries)
    }

    /// Insert the event as tentative and return its link.
    async fn commit(&self, event: &EnrichedEvent) -> Result<String> {
        let payload = InsertEvent {
            summary: event.title.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            start: EventTime {
                date_time: event.start_time.format("%Y-%m-%dT%H:%M:%S").to_string(),
                time_zone: CALENDAR_TIMEZONE.to_string(),
            },
            end: EventTime {
                date_time: event.end_time.format("%Y-%m-%dT%H:%M:%S").to_string(),
                time_zone: CALENDAR_TIMEZONE.to_string(),
            },
            color_id: event.color_tag.provider_id().to_string(),
            status: "tentative".to_string(),
        };

        let request = self
            .http_client
            .request(Method::POST, self.events_url())
            .bearer_auth(&self.token)
            .json(&payload);

        let response = self
            .http_client
            .send(request)
            .await
            .map_err(|err| SatchelError::Commit(err.to_string()))?;
        let status = response.status();
        if status == 401 || status == 403 {
            return Err(SatchelError::Auth(format!("calendar rejected credentials ({status})")));
        }
        if !status.is_success() {
            return Err(SatchelError::Commit(format!("calendar insert failed ({status})")));
        }

        let created: CreatedEvent = response
            .json()
            .await
            .map_err(|err| SatchelError::Commit(format!("invalid insert response: {err}")))?;

        info!(identity = %event.identity, link = %created.html_link, "event inserted");
        Ok(created.html_link)
    }
}

#[derive(Debug, Serialize)]
struct InsertEvent {
    summary: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    start: EventTime,
    end: EventTime,
    #[serde(rename = "colorId")]
    color_id: String,
    status: String,
}

#[derive(Debug, Serialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: String,
    #[serde(rename = "timeZone")]
    time_zone: String,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<ListedEvent>,
}

#[derive(Debug, Deserialize)]
struct ListedEvent {
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    #[serde(rename = "htmlLink")]
    html_link: String,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{NaiveDate, Utc};
    use satchel_domain::{ColorTag, EventStatus, SourceKind};
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(base_url: String) -> CalendarClient {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(5))
            .max_attempts(1)
            .build()
            .expect("http client");
        let settings = CalendarSettings {
            base_url,
            token: "token".to_string(),
            calendar_id: "primary".to_string(),
        };
        CalendarClient::new(&settings, http_client)
    }

    fn event(color: ColorTag) -> EnrichedEvent {
        let start = NaiveDate::from_ymd_opt(2026, 12, 15).unwrap().and_hms_opt(9, 0, 0).unwrap();
        EnrichedEvent {
            identity: "msg-1".to_string(),
            title: "[Tristan] Museum trip".to_string(),
            description: "Bring a packed lunch".to_string(),
            location: Some("City Museum".to_string()),
            start_time: start,
            end_time: start + chrono::Duration::minutes(60),
            color_tag: color,
            source: SourceKind::Email,
            source_url: None,
            status: EventStatus::Pending,
            discovered_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn conflict_query_returns_summaries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("singleEvents", "true"))
            .and(query_param("timeMin", "2026-12-15T09:00:00+00:00"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"summary": "Dentist"},
                    {}
                ]
            })))
            .mount(&server)
            .await;

        let client = client(server.uri());
        let start = NaiveDate::from_ymd_opt(2026, 12, 15).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let end = start + chrono::Duration::minutes(60);

        let conflicts = client.find_conflicts(start, end).await.expect("query should succeed");
        assert_eq!(conflicts, vec!["Dentist"]);
    }

    #[tokio::test]
    async fn summer_wall_clock_converts_with_bst_offset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("timeMin", "2026-06-14T10:30:00+01:00"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
            .mount(&server)
            .await;

        let client = client(server.uri());
        let start = NaiveDate::from_ymd_opt(2026, 6, 14).unwrap().and_hms_opt(10, 30, 0).unwrap();
        let conflicts = client
            .find_conflicts(start, start + chrono::Duration::minutes(60))
            .await
            .expect("query should succeed");
        assert!(conflicts.is_empty());
    }

    #[tokio::test]
    async fn commit_posts_tentative_event_with_color() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(body_partial_json(serde_json::json!({
                "summary": "[Tristan] Museum trip",
                "status": "tentative",
                "colorId": "11",
                "start": {"dateTime": "2026-12-15T09:00:00", "timeZone": "Europe/London"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "htmlLink": "https://calendar.example/event/abc"
            })))
            .mount(&server)
            .await;

        let client = client(server.uri());
        let link = client.commit(&event(ColorTag::Priority)).await.expect("commit should succeed");
        assert_eq!(link, "https://calendar.example/event/abc");
    }

    #[tokio::test]
    async fn commit_failure_is_a_commit_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client(server.uri());
        let err = client.commit(&event(ColorTag::Default)).await.expect_err("should fail");
        assert!(matches!(err, SatchelError::Commit(_)));
    }

    #[tokio::test]
    async fn conflict_check_failure_is_distinguishable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client(server.uri());
        let start = NaiveDate::from_ymd_opt(2026, 12, 15).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let err = client
            .find_conflicts(start, start + chrono::Duration::minutes(60))
            .await
            .expect_err("should fail");
        assert!(matches!(err, SatchelError::ConflictCheck(_)));
    }
}
