//! Event normalizer / enricher
//!
//! The central transform: one extracted event plus its raw source text
//! in, one enriched event (or a skip signal) out. The heuristic
//! classifier is authoritative for labeling here - the oracle's own
//! `subjects` judgment is advisory only.

use std::sync::Arc;

use chrono::{Duration, Utc};
use satchel_domain::constants::{
    CONFLICT_PREFIX, COSTUME_PREFIX, DEFAULT_DURATION_MINUTES, DEFAULT_ORG_LABEL, GIFT_REMINDER,
};
use satchel_domain::{ColorTag, EnrichedEvent, EventStatus, ExtractedEvent, RawItem, Result};
use tracing::warn;

use crate::classify::flags::{needs_costume, needs_gift};
use crate::classify::subjects::{SubjectMatcher, SubjectOutcome};
use crate::ports::CalendarGateway;

/// Applies classifier rules, computed metadata and the advisory
/// calendar-conflict check to extracted events.
pub struct Enricher {
    matcher: Arc<SubjectMatcher>,
    calendar: Arc<dyn CalendarGateway>,
}

impl Enricher {
    pub fn new(matcher: Arc<SubjectMatcher>, calendar: Arc<dyn CalendarGateway>) -> Self {
        Self { matcher, calendar }
    }

    /// Enrich one extracted event.
    ///
    /// Returns `Ok(None)` when the classifier deems the combined
    /// title + raw text irrelevant - the event is skipped, not staged.
    /// A conflict-check failure is logged and enrichment proceeds
    /// without the annotation.
    pub async fn enrich(
        &self,
        raw: &RawItem,
        event: ExtractedEvent,
    ) -> Result<Option<EnrichedEvent>> {
        // Recompute labels from title + raw source text, not the oracle's
        // subjects field.
        let combined = format!("{} {} {}", event.title, raw.title, raw.body);
        let labels = match self.matcher.identify(&combined) {
            SubjectOutcome::Ignore => return Ok(None),
            SubjectOutcome::Labels(labels) => labels,
        };

        let tag = if labels.is_empty() {
            format!("[{DEFAULT_ORG_LABEL}]")
        } else {
            format!("[{}]", labels.join(", "))
        };
        let mut title = format!("{tag} {}", event.title);

        let mut description = event.description.clone();
        if needs_gift(&event.title, &event.description) {
            description = format!("{GIFT_REMINDER}\n\n{description}");
        }

        let mut color_tag = ColorTag::Default;
        if needs_costume(&format!("{title} {description}")) {
            title = format!("{COSTUME_PREFIX}{title}");
            color_tag = ColorTag::Priority;
        }

        let start_time = event.start_time;
        let end_time =
            event.end_time.unwrap_or(start_time + Duration::minutes(DEFAULT_DURATION_MINUTES));

        match self.calendar.find_conflicts(start_time, end_time).await {
            Ok(existing) if !existing.is_empty() => {
                title = format!("{CONFLICT_PREFIX}{title}");
                description =
                    format!("{description}\n\nClashes with: {}", existing.join(", "));
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "conflict check failed; staging without annotation");
            }
        }

        let identity = match &raw.id {
            Some(id) => id.clone(),
            // No natural id from the source: synthesize one. Rediscovery
            // in a later run will stage a duplicate (accepted limitation).
            None => format!("{}-{}", raw.source, Utc::now().timestamp_micros()),
        };

        Ok(Some(EnrichedEvent {
            identity,
            title,
            description,
            location: event.location,
            start_time,
            end_time,
            color_tag,
            source: raw.source,
            source_url: event.source_url,
            status: EventStatus::Pending,
            discovered_at: Utc::now(),
        }))
    }
}
