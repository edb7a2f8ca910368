//! End-to-end pipeline tests against in-memory collaborators.
//!
//! Drives the full scan -> classify -> extract -> enrich -> stage ->
//! approve sequence through the public API only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use satchel_core::{
    CalendarGateway, Enricher, ExtractionOracle, LookbackPolicy, PipelineObserver,
    PipelineService, RunStateStore, SourceAdapter, StagingStore, SubjectMatcher, RunStateTracker,
};
use satchel_domain::constants::{COSTUME_PREFIX, GIFT_REMINDER};
use satchel_domain::{
    ColorTag, EnrichedEvent, EventStatus, ExtractedEvent, PipelineConfig, RawItem, Result,
    RunState, SatchelError, SourceKind,
};

struct FakeSource {
    items: Vec<RawItem>,
}

#[async_trait]
impl SourceAdapter for FakeSource {
    fn name(&self) -> &str {
        "fake-mail"
    }

    async fn scan(&self, _lookback_days: i64) -> Result<Vec<RawItem>> {
        Ok(self.items.clone())
    }
}

/// Returns a scripted event for any item whose title contains the key,
/// `Ok(None)` otherwise.
struct ScriptedOracle {
    key: &'static str,
    event: ExtractedEvent,
    calls: AtomicUsize,
}

#[async_trait]
impl ExtractionOracle for ScriptedOracle {
    async fn extract(
        &self,
        item: &RawItem,
        _context_labels: &[String],
    ) -> Result<Option<ExtractedEvent>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if item.title.contains(self.key) {
            Ok(Some(self.event.clone()))
        } else {
            Ok(None)
        }
    }
}

struct BrokenOracle;

#[async_trait]
impl ExtractionOracle for BrokenOracle {
    async fn extract(
        &self,
        _item: &RawItem,
        _context_labels: &[String],
    ) -> Result<Option<ExtractedEvent>> {
        Err(SatchelError::Oracle("quota exhausted".into()))
    }
}

struct RecordingCalendar {
    committed: Mutex<Vec<EnrichedEvent>>,
}

#[async_trait]
impl CalendarGateway for RecordingCalendar {
    async fn find_conflicts(
        &self,
        _start: NaiveDateTime,
        _end: NaiveDateTime,
    ) -> Result<Vec<String>> {
        Ok(vec![])
    }

    async fn commit(&self, event: &EnrichedEvent) -> Result<String> {
        self.committed.lock().push(event.clone());
        Ok(format!("https://calendar.example/{}", event.identity))
    }
}

struct MemoryRunState {
    state: Mutex<RunState>,
}

#[async_trait]
impl RunStateStore for MemoryRunState {
    async fn load(&self) -> Result<RunState> {
        Ok(self.state.lock().clone())
    }

    async fn save(&self, state: &RunState) -> Result<()> {
        *self.state.lock() = state.clone();
        Ok(())
    }
}

struct CollectingObserver {
    lines: Mutex<Vec<String>>,
}

impl PipelineObserver for CollectingObserver {
    fn notify(&self, message: &str) {
        self.lines.lock().push(message.to_string());
    }
}

fn item(id: &str, title: &str, body: &str) -> RawItem {
    RawItem {
        id: Some(id.to_string()),
        title: title.to_string(),
        body: body.to_string(),
        source: SourceKind::Email,
    }
}

struct World {
    pipeline: PipelineService,
    staging: Arc<StagingStore>,
    calendar: Arc<RecordingCalendar>,
    observer: Arc<CollectingObserver>,
}

fn world(items: Vec<RawItem>, oracle: Arc<dyn ExtractionOracle>) -> World {
    let matcher = Arc::new(SubjectMatcher::new(&PipelineConfig::default()));
    let calendar = Arc::new(RecordingCalendar { committed: Mutex::new(vec![]) });
    let gateway: Arc<dyn CalendarGateway> = calendar.clone();
    let staging = Arc::new(StagingStore::new(gateway.clone()));
    let state = Arc::new(MemoryRunState { state: Mutex::new(RunState::default()) });
    let observer = Arc::new(CollectingObserver { lines: Mutex::new(vec![]) });
    let pipeline = PipelineService::new(
        vec![Arc::new(FakeSource { items })],
        oracle,
        matcher.clone(),
        Enricher::new(matcher, gateway),
        staging.clone(),
        RunStateTracker::new(state, LookbackPolicy::new(180)),
        observer.clone(),
        Duration::ZERO,
    );
    World { pipeline, staging, calendar, observer }
}

#[tokio::test]
async fn jumper_day_is_staged_with_costume_marker_and_approved() {
    let oracle = Arc::new(ScriptedOracle {
        key: "Jumper",
        event: ExtractedEvent {
            title: "Christmas Jumper Day".to_string(),
            start_time: "2026-12-15T09:00:00".parse().expect("timestamp"),
            end_time: None,
            location: None,
            description: "wear a jumper!".to_string(),
            subjects: vec![],
            source_url: None,
        },
        calls: AtomicUsize::new(0),
    });
    let w = world(
        vec![
            item("msg-1", "Year 3 Christmas Jumper Day", "wear a jumper! 15 December"),
            item("msg-2", "50% off garden furniture", "sale ends sunday"),
        ],
        oracle.clone(),
    );

    let report = w.pipeline.run().await.expect("run should succeed");

    assert_eq!(report.scanned, 2);
    assert_eq!(report.staged, 1);
    assert_eq!(report.ignored, 1);
    // the furniture ad never reaches the oracle
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);

    let pending = w.staging.list_pending();
    assert_eq!(pending.len(), 1);
    let staged = &pending[0];
    assert!(staged.title.starts_with(COSTUME_PREFIX), "got {}", staged.title);
    assert!(staged.title.contains("[Tristan]"), "got {}", staged.title);
    assert_eq!(staged.color_tag, ColorTag::Priority);
    assert!(!staged.description.contains(GIFT_REMINDER));
    assert_eq!(staged.status, EventStatus::Pending);

    let link = w.staging.approve(&staged.identity).await.expect("approve should commit");
    assert!(link.contains(&staged.identity));
    assert_eq!(w.calendar.committed.lock().len(), 1);
    assert_eq!(w.staging.pending_count(), 0);
}

#[tokio::test]
async fn second_run_does_not_duplicate_pending_events() {
    let oracle = Arc::new(ScriptedOracle {
        key: "trip",
        event: ExtractedEvent {
            title: "Museum trip".to_string(),
            start_time: "2026-03-11T09:30:00".parse().expect("timestamp"),
            end_time: None,
            location: Some("City Museum".to_string()),
            description: "Bring a packed lunch".to_string(),
            subjects: vec![],
            source_url: None,
        },
        calls: AtomicUsize::new(0),
    });
    let w = world(vec![item("msg-7", "Year 3 trip", "Museum trip on 11 March")], oracle);

    w.pipeline.run().await.expect("first run");
    let report = w.pipeline.run().await.expect("second run");

    // same identity re-staged: skipped, not duplicated
    assert_eq!(report.staged, 0);
    assert_eq!(w.staging.pending_count(), 1);
}

#[tokio::test]
async fn broken_oracle_still_yields_events_via_fallback() {
    let w = world(
        vec![item("msg-9", "Year 3 trip", "Museum trip on 11/03/2026 at 9:30")],
        Arc::new(BrokenOracle),
    );

    let report = w.pipeline.run().await.expect("run should succeed");

    assert_eq!(report.staged, 1);
    let pending = w.staging.list_pending();
    assert_eq!(pending[0].start_time.to_string(), "2026-03-11 09:30:00");
}

#[tokio::test]
async fn run_summary_reaches_the_observer() {
    let w = world(vec![], Arc::new(BrokenOracle));

    w.pipeline.run().await.expect("empty run should succeed");

    let lines = w.observer.lines.lock();
    assert!(lines.iter().any(|l| l.contains("Starting pipeline run")));
    assert!(lines.iter().any(|l| l.contains("Pipeline run finished")));
}
