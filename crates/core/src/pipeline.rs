//! Pipeline orchestrator
//!
//! Sequences one run: resolve the lookback window, scan every source,
//! gate each item through the cheap classifier, extract via the oracle
//! (fallback on failure), enrich, stage, then mark the run complete.
//! Exactly one run may be active at a time; a trigger during an active
//! run is rejected, not queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use satchel_domain::{
    ExtractedEvent, RawItem, Result, RunReport, RunStatus, SatchelError,
};
use tracing::{error, info, warn};

use crate::classify::fallback::extract_fallback;
use crate::classify::subjects::{SubjectMatcher, SubjectOutcome};
use crate::enrich::Enricher;
use crate::ports::{ExtractionOracle, PipelineObserver, SourceAdapter};
use crate::runstate::RunStateTracker;
use crate::staging::StagingStore;

/// Orchestrates the scan -> extract -> enrich -> stage sequence.
pub struct PipelineService {
    sources: Vec<Arc<dyn SourceAdapter>>,
    oracle: Arc<dyn ExtractionOracle>,
    matcher: Arc<SubjectMatcher>,
    enricher: Enricher,
    staging: Arc<StagingStore>,
    runstate: RunStateTracker,
    observer: Arc<dyn PipelineObserver>,
    /// Fixed pause between consecutive oracle calls (quota pacing).
    call_delay: Duration,
    running: AtomicBool,
    last_run: parking_lot::RwLock<Option<DateTime<Utc>>>,
}

impl PipelineService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sources: Vec<Arc<dyn SourceAdapter>>,
        oracle: Arc<dyn ExtractionOracle>,
        matcher: Arc<SubjectMatcher>,
        enricher: Enricher,
        staging: Arc<StagingStore>,
        runstate: RunStateTracker,
        observer: Arc<dyn PipelineObserver>,
        call_delay: Duration,
    ) -> Self {
        Self {
            sources,
            oracle,
            matcher,
            enricher,
            staging,
            runstate,
            observer,
            call_delay,
            running: AtomicBool::new(false),
            last_run: parking_lot::RwLock::new(None),
        }
    }

    /// Whether a run is currently active.
    pub fn status(&self) -> RunStatus {
        if self.running.load(Ordering::SeqCst) {
            RunStatus::Running
        } else {
            RunStatus::Idle
        }
    }

    /// Completion time of the most recent run in this process.
    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        *self.last_run.read()
    }

    /// Execute one full pipeline run.
    ///
    /// Rejects with `InvalidInput` when another run is active. Only an
    /// authentication failure across every source is fatal; all other
    /// failures are isolated, logged, and counted in the report.
    pub async fn run(&self) -> Result<RunReport> {
        let _guard = RunGuard::acquire(&self.running).ok_or_else(|| {
            SatchelError::InvalidInput("a pipeline run is already active".into())
        })?;

        let result = self.run_locked().await;
        *self.last_run.write() = Some(Utc::now());
        result
    }

    async fn run_locked(&self) -> Result<RunReport> {
        self.observer.notify("Starting pipeline run...");
        let mut report = RunReport::default();

        let lookback_days = self.runstate.lookback_days().await?;
        self.observer.notify(&format!("Scanning sources, lookback {lookback_days} days"));

        let mut items: Vec<RawItem> = Vec::new();
        let mut auth_failures = 0usize;
        for source in &self.sources {
            match source.scan(lookback_days).await {
                Ok(batch) => {
                    self.observer
                        .notify(&format!("{}: {} candidate items", source.name(), batch.len()));
                    items.extend(batch);
                }
                Err(SatchelError::Auth(message)) => {
                    auth_failures += 1;
                    error!(source = source.name(), %message, "source authentication failed");
                    self.observer
                        .notify(&format!("{}: authentication failed", source.name()));
                }
                Err(err) => {
                    report.failures += 1;
                    warn!(source = source.name(), error = %err, "source scan failed; continuing");
                    self.observer.notify(&format!("{}: scan failed ({err})", source.name()));
                }
            }
        }

        // Credentials broken everywhere: end early without marking
        // completion so the same window is retried next run.
        if !self.sources.is_empty() && auth_failures == self.sources.len() {
            self.observer.notify("All sources failed authentication; run aborted");
            return Err(SatchelError::Auth("every configured source rejected credentials".into()));
        }

        report.scanned = items.len();
        let mut oracle_called = false;

        for item in &items {
            let combined = format!("{} {}", item.title, item.body);
            let labels = match self.matcher.identify(&combined) {
                SubjectOutcome::Ignore => {
                    report.ignored += 1;
                    continue;
                }
                SubjectOutcome::Labels(labels) => labels,
            };

            // Serialize oracle calls with a fixed inter-call delay.
            if oracle_called && !self.call_delay.is_zero() {
                tokio::time::sleep(self.call_delay).await;
            }
            oracle_called = true;

            let extracted = match self.oracle.extract(item, &labels).await {
                Ok(Some(event)) => Some(event),
                Ok(None) => None,
                Err(err) => {
                    warn!(error = %err, title = %item.title, "oracle failed; using fallback extractor");
                    extract_fallback(item, &self.matcher, Utc::now().date_naive())
                }
            };

            let Some(extracted) = extracted else {
                report.missed += 1;
                self.observer.notify(&format!("No event detected in: {}", item.title));
                continue;
            };

            self.process_extracted(item, extracted, &mut report).await;
        }

        if let Err(err) = self.runstate.mark_run_complete().await {
            // Worst case the next run re-scans a covered window.
            warn!(error = %err, "failed to persist run state");
        }

        self.observer.notify(&format!(
            "Pipeline run finished: {} scanned, {} staged, {} ignored, {} missed, {} failed",
            report.scanned, report.staged, report.ignored, report.missed, report.failures
        ));
        info!(?report, "pipeline run complete");
        Ok(report)
    }

    async fn process_extracted(
        &self,
        item: &RawItem,
        extracted: ExtractedEvent,
        report: &mut RunReport,
    ) {
        match self.enricher.enrich(item, extracted).await {
            Ok(Some(event)) => {
                let title = event.title.clone();
                if self.staging.stage(event) {
                    report.staged += 1;
                    self.observer.notify(&format!("Staged for approval: {title}"));
                } else {
                    self.observer.notify(&format!("Already pending, skipped: {title}"));
                }
            }
            Ok(None) => {
                report.ignored += 1;
            }
            Err(err) => {
                report.failures += 1;
                warn!(error = %err, title = %item.title, "enrichment failed");
            }
        }
    }
}

/// Releases the run-in-progress flag even on early return.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
            .then_some(Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use satchel_domain::{EnrichedEvent, PipelineConfig, RunState, SourceKind};

    use super::*;
    use crate::ports::{CalendarGateway, RunStateStore, TracingObserver};
    use crate::runstate::LookbackPolicy;

    struct StaticSource {
        name: &'static str,
        items: Vec<RawItem>,
        fail_auth: bool,
    }

    #[async_trait]
    impl SourceAdapter for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn scan(&self, _lookback_days: i64) -> Result<Vec<RawItem>> {
            if self.fail_auth {
                return Err(SatchelError::Auth("invalid token".into()));
            }
            Ok(self.items.clone())
        }
    }

    struct CountingOracle {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ExtractionOracle for CountingOracle {
        async fn extract(
            &self,
            item: &RawItem,
            _context_labels: &[String],
        ) -> Result<Option<ExtractedEvent>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SatchelError::Oracle("model unavailable".into()));
            }
            Ok(Some(ExtractedEvent {
                title: item.title.clone(),
                start_time: "2026-03-11T09:00:00".parse().expect("timestamp"),
                end_time: None,
                location: None,
                description: item.body.clone(),
                subjects: vec![],
                source_url: None,
            }))
        }
    }

    struct NoopCalendar;

    #[async_trait]
    impl CalendarGateway for NoopCalendar {
        async fn find_conflicts(
            &self,
            _start: NaiveDateTime,
            _end: NaiveDateTime,
        ) -> Result<Vec<String>> {
            Ok(vec![])
        }

        async fn commit(&self, _event: &EnrichedEvent) -> Result<String> {
            Ok("link".to_string())
        }
    }

    struct MemoryState {
        saved: parking_lot::Mutex<Option<RunState>>,
    }

    #[async_trait]
    impl RunStateStore for MemoryState {
        async fn load(&self) -> Result<RunState> {
            Ok(self.saved.lock().clone().unwrap_or_default())
        }

        async fn save(&self, state: &RunState) -> Result<()> {
            *self.saved.lock() = Some(state.clone());
            Ok(())
        }
    }

    fn raw(id: &str, title: &str, body: &str) -> RawItem {
        RawItem {
            id: Some(id.to_string()),
            title: title.to_string(),
            body: body.to_string(),
            source: SourceKind::Email,
        }
    }

    struct Harness {
        pipeline: PipelineService,
        staging: Arc<StagingStore>,
        oracle_calls: Arc<CountingOracle>,
        state: Arc<MemoryState>,
    }

    fn harness(sources: Vec<Arc<dyn SourceAdapter>>, oracle_fails: bool) -> Harness {
        let matcher = Arc::new(SubjectMatcher::new(&PipelineConfig::default()));
        let calendar: Arc<dyn CalendarGateway> = Arc::new(NoopCalendar);
        let staging = Arc::new(StagingStore::new(calendar.clone()));
        let oracle = Arc::new(CountingOracle { calls: AtomicUsize::new(0), fail: oracle_fails });
        let state = Arc::new(MemoryState { saved: parking_lot::Mutex::new(None) });
        let pipeline = PipelineService::new(
            sources,
            oracle.clone(),
            matcher.clone(),
            Enricher::new(matcher, calendar),
            staging.clone(),
            RunStateTracker::new(state.clone(), LookbackPolicy::new(180)),
            Arc::new(TracingObserver),
            Duration::ZERO,
        );
        Harness { pipeline, staging, oracle_calls: oracle, state }
    }

    #[tokio::test]
    async fn ignore_gate_skips_oracle_calls() {
        let source = Arc::new(StaticSource {
            name: "mail",
            items: vec![
                raw("1", "Garden furniture sale", "huge discounts this weekend"),
                raw("2", "Year 3 trip", "Museum trip on 11/03/2026"),
            ],
            fail_auth: false,
        });
        let h = harness(vec![source], false);

        let report = h.pipeline.run().await.expect("run should succeed");

        assert_eq!(report.scanned, 2);
        assert_eq!(report.ignored, 1);
        assert_eq!(report.staged, 1);
        assert_eq!(h.oracle_calls.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn oracle_failure_falls_back_to_regex_extraction() {
        let source = Arc::new(StaticSource {
            name: "mail",
            items: vec![raw("1", "Year 3 trip", "Museum trip on 11/03/2026")],
            fail_auth: false,
        });
        let h = harness(vec![source], true);

        let report = h.pipeline.run().await.expect("run should succeed");

        assert_eq!(report.staged, 1);
        let pending = h.staging.list_pending();
        assert_eq!(pending[0].start_time.date().to_string(), "2026-03-11");
    }

    #[tokio::test]
    async fn fallback_miss_drops_item() {
        let source = Arc::new(StaticSource {
            name: "mail",
            items: vec![raw("1", "Year 3 notice", "no date in here at all")],
            fail_auth: false,
        });
        let h = harness(vec![source], true);

        let report = h.pipeline.run().await.expect("run should succeed");

        assert_eq!(report.missed, 1);
        assert_eq!(report.staged, 0);
    }

    #[tokio::test]
    async fn one_failing_source_does_not_block_others() {
        let bad: Arc<dyn SourceAdapter> =
            Arc::new(StaticSource { name: "portal", items: vec![], fail_auth: true });
        let good: Arc<dyn SourceAdapter> = Arc::new(StaticSource {
            name: "mail",
            items: vec![raw("1", "Year 3 trip", "Museum trip on 11/03/2026")],
            fail_auth: false,
        });
        let h = harness(vec![bad, good], false);

        let report = h.pipeline.run().await.expect("run should succeed");

        assert_eq!(report.staged, 1);
        assert!(h.state.saved.lock().is_some(), "run completion should be marked");
    }

    #[tokio::test]
    async fn all_sources_failing_auth_is_fatal_and_unmarked() {
        let a: Arc<dyn SourceAdapter> =
            Arc::new(StaticSource { name: "mail", items: vec![], fail_auth: true });
        let b: Arc<dyn SourceAdapter> =
            Arc::new(StaticSource { name: "portal", items: vec![], fail_auth: true });
        let h = harness(vec![a, b], false);

        let err = h.pipeline.run().await.expect_err("run should abort");

        assert!(matches!(err, SatchelError::Auth(_)));
        assert!(h.state.saved.lock().is_none(), "aborted run must not mark completion");
        assert_eq!(h.pipeline.status(), RunStatus::Idle, "guard released after abort");
    }

    #[tokio::test]
    async fn concurrent_trigger_is_rejected() {
        let source: Arc<dyn SourceAdapter> = Arc::new(StaticSource {
            name: "mail",
            items: vec![raw("1", "Year 3 trip", "Museum trip on 11/03/2026")],
            fail_auth: false,
        });
        let h = Arc::new(harness(vec![source], false));

        // Simulate an active run by holding the flag.
        let guard = RunGuard::acquire(&h.pipeline.running).expect("flag free");
        let err = h.pipeline.run().await.expect_err("second run rejected");
        assert!(matches!(err, SatchelError::InvalidInput(_)));
        drop(guard);

        h.pipeline.run().await.expect("run succeeds once flag released");
    }
}
