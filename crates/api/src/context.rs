//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use satchel_core::{
    CalendarGateway, Enricher, ExtractionOracle, LookbackPolicy, PipelineObserver,
    PipelineService, RunStateStore, RunStateTracker, SourceAdapter, StagingStore, SubjectMatcher,
};
use satchel_domain::config::{PipelineConfig, RuntimeConfig};
use satchel_domain::Result;
use satchel_infra::{
    CalendarClient, FileRunStateStore, GeminiOracle, HttpClient, MailAdapter, PortalAdapter,
};
use tracing::info;

use crate::runlog::RunLog;

/// Holds the wired pipeline and the pieces the HTTP surface serves from.
pub struct AppContext {
    pub pipeline: Arc<PipelineService>,
    pub staging: Arc<StagingStore>,
    pub run_log: Arc<RunLog>,
}

impl AppContext {
    /// Wire the full pipeline against the real integrations.
    pub fn build(runtime: &RuntimeConfig, rules: &PipelineConfig) -> Result<Self> {
        let http_client = HttpClient::builder().user_agent("satchel").build()?;

        let matcher = Arc::new(SubjectMatcher::new(rules));
        let calendar: Arc<dyn CalendarGateway> =
            Arc::new(CalendarClient::new(&runtime.calendar, http_client.clone()));
        let staging = Arc::new(StagingStore::new(calendar.clone()));

        let mut sources: Vec<Arc<dyn SourceAdapter>> = Vec::new();
        if runtime.mail.enabled {
            sources.push(Arc::new(MailAdapter::new(&runtime.mail, rules, http_client.clone())));
        }
        if runtime.portal.enabled {
            sources.push(Arc::new(PortalAdapter::new(&runtime.portal, http_client.clone())));
        }
        info!(sources = sources.len(), "source adapters configured");

        let oracle: Arc<dyn ExtractionOracle> =
            Arc::new(GeminiOracle::new(&runtime.oracle, http_client));
        let state: Arc<dyn RunStateStore> =
            Arc::new(FileRunStateStore::new(runtime.state_path.clone()));
        let run_log = Arc::new(RunLog::new());
        let observer: Arc<dyn PipelineObserver> = run_log.clone();

        let pipeline = Arc::new(PipelineService::new(
            sources,
            oracle,
            matcher.clone(),
            Enricher::new(matcher, calendar),
            staging.clone(),
            RunStateTracker::new(state, LookbackPolicy::new(runtime.backfill_days)),
            observer,
            Duration::from_millis(runtime.oracle.call_delay_ms),
        ));

        Ok(Self { pipeline, staging, run_log })
    }
}
