//! Cron scheduler for unattended pipeline runs.
//!
//! Triggers the pipeline job on a fixed cron expression. Join handles are
//! tracked, cancellation is explicit, and every asynchronous lifecycle
//! operation is wrapped in a timeout. A run that overlaps the previous
//! one is rejected by the pipeline itself; the scheduler just logs it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use satchel_domain::SatchelError;

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Trait representing the scheduled pipeline work.
#[async_trait]
pub trait PipelineJob: Send + Sync {
    /// Execute one pipeline run.
    async fn run(&self) -> Result<(), SatchelError>;
}

/// Configuration for the pipeline scheduler.
#[derive(Debug, Clone)]
pub struct PipelineSchedulerConfig {
    /// Cron expression describing the execution schedule.
    pub cron_expression: String,
    /// Timeout applied to a single job execution.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for PipelineSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: satchel_domain::constants::DEFAULT_CRON.into(),
            job_timeout: Duration::from_secs(1800), // a run can touch every source
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Pipeline scheduler with explicit lifecycle management.
pub struct PipelineScheduler {
    scheduler: Arc<RwLock<Option<JobScheduler>>>,
    config: PipelineSchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    job: Arc<dyn PipelineJob>,
}

impl PipelineScheduler {
    /// Create a scheduler with the default configuration and the given
    /// cron expression.
    pub fn new(cron_expression: String, job: Arc<dyn PipelineJob>) -> Self {
        let config = PipelineSchedulerConfig { cron_expression, ..Default::default() };
        Self::with_config(config, job)
    }

    pub fn with_config(config: PipelineSchedulerConfig, job: Arc<dyn PipelineJob>) -> Self {
        Self {
            scheduler: Arc::new(RwLock::new(None)),
            config,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            job,
        }
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler_instance = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;

        let start_result = tokio::time::timeout(start_timeout, scheduler_instance.start())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?;
        start_result.map_err(|source| SchedulerError::StartFailed(source.to_string()))?;

        {
            let mut guard = self.scheduler.write().await;
            *guard = Some(scheduler_instance);
        }

        let cancel = self.cancellation.clone();
        let handle = tokio::spawn(async move {
            cancel.cancelled().await;
            debug!("pipeline scheduler monitor cancelled");
        });

        self.monitor_handle = Some(handle);
        info!(cron = %self.config.cron_expression, "pipeline scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let scheduler = {
            let mut guard = self.scheduler.write().await;
            guard.take()
        };

        let mut scheduler = match scheduler {
            Some(scheduler) => scheduler,
            None => return Err(SchedulerError::NotRunning),
        };

        let stop_timeout = self.config.stop_timeout;
        let stop_result =
            tokio::time::timeout(stop_timeout, async move { scheduler.shutdown().await })
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?;
        stop_result.map_err(|source| SchedulerError::StopFailed(source.to_string()))?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!("pipeline scheduler stopped");
        Ok(())
    }

    /// Returns true when the monitor task is active.
    pub fn is_running(&self) -> bool {
        self.monitor_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|source| SchedulerError::CreationFailed(source.to_string()))?;
        let cron_expr = self.config.cron_expression.clone();
        let job = self.job.clone();
        let job_timeout = self.config.job_timeout;

        let job_definition = Job::new_async(cron_expr.as_str(), move |_id, _lock| {
            let job = job.clone();

            Box::pin(async move {
                let started = Instant::now();
                debug!("scheduled pipeline run starting");

                match tokio::time::timeout(job_timeout, job.run()).await {
                    Ok(Ok(())) => {
                        debug!(elapsed = ?started.elapsed(), "scheduled pipeline run finished");
                    }
                    Ok(Err(err)) => {
                        error!(error = %err, "scheduled pipeline run failed");
                    }
                    Err(_) => {
                        warn!(timeout_secs = job_timeout.as_secs(), "scheduled pipeline run timed out");
                    }
                }
            })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed(source.to_string()))?;

        let job_id = job_definition.guid();
        scheduler
            .add(job_definition)
            .await
            .map_err(|source| SchedulerError::JobRegistrationFailed(source.to_string()))?;

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "registered pipeline job");
        Ok(scheduler)
    }
}

impl Drop for PipelineScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("PipelineScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
