//! Satchel service entry point.
//!
//! Wires configuration, the pipeline, the cron scheduler, and the HTTP
//! approval surface together and runs until interrupted.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use satchel_api::{router, AppContext};
use satchel_core::PipelineService;
use satchel_domain::SatchelError;
use satchel_infra::scheduling::PipelineJob;
use satchel_infra::PipelineScheduler;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

struct ScheduledRun {
    pipeline: Arc<PipelineService>,
}

#[async_trait]
impl PipelineJob for ScheduledRun {
    async fn run(&self) -> Result<(), SatchelError> {
        match self.pipeline.run().await {
            Ok(_) => Ok(()),
            // an overlapping manual trigger is routine, not a job failure
            Err(SatchelError::InvalidInput(message)) => {
                warn!(%message, "scheduled run skipped");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let runtime = satchel_infra::config::load();
    let rules = satchel_infra::config::load_rules(runtime.rules_path.as_deref());
    info!(
        children = rules.search_settings.children.len(),
        mappings = rules.child_mappings.len(),
        "household rules ready"
    );

    let context = Arc::new(AppContext::build(&runtime, &rules).context("failed to wire pipeline")?);

    let mut scheduler = None;
    if runtime.scheduler.enabled {
        let job = Arc::new(ScheduledRun { pipeline: context.pipeline.clone() });
        let mut instance = PipelineScheduler::new(runtime.scheduler.cron.clone(), job);
        instance.start().await.context("failed to start scheduler")?;
        info!(cron = %runtime.scheduler.cron, "scheduled runs enabled");
        scheduler = Some(instance);
    }

    let listener = tokio::net::TcpListener::bind(&runtime.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", runtime.server.bind))?;
    info!(bind = %runtime.server.bind, "approval surface listening");

    axum::serve(listener, router(context))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(mut instance) = scheduler.take() {
        if let Err(err) = instance.stop().await {
            error!(error = %err, "scheduler did not stop cleanly");
        }
    }

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
}
