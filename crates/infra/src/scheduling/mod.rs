//! Cron scheduling for unattended pipeline runs

pub mod error;
pub mod pipeline_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use pipeline_scheduler::{PipelineJob, PipelineScheduler, PipelineSchedulerConfig};
