//! Cron-driven task scheduling for the batch jobs.

mod context;
mod job;
pub mod jobs;
mod scheduler;

pub use context::JobContext;
pub use job::{BatchJob, JobError};
pub use scheduler::{SchedulerStatus, TaskScheduler, TaskStatus};
