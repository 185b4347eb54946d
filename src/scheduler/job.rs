use super::context::JobContext;
use async_trait::async_trait;

/// Errors that can occur during batch job execution.
#[derive(Debug)]
pub enum JobError {
    ExecutionFailed(String),
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobError::ExecutionFailed(msg) => write!(f, "Execution failed: {}", msg),
        }
    }
}

impl std::error::Error for JobError {}

impl From<anyhow::Error> for JobError {
    fn from(e: anyhow::Error) -> Self {
        JobError::ExecutionFailed(format!("{:#}", e))
    }
}

/// Trait for scheduled batch jobs.
///
/// One execution runs to completion before the same job's timer can fire
/// again; there is no mid-batch cancellation. Different jobs may interleave,
/// so implementations must keep their mutations idempotent and
/// order-independent.
#[async_trait]
pub trait BatchJob: Send + Sync {
    /// Unique identifier for this job.
    fn id(&self) -> &'static str;

    /// Description of what this job does.
    fn description(&self) -> &'static str;

    /// Cron expression (with seconds field) for when this job fires.
    fn cron(&self) -> &'static str;

    /// Execute one batch run.
    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError>;
}
