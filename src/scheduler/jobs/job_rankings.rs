//! Job ranking update: expire postings past their lifetime.

use crate::scheduler::context::JobContext;
use crate::scheduler::job::{BatchJob, JobError};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::info;

use super::JOB_RETENTION_DAYS;

/// Transitions to `expired` every job past its `expires_at`, or past the
/// retention window when no expiry was set. Idempotent, safe alongside
/// concurrent job creation and editing.
pub struct JobRankingsJob;

#[async_trait]
impl BatchJob for JobRankingsJob {
    fn id(&self) -> &'static str {
        "job-rankings"
    }

    fn description(&self) -> &'static str {
        "Mark expired job postings"
    }

    fn cron(&self) -> &'static str {
        "0 0 */6 * * *"
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let now = Utc::now();
        let expired = ctx
            .store
            .expire_due_jobs(now, now - Duration::days(JOB_RETENTION_DAYS))?;
        if expired > 0 {
            info!("Marked {} jobs as expired", expired);
        } else {
            info!("No jobs due for expiry");
        }
        Ok(())
    }
}
