//! The six scheduled batch jobs.

mod alert_dispatch;
mod db_maintenance;
mod job_rankings;
mod token_cleanup;
mod weekly_digest;

pub use alert_dispatch::{run_alert_batch, AlertBatchOutcome, DailyAlertsJob, ImmediateAlertsJob};
pub use db_maintenance::DbMaintenanceJob;
pub use job_rankings::JobRankingsJob;
pub use token_cleanup::{run_token_cleanup, TokenCleanupJob};
pub use weekly_digest::{run_digest_batch, DigestBatchOutcome, WeeklyDigestsJob};

use super::job::BatchJob;
use std::sync::Arc;

/// Maximum alerts or digests selected per batch run. Bounds worst-case run
/// time; the remainder is picked up on the next tick.
pub const BATCH_LIMIT: usize = 100;

/// How far back a job posting may be to appear in an alert email.
pub const ALERT_JOB_RECENCY_HOURS: i64 = 24;

/// Maximum jobs carried in one alert email.
pub const MAX_JOBS_PER_ALERT_EMAIL: usize = 10;

/// Immediate alerts are not re-triggered within this window.
pub const IMMEDIATE_RETRIGGER_MINUTES: i64 = 5;

/// Daily alerts are not re-triggered within this window.
pub const DAILY_RETRIGGER_HOURS: i64 = 24;

/// Maximum jobs carried in one weekly digest email.
pub const MAX_JOBS_PER_DIGEST_EMAIL: usize = 15;

/// How far back a job posting may be to appear in a digest.
pub const DIGEST_JOB_WINDOW_DAYS: i64 = 7;

/// A digest sent within this window is not re-sent, even on its day.
pub const DIGEST_RESEND_GUARD_DAYS: i64 = 6;

/// Retention for terminal-status email log rows.
pub const EMAIL_LOG_RETENTION_DAYS: i64 = 90;

/// Jobs with no explicit expiry are expired once older than this.
pub const JOB_RETENTION_DAYS: i64 = 90;

/// Retention for search analytics rows.
pub const SEARCH_EVENT_RETENTION_DAYS: i64 = 180;

/// The full job roster, in registration order.
pub fn default_jobs() -> Vec<Arc<dyn BatchJob>> {
    vec![
        Arc::new(ImmediateAlertsJob),
        Arc::new(DailyAlertsJob),
        Arc::new(WeeklyDigestsJob),
        Arc::new(TokenCleanupJob),
        Arc::new(JobRankingsJob),
        Arc::new(DbMaintenanceJob),
    ]
}
