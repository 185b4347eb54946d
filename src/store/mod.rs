mod models;
mod schema;
mod sqlite_store;

pub use models::*;
pub use schema::JOBBOARD_VERSIONED_SCHEMAS;
pub use sqlite_store::SqliteJobBoardStore;

use anyhow::Result;
use chrono::{DateTime, Utc};

/// Persistent store consumed by the batch jobs.
///
/// Every write the scheduler performs is scoped to rows selected by primary
/// key in the same batch run, so implementations need no cross-batch locking.
pub trait JobBoardStore: Send + Sync {
    // Alerts
    /// Alerts eligible for dispatch: active, email-enabled, matching
    /// frequency, and `last_triggered` NULL or at/before the cutoff.
    /// Ordered oldest `last_triggered` first (never-triggered first).
    fn due_alerts(
        &self,
        frequency: AlertFrequency,
        triggered_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Alert>>;
    /// Active jobs posted after `posted_after` matching every non-empty
    /// filter on the alert, newest first.
    fn matching_jobs_for_alert(
        &self,
        alert: &Alert,
        posted_after: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Job>>;
    fn mark_alert_triggered(
        &self,
        alert_id: &str,
        at: DateTime<Utc>,
        jobs_sent: usize,
    ) -> Result<()>;
    fn get_alert(&self, alert_id: &str) -> Result<Option<Alert>>;
    fn insert_alert(&self, alert: &Alert) -> Result<()>;

    // Weekly digests
    /// Digests eligible for dispatch: active, matching day of week, and
    /// `last_sent_at` NULL or at/before the cutoff. Oldest first.
    fn due_digests(
        &self,
        day_of_week: u8,
        sent_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<WeeklyDigest>>;
    /// Active jobs posted after `posted_after` matching the digest filters,
    /// newest first. Remote jobs match any location filter.
    fn digest_jobs(
        &self,
        digest: &WeeklyDigest,
        posted_after: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Job>>;
    fn mark_digest_sent(&self, digest_id: &str, at: DateTime<Utc>) -> Result<()>;
    fn get_digest(&self, digest_id: &str) -> Result<Option<WeeklyDigest>>;
    fn insert_digest(&self, digest: &WeeklyDigest) -> Result<()>;

    // Users and suppression
    fn get_user(&self, user_id: &str) -> Result<Option<User>>;
    fn insert_user(&self, user: &User) -> Result<()>;
    fn is_suppressed(&self, email: &str, kind: EmailKind) -> Result<bool>;
    fn insert_unsubscribe(&self, record: &EmailUnsubscribe) -> Result<()>;

    // Jobs
    fn get_job(&self, job_id: &str) -> Result<Option<Job>>;
    fn insert_job(&self, job: &Job) -> Result<()>;
    /// Transition to `expired` every non-expired job whose `expires_at` has
    /// passed, or whose `expires_at` is unset and `created_at` is at/before
    /// `unset_expiry_cutoff`. Returns the number of rows changed.
    fn expire_due_jobs(
        &self,
        now: DateTime<Utc>,
        unset_expiry_cutoff: DateTime<Utc>,
    ) -> Result<usize>;

    // Token cleanup
    fn expire_magic_link_tokens(&self, now: DateTime<Utc>) -> Result<usize>;
    fn expire_password_reset_tokens(&self, now: DateTime<Utc>) -> Result<usize>;
    /// Delete email logs older than the cutoff with a terminal status.
    fn delete_email_logs_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
    fn insert_email_log(
        &self,
        recipient: &str,
        email_type: &str,
        status: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i64>;
    fn count_email_logs(&self) -> Result<usize>;

    // Search analytics
    fn delete_search_events_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
    fn insert_search_event(&self, query: &str, created_at: DateTime<Utc>) -> Result<i64>;
    fn count_search_events(&self) -> Result<usize>;
}
