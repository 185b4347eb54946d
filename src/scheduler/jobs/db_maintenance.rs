//! Database maintenance: analytics retention.
//!
//! Runs in its own error boundary, separate from token cleanup, so a
//! failure here never masks or blocks the other maintenance outcome.

use crate::scheduler::context::JobContext;
use crate::scheduler::job::{BatchJob, JobError};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::info;

use super::SEARCH_EVENT_RETENTION_DAYS;

/// Nightly purge of aged-out search analytics rows.
pub struct DbMaintenanceJob;

#[async_trait]
impl BatchJob for DbMaintenanceJob {
    fn id(&self) -> &'static str {
        "db-maintenance"
    }

    fn description(&self) -> &'static str {
        "Purge old search analytics records"
    }

    fn cron(&self) -> &'static str {
        "0 0 3 * * *"
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let cutoff = Utc::now() - Duration::days(SEARCH_EVENT_RETENTION_DAYS);
        let deleted = ctx.store.delete_search_events_before(cutoff)?;
        if deleted > 0 {
            info!("Deleted {} old search analytics records", deleted);
        } else {
            info!("No search analytics records to purge");
        }
        Ok(())
    }
}
