//! Token and email-log cleanup job.

use crate::scheduler::context::JobContext;
use crate::scheduler::job::{BatchJob, JobError};
use crate::store::TokenCleanupCounts;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::info;

use super::EMAIL_LOG_RETENTION_DAYS;

/// One cleanup pass: expire both auth token kinds and purge old email logs.
pub fn run_token_cleanup(ctx: &JobContext) -> anyhow::Result<TokenCleanupCounts> {
    let now = Utc::now();
    let counts = TokenCleanupCounts {
        magic_link_tokens: ctx.store.expire_magic_link_tokens(now)?,
        password_reset_tokens: ctx.store.expire_password_reset_tokens(now)?,
        email_logs: ctx
            .store
            .delete_email_logs_before(now - Duration::days(EMAIL_LOG_RETENTION_DAYS))?,
    };
    Ok(counts)
}

/// Nightly cleanup of expired auth tokens and aged-out email logs.
pub struct TokenCleanupJob;

#[async_trait]
impl BatchJob for TokenCleanupJob {
    fn id(&self) -> &'static str {
        "token-cleanup"
    }

    fn description(&self) -> &'static str {
        "Expire stale auth tokens and purge old email logs"
    }

    fn cron(&self) -> &'static str {
        "0 0 2 * * *"
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let counts = run_token_cleanup(ctx)?;
        info!(
            "Token cleanup: {} magic-link tokens, {} password-reset tokens, {} email logs",
            counts.magic_link_tokens, counts.password_reset_tokens, counts.email_logs
        );
        Ok(())
    }
}
