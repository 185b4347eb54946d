//! Weekly digest dispatch job.

use crate::email::{format::summarize_job, DigestEmailRequest, EmailPriority};
use crate::scheduler::context::JobContext;
use crate::scheduler::job::{BatchJob, JobError};
use crate::store::{EmailKind, WeeklyDigest};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, Duration, Utc};
use tracing::{debug, info, warn};

use super::{BATCH_LIMIT, DIGEST_JOB_WINDOW_DAYS, DIGEST_RESEND_GUARD_DAYS, MAX_JOBS_PER_DIGEST_EMAIL};

/// Counts reported by one digest batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DigestBatchOutcome {
    pub selected: usize,
    pub emails_sent: usize,
    pub skipped_suppressed: usize,
    pub skipped_empty: usize,
    pub failures: usize,
}

enum DigestResult {
    Sent(usize),
    SkippedSuppressed,
    SkippedEmpty,
}

async fn process_digest(ctx: &JobContext, digest: &WeeklyDigest) -> Result<DigestResult> {
    let user = ctx.store.get_user(&digest.user_id)?.with_context(|| {
        format!(
            "Digest {} references missing user {}",
            digest.id, digest.user_id
        )
    })?;

    if ctx.store.is_suppressed(&user.email, EmailKind::WeeklyDigest)? {
        return Ok(DigestResult::SkippedSuppressed);
    }

    let now = Utc::now();
    let posted_after = now - Duration::days(DIGEST_JOB_WINDOW_DAYS);
    let jobs = ctx
        .store
        .digest_jobs(digest, posted_after, MAX_JOBS_PER_DIGEST_EMAIL)?;

    if jobs.is_empty() {
        return Ok(DigestResult::SkippedEmpty);
    }

    let sent = jobs.len();
    let summaries = jobs
        .iter()
        .map(|job| summarize_job(job, &ctx.base_url, now))
        .collect();

    ctx.email_queue
        .enqueue_digest_email(DigestEmailRequest {
            to: user.email,
            display_name: user.display_name,
            user_id: digest.user_id.clone(),
            location: digest.location.clone(),
            jobs: summaries,
            priority: EmailPriority::Normal,
        })
        .await?;

    ctx.store.mark_digest_sent(&digest.id, now)?;
    Ok(DigestResult::Sent(sent))
}

/// Run one digest batch for the current day of week in the scheduler
/// timezone (0 = Sunday).
pub async fn run_digest_batch(ctx: &JobContext) -> Result<DigestBatchOutcome, JobError> {
    let now = Utc::now();
    let today = now
        .with_timezone(&ctx.timezone)
        .weekday()
        .num_days_from_sunday() as u8;
    let cutoff = now - Duration::days(DIGEST_RESEND_GUARD_DAYS);

    let digests = ctx.store.due_digests(today, cutoff, BATCH_LIMIT)?;

    let mut outcome = DigestBatchOutcome {
        selected: digests.len(),
        ..Default::default()
    };

    for digest in &digests {
        match process_digest(ctx, digest).await {
            Ok(DigestResult::Sent(jobs)) => {
                outcome.emails_sent += 1;
                debug!("Digest {} sent with {} jobs", digest.id, jobs);
            }
            Ok(DigestResult::SkippedSuppressed) => {
                outcome.skipped_suppressed += 1;
                debug!("Digest {} skipped: recipient suppressed", digest.id);
            }
            Ok(DigestResult::SkippedEmpty) => {
                outcome.skipped_empty += 1;
            }
            Err(e) => {
                outcome.failures += 1;
                warn!("Digest {} failed: {:#}", digest.id, e);
            }
        }
    }

    info!(
        "Weekly digest batch: {} selected, {} sent, {} suppressed, {} empty, {} failed",
        outcome.selected,
        outcome.emails_sent,
        outcome.skipped_suppressed,
        outcome.skipped_empty,
        outcome.failures
    );
    Ok(outcome)
}

/// Dispatches weekly digests whose subscription day matches today.
pub struct WeeklyDigestsJob;

#[async_trait]
impl BatchJob for WeeklyDigestsJob {
    fn id(&self) -> &'static str {
        "weekly-digests"
    }

    fn description(&self) -> &'static str {
        "Build and dispatch weekly job digests"
    }

    fn cron(&self) -> &'static str {
        "0 0 9 * * Mon"
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        run_digest_batch(ctx).await?;
        Ok(())
    }
}
