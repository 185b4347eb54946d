//! Immediate and daily alert dispatch jobs.
//!
//! Both tiers share one batch algorithm and differ only in their
//! re-trigger window and email priority.

use crate::email::{format::summarize_job, AlertEmailRequest, EmailPriority};
use crate::scheduler::context::JobContext;
use crate::scheduler::job::{BatchJob, JobError};
use crate::store::{Alert, AlertFrequency, EmailKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use super::{
    ALERT_JOB_RECENCY_HOURS, BATCH_LIMIT, DAILY_RETRIGGER_HOURS, IMMEDIATE_RETRIGGER_MINUTES,
    MAX_JOBS_PER_ALERT_EMAIL,
};

/// Counts reported by one alert batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertBatchOutcome {
    pub selected: usize,
    pub emails_sent: usize,
    pub jobs_matched: usize,
    pub skipped_suppressed: usize,
    pub skipped_empty: usize,
    pub failures: usize,
}

enum AlertResult {
    Sent(usize),
    SkippedSuppressed,
    SkippedEmpty,
}

async fn process_alert(ctx: &JobContext, alert: &Alert, priority: EmailPriority) -> Result<AlertResult> {
    let user = ctx
        .store
        .get_user(&alert.user_id)?
        .with_context(|| format!("Alert {} references missing user {}", alert.id, alert.user_id))?;

    if ctx.store.is_suppressed(&user.email, EmailKind::JobAlert)? {
        return Ok(AlertResult::SkippedSuppressed);
    }

    let now = Utc::now();
    let posted_after = now - Duration::hours(ALERT_JOB_RECENCY_HOURS);
    let jobs = ctx
        .store
        .matching_jobs_for_alert(alert, posted_after, MAX_JOBS_PER_ALERT_EMAIL)?;

    // No matches means no email and no state mutation, so a later run can
    // still pick this alert up once new postings land in the window.
    if jobs.is_empty() {
        return Ok(AlertResult::SkippedEmpty);
    }

    let matched = jobs.len();
    let summaries = jobs
        .iter()
        .map(|job| summarize_job(job, &ctx.base_url, now))
        .collect();

    ctx.email_queue
        .enqueue_alert_email(AlertEmailRequest {
            to: user.email,
            display_name: user.display_name,
            alert_id: alert.id.clone(),
            user_id: alert.user_id.clone(),
            jobs: summaries,
            priority,
        })
        .await?;

    ctx.store.mark_alert_triggered(&alert.id, now, matched)?;
    Ok(AlertResult::Sent(matched))
}

/// Run one batch for the given frequency tier.
pub async fn run_alert_batch(
    ctx: &JobContext,
    frequency: AlertFrequency,
    retrigger_window: Duration,
    priority: EmailPriority,
) -> Result<AlertBatchOutcome, JobError> {
    let cutoff = Utc::now() - retrigger_window;
    let alerts = ctx.store.due_alerts(frequency, cutoff, BATCH_LIMIT)?;

    let mut outcome = AlertBatchOutcome {
        selected: alerts.len(),
        ..Default::default()
    };

    for alert in &alerts {
        // Per-record isolation: one bad alert never aborts the batch
        match process_alert(ctx, alert, priority).await {
            Ok(AlertResult::Sent(matched)) => {
                outcome.emails_sent += 1;
                outcome.jobs_matched += matched;
                debug!("Alert {} matched {} jobs", alert.id, matched);
            }
            Ok(AlertResult::SkippedSuppressed) => {
                outcome.skipped_suppressed += 1;
                debug!("Alert {} skipped: recipient suppressed", alert.id);
            }
            Ok(AlertResult::SkippedEmpty) => {
                outcome.skipped_empty += 1;
            }
            Err(e) => {
                outcome.failures += 1;
                warn!("Alert {} failed: {:#}", alert.id, e);
            }
        }
    }

    info!(
        "{} alert batch: {} selected, {} emails ({} jobs), {} suppressed, {} empty, {} failed",
        frequency.as_str(),
        outcome.selected,
        outcome.emails_sent,
        outcome.jobs_matched,
        outcome.skipped_suppressed,
        outcome.skipped_empty,
        outcome.failures
    );
    Ok(outcome)
}

/// Dispatches immediate-tier alerts every five minutes.
pub struct ImmediateAlertsJob;

#[async_trait]
impl BatchJob for ImmediateAlertsJob {
    fn id(&self) -> &'static str {
        "immediate-alerts"
    }

    fn description(&self) -> &'static str {
        "Match and dispatch immediate-frequency job alerts"
    }

    fn cron(&self) -> &'static str {
        "0 */5 * * * *"
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        run_alert_batch(
            ctx,
            AlertFrequency::Immediate,
            Duration::minutes(IMMEDIATE_RETRIGGER_MINUTES),
            EmailPriority::High,
        )
        .await?;
        Ok(())
    }
}

/// Dispatches daily-tier alerts each morning.
pub struct DailyAlertsJob;

#[async_trait]
impl BatchJob for DailyAlertsJob {
    fn id(&self) -> &'static str {
        "daily-alerts"
    }

    fn description(&self) -> &'static str {
        "Match and dispatch daily-frequency job alerts"
    }

    fn cron(&self) -> &'static str {
        "0 0 9 * * *"
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        run_alert_batch(
            ctx,
            AlertFrequency::Daily,
            Duration::hours(DAILY_RETRIGGER_HOURS),
            EmailPriority::Normal,
        )
        .await?;
        Ok(())
    }
}
