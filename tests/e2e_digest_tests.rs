//! End-to-end tests for the weekly digest batch.

mod common;

use chrono::{Datelike, Duration, Utc};
use common::{digest, insert_user, job, TestHarness};
use jobboard_alert_scheduler::scheduler::jobs::run_digest_batch;
use jobboard_alert_scheduler::store::{EmailUnsubscribe, JobBoardStore};

fn today_in_tz(harness: &TestHarness) -> u8 {
    Utc::now()
        .with_timezone(&harness.ctx.timezone)
        .weekday()
        .num_days_from_sunday() as u8
}

#[tokio::test]
async fn test_digest_dispatch_end_to_end() {
    let harness = TestHarness::new();
    let now = Utc::now();
    let today = today_in_tz(&harness);

    insert_user(harness.store.as_ref(), "u1");
    let mut d = digest("d1", "u1", today);
    d.location = Some("Stockton".to_string());
    harness.store.insert_digest(&d).unwrap();
    harness
        .store
        .insert_job(&job("j1", "Warehouse Associate", now - Duration::days(2)))
        .unwrap();

    let outcome = run_digest_batch(&harness.ctx).await.unwrap();
    assert_eq!(outcome.emails_sent, 1);

    let emails = harness.email_queue.digest_emails();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].to, "u1@example.com");
    assert_eq!(emails[0].location, Some("Stockton".to_string()));
    assert_eq!(emails[0].jobs.len(), 1);
    assert_eq!(emails[0].jobs[0].posted, "2 days ago");
    assert_eq!(
        emails[0].jobs[0].salary,
        Some("$40,000 - $55,000".to_string())
    );

    let updated = harness.store.get_digest("d1").unwrap().unwrap();
    assert!(updated.last_sent_at.is_some());
    assert_eq!(updated.total_digests_sent, 1);
}

#[tokio::test]
async fn test_day_gating_excludes_other_days() {
    let harness = TestHarness::new();
    let now = Utc::now();
    let today = today_in_tz(&harness);
    let other_day = (today + 1) % 7;

    insert_user(harness.store.as_ref(), "u1");
    // Never sent, but wrong day: must not be selected
    harness
        .store
        .insert_digest(&digest("d-other", "u1", other_day))
        .unwrap();
    harness
        .store
        .insert_job(&job("j1", "Warehouse Associate", now - Duration::days(1)))
        .unwrap();

    let outcome = run_digest_batch(&harness.ctx).await.unwrap();
    assert_eq!(outcome.selected, 0);
    assert!(harness.email_queue.digest_emails().is_empty());
}

#[tokio::test]
async fn test_resend_guard_skips_recently_sent() {
    let harness = TestHarness::new();
    let now = Utc::now();
    let today = today_in_tz(&harness);

    insert_user(harness.store.as_ref(), "u1");
    harness
        .store
        .insert_job(&job("j1", "Warehouse Associate", now - Duration::days(1)))
        .unwrap();

    // Sent 2 days ago: within the 6-day guard
    let mut recent = digest("d-recent", "u1", today);
    recent.last_sent_at = Some(now - Duration::days(2));
    harness.store.insert_digest(&recent).unwrap();

    // Sent 7 days ago: eligible again
    let mut stale = digest("d-stale", "u1", today);
    stale.last_sent_at = Some(now - Duration::days(7));
    harness.store.insert_digest(&stale).unwrap();

    let outcome = run_digest_batch(&harness.ctx).await.unwrap();
    assert_eq!(outcome.selected, 1);
    assert_eq!(harness.email_queue.digest_emails().len(), 1);

    let stale = harness.store.get_digest("d-stale").unwrap().unwrap();
    assert_eq!(stale.total_digests_sent, 1);
    let recent = harness.store.get_digest("d-recent").unwrap().unwrap();
    assert_eq!(recent.total_digests_sent, 0);
}

#[tokio::test]
async fn test_empty_digest_not_sent() {
    let harness = TestHarness::new();
    let today = today_in_tz(&harness);

    insert_user(harness.store.as_ref(), "u1");
    let mut d = digest("d1", "u1", today);
    d.location = Some("Nowhere, MT".to_string());
    harness.store.insert_digest(&d).unwrap();

    let outcome = run_digest_batch(&harness.ctx).await.unwrap();
    assert_eq!(outcome.skipped_empty, 1);
    assert!(harness.email_queue.digest_emails().is_empty());

    let unchanged = harness.store.get_digest("d1").unwrap().unwrap();
    assert!(unchanged.last_sent_at.is_none());
}

#[tokio::test]
async fn test_digest_suppression_honored() {
    let harness = TestHarness::new();
    let now = Utc::now();
    let today = today_in_tz(&harness);

    let user = insert_user(harness.store.as_ref(), "u1");
    harness
        .store
        .insert_unsubscribe(&EmailUnsubscribe {
            email: user.email,
            unsubscribe_all: false,
            unsubscribe_from: vec!["weekly_digest".to_string()],
        })
        .unwrap();
    harness
        .store
        .insert_digest(&digest("d1", "u1", today))
        .unwrap();
    harness
        .store
        .insert_job(&job("j1", "Warehouse Associate", now - Duration::days(1)))
        .unwrap();

    let outcome = run_digest_batch(&harness.ctx).await.unwrap();
    assert_eq!(outcome.skipped_suppressed, 1);
    assert!(harness.email_queue.digest_emails().is_empty());
}

#[tokio::test]
async fn test_remote_jobs_match_any_location_filter() {
    let harness = TestHarness::new();
    let now = Utc::now();
    let today = today_in_tz(&harness);

    insert_user(harness.store.as_ref(), "u1");
    let mut d = digest("d1", "u1", today);
    d.location = Some("Stockton".to_string());
    harness.store.insert_digest(&d).unwrap();

    let mut remote = job("j-remote", "Remote Support Agent", now - Duration::days(1));
    remote.location = "Anywhere".to_string();
    remote.is_remote = true;
    harness.store.insert_job(&remote).unwrap();

    let outcome = run_digest_batch(&harness.ctx).await.unwrap();
    assert_eq!(outcome.emails_sent, 1);
    let emails = harness.email_queue.digest_emails();
    assert_eq!(emails[0].jobs[0].id, "j-remote");
}
