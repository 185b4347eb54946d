//! Formatting helpers for email job summaries.

use crate::store::Job;
use chrono::{DateTime, Duration, Utc};

use super::models::JobSummary;

/// Sentinel returned for timestamps that cannot be rendered as a relative
/// age. Digests run unattended, so a bad timestamp must degrade to this
/// rather than abort the batch.
pub const INVALID_DATE: &str = "Invalid Date";

fn format_thousands(value: i64) -> String {
    let raw = value.abs().to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    let offset = raw.len() % 3;
    for (i, c) in raw.chars().enumerate() {
        if i > 0 && (i + 3 - offset) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if value < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

/// Salary range for display, or None when the posting carries no salary.
pub fn format_salary_range(salary_min: Option<i64>, salary_max: Option<i64>) -> Option<String> {
    match (salary_min, salary_max) {
        (Some(min), Some(max)) if min != max => Some(format!(
            "${} - ${}",
            format_thousands(min),
            format_thousands(max)
        )),
        (Some(value), _) | (None, Some(value)) => Some(format!("${}", format_thousands(value))),
        (None, None) => None,
    }
}

/// Relative age of `posted_at` as seen from `now`, e.g. "3 days ago".
///
/// Timestamps skewed into the future by more than a minute render as the
/// [`INVALID_DATE`] sentinel; small skews from clock drift count as "today".
pub fn format_relative_age(posted_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now - posted_at;
    if age < -Duration::minutes(1) {
        return INVALID_DATE.to_string();
    }

    let days = age.num_days();
    if days < 1 {
        "today".to_string()
    } else if days == 1 {
        "yesterday".to_string()
    } else if days < 7 {
        format!("{} days ago", days)
    } else if days < 14 {
        "1 week ago".to_string()
    } else {
        format!("{} weeks ago", days / 7)
    }
}

/// Same as [`format_relative_age`], from raw timestamp text that may not
/// parse at all.
pub fn format_relative_age_str(raw: &str, now: DateTime<Utc>) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => format_relative_age(dt.with_timezone(&Utc), now),
        Err(_) => INVALID_DATE.to_string(),
    }
}

/// Canonical public URL of a job posting.
pub fn job_url(base_url: &str, job_id: &str) -> String {
    format!("{}/jobs/{}", base_url.trim_end_matches('/'), job_id)
}

/// Build the summary embedded in alert and digest emails.
pub fn summarize_job(job: &Job, base_url: &str, now: DateTime<Utc>) -> JobSummary {
    JobSummary {
        id: job.id.clone(),
        title: job.title.clone(),
        company: job.company.clone(),
        location: job.location.clone(),
        salary: format_salary_range(job.salary_min, job.salary_max),
        posted: format_relative_age(job.created_at, now),
        url: job_url(base_url, &job.id),
    }
}
