use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How often an alert owner wants to be notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertFrequency {
    Immediate,
    Daily,
}

impl AlertFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertFrequency::Immediate => "immediate",
            AlertFrequency::Daily => "daily",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "immediate" => Some(AlertFrequency::Immediate),
            "daily" => Some(AlertFrequency::Daily),
            _ => None,
        }
    }
}

/// A saved search owned by a user.
///
/// Only the scheduler mutates `last_triggered` and `total_jobs_sent`; every
/// other field is owned by the web UI, which is outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub user_id: String,
    pub job_title: Option<String>,
    pub location: Option<String>,
    pub job_types: Vec<String>,
    pub categories: Vec<String>,
    pub companies: Vec<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub frequency: AlertFrequency,
    pub is_active: bool,
    pub email_enabled: bool,
    pub last_triggered: Option<DateTime<Utc>>,
    pub total_jobs_sent: i64,
}

/// A recurring digest subscription bound to one day of the week (0 = Sunday).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyDigest {
    pub id: String,
    pub user_id: String,
    pub location: Option<String>,
    pub categories: Vec<String>,
    pub job_types: Vec<String>,
    pub day_of_week: u8,
    pub is_active: bool,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub total_digests_sent: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Active,
    Expired,
    Closed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Active => "active",
            JobStatus::Expired => "expired",
            JobStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(JobStatus::Active),
            "expired" => Some(JobStatus::Expired),
            "closed" => Some(JobStatus::Closed),
            _ => None,
        }
    }
}

/// An active job posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub job_type: String,
    pub categories: Vec<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub is_remote: bool,
    pub description: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// An alert/digest owner, with the token pairs the token-cleanup job expires.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub magic_link_token: Option<String>,
    pub magic_link_expires_at: Option<DateTime<Utc>>,
    pub password_reset_token: Option<String>,
    pub password_reset_expires_at: Option<DateTime<Utc>>,
}

/// Email types a recipient can opt out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    JobAlert,
    WeeklyDigest,
}

impl EmailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailKind::JobAlert => "job_alert",
            EmailKind::WeeklyDigest => "weekly_digest",
        }
    }
}

/// Per-email suppression record. Read-only for the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailUnsubscribe {
    pub email: String,
    pub unsubscribe_all: bool,
    pub unsubscribe_from: Vec<String>,
}

impl EmailUnsubscribe {
    /// Whether this record suppresses the given email type.
    pub fn suppresses(&self, kind: EmailKind) -> bool {
        self.unsubscribe_all || self.unsubscribe_from.iter().any(|t| t == kind.as_str())
    }
}

/// Audit record of a sent or failed email.
#[derive(Debug, Clone)]
pub struct EmailLog {
    pub id: i64,
    pub recipient: String,
    pub email_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Statuses after which an email log row will never change again and is
/// safe to purge by retention policy.
pub const TERMINAL_EMAIL_STATUSES: &[&str] = &["sent", "delivered", "failed", "bounced"];

/// Counts reported by one token-cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenCleanupCounts {
    pub magic_link_tokens: usize,
    pub password_reset_tokens: usize,
    pub email_logs: usize,
}
