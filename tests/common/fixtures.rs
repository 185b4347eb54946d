//! Record builders for users, alerts, digests, and jobs.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use jobboard_alert_scheduler::store::{
    Alert, AlertFrequency, Job, JobBoardStore, JobStatus, User, WeeklyDigest,
};

pub fn insert_user(store: &dyn JobBoardStore, id: &str) -> User {
    let user = User {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        display_name: Some(format!("User {}", id)),
        magic_link_token: None,
        magic_link_expires_at: None,
        password_reset_token: None,
        password_reset_expires_at: None,
    };
    store.insert_user(&user).unwrap();
    user
}

pub fn alert(id: &str, user_id: &str, frequency: AlertFrequency) -> Alert {
    Alert {
        id: id.to_string(),
        user_id: user_id.to_string(),
        job_title: None,
        location: None,
        job_types: vec![],
        categories: vec![],
        companies: vec![],
        salary_min: None,
        salary_max: None,
        frequency,
        is_active: true,
        email_enabled: true,
        last_triggered: None,
        total_jobs_sent: 0,
    }
}

pub fn digest(id: &str, user_id: &str, day_of_week: u8) -> WeeklyDigest {
    WeeklyDigest {
        id: id.to_string(),
        user_id: user_id.to_string(),
        location: None,
        categories: vec![],
        job_types: vec![],
        day_of_week,
        is_active: true,
        last_sent_at: None,
        total_digests_sent: 0,
    }
}

pub fn job(id: &str, title: &str, created_at: DateTime<Utc>) -> Job {
    Job {
        id: id.to_string(),
        title: title.to_string(),
        company: "Acme Logistics".to_string(),
        location: "Stockton, CA".to_string(),
        job_type: "full_time".to_string(),
        categories: vec!["logistics".to_string()],
        salary_min: Some(40_000),
        salary_max: Some(55_000),
        is_remote: false,
        description: None,
        status: JobStatus::Active,
        created_at,
        expires_at: None,
    }
}
