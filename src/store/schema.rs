//! SQLite schema for the job-board store.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, ForeignKey, SqlType, Table, VersionedSchema};

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "id",
};

/// Users table - alert/digest owners plus the auth token pairs that the
/// token-cleanup job nulls out when expired.
const USERS_TABLE_V1: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("display_name", &SqlType::Text),
        sqlite_column!("magic_link_token", &SqlType::Text),
        sqlite_column!("magic_link_expires_at", &SqlType::Text),
        sqlite_column!("password_reset_token", &SqlType::Text),
        sqlite_column!("password_reset_expires_at", &SqlType::Text),
    ],
    indices: &[],
};

/// Alerts table - saved searches. JSON-array TEXT columns hold the set
/// filters (job types, categories, companies).
const ALERTS_TABLE_V1: Table = Table {
    name: "alerts",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("job_title", &SqlType::Text),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("job_types", &SqlType::Text),
        sqlite_column!("categories", &SqlType::Text),
        sqlite_column!("companies", &SqlType::Text),
        sqlite_column!("salary_min", &SqlType::Integer),
        sqlite_column!("salary_max", &SqlType::Integer),
        sqlite_column!("frequency", &SqlType::Text, non_null = true),
        sqlite_column!("is_active", &SqlType::Integer, non_null = true, default_value = Some("1")),
        sqlite_column!("email_enabled", &SqlType::Integer, non_null = true, default_value = Some("1")),
        sqlite_column!("last_triggered", &SqlType::Text),
        sqlite_column!("total_jobs_sent", &SqlType::Integer, non_null = true, default_value = Some("0")),
    ],
    indices: &[
        ("idx_alerts_frequency", "frequency, last_triggered"),
        ("idx_alerts_user", "user_id"),
    ],
};

const WEEKLY_DIGESTS_TABLE_V1: Table = Table {
    name: "weekly_digests",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("categories", &SqlType::Text),
        sqlite_column!("job_types", &SqlType::Text),
        sqlite_column!("day_of_week", &SqlType::Integer, non_null = true),
        sqlite_column!("is_active", &SqlType::Integer, non_null = true, default_value = Some("1")),
        sqlite_column!("last_sent_at", &SqlType::Text),
        sqlite_column!("total_digests_sent", &SqlType::Integer, non_null = true, default_value = Some("0")),
    ],
    indices: &[("idx_weekly_digests_day", "day_of_week, last_sent_at")],
};

const JOBS_TABLE_V1: Table = Table {
    name: "jobs",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("company", &SqlType::Text, non_null = true),
        sqlite_column!("location", &SqlType::Text, non_null = true),
        sqlite_column!("job_type", &SqlType::Text, non_null = true),
        sqlite_column!("categories", &SqlType::Text),
        sqlite_column!("salary_min", &SqlType::Integer),
        sqlite_column!("salary_max", &SqlType::Integer),
        sqlite_column!("is_remote", &SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("status", &SqlType::Text, non_null = true, default_value = Some("'active'")),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
        sqlite_column!("expires_at", &SqlType::Text),
    ],
    indices: &[
        ("idx_jobs_status_created", "status, created_at DESC"),
        ("idx_jobs_expires", "expires_at"),
    ],
};

const EMAIL_UNSUBSCRIBES_TABLE_V1: Table = Table {
    name: "email_unsubscribes",
    columns: &[
        sqlite_column!("email", &SqlType::Text, is_primary_key = true),
        sqlite_column!("unsubscribe_all", &SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!("unsubscribe_from", &SqlType::Text),
    ],
    indices: &[],
};

const EMAIL_LOGS_TABLE_V1: Table = Table {
    name: "email_logs",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("recipient", &SqlType::Text, non_null = true),
        sqlite_column!("email_type", &SqlType::Text, non_null = true),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_email_logs_created", "created_at")],
};

const SEARCH_EVENTS_TABLE_V1: Table = Table {
    name: "search_events",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("query", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_search_events_created", "created_at")],
};

pub const JOBBOARD_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        USERS_TABLE_V1,
        ALERTS_TABLE_V1,
        WEEKLY_DIGESTS_TABLE_V1,
        JOBS_TABLE_V1,
        EMAIL_UNSUBSCRIBES_TABLE_V1,
        EMAIL_LOGS_TABLE_V1,
        SEARCH_EVENTS_TABLE_V1,
    ],
    migration: None,
}];
