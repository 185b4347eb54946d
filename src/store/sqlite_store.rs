use super::models::{
    Alert, AlertFrequency, EmailKind, EmailUnsubscribe, Job, JobStatus, User, WeeklyDigest,
    TERMINAL_EMAIL_STATUSES,
};
use super::schema::JOBBOARD_VERSIONED_SCHEMAS;
use super::JobBoardStore;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, ToSql};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct SqliteJobBoardStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteJobBoardStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let conn = Connection::open(path).context("Failed to open job board database")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        if is_new_db {
            info!("Creating new job board database at {:?}", path);
            JOBBOARD_VERSIONED_SCHEMAS.last().unwrap().create(&conn)?;
        } else {
            let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
            let db_version = raw_version - BASE_DB_VERSION as i64;

            if db_version < 1 {
                anyhow::bail!(
                    "Job board database version {} is invalid (expected >= 1)",
                    db_version
                );
            }

            let schema = JOBBOARD_VERSIONED_SCHEMAS
                .iter()
                .find(|s| s.version == db_version as usize)
                .with_context(|| format!("Unknown job board database version {}", db_version))?;
            schema.validate(&conn).with_context(|| {
                format!(
                    "Job board database schema validation failed for version {}",
                    db_version
                )
            })?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Fixed-width timestamp text so lexicographic comparison in SQL matches
    /// chronological order.
    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    fn parse_string_list(raw: Option<String>) -> Vec<String> {
        raw.and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    fn encode_string_list(list: &[String]) -> String {
        serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string())
    }

    fn placeholders(count: usize) -> String {
        vec!["?"; count].join(", ")
    }

    fn row_to_alert(row: &rusqlite::Row) -> rusqlite::Result<Alert> {
        let frequency_str: String = row.get("frequency")?;
        let last_triggered_str: Option<String> = row.get("last_triggered")?;
        Ok(Alert {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            job_title: row.get("job_title")?,
            location: row.get("location")?,
            job_types: Self::parse_string_list(row.get("job_types")?),
            categories: Self::parse_string_list(row.get("categories")?),
            companies: Self::parse_string_list(row.get("companies")?),
            salary_min: row.get("salary_min")?,
            salary_max: row.get("salary_max")?,
            frequency: AlertFrequency::parse(&frequency_str).unwrap_or(AlertFrequency::Daily),
            is_active: row.get::<_, i64>("is_active")? != 0,
            email_enabled: row.get::<_, i64>("email_enabled")? != 0,
            last_triggered: last_triggered_str.as_deref().and_then(Self::parse_datetime),
            total_jobs_sent: row.get("total_jobs_sent")?,
        })
    }

    fn row_to_digest(row: &rusqlite::Row) -> rusqlite::Result<WeeklyDigest> {
        let last_sent_at_str: Option<String> = row.get("last_sent_at")?;
        let day_of_week: i64 = row.get("day_of_week")?;
        Ok(WeeklyDigest {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            location: row.get("location")?,
            categories: Self::parse_string_list(row.get("categories")?),
            job_types: Self::parse_string_list(row.get("job_types")?),
            day_of_week: day_of_week as u8,
            is_active: row.get::<_, i64>("is_active")? != 0,
            last_sent_at: last_sent_at_str.as_deref().and_then(Self::parse_datetime),
            total_digests_sent: row.get("total_digests_sent")?,
        })
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let status_str: String = row.get("status")?;
        let created_at_str: String = row.get("created_at")?;
        let expires_at_str: Option<String> = row.get("expires_at")?;
        Ok(Job {
            id: row.get("id")?,
            title: row.get("title")?,
            company: row.get("company")?,
            location: row.get("location")?,
            job_type: row.get("job_type")?,
            categories: Self::parse_string_list(row.get("categories")?),
            salary_min: row.get("salary_min")?,
            salary_max: row.get("salary_max")?,
            is_remote: row.get::<_, i64>("is_remote")? != 0,
            description: row.get("description")?,
            status: JobStatus::parse(&status_str).unwrap_or(JobStatus::Closed),
            created_at: Self::parse_datetime(&created_at_str).unwrap_or_else(Utc::now),
            expires_at: expires_at_str.as_deref().and_then(Self::parse_datetime),
        })
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let ml_expires: Option<String> = row.get("magic_link_expires_at")?;
        let pr_expires: Option<String> = row.get("password_reset_expires_at")?;
        Ok(User {
            id: row.get("id")?,
            email: row.get("email")?,
            display_name: row.get("display_name")?,
            magic_link_token: row.get("magic_link_token")?,
            magic_link_expires_at: ml_expires.as_deref().and_then(Self::parse_datetime),
            password_reset_token: row.get("password_reset_token")?,
            password_reset_expires_at: pr_expires.as_deref().and_then(Self::parse_datetime),
        })
    }

    /// Append the job filter clauses shared by alert matching and digest
    /// gathering. `remote_matches_location` widens a location filter to
    /// include remote jobs.
    #[allow(clippy::too_many_arguments)]
    fn push_job_filters(
        sql: &mut String,
        query_params: &mut Vec<Box<dyn ToSql>>,
        title: Option<&str>,
        location: Option<&str>,
        remote_matches_location: bool,
        job_types: &[String],
        categories: &[String],
        companies: &[String],
        salary_min: Option<i64>,
        salary_max: Option<i64>,
    ) {
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            sql.push_str(" AND title LIKE ?");
            query_params.push(Box::new(format!("%{}%", title.trim())));
        }
        if let Some(location) = location.filter(|l| !l.trim().is_empty()) {
            if remote_matches_location {
                sql.push_str(" AND (location LIKE ? OR is_remote = 1)");
            } else {
                sql.push_str(" AND location LIKE ?");
            }
            query_params.push(Box::new(format!("%{}%", location.trim())));
        }
        if !job_types.is_empty() {
            sql.push_str(&format!(
                " AND job_type IN ({})",
                Self::placeholders(job_types.len())
            ));
            for job_type in job_types {
                query_params.push(Box::new(job_type.clone()));
            }
        }
        if !categories.is_empty() {
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM json_each(jobs.categories) WHERE json_each.value IN ({}))",
                Self::placeholders(categories.len())
            ));
            for category in categories {
                query_params.push(Box::new(category.clone()));
            }
        }
        if !companies.is_empty() {
            sql.push_str(&format!(
                " AND company IN ({})",
                Self::placeholders(companies.len())
            ));
            for company in companies {
                query_params.push(Box::new(company.clone()));
            }
        }
        // Salary bounds require the job to advertise an overlapping range;
        // jobs without salary data are excluded when the filter sets bounds.
        if let Some(min) = salary_min {
            sql.push_str(" AND COALESCE(salary_max, salary_min) >= ?");
            query_params.push(Box::new(min));
        }
        if let Some(max) = salary_max {
            sql.push_str(" AND COALESCE(salary_min, salary_max) <= ?");
            query_params.push(Box::new(max));
        }
    }
}

impl JobBoardStore for SqliteJobBoardStore {
    fn due_alerts(
        &self,
        frequency: AlertFrequency,
        triggered_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Alert>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM alerts
             WHERE is_active = 1 AND email_enabled = 1 AND frequency = ?1
               AND (last_triggered IS NULL OR last_triggered <= ?2)
             ORDER BY last_triggered ASC
             LIMIT ?3",
        )?;
        let alerts = stmt
            .query_map(
                params![
                    frequency.as_str(),
                    Self::format_datetime(&triggered_before),
                    limit as i64
                ],
                Self::row_to_alert,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(alerts)
    }

    fn matching_jobs_for_alert(
        &self,
        alert: &Alert,
        posted_after: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Job>> {
        let mut sql =
            "SELECT * FROM jobs WHERE status = 'active' AND created_at >= ?".to_string();
        let mut query_params: Vec<Box<dyn ToSql>> =
            vec![Box::new(Self::format_datetime(&posted_after))];

        Self::push_job_filters(
            &mut sql,
            &mut query_params,
            alert.job_title.as_deref(),
            alert.location.as_deref(),
            false,
            &alert.job_types,
            &alert.categories,
            &alert.companies,
            alert.salary_min,
            alert.salary_max,
        );

        sql.push_str(" ORDER BY created_at DESC LIMIT ?");
        query_params.push(Box::new(limit as i64));

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let jobs = stmt
            .query_map(params_from_iter(query_params), Self::row_to_job)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }

    fn mark_alert_triggered(
        &self,
        alert_id: &str,
        at: DateTime<Utc>,
        jobs_sent: usize,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE alerts
             SET last_triggered = ?1, total_jobs_sent = total_jobs_sent + ?2
             WHERE id = ?3",
            params![Self::format_datetime(&at), jobs_sent as i64, alert_id],
        )?;
        Ok(())
    }

    fn get_alert(&self, alert_id: &str) -> Result<Option<Alert>> {
        let conn = self.conn.lock().unwrap();
        let alert = conn
            .query_row(
                "SELECT * FROM alerts WHERE id = ?1",
                params![alert_id],
                Self::row_to_alert,
            )
            .optional()?;
        Ok(alert)
    }

    fn insert_alert(&self, alert: &Alert) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO alerts (id, user_id, job_title, location, job_types, categories,
                companies, salary_min, salary_max, frequency, is_active, email_enabled,
                last_triggered, total_jobs_sent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                alert.id,
                alert.user_id,
                alert.job_title,
                alert.location,
                Self::encode_string_list(&alert.job_types),
                Self::encode_string_list(&alert.categories),
                Self::encode_string_list(&alert.companies),
                alert.salary_min,
                alert.salary_max,
                alert.frequency.as_str(),
                alert.is_active as i64,
                alert.email_enabled as i64,
                alert.last_triggered.as_ref().map(Self::format_datetime),
                alert.total_jobs_sent,
            ],
        )?;
        Ok(())
    }

    fn due_digests(
        &self,
        day_of_week: u8,
        sent_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<WeeklyDigest>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM weekly_digests
             WHERE is_active = 1 AND day_of_week = ?1
               AND (last_sent_at IS NULL OR last_sent_at <= ?2)
             ORDER BY last_sent_at ASC
             LIMIT ?3",
        )?;
        let digests = stmt
            .query_map(
                params![
                    day_of_week as i64,
                    Self::format_datetime(&sent_before),
                    limit as i64
                ],
                Self::row_to_digest,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(digests)
    }

    fn digest_jobs(
        &self,
        digest: &WeeklyDigest,
        posted_after: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Job>> {
        let mut sql =
            "SELECT * FROM jobs WHERE status = 'active' AND created_at >= ?".to_string();
        let mut query_params: Vec<Box<dyn ToSql>> =
            vec![Box::new(Self::format_datetime(&posted_after))];

        Self::push_job_filters(
            &mut sql,
            &mut query_params,
            None,
            digest.location.as_deref(),
            true,
            &digest.job_types,
            &digest.categories,
            &[],
            None,
            None,
        );

        sql.push_str(" ORDER BY created_at DESC LIMIT ?");
        query_params.push(Box::new(limit as i64));

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let jobs = stmt
            .query_map(params_from_iter(query_params), Self::row_to_job)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }

    fn mark_digest_sent(&self, digest_id: &str, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE weekly_digests
             SET last_sent_at = ?1, total_digests_sent = total_digests_sent + 1
             WHERE id = ?2",
            params![Self::format_datetime(&at), digest_id],
        )?;
        Ok(())
    }

    fn get_digest(&self, digest_id: &str) -> Result<Option<WeeklyDigest>> {
        let conn = self.conn.lock().unwrap();
        let digest = conn
            .query_row(
                "SELECT * FROM weekly_digests WHERE id = ?1",
                params![digest_id],
                Self::row_to_digest,
            )
            .optional()?;
        Ok(digest)
    }

    fn insert_digest(&self, digest: &WeeklyDigest) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO weekly_digests (id, user_id, location, categories, job_types,
                day_of_week, is_active, last_sent_at, total_digests_sent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                digest.id,
                digest.user_id,
                digest.location,
                Self::encode_string_list(&digest.categories),
                Self::encode_string_list(&digest.job_types),
                digest.day_of_week as i64,
                digest.is_active as i64,
                digest.last_sent_at.as_ref().map(Self::format_datetime),
                digest.total_digests_sent,
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                "SELECT * FROM users WHERE id = ?1",
                params![user_id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn insert_user(&self, user: &User) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (id, email, display_name, magic_link_token,
                magic_link_expires_at, password_reset_token, password_reset_expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.id,
                user.email,
                user.display_name,
                user.magic_link_token,
                user.magic_link_expires_at.as_ref().map(Self::format_datetime),
                user.password_reset_token,
                user
                    .password_reset_expires_at
                    .as_ref()
                    .map(Self::format_datetime),
            ],
        )?;
        Ok(())
    }

    fn is_suppressed(&self, email: &str, kind: EmailKind) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT email, unsubscribe_all, unsubscribe_from
                 FROM email_unsubscribes WHERE email = ?1",
                params![email],
                |row| {
                    Ok(EmailUnsubscribe {
                        email: row.get("email")?,
                        unsubscribe_all: row.get::<_, i64>("unsubscribe_all")? != 0,
                        unsubscribe_from: Self::parse_string_list(row.get("unsubscribe_from")?),
                    })
                },
            )
            .optional()?;
        Ok(record.map(|r| r.suppresses(kind)).unwrap_or(false))
    }

    fn insert_unsubscribe(&self, record: &EmailUnsubscribe) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO email_unsubscribes (email, unsubscribe_all, unsubscribe_from)
             VALUES (?1, ?2, ?3)",
            params![
                record.email,
                record.unsubscribe_all as i64,
                Self::encode_string_list(&record.unsubscribe_from),
            ],
        )?;
        Ok(())
    }

    fn get_job(&self, job_id: &str) -> Result<Option<Job>> {
        let conn = self.conn.lock().unwrap();
        let job = conn
            .query_row(
                "SELECT * FROM jobs WHERE id = ?1",
                params![job_id],
                Self::row_to_job,
            )
            .optional()?;
        Ok(job)
    }

    fn insert_job(&self, job: &Job) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO jobs (id, title, company, location, job_type, categories,
                salary_min, salary_max, is_remote, description, status, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                job.id,
                job.title,
                job.company,
                job.location,
                job.job_type,
                Self::encode_string_list(&job.categories),
                job.salary_min,
                job.salary_max,
                job.is_remote as i64,
                job.description,
                job.status.as_str(),
                Self::format_datetime(&job.created_at),
                job.expires_at.as_ref().map(Self::format_datetime),
            ],
        )?;
        Ok(())
    }

    fn expire_due_jobs(
        &self,
        now: DateTime<Utc>,
        unset_expiry_cutoff: DateTime<Utc>,
    ) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE jobs SET status = 'expired'
             WHERE status != 'expired'
               AND ((expires_at IS NOT NULL AND expires_at <= ?1)
                    OR (expires_at IS NULL AND created_at <= ?2))",
            params![
                Self::format_datetime(&now),
                Self::format_datetime(&unset_expiry_cutoff)
            ],
        )?;
        Ok(changed)
    }

    fn expire_magic_link_tokens(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE users SET magic_link_token = NULL, magic_link_expires_at = NULL
             WHERE magic_link_token IS NOT NULL AND magic_link_expires_at <= ?1",
            params![Self::format_datetime(&now)],
        )?;
        Ok(changed)
    }

    fn expire_password_reset_tokens(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE users SET password_reset_token = NULL, password_reset_expires_at = NULL
             WHERE password_reset_token IS NOT NULL AND password_reset_expires_at <= ?1",
            params![Self::format_datetime(&now)],
        )?;
        Ok(changed)
    }

    fn delete_email_logs_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "DELETE FROM email_logs WHERE created_at < ? AND status IN ({})",
            Self::placeholders(TERMINAL_EMAIL_STATUSES.len())
        );
        let mut query_params: Vec<Box<dyn ToSql>> =
            vec![Box::new(Self::format_datetime(&cutoff))];
        for status in TERMINAL_EMAIL_STATUSES {
            query_params.push(Box::new(status.to_string()));
        }
        let deleted = conn.execute(&sql, params_from_iter(query_params))?;
        Ok(deleted)
    }

    fn insert_email_log(
        &self,
        recipient: &str,
        email_type: &str,
        status: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO email_logs (recipient, email_type, status, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                recipient,
                email_type,
                status,
                Self::format_datetime(&created_at)
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn count_email_logs(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM email_logs", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn delete_search_events_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM search_events WHERE created_at < ?1",
            params![Self::format_datetime(&cutoff)],
        )?;
        Ok(deleted)
    }

    fn insert_search_event(&self, query: &str, created_at: DateTime<Utc>) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO search_events (query, created_at) VALUES (?1, ?2)",
            params![query, Self::format_datetime(&created_at)],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn count_search_events(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM search_events", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn open_test_store() -> (SqliteJobBoardStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteJobBoardStore::new(temp_dir.path().join("jobboard.db")).unwrap();
        (store, temp_dir)
    }

    fn test_user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            display_name: Some(id.to_string()),
            magic_link_token: None,
            magic_link_expires_at: None,
            password_reset_token: None,
            password_reset_expires_at: None,
        }
    }

    fn test_alert(id: &str, user_id: &str, frequency: AlertFrequency) -> Alert {
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

    fn test_job(id: &str, title: &str, created_at: DateTime<Utc>) -> Job {
        Job {
            id: id.to_string(),
            title: title.to_string(),
            company: "Acme".to_string(),
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

    #[test]
    fn test_reopen_validates_schema() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("jobboard.db");
        {
            let _store = SqliteJobBoardStore::new(&db_path).unwrap();
        }
        // Second open goes through the validation path
        let _store = SqliteJobBoardStore::new(&db_path).unwrap();
    }

    #[test]
    fn test_due_alerts_window_and_order() {
        let (store, _tmp) = open_test_store();
        let now = Utc::now();
        store.insert_user(&test_user("u1")).unwrap();

        let mut fresh = test_alert("a-fresh", "u1", AlertFrequency::Immediate);
        fresh.last_triggered = Some(now - Duration::minutes(3));
        store.insert_alert(&fresh).unwrap();

        let mut stale = test_alert("a-stale", "u1", AlertFrequency::Immediate);
        stale.last_triggered = Some(now - Duration::minutes(10));
        store.insert_alert(&stale).unwrap();

        let never = test_alert("a-never", "u1", AlertFrequency::Immediate);
        store.insert_alert(&never).unwrap();

        let cutoff = now - Duration::minutes(5);
        let due = store
            .due_alerts(AlertFrequency::Immediate, cutoff, 100)
            .unwrap();
        let ids: Vec<&str> = due.iter().map(|a| a.id.as_str()).collect();
        // NULL last_triggered sorts first, then oldest
        assert_eq!(ids, vec!["a-never", "a-stale"]);
    }

    #[test]
    fn test_due_alerts_skips_inactive_and_disabled() {
        let (store, _tmp) = open_test_store();
        store.insert_user(&test_user("u1")).unwrap();

        let mut inactive = test_alert("a-inactive", "u1", AlertFrequency::Daily);
        inactive.is_active = false;
        store.insert_alert(&inactive).unwrap();

        let mut muted = test_alert("a-muted", "u1", AlertFrequency::Daily);
        muted.email_enabled = false;
        store.insert_alert(&muted).unwrap();

        let due = store
            .due_alerts(AlertFrequency::Daily, Utc::now(), 100)
            .unwrap();
        assert!(due.is_empty());
    }

    #[test]
    fn test_due_alerts_respects_limit() {
        let (store, _tmp) = open_test_store();
        store.insert_user(&test_user("u1")).unwrap();
        for i in 0..10 {
            store
                .insert_alert(&test_alert(
                    &format!("a{:02}", i),
                    "u1",
                    AlertFrequency::Immediate,
                ))
                .unwrap();
        }
        let due = store
            .due_alerts(AlertFrequency::Immediate, Utc::now(), 4)
            .unwrap();
        assert_eq!(due.len(), 4);
    }

    #[test]
    fn test_matching_jobs_title_substring() {
        let (store, _tmp) = open_test_store();
        store.insert_user(&test_user("u1")).unwrap();
        let now = Utc::now();
        store
            .insert_job(&test_job("j1", "Warehouse Associate", now - Duration::hours(1)))
            .unwrap();
        store
            .insert_job(&test_job("j2", "Forklift Operator", now - Duration::hours(1)))
            .unwrap();

        let mut alert = test_alert("a1", "u1", AlertFrequency::Immediate);
        alert.job_title = Some("warehouse".to_string());
        store.insert_alert(&alert).unwrap();

        let jobs = store
            .matching_jobs_for_alert(&alert, now - Duration::hours(24), 10)
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "j1");
    }

    #[test]
    fn test_matching_jobs_recency_window() {
        let (store, _tmp) = open_test_store();
        store.insert_user(&test_user("u1")).unwrap();
        let now = Utc::now();
        store
            .insert_job(&test_job("j-old", "Warehouse", now - Duration::hours(30)))
            .unwrap();
        store
            .insert_job(&test_job("j-new", "Warehouse", now - Duration::hours(1)))
            .unwrap();

        let alert = test_alert("a1", "u1", AlertFrequency::Immediate);
        let jobs = store
            .matching_jobs_for_alert(&alert, now - Duration::hours(24), 10)
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "j-new");
    }

    #[test]
    fn test_matching_jobs_category_overlap() {
        let (store, _tmp) = open_test_store();
        store.insert_user(&test_user("u1")).unwrap();
        let now = Utc::now();

        let mut warehouse = test_job("j1", "Picker", now - Duration::hours(1));
        warehouse.categories = vec!["logistics".to_string(), "warehouse".to_string()];
        store.insert_job(&warehouse).unwrap();

        let mut office = test_job("j2", "Clerk", now - Duration::hours(1));
        office.categories = vec!["admin".to_string()];
        store.insert_job(&office).unwrap();

        let mut alert = test_alert("a1", "u1", AlertFrequency::Immediate);
        alert.categories = vec!["warehouse".to_string(), "driving".to_string()];
        store.insert_alert(&alert).unwrap();

        let jobs = store
            .matching_jobs_for_alert(&alert, now - Duration::hours(24), 10)
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "j1");
    }

    #[test]
    fn test_matching_jobs_salary_bounds() {
        let (store, _tmp) = open_test_store();
        store.insert_user(&test_user("u1")).unwrap();
        let now = Utc::now();
        store.insert_job(&test_job("j1", "Picker", now)).unwrap(); // 40k-55k

        let mut alert = test_alert("a1", "u1", AlertFrequency::Immediate);
        alert.salary_min = Some(60_000);
        store.insert_alert(&alert).unwrap();
        assert!(store
            .matching_jobs_for_alert(&alert, now - Duration::hours(24), 10)
            .unwrap()
            .is_empty());

        alert.salary_min = Some(50_000);
        assert_eq!(
            store
                .matching_jobs_for_alert(&alert, now - Duration::hours(24), 10)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_mark_alert_triggered_updates_counters() {
        let (store, _tmp) = open_test_store();
        store.insert_user(&test_user("u1")).unwrap();
        store
            .insert_alert(&test_alert("a1", "u1", AlertFrequency::Immediate))
            .unwrap();

        let at = Utc::now();
        store.mark_alert_triggered("a1", at, 3).unwrap();
        store.mark_alert_triggered("a1", at, 2).unwrap();

        let alert = store.get_alert("a1").unwrap().unwrap();
        assert_eq!(alert.total_jobs_sent, 5);
        assert!(alert.last_triggered.is_some());
    }

    #[test]
    fn test_digest_jobs_remote_matches_location() {
        let (store, _tmp) = open_test_store();
        store.insert_user(&test_user("u1")).unwrap();
        let now = Utc::now();

        let mut remote = test_job("j-remote", "Support Agent", now - Duration::days(1));
        remote.location = "Anywhere".to_string();
        remote.is_remote = true;
        store.insert_job(&remote).unwrap();

        let mut elsewhere = test_job("j-sf", "Barista", now - Duration::days(1));
        elsewhere.location = "San Francisco, CA".to_string();
        store.insert_job(&elsewhere).unwrap();

        let digest = WeeklyDigest {
            id: "d1".to_string(),
            user_id: "u1".to_string(),
            location: Some("Stockton".to_string()),
            categories: vec![],
            job_types: vec![],
            day_of_week: 1,
            is_active: true,
            last_sent_at: None,
            total_digests_sent: 0,
        };
        store.insert_digest(&digest).unwrap();

        let jobs = store
            .digest_jobs(&digest, now - Duration::days(7), 15)
            .unwrap();
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert!(ids.contains(&"j-remote"));
        assert!(!ids.contains(&"j-sf"));
    }

    #[test]
    fn test_due_digests_day_gating() {
        let (store, _tmp) = open_test_store();
        store.insert_user(&test_user("u1")).unwrap();
        let digest = WeeklyDigest {
            id: "d1".to_string(),
            user_id: "u1".to_string(),
            location: None,
            categories: vec![],
            job_types: vec![],
            day_of_week: 1,
            is_active: true,
            last_sent_at: None,
            total_digests_sent: 0,
        };
        store.insert_digest(&digest).unwrap();

        assert_eq!(store.due_digests(1, Utc::now(), 100).unwrap().len(), 1);
        assert!(store.due_digests(2, Utc::now(), 100).unwrap().is_empty());
    }

    #[test]
    fn test_expire_due_jobs_is_idempotent() {
        let (store, _tmp) = open_test_store();
        let now = Utc::now();

        let mut past_expiry = test_job("j1", "Old", now - Duration::days(10));
        past_expiry.expires_at = Some(now - Duration::days(1));
        store.insert_job(&past_expiry).unwrap();

        let ancient = test_job("j2", "Ancient", now - Duration::days(100));
        store.insert_job(&ancient).unwrap();

        let mut future = test_job("j3", "Fresh", now);
        future.expires_at = Some(now + Duration::days(1));
        store.insert_job(&future).unwrap();

        let cutoff = now - Duration::days(90);
        let first = store.expire_due_jobs(now, cutoff).unwrap();
        assert_eq!(first, 2);
        let second = store.expire_due_jobs(now, cutoff).unwrap();
        assert_eq!(second, 0);

        assert_eq!(
            store.get_job("j1").unwrap().unwrap().status,
            JobStatus::Expired
        );
        assert_eq!(
            store.get_job("j2").unwrap().unwrap().status,
            JobStatus::Expired
        );
        assert_eq!(
            store.get_job("j3").unwrap().unwrap().status,
            JobStatus::Active
        );
    }

    #[test]
    fn test_expire_tokens() {
        let (store, _tmp) = open_test_store();
        let now = Utc::now();

        let mut expired = test_user("u-expired");
        expired.magic_link_token = Some("tok1".to_string());
        expired.magic_link_expires_at = Some(now - Duration::hours(1));
        expired.password_reset_token = Some("tok2".to_string());
        expired.password_reset_expires_at = Some(now - Duration::hours(2));
        store.insert_user(&expired).unwrap();

        let mut valid = test_user("u-valid");
        valid.magic_link_token = Some("tok3".to_string());
        valid.magic_link_expires_at = Some(now + Duration::hours(1));
        store.insert_user(&valid).unwrap();

        assert_eq!(store.expire_magic_link_tokens(now).unwrap(), 1);
        assert_eq!(store.expire_password_reset_tokens(now).unwrap(), 1);

        let user = store.get_user("u-expired").unwrap().unwrap();
        assert!(user.magic_link_token.is_none());
        assert!(user.password_reset_token.is_none());
        let user = store.get_user("u-valid").unwrap().unwrap();
        assert!(user.magic_link_token.is_some());
    }

    #[test]
    fn test_delete_email_logs_terminal_only() {
        let (store, _tmp) = open_test_store();
        let old = Utc::now() - Duration::days(100);
        store
            .insert_email_log("a@b.c", "job_alert", "sent", old)
            .unwrap();
        store
            .insert_email_log("a@b.c", "job_alert", "queued", old)
            .unwrap();
        store
            .insert_email_log("a@b.c", "job_alert", "sent", Utc::now())
            .unwrap();

        let cutoff = Utc::now() - Duration::days(90);
        assert_eq!(store.delete_email_logs_before(cutoff).unwrap(), 1);
        assert_eq!(store.count_email_logs().unwrap(), 2);
    }

    #[test]
    fn test_delete_search_events() {
        let (store, _tmp) = open_test_store();
        store
            .insert_search_event("warehouse", Utc::now() - Duration::days(200))
            .unwrap();
        store.insert_search_event("driver", Utc::now()).unwrap();

        let cutoff = Utc::now() - Duration::days(180);
        assert_eq!(store.delete_search_events_before(cutoff).unwrap(), 1);
        assert_eq!(store.count_search_events().unwrap(), 1);
    }

    #[test]
    fn test_suppression_lookup() {
        let (store, _tmp) = open_test_store();
        store
            .insert_unsubscribe(&EmailUnsubscribe {
                email: "all@example.com".to_string(),
                unsubscribe_all: true,
                unsubscribe_from: vec![],
            })
            .unwrap();
        store
            .insert_unsubscribe(&EmailUnsubscribe {
                email: "digest@example.com".to_string(),
                unsubscribe_all: false,
                unsubscribe_from: vec!["weekly_digest".to_string()],
            })
            .unwrap();

        assert!(store
            .is_suppressed("all@example.com", EmailKind::JobAlert)
            .unwrap());
        assert!(!store
            .is_suppressed("digest@example.com", EmailKind::JobAlert)
            .unwrap());
        assert!(store
            .is_suppressed("digest@example.com", EmailKind::WeeklyDigest)
            .unwrap());
        assert!(!store
            .is_suppressed("unknown@example.com", EmailKind::JobAlert)
            .unwrap());
    }
}
