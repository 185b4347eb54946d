mod file_config;

pub use file_config::FileConfig;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

const DEFAULT_HEALTH_CHECK_INTERVAL_MS: u64 = 60_000;
const HEALTH_CHECK_INTERVAL_RANGE_MS: (u64, u64) = (30_000, 300_000);

const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 30_000;
const SHUTDOWN_TIMEOUT_RANGE_MS: (u64, u64) = (5_000, 60_000);

const DEFAULT_ENDPOINT_TEST_TIMEOUT_MS: u64 = 10_000;
const ENDPOINT_TEST_TIMEOUT_RANGE_MS: (u64, u64) = (5_000, 30_000);

/// CLI arguments that feed config resolution.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    /// Public base URL of the web app: email endpoints and job links.
    pub base_url: String,
    /// Bearer token for the internal email/cron endpoints.
    pub cron_secret: Option<String>,
    pub timezone: Tz,
    pub pid_file: PathBuf,
    pub lock_file: PathBuf,
    pub health_check_interval: Duration,
    pub shutdown_timeout: Duration,
    pub endpoint_test_timeout: Duration,
}

/// Parse a millisecond setting, falling back to the default when missing
/// or unparseable and clamping into the allowed range.
fn resolve_ms(
    name: &str,
    env_value: Option<String>,
    file_value: Option<u64>,
    default: u64,
    range: (u64, u64),
) -> u64 {
    let raw = match env_value {
        Some(s) => match s.parse::<u64>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring unparseable {} value {:?}", name, s);
                None
            }
        },
        None => None,
    };
    let value = raw.or(file_value).unwrap_or(default);
    let clamped = value.clamp(range.0, range.1);
    if clamped != value {
        warn!(
            "{} value {}ms outside [{}, {}]ms, clamped to {}ms",
            name, value, range.0, range.1, clamped
        );
    }
    clamped
}

impl AppConfig {
    /// Resolve configuration from CLI arguments, optional TOML file config,
    /// and environment variables. Environment overrides file, file
    /// overrides CLI defaults.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        Self::resolve_with_env(cli, file_config, &|key| std::env::var(key).ok())
    }

    pub fn resolve_with_env(
        cli: &CliConfig,
        file_config: Option<FileConfig>,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = env("SCHEDULER_DB_PATH")
            .map(PathBuf::from)
            .or_else(|| file.db_path.as_deref().map(PathBuf::from))
            .or_else(|| cli.db_path.clone())
            .unwrap_or_else(|| PathBuf::from("jobboard.db"));

        let base_url = env("CRON_BASE_URL")
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let cron_secret = env("CRON_SECRET").or(file.cron_secret);
        if cron_secret.is_none() {
            warn!("CRON_SECRET not set, endpoint requests will be unauthenticated");
        }

        let timezone_name = env("SCHEDULER_TZ")
            .or(file.timezone)
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid timezone: {}", timezone_name))?;

        let pid_file = env("SCHEDULER_PID_FILE")
            .or(file.pid_file)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("alert-scheduler.pid"));
        let lock_file = env("SCHEDULER_LOCK_FILE")
            .or(file.lock_file)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("alert-scheduler.lock"));

        let health_check_interval = Duration::from_millis(resolve_ms(
            "HEALTH_CHECK_INTERVAL_MS",
            env("HEALTH_CHECK_INTERVAL_MS"),
            file.health_check_interval_ms,
            DEFAULT_HEALTH_CHECK_INTERVAL_MS,
            HEALTH_CHECK_INTERVAL_RANGE_MS,
        ));
        let shutdown_timeout = Duration::from_millis(resolve_ms(
            "SHUTDOWN_TIMEOUT_MS",
            env("SHUTDOWN_TIMEOUT_MS"),
            file.shutdown_timeout_ms,
            DEFAULT_SHUTDOWN_TIMEOUT_MS,
            SHUTDOWN_TIMEOUT_RANGE_MS,
        ));
        let endpoint_test_timeout = Duration::from_millis(resolve_ms(
            "ENDPOINT_TEST_TIMEOUT_MS",
            env("ENDPOINT_TEST_TIMEOUT_MS"),
            file.endpoint_test_timeout_ms,
            DEFAULT_ENDPOINT_TEST_TIMEOUT_MS,
            ENDPOINT_TEST_TIMEOUT_RANGE_MS,
        ));

        Ok(Self {
            db_path,
            base_url,
            cron_secret,
            timezone,
            pid_file,
            lock_file,
            health_check_interval,
            shutdown_timeout,
            endpoint_test_timeout,
        })
    }
}
