use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobboard_alert_scheduler::config::{AppConfig, CliConfig, FileConfig};
use jobboard_alert_scheduler::email::HttpEmailQueue;
use jobboard_alert_scheduler::process::{
    LifecycleConfig, ProcessLifecycleManager, SingleInstanceGuard,
};
use jobboard_alert_scheduler::scheduler::jobs::default_jobs;
use jobboard_alert_scheduler::scheduler::{JobContext, TaskScheduler};
use jobboard_alert_scheduler::store::SqliteJobBoardStore;

/// Timeout for enqueueing a single email with the web app.
const EMAIL_DISPATCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Cron-trigger endpoints probed by the `test` command.
const TEST_ENDPOINTS: &[&str] = &[
    "/api/cron/immediate-alerts",
    "/api/cron/daily-alerts",
    "/api/cron/weekly-digests",
    "/api/cron/maintenance",
];

#[derive(Parser, Debug)]
#[clap(about = "Job board alert scheduler daemon")]
struct CliArgs {
    /// Command: start, stop, status, or test.
    pub command: Option<String>,

    /// Path to the SQLite job board database file.
    #[clap(long)]
    pub db: Option<PathBuf>,

    /// Path to a TOML config file.
    #[clap(long)]
    pub config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_path: cli_args.db.clone(),
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    match cli_args.command.as_deref() {
        Some("start") => run_start(config).await,
        Some("stop") => run_stop(config),
        Some("status") => run_status(config),
        Some("test") => run_endpoint_test(config).await,
        other => {
            print_usage(&config, other);
            Ok(())
        }
    }
}

async fn run_start(config: AppConfig) -> Result<()> {
    let guard = Arc::new(SingleInstanceGuard::new(
        config.lock_file.clone(),
        config.pid_file.clone(),
    ));
    guard.check_lock().context("Failed to acquire instance lock")?;
    guard.write_pid_file()?;

    info!("Opening job board database at {:?}", config.db_path);
    let store = match SqliteJobBoardStore::new(&config.db_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            // Startup failure is fatal: release what we acquired and bail
            guard.cleanup_best_effort();
            return Err(e);
        }
    };

    let email_queue = Arc::new(HttpEmailQueue::new(
        config.base_url.clone(),
        config.cron_secret.clone(),
        EMAIL_DISPATCH_TIMEOUT,
    ));

    let context = JobContext::new(store, email_queue, config.timezone, config.base_url.clone());

    let mut scheduler = TaskScheduler::new(context);
    if let Err(e) = scheduler.initialize().await {
        guard.cleanup_best_effort();
        return Err(e).context("Failed to initialize task scheduler");
    }

    let lifecycle = ProcessLifecycleManager::new(
        Arc::clone(&guard),
        LifecycleConfig {
            health_check_interval: config.health_check_interval,
            shutdown_timeout: config.shutdown_timeout,
        },
    );
    lifecycle.run(scheduler).await
}

/// Clears instance state left by a previous process. The daemon itself
/// shuts down via signals; this is the operator-facing cleanup path.
fn run_stop(config: AppConfig) -> Result<()> {
    let guard = SingleInstanceGuard::new(config.lock_file, config.pid_file);
    match guard.read_lock()? {
        Some(payload) => info!("Removing instance lock held by pid {}", payload.pid),
        None => info!("No instance lock found"),
    }
    guard.remove_lock()?;
    guard.remove_pid_file()?;
    info!("Scheduler instance state cleared");
    Ok(())
}

fn run_status(config: AppConfig) -> Result<()> {
    let guard = SingleInstanceGuard::new(config.lock_file, config.pid_file);
    let running_pid = guard.read_lock()?.and_then(|payload| {
        std::path::Path::new(&format!("/proc/{}", payload.pid))
            .exists()
            .then_some(payload.pid)
    });

    match running_pid {
        Some(pid) => println!("Scheduler: running (pid {})", pid),
        None => println!("Scheduler: not running"),
    }
    println!("Timezone: {}", config.timezone);
    println!();
    let state = task_state_label(running_pid.is_some());
    println!(
        "{:<18} {:<10} {:<16} {}",
        "TASK", "STATE", "SCHEDULE", "DESCRIPTION"
    );
    for job in default_jobs() {
        println!(
            "{:<18} {:<10} {:<16} {}",
            job.id(),
            state,
            job.cron(),
            job.description()
        );
    }
    Ok(())
}

/// Per-task state shown by `status`. Tasks live and die with the daemon,
/// so a live instance lock means every registered task is scheduled.
fn task_state_label(daemon_running: bool) -> &'static str {
    if daemon_running {
        "scheduled"
    } else {
        "stopped"
    }
}

async fn run_endpoint_test(config: AppConfig) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(config.endpoint_test_timeout)
        .build()
        .context("Failed to create HTTP client")?;

    let mut failures = 0usize;
    for path in TEST_ENDPOINTS {
        let url = format!("{}{}", config.base_url, path);
        let mut request = client.get(&url);
        if let Some(secret) = &config.cron_secret {
            request = request.bearer_auth(secret);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                info!("OK   {} ({})", path, response.status());
            }
            Ok(response) => {
                error!("FAIL {} ({})", path, response.status());
                failures += 1;
            }
            Err(e) => {
                error!("FAIL {} ({})", path, e);
                failures += 1;
            }
        }
    }

    let passed = TEST_ENDPOINTS.len() - failures;
    info!(
        "Endpoint test: {}/{} passed",
        passed,
        TEST_ENDPOINTS.len()
    );
    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_usage(config: &AppConfig, command: Option<&str>) {
    if let Some(unknown) = command {
        warn!("Unknown command: {}", unknown);
    }
    println!("Usage: alert-scheduler [--db <path>] [--config <path>] <command>");
    println!();
    println!("Commands:");
    println!("  start   Run the scheduler daemon");
    println!("  stop    Clear lock and PID files left by a previous instance");
    println!("  status  Show whether an instance is running and the task schedule");
    println!("  test    Probe the cron-trigger endpoints and report failures");
    println!();
    println!("Scheduled tasks (timezone: {}):", config.timezone);
    for job in default_jobs() {
        println!("  {:<18} {:<16} {}", job.id(), job.cron(), job.description());
    }
    println!();
    println!("Environment variables:");
    println!("  LOG_LEVEL                  log filter (default: info)");
    println!("  SCHEDULER_DB_PATH          SQLite database path");
    println!("  SCHEDULER_TZ               cron timezone (default: America/Los_Angeles)");
    println!("  SCHEDULER_PID_FILE         PID file path (default: alert-scheduler.pid)");
    println!("  SCHEDULER_LOCK_FILE        lock file path (default: alert-scheduler.lock)");
    println!("  CRON_BASE_URL              web app base URL (default: http://localhost:3000)");
    println!("  CRON_SECRET                bearer token for internal endpoints");
    println!("  HEALTH_CHECK_INTERVAL_MS   health check interval, 30000-300000 (default: 60000)");
    println!("  SHUTDOWN_TIMEOUT_MS        graceful shutdown timeout, 5000-60000 (default: 30000)");
    println!("  ENDPOINT_TEST_TIMEOUT_MS   per-request test timeout, 5000-30000 (default: 10000)");
}
