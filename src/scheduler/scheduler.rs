use super::context::JobContext;
use super::job::BatchJob;
use super::jobs::default_jobs;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Per-task bookkeeping, updated after every run.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    pub id: String,
    pub description: String,
    pub cron: String,
    pub last_run_at: Option<DateTime<Utc>>,
    /// "success", or the error message of the last failed run.
    pub last_outcome: Option<String>,
    pub runs: u64,
    pub failures: u64,
}

/// Snapshot returned by [`TaskScheduler::status`].
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub timezone: String,
    pub tasks: Vec<TaskStatus>,
}

struct SchedulerState {
    running: bool,
    tasks: HashMap<String, TaskStatus>,
}

/// Drives the six batch jobs on their cron schedules.
///
/// Each task runs in its own spawned loop: the runtime may interleave the
/// async work of different tasks, but one task's handler always runs to
/// completion before its own timer can fire again.
pub struct TaskScheduler {
    context: JobContext,
    state: Arc<RwLock<SchedulerState>>,
    jobs: Vec<(Arc<dyn BatchJob>, Schedule)>,
    shutdown_token: CancellationToken,
    task_handles: Vec<JoinHandle<()>>,
}

impl TaskScheduler {
    pub fn new(context: JobContext) -> Self {
        Self {
            context,
            state: Arc::new(RwLock::new(SchedulerState {
                running: false,
                tasks: HashMap::new(),
            })),
            jobs: Vec::new(),
            shutdown_token: CancellationToken::new(),
            task_handles: Vec::new(),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.context.timezone
    }

    /// Register the job roster and start a timer loop per task.
    ///
    /// Idempotent: a second call on a running scheduler logs and returns
    /// without re-registering anything.
    pub async fn initialize(&mut self) -> Result<()> {
        {
            let state = self.state.read().await;
            if state.running {
                info!("Task scheduler is already initialized, skipping");
                return Ok(());
            }
        }

        for job in default_jobs() {
            let schedule = Schedule::from_str(job.cron())
                .with_context(|| format!("Invalid cron expression for task {}", job.id()))?;
            self.jobs.push((job, schedule));
        }

        {
            let mut state = self.state.write().await;
            for (job, _) in &self.jobs {
                info!("Registering task: {} - {}", job.id(), job.description());
                state.tasks.insert(
                    job.id().to_string(),
                    TaskStatus {
                        id: job.id().to_string(),
                        description: job.description().to_string(),
                        cron: job.cron().to_string(),
                        last_run_at: None,
                        last_outcome: None,
                        runs: 0,
                        failures: 0,
                    },
                );
            }
            state.running = true;
        }

        for (job, schedule) in &self.jobs {
            let handle = tokio::spawn(run_task_loop(
                Arc::clone(job),
                schedule.clone(),
                self.context.clone(),
                Arc::clone(&self.state),
                self.shutdown_token.clone(),
            ));
            self.task_handles.push(handle);
        }

        info!(
            "Task scheduler initialized with {} tasks (timezone: {})",
            self.jobs.len(),
            self.context.timezone
        );
        Ok(())
    }

    /// Stop every task loop. A batch already in flight runs to completion
    /// before its loop exits. Idempotent.
    pub async fn stop(&mut self) {
        {
            let state = self.state.read().await;
            if !state.running {
                return;
            }
        }

        info!("Stopping task scheduler");
        self.shutdown_token.cancel();
        for handle in self.task_handles.drain(..) {
            if let Err(e) = handle.await {
                warn!("Task loop did not shut down cleanly: {}", e);
            }
        }

        let mut state = self.state.write().await;
        state.running = false;
        info!("Task scheduler stopped");
    }

    /// Snapshot of scheduler and per-task state, tasks in registration order.
    pub async fn status(&self) -> SchedulerStatus {
        let state = self.state.read().await;
        let tasks = self
            .jobs
            .iter()
            .filter_map(|(job, _)| state.tasks.get(job.id()).cloned())
            .collect();
        SchedulerStatus {
            running: state.running,
            timezone: self.context.timezone.to_string(),
            tasks,
        }
    }

    /// Next fire time per task, for the CLI schedule table.
    pub fn upcoming_runs(&self) -> Vec<(String, Option<DateTime<Utc>>)> {
        self.jobs
            .iter()
            .map(|(job, schedule)| {
                let next = schedule
                    .upcoming(self.context.timezone)
                    .next()
                    .map(|dt| dt.with_timezone(&Utc));
                (job.id().to_string(), next)
            })
            .collect()
    }
}

async fn run_task_loop(
    job: Arc<dyn BatchJob>,
    schedule: Schedule,
    context: JobContext,
    state: Arc<RwLock<SchedulerState>>,
    shutdown_token: CancellationToken,
) {
    loop {
        let now = Utc::now().with_timezone(&context.timezone);
        let Some(next_fire) = schedule.after(&now).next() else {
            warn!("Task {} has no future fire times, stopping its loop", job.id());
            return;
        };

        let wait = (next_fire - now).to_std().unwrap_or(Duration::ZERO);
        debug!("Task {} sleeping {:?} until {}", job.id(), wait, next_fire);

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                run_task_once(&job, &context, &state).await;
            }
            _ = shutdown_token.cancelled() => {
                debug!("Task {} loop received shutdown", job.id());
                return;
            }
        }
    }
}

async fn run_task_once(
    job: &Arc<dyn BatchJob>,
    context: &JobContext,
    state: &Arc<RwLock<SchedulerState>>,
) {
    info!("Starting task: {}", job.id());
    let started_at = Utc::now();
    let start = Instant::now();
    let result = job.execute(context).await;
    let elapsed = start.elapsed();

    let outcome = match &result {
        Ok(()) => {
            info!("Task {} completed successfully in {:?}", job.id(), elapsed);
            "success".to_string()
        }
        Err(e) => {
            error!("Task {} failed after {:?}: {}", job.id(), elapsed, e);
            e.to_string()
        }
    };

    let mut state = state.write().await;
    if let Some(task) = state.tasks.get_mut(job.id()) {
        task.last_run_at = Some(started_at);
        task.last_outcome = Some(outcome);
        task.runs += 1;
        if result.is_err() {
            task.failures += 1;
        }
    }
}
