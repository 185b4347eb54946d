//! Process lifecycle: signal handling, graceful and emergency shutdown,
//! and the periodic health loop.

use super::guard::SingleInstanceGuard;
use super::health;
use crate::scheduler::TaskScheduler;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct LifecycleConfig {
    pub health_check_interval: Duration,
    pub shutdown_timeout: Duration,
}

/// Best-effort removal of lock and PID files when correctness is already
/// lost and the only priority is not blocking the next start.
fn emergency_cleanup(lock_path: &PathBuf, pid_path: &PathBuf) {
    let _ = std::fs::remove_file(lock_path);
    let _ = std::fs::remove_file(pid_path);
}

/// Makes the scheduler process a well-behaved long-running daemon.
pub struct ProcessLifecycleManager {
    guard: Arc<SingleInstanceGuard>,
    config: LifecycleConfig,
    started_at: Instant,
}

impl ProcessLifecycleManager {
    pub fn new(guard: Arc<SingleInstanceGuard>, config: LifecycleConfig) -> Self {
        Self {
            guard,
            config,
            started_at: Instant::now(),
        }
    }

    /// Route panics through emergency shutdown: scheduling correctness is
    /// gone at that point, so clean up the instance files and exit nonzero.
    fn install_panic_hook(&self) {
        let lock_path = self.guard.lock_path().to_path_buf();
        let pid_path = self.guard.pid_path().to_path_buf();
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            default_hook(panic_info);
            error!("Panic in scheduler process, performing emergency shutdown");
            emergency_cleanup(&lock_path, &pid_path);
            std::process::exit(1);
        }));
    }

    /// Install termination signal handlers (SIGINT, SIGTERM, SIGHUP).
    ///
    /// The first signal requests graceful shutdown through the returned
    /// channel; a second one while shutdown is in progress forces
    /// immediate exit.
    fn install_signal_handlers(&self) -> Result<mpsc::UnboundedReceiver<()>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let signal_count = AtomicUsize::new(0);
        let lock_path = self.guard.lock_path().to_path_buf();
        let pid_path = self.guard.pid_path().to_path_buf();

        ctrlc::set_handler(move || {
            if signal_count.fetch_add(1, Ordering::SeqCst) > 0 {
                eprintln!("Second termination signal received, forcing exit");
                emergency_cleanup(&lock_path, &pid_path);
                std::process::exit(1);
            }
            let _ = tx.send(());
        })
        .context("Failed to install signal handlers")?;
        Ok(rx)
    }

    /// Run the daemon until a termination signal arrives, then shut down.
    pub async fn run(self, mut scheduler: TaskScheduler) -> Result<()> {
        self.install_panic_hook();
        let mut shutdown_rx = self.install_signal_handlers()?;

        let health_token = CancellationToken::new();
        let health_handle = tokio::spawn(health_loop(
            Arc::clone(&self.guard),
            self.config.health_check_interval,
            self.started_at,
            health_token.clone(),
        ));

        shutdown_rx.recv().await;
        info!("Termination signal received, shutting down gracefully");

        let graceful = async {
            scheduler.stop().await;
            health_token.cancel();
            let _ = health_handle.await;
        };
        if tokio::time::timeout(self.config.shutdown_timeout, graceful)
            .await
            .is_err()
        {
            error!(
                "Graceful shutdown timed out after {:?}, forcing exit",
                self.config.shutdown_timeout
            );
            self.guard.cleanup_best_effort();
            std::process::exit(1);
        }

        self.guard.remove_pid_file()?;
        self.guard.remove_lock()?;
        info!("Shutdown complete");
        Ok(())
    }
}

async fn health_loop(
    guard: Arc<SingleInstanceGuard>,
    interval: Duration,
    started_at: Instant,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match health::sample(started_at) {
                    Ok(sample) => health::log_health(&sample),
                    Err(e) => warn!("Health check failed: {:#}", e),
                }
                if let Err(e) = guard.refresh_heartbeat() {
                    warn!("Failed to refresh lock heartbeat: {:#}", e);
                }
            }
            _ = token.cancelled() => {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_emergency_cleanup_removes_files() {
        let tmp = TempDir::new().unwrap();
        let lock = tmp.path().join("scheduler.lock");
        let pid = tmp.path().join("scheduler.pid");
        std::fs::write(&lock, "x").unwrap();
        std::fs::write(&pid, "1").unwrap();

        emergency_cleanup(&lock, &pid);
        assert!(!lock.exists());
        assert!(!pid.exists());
    }

    #[test]
    fn test_emergency_cleanup_tolerates_missing_files() {
        let tmp = TempDir::new().unwrap();
        emergency_cleanup(
            &tmp.path().join("no.lock"),
            &tmp.path().join("no.pid"),
        );
    }

    #[tokio::test]
    async fn test_health_loop_refreshes_heartbeat_and_cancels() {
        let tmp = TempDir::new().unwrap();
        let guard = Arc::new(SingleInstanceGuard::new(
            tmp.path().join("scheduler.lock"),
            tmp.path().join("scheduler.pid"),
        ));
        let token = CancellationToken::new();
        let handle = tokio::spawn(health_loop(
            Arc::clone(&guard),
            Duration::from_millis(10),
            Instant::now(),
            token.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        handle.await.unwrap();

        // First tick fires immediately, so the heartbeat file exists
        assert!(guard.read_lock().unwrap().is_some());
    }
}
