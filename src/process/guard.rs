//! Host-level single-instance guard.
//!
//! Distinct from the in-process double-initialize check in the scheduler:
//! this one stops a second scheduler *process* on the same host via a lock
//! file, and recovers the lock when the recorded process is gone.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A lock whose heartbeat is older than this is treated as stale even if a
/// process with the recorded PID exists, to cover PID reuse after a crash.
pub const HEARTBEAT_STALE_MINUTES: i64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockPayload {
    pub pid: u32,
    pub heartbeat: DateTime<Utc>,
}

pub struct SingleInstanceGuard {
    lock_path: PathBuf,
    pid_path: PathBuf,
}

fn is_pid_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

impl SingleInstanceGuard {
    pub fn new(lock_path: PathBuf, pid_path: PathBuf) -> Self {
        Self {
            lock_path,
            pid_path,
        }
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn pid_path(&self) -> &Path {
        &self.pid_path
    }

    /// Read the lock file, if present and parseable.
    pub fn read_lock(&self) -> Result<Option<LockPayload>> {
        match fs::read_to_string(&self.lock_path) {
            Ok(raw) => Ok(serde_json::from_str(&raw).ok()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read lock file"),
        }
    }

    /// Acquire the instance lock, recovering a stale one first.
    ///
    /// Refuses only when the recorded process is alive *and* its heartbeat
    /// is fresh; anything else is a leftover from a crashed instance and
    /// must not permanently block restarts.
    pub fn check_lock(&self) -> Result<()> {
        if self.lock_path.exists() {
            match self.read_lock()? {
                Some(payload) => {
                    let heartbeat_age = Utc::now() - payload.heartbeat;
                    let heartbeat_fresh =
                        heartbeat_age < Duration::minutes(HEARTBEAT_STALE_MINUTES);
                    if is_pid_alive(payload.pid) && heartbeat_fresh {
                        anyhow::bail!(
                            "Another scheduler instance is running (pid {}, lock {:?})",
                            payload.pid,
                            self.lock_path
                        );
                    }
                    warn!(
                        "Removing stale lock from pid {} (alive: {}, heartbeat age: {}s)",
                        payload.pid,
                        is_pid_alive(payload.pid),
                        heartbeat_age.num_seconds()
                    );
                }
                None => {
                    warn!("Removing unparseable lock file {:?}", self.lock_path);
                }
            }
            self.remove_lock()?;
        }

        self.write_lock()?;
        info!("Acquired instance lock {:?}", self.lock_path);
        Ok(())
    }

    fn write_lock(&self) -> Result<()> {
        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent).context("Failed to create lock file directory")?;
        }
        let payload = LockPayload {
            pid: std::process::id(),
            heartbeat: Utc::now(),
        };
        fs::write(&self.lock_path, serde_json::to_string(&payload)?)
            .context("Failed to write lock file")?;
        Ok(())
    }

    /// Rewrite the lock with a current heartbeat. Called from the health
    /// loop so a crashed instance's lock goes stale within minutes.
    pub fn refresh_heartbeat(&self) -> Result<()> {
        self.write_lock()
    }

    /// Idempotent lock removal; a missing file is not an error.
    pub fn remove_lock(&self) -> Result<()> {
        match fs::remove_file(&self.lock_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove lock file"),
        }
    }

    /// Record the live process's PID for external tooling.
    pub fn write_pid_file(&self) -> Result<()> {
        if let Some(parent) = self.pid_path.parent() {
            fs::create_dir_all(parent).context("Failed to create PID file directory")?;
        }
        fs::write(&self.pid_path, std::process::id().to_string())
            .context("Failed to write PID file")?;
        Ok(())
    }

    /// Idempotent PID file removal.
    pub fn remove_pid_file(&self) -> Result<()> {
        match fs::remove_file(&self.pid_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove PID file"),
        }
    }

    /// Best-effort removal of both files, for emergency shutdown paths
    /// where nothing can be done about an error anyway.
    pub fn cleanup_best_effort(&self) {
        let _ = self.remove_lock();
        let _ = self.remove_pid_file();
    }
}
