//! Periodic self health check.

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Resident memory above this is logged as a warning. An early signal of a
/// leak in the long-running batch loops, surfaced via logs only.
pub const MEMORY_WARN_BYTES: u64 = 200 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct ProcessHealth {
    pub rss_bytes: u64,
    pub uptime: Duration,
}

/// Parse the VmRSS line out of /proc/self/status content.
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}

/// Sample current resident memory and uptime.
pub fn sample(started_at: Instant) -> Result<ProcessHealth> {
    let status =
        std::fs::read_to_string("/proc/self/status").context("Failed to read /proc/self/status")?;
    let rss_bytes = parse_vm_rss(&status).context("No VmRSS in /proc/self/status")?;
    Ok(ProcessHealth {
        rss_bytes,
        uptime: started_at.elapsed(),
    })
}

/// Log one health sample, warning when memory is above the threshold.
pub fn log_health(health: &ProcessHealth) {
    let rss_mb = health.rss_bytes / (1024 * 1024);
    if health.rss_bytes > MEMORY_WARN_BYTES {
        warn!(
            "Health check: resident memory {}MB exceeds {}MB threshold (uptime: {}s)",
            rss_mb,
            MEMORY_WARN_BYTES / (1024 * 1024),
            health.uptime.as_secs()
        );
    } else {
        info!(
            "Health check: memory {}MB, uptime {}s",
            rss_mb,
            health.uptime.as_secs()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vm_rss() {
        let status = "Name:\talert-scheduler\nVmPeak:\t  123456 kB\nVmRSS:\t   51200 kB\n";
        assert_eq!(parse_vm_rss(status), Some(51200 * 1024));
    }

    #[test]
    fn test_parse_vm_rss_missing() {
        assert_eq!(parse_vm_rss("Name:\tfoo\n"), None);
    }

    #[test]
    fn test_sample_reports_live_process() {
        let health = sample(Instant::now()).unwrap();
        assert!(health.rss_bytes > 0);
    }
}
