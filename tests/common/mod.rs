//! Common test infrastructure
//!
//! Builds a real SQLite store in a temp directory plus a recording email
//! queue, wired into a `JobContext` the batch runners accept.

mod fixtures;

pub use fixtures::*;

use jobboard_alert_scheduler::email::{EmailDispatchQueue, RecordingEmailQueue};
use jobboard_alert_scheduler::scheduler::JobContext;
use jobboard_alert_scheduler::store::{JobBoardStore, SqliteJobBoardStore};
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_BASE_URL: &str = "http://localhost:3000";

pub struct TestHarness {
    pub store: Arc<SqliteJobBoardStore>,
    pub email_queue: Arc<RecordingEmailQueue>,
    pub ctx: JobContext,
    _temp_dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteJobBoardStore::new(temp_dir.path().join("jobboard.db")).unwrap());
        let email_queue = Arc::new(RecordingEmailQueue::new());
        let ctx = JobContext::new(
            Arc::clone(&store) as Arc<dyn JobBoardStore>,
            Arc::clone(&email_queue) as Arc<dyn EmailDispatchQueue>,
            chrono_tz::America::Los_Angeles,
            TEST_BASE_URL.to_string(),
        );
        Self {
            store,
            email_queue,
            ctx,
            _temp_dir: temp_dir,
        }
    }
}
