//! Job board alert scheduler library.
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod email;
pub mod process;
pub mod scheduler;
pub mod sqlite_persistence;
pub mod store;

// Re-export commonly used types for convenience
pub use config::{AppConfig, CliConfig, FileConfig};
pub use scheduler::{JobContext, TaskScheduler};
pub use store::{JobBoardStore, SqliteJobBoardStore};
