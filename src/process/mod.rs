//! Process management: single-instance locking, health checks, and
//! daemon lifecycle.

mod guard;
pub mod health;
mod lifecycle;

pub use guard::{LockPayload, SingleInstanceGuard, HEARTBEAT_STALE_MINUTES};
pub use lifecycle::{LifecycleConfig, ProcessLifecycleManager};
