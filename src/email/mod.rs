//! Email dispatch: request models, display formatting, and the queue the
//! batch jobs hand finished emails to.

pub mod format;
mod models;
mod queue;

pub use models::{AlertEmailRequest, DigestEmailRequest, EmailPriority, JobSummary};
pub use queue::{EmailDispatchQueue, HttpEmailQueue, RecordingEmailQueue};
