use crate::email::EmailDispatchQueue;
use crate::store::JobBoardStore;
use chrono_tz::Tz;
use std::sync::Arc;

/// Context provided to batch jobs during execution.
#[derive(Clone)]
pub struct JobContext {
    /// Access to the job board database.
    pub store: Arc<dyn JobBoardStore>,

    /// Outbound email dispatch.
    pub email_queue: Arc<dyn EmailDispatchQueue>,

    /// Timezone daily/weekly boundaries are evaluated in.
    pub timezone: Tz,

    /// Public base URL used for job links in emails.
    pub base_url: String,
}

impl JobContext {
    pub fn new(
        store: Arc<dyn JobBoardStore>,
        email_queue: Arc<dyn EmailDispatchQueue>,
        timezone: Tz,
        base_url: String,
    ) -> Self {
        Self {
            store,
            email_queue,
            timezone,
            base_url,
        }
    }
}
