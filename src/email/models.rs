use serde::{Deserialize, Serialize};

/// Compact per-job summary embedded in alert and digest emails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    /// Formatted range like "$40,000 - $55,000", omitted when the posting
    /// carries no salary data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    /// Relative age like "3 days ago", or the "Invalid Date" sentinel.
    pub posted: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailPriority {
    High,
    Normal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEmailRequest {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub alert_id: String,
    pub user_id: String,
    pub jobs: Vec<JobSummary>,
    pub priority: EmailPriority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestEmailRequest {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub jobs: Vec<JobSummary>,
    pub priority: EmailPriority,
}
