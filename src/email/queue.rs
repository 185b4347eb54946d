use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::models::{AlertEmailRequest, DigestEmailRequest};

/// Fire-and-forget email dispatch. Retries and delivery tracking belong to
/// the service behind this trait, not to the scheduler.
#[async_trait]
pub trait EmailDispatchQueue: Send + Sync {
    async fn enqueue_alert_email(&self, request: AlertEmailRequest) -> Result<()>;
    async fn enqueue_digest_email(&self, request: DigestEmailRequest) -> Result<()>;
}

/// Dispatch queue backed by the web app's internal email endpoints.
pub struct HttpEmailQueue {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpEmailQueue {
    pub fn new(base_url: String, auth_token: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        // Ensure base_url doesn't have trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        Self {
            client,
            base_url,
            auth_token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<T: serde::Serialize>(&self, path: &str, body: &T) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach email endpoint {}", path))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Email endpoint {} returned status {}",
                path,
                response.status()
            );
        }
        debug!("Enqueued email via {}", path);
        Ok(())
    }
}

#[async_trait]
impl EmailDispatchQueue for HttpEmailQueue {
    async fn enqueue_alert_email(&self, request: AlertEmailRequest) -> Result<()> {
        self.post_json("/api/internal/emails/job-alert", &request)
            .await
    }

    async fn enqueue_digest_email(&self, request: DigestEmailRequest) -> Result<()> {
        self.post_json("/api/internal/emails/weekly-digest", &request)
            .await
    }
}

/// In-memory queue for tests: records every request instead of sending.
#[derive(Default)]
pub struct RecordingEmailQueue {
    alert_emails: std::sync::Mutex<Vec<AlertEmailRequest>>,
    digest_emails: std::sync::Mutex<Vec<DigestEmailRequest>>,
    fail_for: std::sync::Mutex<Vec<String>>,
}

impl RecordingEmailQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make enqueues addressed to `to` fail, to exercise per-record error
    /// isolation in the batch loops.
    pub fn fail_for(&self, to: &str) {
        self.fail_for.lock().unwrap().push(to.to_string());
    }

    pub fn alert_emails(&self) -> Vec<AlertEmailRequest> {
        self.alert_emails.lock().unwrap().clone()
    }

    pub fn digest_emails(&self) -> Vec<DigestEmailRequest> {
        self.digest_emails.lock().unwrap().clone()
    }

    fn check_failure(&self, to: &str) -> Result<()> {
        if self.fail_for.lock().unwrap().iter().any(|f| f == to) {
            anyhow::bail!("Injected dispatch failure for {}", to);
        }
        Ok(())
    }
}

#[async_trait]
impl EmailDispatchQueue for RecordingEmailQueue {
    async fn enqueue_alert_email(&self, request: AlertEmailRequest) -> Result<()> {
        self.check_failure(&request.to)?;
        self.alert_emails.lock().unwrap().push(request);
        Ok(())
    }

    async fn enqueue_digest_email(&self, request: DigestEmailRequest) -> Result<()> {
        self.check_failure(&request.to)?;
        self.digest_emails.lock().unwrap().push(request);
        Ok(())
    }
}
