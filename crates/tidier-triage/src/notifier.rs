use std::time::Duration;

use tidier_core::TidierConfig;
use tracing::{info, warn};

/// Sends the completion ping.
pub trait RunNotifier {
    /// Returns the response status, or a transport error message.
    fn ping(&self, url: &str) -> Result<u16, String>;
}

/// Issues a plain GET against the configured webhook URL.
pub struct WebhookNotifier {
    http: reqwest::blocking::Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("tidier")
            .build()?;
        Ok(Self { http })
    }
}

impl RunNotifier for WebhookNotifier {
    fn ping(&self, url: &str) -> Result<u16, String> {
        self.http
            .get(url)
            .send()
            .map(|response| response.status().as_u16())
            .map_err(|error| error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates supported `NotificationOutcome` values.
pub enum NotificationOutcome {
    NotConfigured,
    SkippedDryRun { url: String },
    Delivered { url: String, status: u16 },
    Failed { url: String, message: String },
}

/// Pings the webhook when configured and live. The response body is ignored
/// and a failed ping never fails the run.
pub fn notify_after_run(notifier: &dyn RunNotifier, config: &TidierConfig) -> NotificationOutcome {
    let Some(url) = config.webhook() else {
        return NotificationOutcome::NotConfigured;
    };
    if !config.for_real() {
        return NotificationOutcome::SkippedDryRun {
            url: url.to_string(),
        };
    }
    match notifier.ping(url) {
        Ok(status) => {
            info!(status, "webhook pinged");
            NotificationOutcome::Delivered {
                url: url.to_string(),
                status,
            }
        }
        Err(message) => {
            warn!(error = %message, "webhook ping failed");
            NotificationOutcome::Failed {
                url: url.to_string(),
                message,
            }
        }
    }
}
