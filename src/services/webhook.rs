//! Webhook delivery of the report message

use crate::types::{InvocationResult, ReporterError, Result, STATUS_DELIVERED};
use serde::Serialize;

/// Body returned after the webhook accepted the message
pub const DELIVERED_BODY: &str = "Message sent successfully to the chat webhook!";

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    markdown: &'a str,
}

/// Posts markdown messages to a chat webhook
pub struct WebhookClient {
    client: reqwest::blocking::Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("cost-reporter/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Send one message.
    ///
    /// A 204 is success; any other status comes back as a result carrying
    /// that status and the response body. Only transport failures are errors.
    pub fn send(&self, message: &str) -> Result<InvocationResult> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { markdown: message })
            .send()
            .map_err(|e| {
                tracing::error!(error = %e, "webhook unreachable");
                ReporterError::Delivery(e.to_string())
            })?;

        let status = response.status().as_u16();
        if status == STATUS_DELIVERED {
            tracing::info!("report delivered");
            return Ok(InvocationResult::new(STATUS_DELIVERED, DELIVERED_BODY));
        }

        let body = super::read_body(response);
        tracing::warn!(status, body = %body, "webhook rejected report");
        Ok(InvocationResult::new(
            status,
            format!("Failed to send message to the chat webhook: {}", body),
        ))
    }
}
