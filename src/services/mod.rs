//! Services for querying, aggregating, formatting and delivering the report

pub mod aggregator;
pub mod billing;
pub mod formatter;
pub mod reporter;
pub mod webhook;

pub use aggregator::Aggregator;
pub use billing::{BillingSource, CostExplorerClient, CostQuery};
pub use reporter::{run_job, CostReporter};
pub use webhook::WebhookClient;

/// Response body as text, or a description of why it could not be read
pub(crate) fn read_body(response: reqwest::blocking::Response) -> String {
    describe_body(response.text())
}

fn describe_body(body: reqwest::Result<String>) -> String {
    body.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to read response body");
        format!("<unreadable response body: {}>", e)
    })
}
