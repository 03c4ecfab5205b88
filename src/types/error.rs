use thiserror::Error;

/// cost-reporter error types
#[derive(Error, Debug)]
pub enum ReporterError {
    /// Billing query failed or returned something unusable
    #[error("billing error: {0}")]
    Billing(String),

    /// Webhook could not be reached
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Missing or invalid configuration
    #[error("config error: {0}")]
    Config(String),

    /// HTTP client error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for cost-reporter
pub type Result<T> = std::result::Result<T, ReporterError>;
