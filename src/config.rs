//! Job configuration, read once at startup from flags or environment

use crate::services::aggregator::DEFAULT_OTHER_THRESHOLD;
use crate::services::billing::DEFAULT_BILLING_ENDPOINT;
use crate::types::{ReporterError, Result};
use clap::Args;

/// Account label used when none is configured
pub const DEFAULT_ACCOUNT_NAME: &str = "Unknown";

/// Days averaged for the forecast
pub const DEFAULT_FORECAST_DAYS: u32 = 3;

/// Configuration flags; each falls back to its environment variable
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Chat webhook the report is posted to
    #[arg(long, env = "WEBHOOK_URL", global = true)]
    pub webhook_url: Option<String>,

    /// Account or project label shown in the report
    #[arg(long, env = "ACCOUNT_NAME", global = true)]
    pub account_name: Option<String>,

    /// Cost Explorer endpoint
    #[arg(long, env = "BILLING_ENDPOINT", global = true)]
    pub billing_endpoint: Option<String>,

    /// Services costing this much or less are grouped as "Other"
    #[arg(long, env = "OTHER_COST_THRESHOLD", global = true)]
    pub other_threshold: Option<f64>,

    /// Number of trailing days averaged for the forecast
    #[arg(long, env = "FORECAST_WINDOW_DAYS", global = true)]
    pub forecast_days: Option<u32>,
}

/// Settings that shape the report itself
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub account_name: String,
    pub other_threshold: f64,
    pub forecast_days: u32,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            account_name: DEFAULT_ACCOUNT_NAME.to_string(),
            other_threshold: DEFAULT_OTHER_THRESHOLD,
            forecast_days: DEFAULT_FORECAST_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub webhook_url: Option<String>,
    pub billing_endpoint: String,
    pub report: ReportSettings,
}

impl Config {
    /// The webhook URL, which only delivery needs
    pub fn require_webhook(&self) -> Result<&str> {
        self.webhook_url
            .as_deref()
            .ok_or_else(|| ReporterError::Config("WEBHOOK_URL is not set".into()))
    }
}

impl ConfigArgs {
    /// Apply defaults and validate
    pub fn resolve(self) -> Result<Config> {
        let defaults = ReportSettings::default();

        let other_threshold = self.other_threshold.unwrap_or(defaults.other_threshold);
        if !other_threshold.is_finite() || other_threshold < 0.0 {
            return Err(ReporterError::Config(format!(
                "OTHER_COST_THRESHOLD must be a non-negative number, got {}",
                other_threshold
            )));
        }

        let forecast_days = self.forecast_days.unwrap_or(defaults.forecast_days);
        if forecast_days == 0 {
            return Err(ReporterError::Config(
                "FORECAST_WINDOW_DAYS must be at least 1".into(),
            ));
        }

        Ok(Config {
            webhook_url: self.webhook_url.filter(|url| !url.trim().is_empty()),
            billing_endpoint: self
                .billing_endpoint
                .unwrap_or_else(|| DEFAULT_BILLING_ENDPOINT.to_string()),
            report: ReportSettings {
                account_name: self.account_name.unwrap_or(defaults.account_name),
                other_threshold,
                forecast_days,
            },
        })
    }
}
