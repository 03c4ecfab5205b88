//! Report orchestration: query, aggregate, format, deliver

use super::aggregator::Aggregator;
use super::billing::{BillingSource, CostExplorerClient, CostQuery};
use super::formatter::format_message;
use super::webhook::WebhookClient;
use crate::config::{Config, ReportSettings};
use crate::types::{CostSummary, DateWindow, InvocationResult, Result, ServiceCost};
use chrono::NaiveDate;

/// Builds the daily report from a billing source
pub struct CostReporter<B> {
    billing: B,
    settings: ReportSettings,
}

impl<B: BillingSource> CostReporter<B> {
    pub fn new(billing: B, settings: ReportSettings) -> Self {
        Self { billing, settings }
    }

    pub fn window(&self, today: NaiveDate) -> Result<DateWindow> {
        DateWindow::for_today(today, self.settings.forecast_days)
    }

    /// Yesterday's per-service breakdown and total
    pub fn service_costs(&self, window: &DateWindow) -> Result<(Vec<ServiceCost>, f64)> {
        let query = CostQuery::service_costs(window.yesterday, window.today);
        self.billing
            .get_cost_and_usage(&query)
            .and_then(|r| Aggregator::service_costs(&r, self.settings.other_threshold))
            .inspect_err(|e| tracing::error!(error = %e, "failed to get service costs"))
    }

    /// Average daily spend over the trailing window
    pub fn forecast(&self, window: &DateWindow) -> Result<f64> {
        let query = CostQuery::daily_totals(window.trailing_start, window.today);
        self.billing
            .get_cost_and_usage(&query)
            .and_then(|r| Aggregator::forecast(&r))
            .inspect_err(|e| tracing::error!(error = %e, "failed to get forecast"))
    }

    /// Month-to-date total; zero on the first of the month
    pub fn month_total(&self, window: &DateWindow) -> Result<f64> {
        if window.month_is_empty() {
            return Ok(0.0);
        }
        let query = CostQuery::monthly_total(window.month_start, window.today);
        self.billing
            .get_cost_and_usage(&query)
            .and_then(|r| Aggregator::month_total(&r))
            .inspect_err(|e| tracing::error!(error = %e, "failed to get month spend"))
    }

    /// Run the three queries in order
    pub fn summarize(&self, window: &DateWindow) -> Result<CostSummary> {
        let (services, yesterday_total) = self.service_costs(window)?;
        let forecast = self.forecast(window)?;
        let month_total = self.month_total(window)?;

        tracing::info!(
            yesterday = %window.yesterday,
            yesterday_total,
            forecast,
            month_total,
            services = services.len(),
            "costs collected"
        );

        Ok(CostSummary {
            yesterday_total,
            forecast,
            month_total,
            services,
        })
    }

    /// Build the message for `today` without sending it
    pub fn compose(&self, today: NaiveDate) -> Result<String> {
        let window = self.window(today)?;
        let summary = self.summarize(&window)?;
        Ok(format_message(&self.settings.account_name, &window, &summary))
    }

    /// Build the message and post it once
    pub fn run(&self, webhook: &WebhookClient, today: NaiveDate) -> Result<InvocationResult> {
        let message = self.compose(today)?;
        webhook.send(&message)
    }
}

/// Full scheduled run against Cost Explorer; never fails, errors become a 500
pub fn run_job(config: Result<Config>, today: NaiveDate) -> InvocationResult {
    InvocationResult::from_outcome(config.and_then(|config| {
        let webhook = WebhookClient::new(config.require_webhook()?)?;
        let billing = CostExplorerClient::new(config.billing_endpoint)?;
        CostReporter::new(billing, config.report).run(&webhook, today)
    }))
}
