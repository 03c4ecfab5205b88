//! Report types: date window, per-service costs, and the job result

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use super::{ReporterError, Result};

/// Status code returned when the webhook accepted the message
pub const STATUS_DELIVERED: u16 = 204;

/// Status code returned for any internal failure
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Dates a single report run queries, all UTC.
///
/// `today` is the exclusive end of every query range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub yesterday: NaiveDate,
    pub today: NaiveDate,
    pub trailing_start: NaiveDate,
    pub month_start: NaiveDate,
}

impl DateWindow {
    /// Derive the window from `today` and the forecast look-back in days.
    ///
    /// Fails when a look-back falls outside the supported calendar.
    pub fn for_today(today: NaiveDate, forecast_days: u32) -> Result<Self> {
        let days_before = |days: i64| {
            today.checked_sub_signed(Duration::days(days)).ok_or_else(|| {
                ReporterError::Config(format!(
                    "{} minus {} days is out of the supported date range",
                    today, days
                ))
            })
        };

        Ok(Self {
            yesterday: days_before(1)?,
            today,
            trailing_start: days_before(i64::from(forecast_days))?,
            month_start: days_before(i64::from(today.day0()))?,
        })
    }

    /// True on the first of the month, when month-to-date is an empty range
    pub fn month_is_empty(&self) -> bool {
        self.month_start == self.today
    }
}

/// Cost attributed to one service (or the "Other" bucket)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCost {
    pub service: String,
    pub amount: f64,
}

impl ServiceCost {
    pub fn new(service: impl Into<String>, amount: f64) -> Self {
        Self {
            service: service.into(),
            amount,
        }
    }
}

/// Everything the message is built from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSummary {
    pub yesterday_total: f64,
    pub forecast: f64,
    pub month_total: f64,
    /// Sorted descending by amount
    pub services: Vec<ServiceCost>,
}

/// Outcome handed back to the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    pub status_code: u16,
    pub body: String,
}

impl InvocationResult {
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }

    pub fn internal_error(message: impl std::fmt::Display) -> Self {
        Self::new(
            STATUS_INTERNAL_ERROR,
            format!("Internal server error: {}", message),
        )
    }

    /// Collapse a run into the terminal result; errors become a 500
    pub fn from_outcome(outcome: Result<InvocationResult>) -> Self {
        match outcome {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "cost report failed");
                Self::internal_error(e)
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_DELIVERED
    }
}
