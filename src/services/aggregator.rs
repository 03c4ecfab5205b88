//! Aggregator service for turning billing responses into report figures

use super::billing::CostAndUsage;
use crate::types::{ReporterError, Result, ServiceCost};

/// Default amount at or below which a service is folded into "Other"
pub const DEFAULT_OTHER_THRESHOLD: f64 = 0.10;

/// Name of the bucket collecting small services
pub const OTHER_BUCKET: &str = "Other";

/// Aggregator for computing report figures
pub struct Aggregator;

impl Aggregator {
    /// Bucket (service, cost) pairs and sum them.
    ///
    /// Services costing `threshold` or less are folded into "Other", which is
    /// only emitted when positive. The total includes every service. The
    /// result is sorted descending by amount with "Other" sorted like any
    /// other entry.
    pub fn bucket_services<I, S>(costs: I, threshold: f64) -> (Vec<ServiceCost>, f64)
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut services = Vec::new();
        let mut total = 0.0;
        let mut other = 0.0;

        for (service, amount) in costs {
            if amount <= threshold {
                other += amount;
            } else {
                services.push(ServiceCost::new(service, amount));
            }
            total += amount;
        }

        if other > 0.0 {
            services.push(ServiceCost::new(OTHER_BUCKET, other));
        }

        services.sort_by(|a, b| b.amount.total_cmp(&a.amount));
        (services, total)
    }

    /// Per-service breakdown from the first time bucket of a grouped response
    pub fn service_costs(
        response: &CostAndUsage,
        threshold: f64,
    ) -> Result<(Vec<ServiceCost>, f64)> {
        let Some(bucket) = response.results_by_time.first() else {
            return Ok((Vec::new(), 0.0));
        };

        let pairs = bucket
            .groups
            .iter()
            .map(|g| -> Result<(String, f64)> { Ok((g.name()?.to_string(), g.cost()?)) })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::bucket_services(pairs, threshold))
    }

    /// Mean of daily totals, 0.0 when there are none
    pub fn average(daily_totals: &[f64]) -> f64 {
        if daily_totals.is_empty() {
            return 0.0;
        }
        daily_totals.iter().sum::<f64>() / daily_totals.len() as f64
    }

    /// Trailing-average forecast from an ungrouped daily response
    pub fn forecast(response: &CostAndUsage) -> Result<f64> {
        let totals = response
            .results_by_time
            .iter()
            .map(|r| r.total_cost())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::average(&totals))
    }

    /// Total of the first bucket of a monthly response
    pub fn month_total(response: &CostAndUsage) -> Result<f64> {
        response
            .results_by_time
            .first()
            .ok_or_else(|| ReporterError::Billing("monthly response has no results".into()))?
            .total_cost()
    }
}
