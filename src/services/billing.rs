//! Billing data source
//!
//! Speaks the Cost Explorer `GetCostAndUsage` JSON protocol. Request signing
//! is expected to happen in front of the configured endpoint.

use crate::types::{ReporterError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default Cost Explorer endpoint (the API is only served from us-east-1)
pub const DEFAULT_BILLING_ENDPOINT: &str = "https://ce.us-east-1.amazonaws.com/";

/// Metric every query requests
pub const UNBLENDED_COST: &str = "UnblendedCost";

const TARGET_HEADER: &str = "X-Amz-Target";
const GET_COST_AND_USAGE_TARGET: &str = "AWSInsightsIndexService.GetCostAndUsage";
const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Time bucketing of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    Daily,
    Monthly,
}

/// Date range with inclusive start and exclusive end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One read against the billing source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostQuery {
    pub period: TimePeriod,
    pub granularity: Granularity,
    /// Group results by the SERVICE dimension
    pub by_service: bool,
}

impl CostQuery {
    /// Daily cost per service
    pub fn service_costs(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            period: TimePeriod { start, end },
            granularity: Granularity::Daily,
            by_service: true,
        }
    }

    /// Daily account totals
    pub fn daily_totals(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            period: TimePeriod { start, end },
            granularity: Granularity::Daily,
            by_service: false,
        }
    }

    /// Single monthly account total
    pub fn monthly_total(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            period: TimePeriod { start, end },
            granularity: Granularity::Monthly,
            by_service: false,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GroupDefinition {
    #[serde(rename = "Type")]
    kind: &'static str,
    key: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetCostAndUsageRequest<'a> {
    time_period: TimePeriod,
    granularity: Granularity,
    metrics: [&'static str; 1],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    group_by: Vec<GroupDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_page_token: Option<&'a str>,
}

impl<'a> GetCostAndUsageRequest<'a> {
    fn new(query: &CostQuery, next_page_token: Option<&'a str>) -> Self {
        let group_by = if query.by_service {
            vec![GroupDefinition {
                kind: "DIMENSION",
                key: "SERVICE",
            }]
        } else {
            Vec::new()
        };
        Self {
            time_period: query.period,
            granularity: query.granularity,
            metrics: [UNBLENDED_COST],
            group_by,
            next_page_token,
        }
    }
}

/// A metric amount as the API reports it (decimal string)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricValue {
    pub amount: String,
    #[serde(default)]
    pub unit: String,
}

impl MetricValue {
    pub fn usd(amount: f64) -> Self {
        Self {
            amount: amount.to_string(),
            unit: "USD".into(),
        }
    }

    /// Parse the amount
    pub fn value(&self) -> Result<f64> {
        self.amount
            .trim()
            .parse()
            .map_err(|_| ReporterError::Billing(format!("invalid amount '{}'", self.amount)))
    }
}

fn unblended(metrics: &HashMap<String, MetricValue>) -> Result<f64> {
    metrics
        .get(UNBLENDED_COST)
        .ok_or_else(|| ReporterError::Billing(format!("{} missing from response", UNBLENDED_COST)))?
        .value()
}

/// Costs of one grouping key (one service)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub metrics: HashMap<String, MetricValue>,
}

impl Group {
    pub fn service(name: &str, amount: f64) -> Self {
        Self {
            keys: vec![name.to_string()],
            metrics: HashMap::from([(UNBLENDED_COST.to_string(), MetricValue::usd(amount))]),
        }
    }

    pub fn name(&self) -> Result<&str> {
        self.keys
            .first()
            .map(String::as_str)
            .ok_or_else(|| ReporterError::Billing("group without keys".into()))
    }

    pub fn cost(&self) -> Result<f64> {
        unblended(&self.metrics)
    }
}

/// One time bucket of a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultByTime {
    pub time_period: TimePeriod,
    #[serde(default)]
    pub total: HashMap<String, MetricValue>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub estimated: bool,
}

impl ResultByTime {
    /// Bucket carrying only a total (ungrouped queries)
    pub fn with_total(start: NaiveDate, end: NaiveDate, amount: f64) -> Self {
        Self {
            time_period: TimePeriod { start, end },
            total: HashMap::from([(UNBLENDED_COST.to_string(), MetricValue::usd(amount))]),
            groups: Vec::new(),
            estimated: false,
        }
    }

    /// Bucket carrying per-service groups
    pub fn with_groups(start: NaiveDate, end: NaiveDate, groups: Vec<Group>) -> Self {
        Self {
            time_period: TimePeriod { start, end },
            total: HashMap::new(),
            groups,
            estimated: false,
        }
    }

    pub fn total_cost(&self) -> Result<f64> {
        unblended(&self.total)
    }
}

/// `GetCostAndUsage` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CostAndUsage {
    #[serde(default)]
    pub results_by_time: Vec<ResultByTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl CostAndUsage {
    /// Fold another page in; groups of a repeated time bucket are appended
    pub fn merge(&mut self, page: CostAndUsage) {
        for result in page.results_by_time {
            match self
                .results_by_time
                .iter_mut()
                .find(|r| r.time_period == result.time_period)
            {
                Some(existing) => existing.groups.extend(result.groups),
                None => self.results_by_time.push(result),
            }
        }
        self.next_page_token = page.next_page_token;
    }
}

/// Anything that can answer cost queries
pub trait BillingSource {
    fn get_cost_and_usage(&self, query: &CostQuery) -> Result<CostAndUsage>;
}

/// Cost Explorer client over blocking HTTP
pub struct CostExplorerClient {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl CostExplorerClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("cost-reporter/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn fetch_page(&self, query: &CostQuery, next_page_token: Option<&str>) -> Result<CostAndUsage> {
        let body = serde_json::to_vec(&GetCostAndUsageRequest::new(query, next_page_token))?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON_CONTENT_TYPE)
            .header(TARGET_HEADER, GET_COST_AND_USAGE_TARGET)
            .body(body)
            .send()
            .map_err(|e| ReporterError::Billing(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = super::read_body(response);
            tracing::error!(%status, body = %text, "GetCostAndUsage rejected");
            return Err(ReporterError::Billing(format!(
                "GetCostAndUsage returned {}: {}",
                status, text
            )));
        }

        response
            .json()
            .map_err(|e| ReporterError::Billing(format!("malformed response: {}", e)))
    }
}

impl BillingSource for CostExplorerClient {
    fn get_cost_and_usage(&self, query: &CostQuery) -> Result<CostAndUsage> {
        let mut merged = CostAndUsage::default();
        let mut token: Option<String> = None;

        loop {
            let page = self.fetch_page(query, token.as_deref())?;
            merged.merge(page);
            match merged.next_page_token.take() {
                Some(next) if next.is_empty() => break,
                Some(next) if token.as_deref() == Some(next.as_str()) => {
                    tracing::warn!(token = %next, "billing API repeated its page token");
                    break;
                }
                Some(next) => token = Some(next),
                None => break,
            }
        }

        tracing::debug!(
            granularity = ?query.granularity,
            buckets = merged.results_by_time.len(),
            "billing query complete"
        );
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ========== request encoding tests ==========

    #[test]
    fn test_service_query_request_shape() {
        let query = CostQuery::service_costs(date(2024, 7, 14), date(2024, 7, 15));
        let body = serde_json::to_value(GetCostAndUsageRequest::new(&query, None)).unwrap();

        assert_eq!(
            body,
            json!({
                "TimePeriod": {"Start": "2024-07-14", "End": "2024-07-15"},
                "Granularity": "DAILY",
                "Metrics": ["UnblendedCost"],
                "GroupBy": [{"Type": "DIMENSION", "Key": "SERVICE"}]
            })
        );
    }

    #[test]
    fn test_monthly_query_omits_group_by() {
        let query = CostQuery::monthly_total(date(2024, 7, 1), date(2024, 7, 15));
        let body =
            serde_json::to_value(GetCostAndUsageRequest::new(&query, Some("tok"))).unwrap();

        assert_eq!(body["Granularity"], "MONTHLY");
        assert!(body.get("GroupBy").is_none());
        assert_eq!(body["NextPageToken"], "tok");
    }

    // ========== response decoding tests ==========

    #[test]
    fn test_decode_grouped_response() {
        let raw = json!({
            "ResultsByTime": [{
                "TimePeriod": {"Start": "2024-07-14", "End": "2024-07-15"},
                "Total": {},
                "Groups": [{
                    "Keys": ["Amazon Elastic Compute Cloud - Compute"],
                    "Metrics": {"UnblendedCost": {"Amount": "5.0012", "Unit": "USD"}}
                }],
                "Estimated": true
            }],
            "DimensionValueAttributes": []
        });

        let parsed: CostAndUsage = serde_json::from_value(raw).unwrap();
        let group = &parsed.results_by_time[0].groups[0];

        assert_eq!(group.name().unwrap(), "Amazon Elastic Compute Cloud - Compute");
        assert!((group.cost().unwrap() - 5.0012).abs() < 1e-10);
        assert!(parsed.results_by_time[0].estimated);
    }

    #[test]
    fn test_invalid_amount_is_billing_error() {
        let value = MetricValue {
            amount: "n/a".into(),
            unit: "USD".into(),
        };
        assert!(matches!(value.value(), Err(ReporterError::Billing(_))));
    }

    #[test]
    fn test_missing_total_metric_is_billing_error() {
        let bucket = ResultByTime::with_groups(date(2024, 7, 14), date(2024, 7, 15), vec![]);
        let err = bucket.total_cost().unwrap_err();
        assert!(err.to_string().contains("UnblendedCost"));
    }

    // ========== merge tests ==========

    #[test]
    fn test_merge_appends_groups_of_same_bucket() {
        let (start, end) = (date(2024, 7, 14), date(2024, 7, 15));
        let mut merged = CostAndUsage::default();
        merged.merge(CostAndUsage {
            results_by_time: vec![ResultByTime::with_groups(
                start,
                end,
                vec![Group::service("EC2", 1.0)],
            )],
            next_page_token: Some("page-2".into()),
        });
        assert_eq!(merged.next_page_token.as_deref(), Some("page-2"));

        merged.merge(CostAndUsage {
            results_by_time: vec![ResultByTime::with_groups(
                start,
                end,
                vec![Group::service("S3", 2.0)],
            )],
            next_page_token: None,
        });

        assert_eq!(merged.results_by_time.len(), 1);
        assert_eq!(merged.results_by_time[0].groups.len(), 2);
        assert!(merged.next_page_token.is_none());
    }

    #[test]
    fn test_merge_keeps_distinct_buckets() {
        let mut merged = CostAndUsage::default();
        merged.merge(CostAndUsage {
            results_by_time: vec![
                ResultByTime::with_total(date(2024, 7, 12), date(2024, 7, 13), 1.0),
                ResultByTime::with_total(date(2024, 7, 13), date(2024, 7, 14), 2.0),
            ],
            next_page_token: None,
        });
        assert_eq!(merged.results_by_time.len(), 2);
    }

    // ========== CostExplorerClient tests ==========

    #[test]
    fn test_client_posts_amz_json() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .header("x-amz-target", GET_COST_AND_USAGE_TARGET)
                .header("content-type", AMZ_JSON_CONTENT_TYPE);
            then.status(200).json_body(json!({
                "ResultsByTime": [{
                    "TimePeriod": {"Start": "2024-07-01", "End": "2024-07-15"},
                    "Total": {"UnblendedCost": {"Amount": "123.456", "Unit": "USD"}},
                    "Groups": [],
                    "Estimated": true
                }]
            }));
        });

        let client = CostExplorerClient::new(server.url("/")).unwrap();
        let response = client
            .get_cost_and_usage(&CostQuery::monthly_total(
                date(2024, 7, 1),
                date(2024, 7, 15),
            ))
            .unwrap();

        mock.assert();
        assert_eq!(response.results_by_time.len(), 1);
        assert!((response.results_by_time[0].total_cost().unwrap() - 123.456).abs() < 1e-10);
    }

    #[test]
    fn test_client_surfaces_api_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(400)
                .body(r#"{"__type":"ValidationException","message":"Start date is after end date"}"#);
        });

        let client = CostExplorerClient::new(server.url("/")).unwrap();
        let err = client
            .get_cost_and_usage(&CostQuery::daily_totals(
                date(2024, 7, 12),
                date(2024, 7, 15),
            ))
            .unwrap_err();

        assert!(matches!(err, ReporterError::Billing(_)));
        assert!(err.to_string().contains("ValidationException"));
    }

    #[test]
    fn test_client_rejects_malformed_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(200).body("<html>not json</html>");
        });

        let client = CostExplorerClient::new(server.url("/")).unwrap();
        let err = client
            .get_cost_and_usage(&CostQuery::daily_totals(
                date(2024, 7, 12),
                date(2024, 7, 15),
            ))
            .unwrap_err();

        assert!(err.to_string().contains("malformed response"));
    }

    #[test]
    fn test_client_stops_on_repeated_page_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(200).json_body(json!({
                "ResultsByTime": [{
                    "TimePeriod": {"Start": "2024-07-12", "End": "2024-07-13"},
                    "Total": {"UnblendedCost": {"Amount": "4.0", "Unit": "USD"}}
                }],
                "NextPageToken": "stuck"
            }));
        });

        let client = CostExplorerClient::new(server.url("/")).unwrap();
        let response = client
            .get_cost_and_usage(&CostQuery::daily_totals(
                date(2024, 7, 12),
                date(2024, 7, 13),
            ))
            .unwrap();

        // first page, then one follow-up that repeats the token
        mock.assert_hits(2);
        assert_eq!(response.results_by_time.len(), 1);
        assert!(response.next_page_token.is_none());
    }
}
