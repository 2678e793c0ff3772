use std::sync::Arc;

use bon::Builder;

use super::resource_path;
use crate::{
    client::ApiClient,
    errors::Result,
    types::{AnyJson, Record},
};

/// Reporting window used by usage statistics when none is given.
pub const DEFAULT_USAGE_PERIOD: &str = "30d";

/// Filters for [`AnalyticsService::summary`]. Unset fields are not sent.
///
/// ```
/// use licensechain::client::AnalyticsQuery;
///
/// let query = AnalyticsQuery::builder()
///     .app_id("app_1")
///     .start_date("2024-01-01")
///     .metric("validations")
///     .build();
///
/// assert_eq!(
///     query.query_pairs(),
///     vec![
///         ("app_id".to_string(), "app_1".to_string()),
///         ("start_date".to_string(), "2024-01-01".to_string()),
///         ("metric".to_string(), "validations".to_string()),
///     ]
/// );
/// ```
#[derive(Builder, Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyticsQuery {
    #[builder(into)]
    pub app_id: Option<String>,
    /// Start of the window, e.g. `2024-01-01`.
    #[builder(into)]
    pub start_date: Option<String>,
    #[builder(into)]
    pub end_date: Option<String>,
    #[builder(into)]
    pub metric: Option<String>,
    #[builder(into)]
    pub period: Option<String>,
}

impl AnalyticsQuery {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        [
            ("app_id", &self.app_id),
            ("start_date", &self.start_date),
            ("end_date", &self.end_date),
            ("metric", &self.metric),
            ("period", &self.period),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
        .collect()
    }
}

/// Filters for [`AnalyticsService::usage`].
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
pub struct UsageQuery {
    #[builder(into, default = DEFAULT_USAGE_PERIOD.to_string())]
    pub period: String,
    #[builder(into)]
    pub app_id: Option<String>,
    #[builder(into)]
    pub granularity: Option<String>,
}

impl Default for UsageQuery {
    fn default() -> Self {
        UsageQuery::builder().build()
    }
}

impl UsageQuery {
    /// Query pairs, always including `period`.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("period".to_string(), self.period.clone())];
        if let Some(app_id) = &self.app_id {
            pairs.push(("app_id".to_string(), app_id.clone()));
        }
        if let Some(granularity) = &self.granularity {
            pairs.push(("granularity".to_string(), granularity.clone()));
        }
        pairs
    }
}

/// Read-only reporting endpoints.
#[derive(Debug, Clone)]
pub struct AnalyticsService {
    api: Arc<ApiClient>,
}

impl AnalyticsService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        AnalyticsService { api }
    }

    /// Aggregated analytics (`GET /analytics`).
    pub async fn summary(&self, query: &AnalyticsQuery) -> Result<Record<AnyJson>> {
        self.api.get_data("/analytics", &query.query_pairs()).await
    }

    /// Analytics of a single license.
    pub async fn license(&self, license_id: &str) -> Result<Record<AnyJson>> {
        let path = resource_path("/licenses", license_id, "license_id")?;
        self.api.get_data(&format!("{path}/analytics"), &[]).await
    }

    /// Usage statistics (`GET /analytics/usage`).
    pub async fn usage(&self, query: &UsageQuery) -> Result<Record<AnyJson>> {
        self.api
            .get_data("/analytics/usage", &query.query_pairs())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_analytics_query_sends_nothing() {
        assert!(AnalyticsQuery::default().query_pairs().is_empty());
    }

    #[test]
    fn test_usage_query_defaults_period() {
        assert_eq!(
            UsageQuery::default().query_pairs(),
            vec![("period".to_string(), "30d".to_string())]
        );

        let query = UsageQuery::builder()
            .period("7d")
            .granularity("day")
            .build();
        assert_eq!(
            query.query_pairs(),
            vec![
                ("period".to_string(), "7d".to_string()),
                ("granularity".to_string(), "day".to_string()),
            ]
        );
    }
}
