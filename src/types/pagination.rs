use std::fmt::Display;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::{types::Record, validation::clamp_pagination};

/// Query parameter names owned by [`ListParams`]; filters cannot override them.
const RESERVED_PARAMS: [&str; 4] = ["page", "limit", "sort_by", "sort_order"];

/// Sort direction for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

/// Pagination, sorting and filtering for list operations.
///
/// Out-of-range values are clamped rather than rejected: the page is at least 1
/// and the limit lies in `1..=100`, defaulting to [`DEFAULT_PAGE_LIMIT`](crate::validation::DEFAULT_PAGE_LIMIT).
///
/// ```
/// use licensechain::types::{ListParams, SortOrder};
///
/// let params = ListParams::builder()
///     .page(0)
///     .limit(500)
///     .sort_by("created_at")
///     .sort_order(SortOrder::Desc)
///     .build();
///
/// let query = params.query_pairs();
/// assert!(query.contains(&("page".to_string(), "1".to_string())));
/// assert!(query.contains(&("limit".to_string(), "100".to_string())));
/// assert!(query.contains(&("sort_order".to_string(), "desc".to_string())));
/// ```
#[derive(Builder, Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    /// Requested page, 1-based.
    pub page: Option<u32>,
    /// Requested page size.
    pub limit: Option<u32>,
    /// Field to sort by.
    #[builder(into)]
    pub sort_by: Option<String>,
    /// Sort direction.
    pub sort_order: Option<SortOrder>,
    /// Extra filters passed through as query parameters.
    #[builder(default)]
    pub filters: Record<String>,
}

impl ListParams {
    /// Adds a filter, returning the updated parameters.
    pub fn filter(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.filters.insert(key.into(), value.to_string());
        self
    }

    /// Effective `(page, limit)` after clamping.
    pub fn effective_page(&self) -> (u32, u32) {
        clamp_pagination(self.page, self.limit)
    }

    /// Renders the parameters as query pairs.
    ///
    /// Filters are emitted in key order after the pagination and sort parameters.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let (page, limit) = self.effective_page();
        let mut pairs = vec![
            ("page".to_string(), page.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];

        if let Some(sort_by) = &self.sort_by {
            pairs.push(("sort_by".to_string(), sort_by.clone()));
        }
        if let Some(sort_order) = self.sort_order {
            pairs.push(("sort_order".to_string(), sort_order.to_string()));
        }

        let mut filters: Vec<_> = self
            .filters
            .iter()
            .filter(|(key, _)| !RESERVED_PARAMS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        filters.sort();
        pairs.extend(filters);

        pairs
    }
}

/// One page of a list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
}

impl<T> Page<T> {
    /// Whether more pages follow this one.
    pub fn has_more(&self) -> bool {
        u64::from(self.page) * u64::from(self.limit) < self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_use_single_default_limit() {
        let pairs = ListParams::default().query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("page".to_string(), "1".to_string()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn test_filters_cannot_override_pagination() {
        let params = ListParams::builder()
            .limit(5)
            .build()
            .filter("status", "active")
            .filter("limit", 1000)
            .filter("app_id", "app_1");

        let pairs = params.query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("page".to_string(), "1".to_string()),
                ("limit".to_string(), "5".to_string()),
                ("app_id".to_string(), "app_1".to_string()),
                ("status".to_string(), "active".to_string()),
            ]
        );
    }

    #[test]
    fn test_page_has_more() {
        let page: Page<u8> = serde_json::from_value(serde_json::json!({
            "data": [1, 2],
            "total": 5,
            "page": 1,
            "limit": 2,
        }))
        .unwrap();
        assert!(page.has_more());

        let last: Page<u8> = serde_json::from_value(serde_json::json!({
            "data": [5],
            "total": 5,
            "page": 3,
            "limit": 2,
        }))
        .unwrap();
        assert!(!last.has_more());
    }
}
