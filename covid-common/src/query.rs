//! Query contract consumed by the routing layer
//!
//! Dates arrive as text and are validated here; entity names go through the
//! same canonicalization as ingested rows, so `USA` finds `US`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::dates;
use crate::locale;
use crate::store::{LocationPath, LookupError, NodeRef, Store};

/// Query failures reported back to the caller
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Malformed date, or outside `[2020-01-01, today]`
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Unknown date or entity
    #[error("Not found: {0}")]
    NotFound(String),
}

impl QueryError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::InvalidDate(_) => "INVALID_DATE",
            QueryError::NotFound(_) => "NOT_FOUND",
        }
    }
}

impl From<LookupError> for QueryError {
    fn from(err: LookupError) -> Self {
        QueryError::NotFound(err.to_string())
    }
}

/// Counts for one node, optionally with nested children
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    #[serde(rename = "Confirmed")]
    pub confirmed: i64,
    #[serde(rename = "Deaths")]
    pub deaths: i64,
    #[serde(rename = "Recovered")]
    pub recovered: i64,
    #[serde(rename = "Active")]
    pub active: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<BTreeMap<String, Summary>>,
}

impl Summary {
    /// Summarize `node`, including `depth` levels of children
    pub fn from_node(node: &NodeRef, depth: usize) -> Self {
        let totals = node.totals();
        let children = (depth > 0).then(|| {
            node.children()
                .map(|(name, child)| (name.to_string(), Summary::from_node(&child, depth - 1)))
                .collect()
        });
        Summary {
            confirmed: totals.confirmed,
            deaths: totals.deaths,
            recovered: totals.recovered,
            active: totals.active,
            children,
        }
    }
}

impl NodeRef {
    /// Summary of this node with `depth` levels of children
    pub fn summary(&self, depth: usize) -> Summary {
        Summary::from_node(self, depth)
    }
}

/// One entry of a range query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatedSummary {
    /// `MM-DD-YYYY`
    pub date: String,
    #[serde(flatten)]
    pub summary: Summary,
}

/// Point and range queries over a shared [`Store`]
#[derive(Debug, Clone)]
pub struct QueryService {
    store: Arc<Store>,
}

impl QueryService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// World totals on `date` (latest by default)
    pub fn summary(&self, date: Option<&str>) -> Result<Summary, QueryError> {
        self.point(&LocationPath::world(), date, 0)
    }

    /// World totals with one level of countries
    pub fn countries_summary(&self, date: Option<&str>) -> Result<Summary, QueryError> {
        self.point(&LocationPath::world(), date, 1)
    }

    pub fn summary_range(
        &self,
        start: &str,
        end: Option<&str>,
    ) -> Result<Vec<DatedSummary>, QueryError> {
        self.range(&LocationPath::world(), start, end, 0)
    }

    pub fn countries_summary_range(
        &self,
        start: &str,
        end: Option<&str>,
    ) -> Result<Vec<DatedSummary>, QueryError> {
        self.range(&LocationPath::world(), start, end, 1)
    }

    /// One country with its subregions
    pub fn country(&self, country: &str, date: Option<&str>) -> Result<Summary, QueryError> {
        self.point(&country_path(country), date, 1)
    }

    pub fn country_range(
        &self,
        country: &str,
        start: &str,
        end: Option<&str>,
    ) -> Result<Vec<DatedSummary>, QueryError> {
        self.range(&country_path(country), start, end, 0)
    }

    /// One subregion with its localities
    pub fn subregion(
        &self,
        country: &str,
        subregion: &str,
        date: Option<&str>,
    ) -> Result<Summary, QueryError> {
        self.point(&subregion_path(country, subregion), date, 1)
    }

    pub fn subregion_range(
        &self,
        country: &str,
        subregion: &str,
        start: &str,
        end: Option<&str>,
    ) -> Result<Vec<DatedSummary>, QueryError> {
        self.range(&subregion_path(country, subregion), start, end, 0)
    }

    fn point(
        &self,
        path: &LocationPath,
        date: Option<&str>,
        depth: usize,
    ) -> Result<Summary, QueryError> {
        let date = date.map(dates::parse_query_date).transpose()?;
        Ok(self.store.lookup(path, date)?.summary(depth))
    }

    fn range(
        &self,
        path: &LocationPath,
        start: &str,
        end: Option<&str>,
        depth: usize,
    ) -> Result<Vec<DatedSummary>, QueryError> {
        let start = dates::parse_query_date(start)?;
        let end = end.map(dates::parse_query_date).transpose()?;
        let series = self.store.time_series(path, start, end);
        Ok(series
            .iter()
            .map(|(date, node)| DatedSummary {
                date: dates::format_report_date(date),
                summary: node.summary(depth),
            })
            .collect())
    }
}

fn country_path(country: &str) -> LocationPath {
    LocationPath::country(locale::canonical_country(country))
}

fn subregion_path(country: &str, subregion: &str) -> LocationPath {
    LocationPath::subregion(
        locale::canonical_country(country),
        locale::normalize(subregion),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NormalizedRow;
    use chrono::NaiveDate;

    fn service() -> QueryService {
        let store = Arc::new(Store::new());
        let rows = |confirmed: i64| {
            vec![
                NormalizedRow {
                    country: "US".to_string(),
                    subregion: Some("Ohio".to_string()),
                    locality: None,
                    confirmed,
                    deaths: 1,
                    recovered: 0,
                    active: Some(confirmed - 1),
                },
                NormalizedRow {
                    country: "China".to_string(),
                    subregion: Some("Hubei".to_string()),
                    locality: None,
                    confirmed: 100,
                    deaths: 5,
                    recovered: 10,
                    active: None,
                },
            ]
        };
        store.ingest_normalized(NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(), rows(4));
        store.ingest_normalized(NaiveDate::from_ymd_opt(2020, 3, 3).unwrap(), rows(9));
        QueryService::new(store)
    }

    #[test]
    fn test_summary_defaults_to_latest() {
        let summary = service().summary(None).unwrap();
        assert_eq!(summary.confirmed, 109);
        assert!(summary.children.is_none());
    }

    #[test]
    fn test_summary_on_specific_date() {
        let summary = service().summary(Some("2020-03-01")).unwrap();
        assert_eq!(summary.confirmed, 104);
    }

    #[test]
    fn test_summary_on_missing_date_is_not_found() {
        let err = service().summary(Some("2020-03-02")).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_countries_summary_has_one_level() {
        let summary = service().countries_summary(None).unwrap();
        let children = summary.children.unwrap();
        assert_eq!(children.len(), 2);
        assert!(children["US"].children.is_none());
    }

    #[test]
    fn test_country_uses_canonical_name() {
        let us = service().country("USA", None).unwrap();
        assert_eq!(us.confirmed, 9);
        assert!(us.children.unwrap().contains_key("Ohio"));

        let china = service().country("Mainland China", None).unwrap();
        assert_eq!(china.confirmed, 100);
    }

    #[test]
    fn test_unknown_entities_are_not_found() {
        let service = service();
        assert_eq!(service.country("Atlantis", None).unwrap_err().code(), "NOT_FOUND");
        assert_eq!(
            service.subregion("US", "Atlantis", None).unwrap_err().code(),
            "NOT_FOUND"
        );
    }

    #[test]
    fn test_invalid_dates_rejected_before_lookup() {
        let service = service();
        assert_eq!(service.summary(Some("03-01-2020")).unwrap_err().code(), "INVALID_DATE");
        assert_eq!(
            service.summary_range("2019-12-31", None).unwrap_err().code(),
            "INVALID_DATE"
        );
        assert_eq!(
            service
                .country_range("US", "2020-03-01", Some("2020-3-3"))
                .unwrap_err()
                .code(),
            "INVALID_DATE"
        );
    }

    #[test]
    fn test_ranges_skip_missing_days() {
        let entries = service().country_range("US", "2020-03-01", None).unwrap();
        let dates: Vec<&str> = entries.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, vec!["03-01-2020", "03-03-2020"]);
        assert_eq!(entries[1].summary.confirmed, 9);
    }

    #[test]
    fn test_subregion_range_for_unknown_entity_is_empty() {
        let entries = service()
            .subregion_range("US", "Atlantis", "2020-03-01", None)
            .unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_node_summary_depth() {
        let service = service();
        let world = service
            .store()
            .lookup(&LocationPath::world(), None)
            .unwrap();

        let flat = world.summary(0);
        assert!(flat.children.is_none());

        let nested = world.summary(2);
        let us = &nested.children.unwrap()["US"];
        assert_eq!(us.children.as_ref().unwrap()["Ohio"].confirmed, 9);
        assert!(us.children.as_ref().unwrap()["Ohio"].children.is_none());
    }

    #[test]
    fn test_dated_summary_serializes_flat() {
        let entries = service().summary_range("2020-03-03", None).unwrap();
        let json = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(json["date"], "03-03-2020");
        assert_eq!(json["Confirmed"], 109);
        assert!(json.get("children").is_none());
    }
}
