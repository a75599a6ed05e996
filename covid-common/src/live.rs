//! Live counter reconciliation
//!
//! The live source is fresher than the daily batch files, so its figures
//! overwrite the newest date's world totals and the totals of countries
//! already present in that tree. Nothing is re-aggregated and no node is
//! created.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::locale;
use crate::metrics::Metrics;
use crate::store::DayTree;

/// Flat update parsed from the live source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveUpdate {
    pub global: Metrics,
    pub per_country: Vec<LiveCountry>,
}

/// One country's live figures; absent fields leave the stored value alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveCountry {
    pub name: String,
    pub confirmed: Option<i64>,
    pub deaths: Option<i64>,
    pub recovered: Option<i64>,
    pub active: Option<i64>,
}

impl LiveCountry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn overwrite(&self, totals: &mut Metrics) {
        if let Some(confirmed) = self.confirmed {
            totals.confirmed = confirmed;
        }
        if let Some(deaths) = self.deaths {
            totals.deaths = deaths;
        }
        if let Some(recovered) = self.recovered {
            totals.recovered = recovered;
        }
        if let Some(active) = self.active {
            totals.active = active;
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LiveError {
    #[error("no ingested date to reconcile against")]
    NoData,
}

/// Outcome of applying one live update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub date: NaiveDate,
    /// Country entries that matched an existing node
    pub applied: usize,
    /// Country entries with no node on that date
    pub skipped: usize,
}

/// Patch `tree` (the tree for `date`) in place with `update`
pub fn reconcile(tree: &mut DayTree, date: NaiveDate, update: &LiveUpdate) -> ReconcileReport {
    let root = tree.root();
    tree.node_mut(root).totals = update.global;

    let mut applied = 0;
    let mut skipped = 0;
    for entry in &update.per_country {
        let name = locale::normalize(&entry.name);
        match tree.node(root).child(name) {
            Some(id) => {
                entry.overwrite(&mut tree.node_mut(id).totals);
                applied += 1;
            }
            None => {
                debug!(country = name, "Live entry has no matching country, skipping");
                skipped += 1;
            }
        }
    }

    info!(%date, applied, skipped, "Applied live update");
    ReconcileReport {
        date,
        applied,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NormalizedRow;
    use crate::store::LocationPath;

    fn seeded_tree() -> DayTree {
        let mut tree = DayTree::new();
        tree.insert(&NormalizedRow {
            country: "US".to_string(),
            subregion: Some("Ohio".to_string()),
            locality: None,
            confirmed: 10,
            deaths: 1,
            recovered: 2,
            active: Some(7),
        });
        tree.insert(&NormalizedRow {
            country: "Italy".to_string(),
            subregion: None,
            locality: None,
            confirmed: 5,
            deaths: 0,
            recovered: 0,
            active: Some(5),
        });
        tree.recalculate();
        tree
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 4, 1).unwrap()
    }

    #[test]
    fn test_global_totals_overwritten_without_reaggregation() {
        let mut tree = seeded_tree();
        let update = LiveUpdate {
            global: Metrics::new(1000, 50, 100, 850),
            per_country: Vec::new(),
        };

        reconcile(&mut tree, date(), &update);

        assert_eq!(tree.node(tree.root()).totals(), Metrics::new(1000, 50, 100, 850));
        let us = tree.resolve(&LocationPath::country("US")).unwrap();
        assert_eq!(tree.node(us).totals(), Metrics::new(10, 1, 2, 7));
    }

    #[test]
    fn test_only_present_fields_are_overwritten() {
        let mut tree = seeded_tree();
        let update = LiveUpdate {
            global: Metrics::ZERO,
            per_country: vec![LiveCountry {
                confirmed: Some(40),
                active: Some(30),
                ..LiveCountry::new("USA")
            }],
        };

        let report = reconcile(&mut tree, date(), &update);

        assert_eq!(report.applied, 1);
        let us = tree.resolve(&LocationPath::country("US")).unwrap();
        assert_eq!(tree.node(us).totals(), Metrics::new(40, 1, 2, 30));
        assert_eq!(tree.node(us).own_data(), None);
        let ohio = tree.resolve(&LocationPath::subregion("US", "Ohio")).unwrap();
        assert_eq!(tree.node(ohio).totals(), Metrics::new(10, 1, 2, 7));
    }

    #[test]
    fn test_unknown_country_is_skipped_not_created() {
        let mut tree = seeded_tree();
        let nodes_before = tree.len();
        let update = LiveUpdate {
            global: Metrics::ZERO,
            per_country: vec![LiveCountry {
                confirmed: Some(3),
                ..LiveCountry::new("Atlantis")
            }],
        };

        let report = reconcile(&mut tree, date(), &update);

        assert_eq!(report.skipped, 1);
        assert_eq!(report.applied, 0);
        assert_eq!(tree.len(), nodes_before);
        assert!(tree.resolve(&LocationPath::country("Atlantis")).is_none());
    }
}
