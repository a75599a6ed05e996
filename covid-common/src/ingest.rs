//! Ingestion of one date's raw report rows
//!
//! Rows are adapted, placed into a fresh day tree, aggregated and published
//! in one go. A structurally unreadable row fails the whole date and leaves
//! whatever was previously published for it in place.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::schema::{self, RawRow, SchemaError};
use crate::store::{DayTree, Store};
use crate::{Error, Result};

/// Counters for one ingested date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub date: NaiveDate,
    /// Rows placed in the tree
    pub rows: usize,
    /// Rows dropped for a blank country
    pub skipped: usize,
    /// Nodes in the published tree, root included
    pub nodes: usize,
}

impl Store {
    /// Adapt, place, aggregate and publish `rows` as the data for `date`.
    ///
    /// An empty report publishes nothing.
    pub fn ingest_date(&self, date: NaiveDate, rows: &[RawRow]) -> Result<IngestStats> {
        let mut tree = DayTree::new();
        let mut placed = 0;
        let mut skipped = 0;

        for (line, raw) in rows.iter().enumerate() {
            match schema::adapt(raw) {
                Ok(row) => {
                    tree.insert(&row);
                    placed += 1;
                }
                Err(err @ SchemaError::BlankCountry(_)) => {
                    warn!(%date, row = line + 1, error = %err, "Skipping report row");
                    skipped += 1;
                }
                Err(err) => {
                    return Err(Error::Ingestion {
                        date,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let stats = IngestStats {
            date,
            rows: placed,
            skipped,
            nodes: tree.len(),
        };
        if placed == 0 {
            warn!(%date, skipped, "Report has no usable rows, nothing published");
            return Ok(stats);
        }

        self.publish(date, tree);
        info!(%date, rows = placed, skipped, nodes = stats.nodes, "Ingested daily report");
        Ok(stats)
    }
}
