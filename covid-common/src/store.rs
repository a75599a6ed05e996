//! Date-indexed hierarchical store
//!
//! Every ingested date owns a [`DayTree`]: an arena of [`Node`]s addressed by
//! [`NodeId`] and rooted at the world node (world → country → subregion →
//! locality). A tree is filled and aggregated before anyone can see it, then
//! published into the [`Store`] snapshot table with one atomic swap. Readers
//! load the current [`Snapshot`] without locking and never observe a partly
//! built or partly aggregated day.

use arc_swap::ArcSwap;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::aggregate;
use crate::live::{self, LiveError, LiveUpdate, ReconcileReport};
use crate::metrics::Metrics;
use crate::schema::NormalizedRow;

/// Location path below the world root: `[]`, `[country]`,
/// `[country, subregion]` or `[country, subregion, locality]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LocationPath(Vec<String>);

impl LocationPath {
    pub fn world() -> Self {
        Self(Vec::new())
    }

    pub fn country(country: impl Into<String>) -> Self {
        Self(vec![country.into()])
    }

    pub fn subregion(country: impl Into<String>, subregion: impl Into<String>) -> Self {
        Self(vec![country.into(), subregion.into()])
    }

    pub fn locality(
        country: impl Into<String>,
        subregion: impl Into<String>,
        locality: impl Into<String>,
    ) -> Self {
        Self(vec![country.into(), subregion.into(), locality.into()])
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_world(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LocationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_world() {
            f.write_str("world")
        } else {
            f.write_str(&self.0.join(" / "))
        }
    }
}

/// Handle of a node inside one [`DayTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// One entity at one hierarchy level for one date
#[derive(Debug, Clone, Default)]
pub struct Node {
    /// Counts reported directly for this entity, if any
    pub(crate) own_data: Option<Metrics>,
    /// Rolled-up counts; zero until the tree is aggregated
    pub(crate) totals: Metrics,
    pub(crate) children: HashMap<String, NodeId>,
}

impl Node {
    pub fn own_data(&self) -> Option<Metrics> {
        self.own_data
    }

    pub fn totals(&self) -> Metrics {
        self.totals
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.children.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

/// Arena holding one date's tree. A child always has a larger id than its
/// parent.
#[derive(Debug, Clone)]
pub struct DayTree {
    nodes: Vec<Node>,
}

impl Default for DayTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DayTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    /// Number of nodes including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    fn child_or_insert(&mut self, parent: NodeId, name: &str) -> NodeId {
        if let Some(existing) = self.node(parent).child(name) {
            return existing;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::default());
        self.node_mut(parent).children.insert(name.to_string(), id);
        id
    }

    /// Place a row, creating missing intermediate nodes without own data.
    /// The target's own data is replaced; its children are left alone.
    pub fn insert(&mut self, row: &NormalizedRow) -> NodeId {
        let path = row.path();
        let target = path
            .segments()
            .iter()
            .fold(self.root(), |parent, segment| {
                self.child_or_insert(parent, segment)
            });
        self.node_mut(target).own_data = Some(row.metrics());
        target
    }

    /// Walk a path, checking each segment exists
    pub fn resolve(&self, path: &LocationPath) -> Option<NodeId> {
        path.segments()
            .iter()
            .try_fold(self.root(), |id, segment| self.node(id).child(segment))
    }

    /// Recompute totals bottom-up
    pub fn recalculate(&mut self) {
        aggregate::recalculate(self);
    }
}

/// Immutable view of the store at one instant
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    days: BTreeMap<NaiveDate, Arc<DayTree>>,
    last_date: Option<NaiveDate>,
}

impl Snapshot {
    /// Latest calendar date ever ingested
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.last_date
    }

    pub fn day(&self, date: NaiveDate) -> Option<&Arc<DayTree>> {
        self.days.get(&date)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Resolve `path` on `date` (the latest date when `None`)
    pub fn lookup(
        &self,
        path: &LocationPath,
        date: Option<NaiveDate>,
    ) -> Result<NodeRef, LookupError> {
        let date = date.or(self.last_date).ok_or(LookupError::Empty)?;
        let tree = self.days.get(&date).ok_or(LookupError::DateNotLoaded(date))?;
        let id = tree.resolve(path).ok_or_else(|| LookupError::PathNotFound {
            path: path.clone(),
            date,
        })?;
        Ok(NodeRef {
            date,
            tree: Arc::clone(tree),
            id,
        })
    }
}

/// Lookup failures. Every variant means "not found" to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no data has been ingested yet")]
    Empty,

    #[error("no data for {0}")]
    DateNotLoaded(NaiveDate),

    #[error("{path} not found on {date}")]
    PathNotFound { path: LocationPath, date: NaiveDate },
}

/// Handle to a node in a published day tree
#[derive(Debug, Clone)]
pub struct NodeRef {
    date: NaiveDate,
    tree: Arc<DayTree>,
    id: NodeId,
}

impl NodeRef {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    fn node(&self) -> &Node {
        self.tree.node(self.id)
    }

    pub fn totals(&self) -> Metrics {
        self.node().totals
    }

    pub fn own_data(&self) -> Option<Metrics> {
        self.node().own_data
    }

    pub fn child(&self, name: &str) -> Option<NodeRef> {
        self.node().child(name).map(|id| NodeRef {
            date: self.date,
            tree: Arc::clone(&self.tree),
            id,
        })
    }

    /// Children in no particular order
    pub fn children(&self) -> impl Iterator<Item = (&str, NodeRef)> + '_ {
        self.node().children().map(move |(name, id)| {
            (
                name,
                NodeRef {
                    date: self.date,
                    tree: Arc::clone(&self.tree),
                    id,
                },
            )
        })
    }

    pub fn child_count(&self) -> usize {
        self.node().children.len()
    }
}

/// Per-day lookups of one path over a date range.
///
/// Bound to the snapshot current when it was created and can be iterated any
/// number of times. Days without data for the path are skipped.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    snapshot: Arc<Snapshot>,
    path: LocationPath,
    start: NaiveDate,
    end: Option<NaiveDate>,
}

impl TimeSeries {
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Inclusive end; `None` only when nothing has been ingested
    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, NodeRef)> + '_ {
        let days = match self.end {
            Some(end) if end >= self.start => Some(self.snapshot.days.range(self.start..=end)),
            _ => None,
        };
        days.into_iter()
            .flatten()
            .filter_map(move |(date, tree)| {
                tree.resolve(&self.path).map(|id| {
                    (
                        *date,
                        NodeRef {
                            date: *date,
                            tree: Arc::clone(tree),
                            id,
                        },
                    )
                })
            })
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.iter().map(|(date, _)| date).collect()
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = (NaiveDate, NodeRef);
    type IntoIter = Box<dyn Iterator<Item = (NaiveDate, NodeRef)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Date-indexed store of aggregated day trees
pub struct Store {
    state: ArcSwap<Snapshot>,
    /// Serializes publishers; readers never take it
    writer: Mutex<()>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("Store")
            .field("dates", &snapshot.len())
            .field("last_date", &snapshot.last_date)
            .finish()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(Snapshot::default()),
            writer: Mutex::new(()),
        }
    }

    /// Current snapshot; stays valid while later publishes happen
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.state.load_full()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.state.load().last_date
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.state.load().dates().collect()
    }

    /// Aggregate `tree` and make it the data for `date`, replacing any
    /// previous tree for that date. `last_date` only ever moves forward.
    pub fn publish(&self, date: NaiveDate, mut tree: DayTree) {
        tree.recalculate();
        let tree = Arc::new(tree);

        let _guard = self.writer.lock();
        let mut next = Snapshot::clone(&self.state.load());
        next.days.insert(date, tree);
        next.last_date = next.last_date.max(Some(date));
        self.state.store(Arc::new(next));

        debug!(%date, "Published day tree");
    }

    /// Build, aggregate and publish one date from already-normalized rows.
    /// Returns the number of rows placed.
    pub fn ingest_normalized<I>(&self, date: NaiveDate, rows: I) -> usize
    where
        I: IntoIterator<Item = NormalizedRow>,
    {
        let mut tree = DayTree::new();
        let mut placed = 0;
        for row in rows {
            tree.insert(&row);
            placed += 1;
        }
        self.publish(date, tree);
        placed
    }

    /// Point lookup; `date` defaults to the latest date
    pub fn lookup(
        &self,
        path: &LocationPath,
        date: Option<NaiveDate>,
    ) -> Result<NodeRef, LookupError> {
        self.state.load().lookup(path, date)
    }

    /// Range lookup over `[start, end]`; `end` defaults to the latest date
    pub fn time_series(
        &self,
        path: &LocationPath,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> TimeSeries {
        let snapshot = self.snapshot();
        let end = end.or(snapshot.last_date);
        TimeSeries {
            snapshot,
            path: path.clone(),
            start,
            end,
        }
    }

    /// Overwrite the newest date's top-level totals from a live update.
    ///
    /// The newest tree is copied, patched and swapped in; no re-aggregation
    /// happens, so the world and country totals may stop matching the sum of
    /// their children for that date.
    pub fn apply_live_update(&self, update: &LiveUpdate) -> Result<ReconcileReport, LiveError> {
        let _guard = self.writer.lock();
        let current = self.state.load_full();
        let date = current.last_date.ok_or(LiveError::NoData)?;
        let tree = current.days.get(&date).ok_or(LiveError::NoData)?;

        let mut patched = DayTree::clone(tree);
        let report = live::reconcile(&mut patched, date, update);

        let mut next = Snapshot::clone(&current);
        next.days.insert(date, Arc::new(patched));
        self.state.store(Arc::new(next));

        Ok(report)
    }
}
