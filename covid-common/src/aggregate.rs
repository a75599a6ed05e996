//! Bottom-up totals for one day tree
//!
//! A node's totals are the sum of its children's totals plus its own
//! reported counts when it has them. Some snapshots report a country figure
//! that already includes the listed provinces and others do not; both are
//! added, so the first kind over-counts. That is accepted.

use crate::metrics::Metrics;
use crate::store::DayTree;

/// Recompute every node's totals in `tree`.
///
/// Children always sit after their parent in the arena, so a reverse sweep
/// visits every child before its parent. Running it twice gives the same
/// result.
pub fn recalculate(tree: &mut DayTree) {
    let nodes = tree.nodes_mut();
    for index in (0..nodes.len()).rev() {
        let from_children: Metrics = nodes[index]
            .children
            .values()
            .map(|child| {
                debug_assert!(child.index() > index);
                nodes[child.index()].totals
            })
            .sum();

        let node = &mut nodes[index];
        node.totals = from_children + node.own_data.unwrap_or_default();
    }
}
