//! Case counters carried by every node

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Confirmed / deaths / recovered / active counts for one entity on one day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metrics {
    pub confirmed: i64,
    pub deaths: i64,
    pub recovered: i64,
    pub active: i64,
}

impl Metrics {
    pub const ZERO: Metrics = Metrics {
        confirmed: 0,
        deaths: 0,
        recovered: 0,
        active: 0,
    };

    pub fn new(confirmed: i64, deaths: i64, recovered: i64, active: i64) -> Self {
        Self {
            confirmed,
            deaths,
            recovered,
            active,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Saturates at the `i64` bounds; reported counts are never trusted to be
/// small.
impl Add for Metrics {
    type Output = Metrics;

    fn add(self, rhs: Metrics) -> Metrics {
        Metrics {
            confirmed: self.confirmed.saturating_add(rhs.confirmed),
            deaths: self.deaths.saturating_add(rhs.deaths),
            recovered: self.recovered.saturating_add(rhs.recovered),
            active: self.active.saturating_add(rhs.active),
        }
    }
}

impl AddAssign for Metrics {
    fn add_assign(&mut self, rhs: Metrics) {
        *self = *self + rhs;
    }
}

impl Sum for Metrics {
    fn sum<I: Iterator<Item = Metrics>>(iter: I) -> Metrics {
        iter.fold(Metrics::ZERO, Add::add)
    }
}
