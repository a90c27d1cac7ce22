//! Group (ren) record: stones, liberties and adjacent-area bookkeeping.

use std::collections::BTreeSet;

use crate::color::{Color, EMPTY};

/// A maximal 4-connected set of same-color stones.
///
/// Every stone of the group maps to a single leader index through the
/// board's `ren_ids`; the record itself lives at the leader slot. Sets are
/// ordered so that "the unique liberty" and set comparisons are
/// deterministic.
#[derive(Debug, Clone)]
pub(crate) struct Ren {
    pub color: Color,
    /// Stone positions (padded board indices).
    pub positions: BTreeSet<i32>,
    /// Liberty positions: empty 4-neighbors of the stones.
    pub spaces: BTreeSet<i32>,
    /// Adjacent empty-region ids, filled by the territory pass.
    pub areas: BTreeSet<i32>,
    /// Group is caught in a ladder.
    pub shicho: bool,
    /// Life confirmed: connected to two or more settled regions.
    pub fixed: bool,
}

impl Ren {
    pub fn new() -> Self {
        Self {
            color: EMPTY,
            positions: BTreeSet::new(),
            spaces: BTreeSet::new(),
            areas: BTreeSet::new(),
            shicho: false,
            fixed: false,
        }
    }

    /// Return the record to its empty state.
    pub fn clear(&mut self) {
        self.color = EMPTY;
        self.positions.clear();
        self.spaces.clear();
        self.areas.clear();
        self.shicho = false;
        self.fixed = false;
    }
}
