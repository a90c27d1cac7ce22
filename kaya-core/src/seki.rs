//! Seki and nakade analysis.
//!
//! `is_seki` answers "would playing here throw stones into a mutual-life
//! stand-off": the legality filter uses it so the evaluator never offers
//! self-destructing seki moves as candidates. The analysis is bounded: big
//! surrounding spaces and big groups are never seki-filtered.

use std::collections::BTreeSet;

use crate::board::Board;
use crate::color::{opposite, Color};

impl Board {
    /// True if a `color` stone at `index` would create a seki shape the
    /// mover must not disturb.
    pub(crate) fn is_seki(&self, index: i32, color: Color) -> bool {
        let op_color = opposite(color);

        // A capturable attacker next door means the move fights, not seki.
        for a in self.arounds() {
            let ren_id = self.ren_ids[(index + a) as usize];
            if ren_id != -1
                && self.rens[ren_id as usize].color == op_color
                && self.rens[ren_id as usize].spaces.len() == 1
            {
                return false;
            }
        }

        // Own groups the new stone would join.
        let mut ren_ids: BTreeSet<i32> = BTreeSet::new();
        for a in self.arounds() {
            let ren_id = self.ren_ids[(index + a) as usize];
            if ren_id != -1 && self.rens[ren_id as usize].color == color {
                ren_ids.insert(ren_id);
            }
        }
        if ren_ids.is_empty() {
            return false;
        }

        // Liberties of the joined group. Nine or more puts the shape out of
        // seki range.
        let mut spaces: BTreeSet<i32> = BTreeSet::new();
        for a in self.arounds() {
            if self.ren_ids[(index + a) as usize] == -1 {
                spaces.insert(index + a);
            }
        }
        for &id in &ren_ids {
            spaces.extend(self.rens[id as usize].spaces.iter().copied());
            if spaces.len() >= 9 {
                return false;
            }
        }

        spaces.remove(&index);

        match spaces.len() {
            0 => false,
            1 => {
                let space_index = *spaces.iter().next().unwrap_or(&-1);
                self.is_seki_ren(index, color, &ren_ids, space_index)
            }
            _ => self.is_seki_area(index, color, &ren_ids, &spaces),
        }
    }

    /// Single-liberty case: the joined group and its opposing neighbors
    /// share a last pair of liberties.
    fn is_seki_ren(
        &self,
        index: i32,
        color: Color,
        ren_ids: &BTreeSet<i32>,
        space_index: i32,
    ) -> bool {
        let op_color = opposite(color);
        let mut op_ren_ids: BTreeSet<i32> = BTreeSet::new();

        for a in self.arounds() {
            for target in [index + a, space_index + a] {
                let ren_id = self.ren_ids[target as usize];

                // Outside breathing room disqualifies the shape.
                if target != index && target != space_index && ren_id == -1 {
                    return false;
                }
                if ren_id != -1 && self.rens[ren_id as usize].color == op_color {
                    op_ren_ids.insert(ren_id);
                }
            }
        }

        if op_ren_ids.is_empty() {
            return false;
        }

        // Every facing group must be down to exactly the shared pair.
        for &id in &op_ren_ids {
            if self.rens[id as usize].spaces.len() != 2 {
                return false;
            }
        }

        // Big own groups survive as seki outright.
        let mut positions: BTreeSet<i32> = BTreeSet::new();
        positions.insert(index);
        for &id in ren_ids {
            positions.extend(self.rens[id as usize].positions.iter().copied());
            if positions.len() >= 7 {
                return true;
            }
        }

        if positions.len() >= 4 && !self.is_nakade(&positions) {
            return true;
        }

        // A facing group breathing anywhere else keeps the stand-off.
        let mut op_spaces: BTreeSet<i32> = BTreeSet::new();
        for &id in &op_ren_ids {
            op_spaces.extend(self.rens[id as usize].spaces.iter().copied());
        }
        op_spaces.remove(&index);
        op_spaces.remove(&space_index);

        !op_spaces.is_empty()
    }

    /// Multi-liberty case: the whole enclosed region is examined for a
    /// nakade refutation.
    fn is_seki_area(
        &self,
        index: i32,
        color: Color,
        ren_ids: &BTreeSet<i32>,
        space_indices: &BTreeSet<i32>,
    ) -> bool {
        let op_color = opposite(color);
        let mut positions: BTreeSet<i32> = BTreeSet::new();
        let mut found_ren_ids: BTreeSet<i32> = BTreeSet::new();
        let mut stack: Vec<i32> = Vec::new();

        positions.insert(index);
        for &space_index in space_indices {
            stack.push(space_index);
            positions.insert(space_index);
        }

        while let Some(pos) = stack.pop() {
            for a in self.arounds() {
                let target = pos + a;
                let ren_id = self.ren_ids[target as usize];

                if (ren_id == -1 || self.rens[ren_id as usize].color == op_color)
                    && !positions.contains(&target)
                {
                    stack.push(target);
                    positions.insert(target);
                }
                if ren_id != -1 && self.rens[ren_id as usize].color == color {
                    found_ren_ids.insert(ren_id);
                }
            }

            if positions.len() >= 9 {
                return false;
            }
        }

        // The region must touch exactly the groups the move joins.
        if &found_ren_ids != ren_ids {
            return false;
        }

        // Before the move: if the shape already sits in one enclosed area
        // and some reduction of it is nakade, the move is an ordinary kill,
        // not seki.
        if self.is_single_area(&positions, color, -1) {
            for &pos in &positions {
                if self.ren_ids[pos as usize] != -1 {
                    continue;
                }
                let mut reduced = positions.clone();
                reduced.remove(&pos);
                if self.is_nakade(&reduced) {
                    return false;
                }
            }
        }

        // After the move the remaining space must still be one area...
        let mut after: BTreeSet<i32> = positions.clone();
        after.remove(&index);
        if !self.is_single_area(&after, color, index) {
            return false;
        }

        // ...and some reduction of it must be nakade for the stand-off to
        // bind.
        for &pos in &after {
            if self.ren_ids[pos as usize] != -1 {
                continue;
            }
            let mut reduced = after.clone();
            reduced.remove(&pos);
            if self.is_nakade(&reduced) {
                return true;
            }
        }

        false
    }

    /// True if `positions` form a nakade: a shape with a vital point whose
    /// occupation collapses the eye space.
    pub(crate) fn is_nakade(&self, positions: &BTreeSet<i32>) -> bool {
        const LEN: i32 = 5;
        const AROUNDS: [i32; 4] = [1, -1, LEN, -LEN];
        const HORIZONTALS: [i32; 4] = [1, -1, 1, -1];
        const VERTICALS: [i32; 4] = [LEN, LEN, -LEN, -LEN];

        if positions.is_empty() || positions.len() >= 7 {
            return false;
        }

        let mut start_x = self.width - 2;
        let mut start_y = self.height - 2;
        let mut end_x = 0;
        let mut end_y = 0;

        for &p in positions {
            let x = self.pos_x(p);
            let y = self.pos_y(p);
            start_x = start_x.min(x);
            start_y = start_y.min(y);
            end_x = end_x.max(x);
            end_y = end_y.max(y);
        }

        // Shapes wider than the vital-point table never collapse.
        if end_x - start_x > 3 || end_y - start_y > 3 {
            return false;
        }

        // Scratch canvas with a one-cell margin; board corners are marked
        // because a diagonal through a corner counts as connected.
        let mut cells = [0i32; (LEN * LEN) as usize];
        let mut corner = [0i32; (LEN * LEN) as usize];

        for &p in positions {
            let src_x = self.pos_x(p);
            let src_y = self.pos_y(p);
            let dst = (src_y - start_y + 1) * LEN + (src_x - start_x + 1);
            cells[dst as usize] = 1;

            if (src_x == 0 || src_x == self.width - 3) && (src_y == 0 || src_y == self.height - 3)
            {
                corner[dst as usize] = 1;
            }
        }

        for y in 1..LEN - 1 {
            for x in 1..LEN - 1 {
                let p = y * LEN + x;
                if cells[p as usize] != 1 {
                    continue;
                }

                let mut direct = 0;
                for a in AROUNDS {
                    direct += cells[(p + a) as usize];
                }

                let mut skew = 0;
                let mut corner_links = 0;
                for i in 0..4 {
                    let v = VERTICALS[i];
                    let h = HORIZONTALS[i];
                    if cells[(p + v + h) as usize] != 1 {
                        continue;
                    }
                    if corner_links == 0
                        && corner[(p + v) as usize] == 1
                        && cells[(p + v) as usize] == 1
                    {
                        corner_links = 1;
                    } else if corner_links == 0
                        && corner[(p + h) as usize] == 1
                        && cells[(p + h) as usize] == 1
                    {
                        corner_links = 1;
                    } else if skew == 0
                        && cells[(p + v) as usize] == 1
                        && cells[(p + h) as usize] == 1
                    {
                        skew = 1;
                    }
                }

                // A cell adjacent to (nearly) every other stone is the
                // vital point.
                if direct + skew + corner_links >= positions.len() as i32 - 1 {
                    return true;
                }
            }
        }

        false
    }

    /// True if every position lies in one connected area enclosed by
    /// `color`, flooding through empty and opponent cells and skipping
    /// `excluded_index`.
    fn is_single_area(&self, positions: &BTreeSet<i32>, color: Color, excluded_index: i32) -> bool {
        let op_color = opposite(color);
        let Some(&seed) = positions.iter().next() else {
            return true;
        };

        let mut areas: BTreeSet<i32> = BTreeSet::new();
        let mut stack = vec![seed];
        areas.insert(seed);

        while let Some(pos) = stack.pop() {
            for a in self.arounds() {
                let target = pos + a;
                let ren_id = self.ren_ids[target as usize];

                if (ren_id == -1 || self.rens[ren_id as usize].color == op_color)
                    && target != excluded_index
                    && !areas.contains(&target)
                {
                    stack.push(target);
                    areas.insert(target);
                }
            }
        }

        positions.iter().all(|p| areas.contains(p))
    }
}
