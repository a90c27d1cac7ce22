//! The board: stone placement, group merging/capture, ko, legality, and the
//! compact snapshot format.
//!
//! Cells live in a padded `(w + 2) * (h + 2)` index space whose border maps
//! to a single sentinel group of color `EDGE` at slot 0, so neighbor loops
//! need no bounds checks. `ren_ids[p] == -1` iff the cell is empty;
//! otherwise it names the leader slot of the group covering `p`.

use std::fmt;

use crate::color::{opposite, Color, BLACK, EDGE, EMPTY, WHITE};
use crate::history::History;
use crate::pattern::Pattern;
use crate::ren::Ren;

#[derive(Clone)]
pub struct Board {
    /// Padded width: board width + 2.
    pub(crate) width: i32,
    /// Padded height: board height + 2.
    pub(crate) height: i32,
    /// Padded cell count.
    pub(crate) length: i32,
    pub(crate) ren_ids: Vec<i32>,
    pub(crate) rens: Vec<Ren>,
    /// Per-color empty-region ids, rebuilt lazily by the territory pass.
    pub(crate) area_ids: [Vec<i32>; 2],
    /// Per-region settled flags, indexed by region seed.
    pub(crate) area_flags: [Vec<bool>; 2],
    pub(crate) ko_index: i32,
    pub(crate) ko_color: Color,
    pub(crate) histories: [History; 2],
    pattern: Pattern,
    pub(crate) area_updated: bool,
    pub(crate) shicho_updated: bool,
}

impl Board {
    pub fn new(width: i32, height: i32) -> Self {
        let pw = width + 2;
        let ph = height + 2;
        let length = pw * ph;

        let mut board = Self {
            width: pw,
            height: ph,
            length,
            ren_ids: vec![-1; length as usize],
            rens: (0..length).map(|_| Ren::new()).collect(),
            area_ids: [vec![-1; length as usize], vec![-1; length as usize]],
            area_flags: [vec![false; length as usize], vec![false; length as usize]],
            ko_index: -1,
            ko_color: EMPTY,
            histories: [History::new(), History::new()],
            pattern: Pattern::new(width, height),
            area_updated: false,
            shicho_updated: false,
        };

        // Sentinel border group at slot 0.
        board.rens[0].color = EDGE;
        board.rens[0].spaces.insert(-1);

        for i in 0..pw {
            board.ren_ids[i as usize] = 0;
            board.ren_ids[(pw * (ph - 1) + i) as usize] = 0;
        }
        for i in 1..ph - 1 {
            board.ren_ids[(pw * i) as usize] = 0;
            board.ren_ids[(pw * i + pw - 1) as usize] = 0;
        }

        board
    }

    /// Reset the interior to an empty board. Edge bookkeeping survives.
    pub fn clear(&mut self) {
        for y in 0..self.height - 2 {
            for x in 0..self.width - 2 {
                let index = self.index(x, y) as usize;
                self.ren_ids[index] = -1;
                self.rens[index].clear();
            }
        }

        self.area_updated = false;
        self.shicho_updated = false;

        self.ko_index = -1;
        self.ko_color = EMPTY;

        self.histories[0].clear();
        self.histories[1].clear();

        self.pattern.clear();
    }

    pub fn width(&self) -> i32 {
        self.width - 2
    }

    pub fn height(&self) -> i32 {
        self.height - 2
    }

    /// Play a stone. A pass (negative coordinates) clears ko and captures
    /// nothing. Returns the number of captured stones, or -1 if the move is
    /// not playable; rejected moves leave the board untouched.
    pub fn play(&mut self, x: i32, y: i32, color: Color) -> i32 {
        if !self.is_valid_position(x, y) {
            self.ko_index = -1;
            self.ko_color = EMPTY;
            return 0;
        }

        let index = self.index(x, y);
        let op_color = opposite(color);

        if !self.is_enabled_index(index, color, false) {
            return -1;
        }

        self.put(index, color);

        if color == BLACK {
            self.histories[0].add(index);
        } else if color == WHITE {
            self.histories[1].add(index);
        }

        // Merge own neighbors, capture breathless opponents.
        let arounds = self.arounds();
        let mut remove_size: i32 = 0;

        for a in arounds {
            let ren_id = self.ren_ids[(index + a) as usize];
            if ren_id == -1 {
                continue;
            }
            let ren_color = self.rens[ren_id as usize].color;
            if ren_color == color && ren_id != self.ren_ids[index as usize] {
                self.merge_ren(index, index + a);
            } else if ren_color == op_color && self.rens[ren_id as usize].spaces.is_empty() {
                remove_size += self.rens[ren_id as usize].positions.len() as i32;
                self.remove_ren(index + a);
                self.ko_index = index + a;
            }
        }

        // Ko only arises from a single-stone capture by a lone stone in
        // atari; anything else clears it.
        let own_id = self.ren_ids[index as usize] as usize;
        let position_size = self.rens[own_id].positions.len();
        let space_size = self.rens[own_id].spaces.len();

        if remove_size != 1 || position_size > 1 || space_size > 1 {
            self.ko_index = -1;
            self.ko_color = EMPTY;
        } else {
            self.ko_color = op_color;
        }

        self.area_updated = false;
        self.shicho_updated = false;

        remove_size
    }

    /// The ko point barred for `color`, or `(-1, -1)`.
    pub fn get_ko(&self, color: Color) -> (i32, i32) {
        if self.ko_index != -1 && color == self.ko_color {
            (self.pos_x(self.ko_index), self.pos_y(self.ko_index))
        } else {
            (-1, -1)
        }
    }

    /// Most recent moves of one side, oldest first.
    pub fn get_histories(&self, color: Color) -> Vec<(i32, i32)> {
        let slot = if color == BLACK { 0 } else { 1 };
        let mut moves = Vec::new();

        for index in self.histories[slot].get() {
            let x = self.pos_x(index);
            let y = self.pos_y(index);
            if self.is_valid_position(x, y) {
                moves.push((x, y));
            }
        }

        moves
    }

    pub fn get_color(&self, x: i32, y: i32) -> Color {
        self.color_at(self.index(x, y))
    }

    /// Whole-board colors relative to `color`: own stones read +1.
    pub fn get_colors(&self, color: Color) -> Vec<i8> {
        let mut colors = Vec::with_capacity((self.width() * self.height()) as usize);
        for y in 0..self.height() {
            for x in 0..self.width() {
                colors.push(self.get_color(x, y) * color);
            }
        }
        colors
    }

    /// Stone count of the group covering `(x, y)`; 0 for empty cells.
    pub fn get_ren_size(&self, x: i32, y: i32) -> i32 {
        match self.ren_ids[self.index(x, y) as usize] {
            -1 => 0,
            id => self.rens[id as usize].positions.len() as i32,
        }
    }

    /// Liberty count of the group covering `(x, y)`; 0 for empty cells.
    pub fn get_ren_space(&self, x: i32, y: i32) -> i32 {
        match self.ren_ids[self.index(x, y) as usize] {
            -1 => 0,
            id => self.rens[id as usize].spaces.len() as i32,
        }
    }

    /// Whether the group covering `(x, y)` is caught in a ladder.
    pub fn is_shicho(&mut self, x: i32, y: i32) -> bool {
        self.update_shicho();
        match self.ren_ids[self.index(x, y) as usize] {
            -1 => false,
            id => self.rens[id as usize].shicho,
        }
    }

    /// Whether `color` may legally play at `(x, y)`.
    pub fn is_enabled(&self, x: i32, y: i32, color: Color, check_seki: bool) -> bool {
        self.is_enabled_index(self.index(x, y), color, check_seki)
    }

    /// Whole-board legality mask for `color`, row-major.
    pub fn get_enableds(&self, color: Color, check_seki: bool) -> Vec<bool> {
        let mut enableds = Vec::with_capacity((self.width() * self.height()) as usize);
        for y in 0..self.height() {
            for x in 0..self.width() {
                enableds.push(self.is_enabled_index(self.index(x, y), color, check_seki));
            }
        }
        enableds
    }

    /// The packed stone-arrangement words.
    pub fn get_patterns(&self) -> Vec<i32> {
        self.pattern.values().to_vec()
    }

    /// Compact snapshot: packed pattern words, one ko word, and two history
    /// words holding three 10-bit `index + 1` fields each.
    pub fn get_state(&self) -> Vec<i32> {
        let mut state = self.pattern.values().to_vec();

        state.push((self.ko_index + 1) << 2 | (self.ko_color as i32 + 1));

        for history in &self.histories {
            let moves = history.get();
            state.push((moves[0] + 1) << 20 | (moves[1] + 1) << 10 | (moves[2] + 1));
        }

        state
    }

    /// Restore a snapshot produced by [`Board::get_state`] on a board of the
    /// same dimensions. Stones are replayed in row-major order; ko and
    /// history are restored verbatim. Group leader identity is not
    /// preserved.
    pub fn load_state(&mut self, state: &[i32]) {
        self.clear();

        for y in 0..self.height - 2 {
            for x in 0..self.width - 2 {
                let pos = y * (self.width - 2) + x;
                let value = state[(pos / 16) as usize] >> ((pos % 16) * 2) & 3;
                if value == 1 {
                    self.play(x, y, BLACK);
                } else if value == 2 {
                    self.play(x, y, WHITE);
                }
            }
        }

        let ko_info = state[state.len() - 3];
        self.ko_index = (ko_info >> 2 & 0x3FFFF) - 1;
        self.ko_color = ((ko_info & 3) - 1) as Color;

        for (slot, word) in [state[state.len() - 2], state[state.len() - 1]]
            .into_iter()
            .enumerate()
        {
            self.histories[slot].clear();
            for i in 0..3 {
                let mv = (word >> (20 - i * 10) & 0x3FF) - 1;
                if mv != -1 {
                    self.histories[slot].add(mv);
                }
            }
        }

        self.area_updated = false;
        self.shicho_updated = false;
    }

    /// Copy another board of the same dimensions into this one.
    pub fn copy_from(&mut self, other: &Board) {
        self.ren_ids.copy_from_slice(&other.ren_ids);
        self.rens.clone_from(&other.rens);
        self.ko_index = other.ko_index;
        self.ko_color = other.ko_color;
        self.pattern = other.pattern.clone();
        self.histories = other.histories.clone();
        self.area_updated = false;
        self.shicho_updated = false;
    }

    // ---- internal helpers ----------------------------------------------

    /// Place a stone and wire up liberties. Does not merge or capture.
    fn put(&mut self, index: i32, color: Color) {
        self.pattern.put(self.pos_x(index), self.pos_y(index), color);

        self.ren_ids[index as usize] = index;
        self.rens[index as usize].color = color;
        self.rens[index as usize].positions.insert(index);

        let arounds = self.arounds();
        for a in arounds {
            let ren_id = self.ren_ids[(index + a) as usize];
            if ren_id == -1 {
                self.rens[index as usize].spaces.insert(index + a);
            } else {
                self.rens[ren_id as usize].spaces.remove(&index);
            }
        }
    }

    /// Fold the group at `src_index` into the one at `dst_index`.
    fn merge_ren(&mut self, src_index: i32, dst_index: i32) {
        let src_id = self.ren_ids[src_index as usize] as usize;
        let dst_id = self.ren_ids[dst_index as usize] as usize;

        let positions = std::mem::take(&mut self.rens[src_id].positions);
        let spaces = std::mem::take(&mut self.rens[src_id].spaces);

        for &pos in &positions {
            self.ren_ids[pos as usize] = dst_id as i32;
        }

        self.rens[dst_id].positions.extend(positions);
        self.rens[dst_id].spaces.extend(spaces);

        self.rens[src_id].color = EMPTY;
    }

    /// Remove a group: free its cells, restore pattern bits, and grant each
    /// freed cell back as a liberty to its remaining neighbors.
    fn remove_ren(&mut self, index: i32) {
        let ren_id = self.ren_ids[index as usize] as usize;
        let color = self.rens[ren_id].color;
        let positions = std::mem::take(&mut self.rens[ren_id].positions);
        let arounds = self.arounds();

        for &pos in &positions {
            self.ren_ids[pos as usize] = -1;
            self.pattern.remove(self.pos_x(pos), self.pos_y(pos), color);

            for a in arounds {
                let target_id = self.ren_ids[(pos + a) as usize];
                if target_id != -1 {
                    self.rens[target_id as usize].spaces.insert(pos);
                }
            }
        }

        self.rens[ren_id].color = EMPTY;
        self.rens[ren_id].spaces.clear();
    }

    pub(crate) fn color_at(&self, index: i32) -> Color {
        match self.ren_ids[index as usize] {
            -1 => EMPTY,
            id => self.rens[id as usize].color,
        }
    }

    pub(crate) fn is_enabled_index(&self, index: i32, color: Color, check_seki: bool) -> bool {
        // Occupied cells and the ko point are out.
        if self.ren_ids[index as usize] != -1 {
            return false;
        }
        if index == self.ko_index && color == self.ko_color {
            return false;
        }
        if check_seki && self.is_seki(index, color) {
            return false;
        }

        // Playable iff some neighbor is empty, a roomy friend, or a
        // capturable enemy.
        let op_color = opposite(color);
        for a in self.arounds() {
            let target = index + a;
            let ren_id = self.ren_ids[target as usize];
            if ren_id == -1 {
                return true;
            }
            let ren = &self.rens[ren_id as usize];
            if ren.color == color && ren.spaces.len() > 1 {
                return true;
            }
            if ren.color == op_color && ren.spaces.len() == 1 {
                return true;
            }
        }

        false
    }

    #[inline]
    pub(crate) fn arounds(&self) -> [i32; 4] {
        [-1, -self.width, 1, self.width]
    }

    #[inline]
    pub(crate) fn is_valid_position(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width - 2 && y >= 0 && y < self.height - 2
    }

    #[inline]
    pub(crate) fn index(&self, x: i32, y: i32) -> i32 {
        (y + 1) * self.width + (x + 1)
    }

    #[inline]
    pub(crate) fn pos_x(&self, index: i32) -> i32 {
        index % self.width - 1
    }

    #[inline]
    pub(crate) fn pos_y(&self, index: i32) -> i32 {
        index / self.width - 1
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "   ")?;
        for x in 0..self.width() {
            write!(f, "{x:2}")?;
        }
        writeln!(f)?;

        writeln!(f, "  +{}-+", "--".repeat(self.width() as usize))?;
        for y in 0..self.height() {
            write!(f, "{y:2}|")?;
            for x in 0..self.width() {
                let index = self.index(x, y);
                let cell = if index == self.ko_index {
                    " K"
                } else {
                    match self.get_color(x, y) {
                        BLACK => " X",
                        WHITE => " O",
                        _ => " .",
                    }
                };
                write!(f, "{cell}")?;
            }
            writeln!(f, " |")?;
        }
        writeln!(f, "  +{}-+", "--".repeat(self.width() as usize))
    }
}
