//! Territory and owner resolution.
//!
//! Empty regions are flooded per color (opponent stones inside count as part
//! of the region), then a fix-point demotes groups that are not connected to
//! at least two settled regions, together with their regions. A cell is
//! territory iff it lies in a settled single-color region or belongs to a
//! settled group.

use std::collections::BTreeSet;

use crate::board::Board;
use crate::color::{opposite, Color, BLACK, EMPTY, WHITE};
use crate::config::Rule;

impl Board {
    /// Rebuild the per-color region maps and group life flags. Cached until
    /// the next play.
    pub(crate) fn update_area(&mut self) {
        if self.area_updated {
            return;
        }

        for c in 0..2 {
            let color: Color = if c == 0 { BLACK } else { WHITE };
            let op_color = opposite(color);

            let mut ren_ids: BTreeSet<i32> = BTreeSet::new();
            for index in 0..self.length {
                let id = self.ren_ids[index as usize];
                if id != -1 && self.rens[id as usize].color == color {
                    ren_ids.insert(id);
                }
            }

            // All groups start life-confirmed; the fix-point demotes.
            for &id in &ren_ids {
                self.rens[id as usize].areas.clear();
                self.rens[id as usize].fixed = true;
            }

            let mut checks = vec![false; self.length as usize];

            for index in 0..self.length {
                if checks[index as usize] {
                    continue;
                }

                let index_color = self.color_at(index);
                if index_color != EMPTY && index_color != op_color {
                    self.area_ids[c][index as usize] = -1;
                    continue;
                }

                // Groups touching the seed cell; the region is settled only
                // if every region cell touches exactly this set.
                let mut connected: BTreeSet<i32> = BTreeSet::new();
                for a in self.arounds() {
                    if self.color_at(index + a) == color {
                        connected.insert(self.ren_ids[(index + a) as usize]);
                    }
                }

                let mut stack = vec![index];
                self.area_flags[c][index as usize] = true;

                while let Some(pos) = stack.pop() {
                    if checks[pos as usize] {
                        continue;
                    }
                    checks[pos as usize] = true;
                    self.area_ids[c][pos as usize] = index;

                    let mut around_ren_ids: BTreeSet<i32> = BTreeSet::new();
                    for a in self.arounds() {
                        let target_id = self.ren_ids[(pos + a) as usize];
                        if target_id != -1 && self.rens[target_id as usize].color == color {
                            around_ren_ids.insert(target_id);
                        }
                    }

                    if around_ren_ids.is_empty() {
                        self.area_flags[c][pos as usize] = false;
                    }
                    if around_ren_ids != connected {
                        self.area_flags[c][index as usize] = false;
                    }

                    for a in self.arounds() {
                        let around = pos + a;
                        let around_color = self.color_at(around);
                        if around_color == EMPTY || around_color == op_color {
                            stack.push(around);
                        }
                    }
                }

                if self.area_flags[c][index as usize] {
                    for &id in &connected {
                        self.rens[id as usize].areas.insert(index);
                    }
                }
            }

            // A group stays settled only while at least two of its regions
            // are; demoting a group unsettles its regions, so iterate.
            let mut updated = true;
            while updated {
                updated = false;

                for &id in &ren_ids {
                    if !self.rens[id as usize].fixed {
                        continue;
                    }

                    let fixed_count = self.rens[id as usize]
                        .areas
                        .iter()
                        .filter(|&&area_id| self.area_flags[c][area_id as usize])
                        .count();
                    if fixed_count >= 2 {
                        continue;
                    }

                    self.rens[id as usize].fixed = false;
                    let areas: Vec<i32> = self.rens[id as usize].areas.iter().copied().collect();
                    for area_id in areas {
                        if self.area_flags[c][area_id as usize] {
                            self.area_flags[c][area_id as usize] = false;
                            updated = true;
                        }
                    }
                }
            }
        }

        self.area_updated = true;
    }

    /// Settled territory, row-major, relative to `color` (own reads +1).
    /// Unsettled cells read 0.
    pub fn get_territories(&mut self, color: Color) -> Vec<i8> {
        self.update_area();

        let mut territories = Vec::with_capacity((self.width() * self.height()) as usize);
        for y in 0..self.height() {
            for x in 0..self.width() {
                let index = self.index(x, y) as usize;
                let ren_id = self.ren_ids[index];

                let cell = if ren_id != -1 && self.rens[ren_id as usize].fixed {
                    self.rens[ren_id as usize].color * color
                } else if self.area_ids[0][index] != -1
                    && self.area_flags[0][self.area_ids[0][index] as usize]
                {
                    BLACK * color
                } else if self.area_ids[1][index] != -1
                    && self.area_flags[1][self.area_ids[1][index] as usize]
                {
                    WHITE * color
                } else {
                    EMPTY
                };
                territories.push(cell);
            }
        }

        territories
    }

    /// Final owner of every cell under `rule`, relative to `color`.
    ///
    /// Starts from settled territory, then stones own their own cells. For
    /// non-Japanese rules, empty regions bordered by a single color are
    /// handed to that color as well.
    pub fn get_owners(&mut self, color: Color, rule: Rule) -> Vec<i8> {
        let mut owners = self.get_territories(color);

        for y in 0..self.height() {
            for x in 0..self.width() {
                let owner_index = (y * self.width() + x) as usize;
                if owners[owner_index] == EMPTY {
                    owners[owner_index] = self.get_color(x, y) * color;
                }
            }
        }

        if rule == Rule::Japanese {
            return owners;
        }

        let mut areas = vec![EMPTY; self.length as usize];
        let mut checks = vec![false; self.length as usize];

        for y in 0..self.height() {
            for x in 0..self.width() {
                let index = self.index(x, y);
                if checks[index as usize] || self.get_color(x, y) != EMPTY {
                    continue;
                }

                let mut positions: BTreeSet<i32> = BTreeSet::new();
                let mut colors: BTreeSet<Color> = BTreeSet::new();
                let mut stack = vec![index];

                while let Some(pos) = stack.pop() {
                    if checks[pos as usize] {
                        continue;
                    }
                    checks[pos as usize] = true;
                    positions.insert(pos);

                    for a in self.arounds() {
                        let target = pos + a;
                        let target_color = self.color_at(target);
                        if target_color == EMPTY {
                            stack.push(target);
                        } else if target_color != crate::color::EDGE {
                            colors.insert(target_color);
                        }
                    }
                }

                if colors.len() == 1 {
                    let owner = *colors.iter().next().unwrap_or(&EMPTY);
                    for pos in positions {
                        areas[pos as usize] = owner;
                    }
                }
            }
        }

        for y in 0..self.height() {
            for x in 0..self.width() {
                let index = self.index(x, y) as usize;
                let owner_index = (y * self.width() + x) as usize;
                if owners[owner_index] == EMPTY {
                    owners[owner_index] = areas[index] * color;
                }
            }
        }

        owners
    }
}
