//! Ladder (shicho) detection.
//!
//! A group with one liberty is read out by depth-first search over board
//! copies: the defender plays the unique liberty, the attacker answers on
//! each of the two remaining liberties. The predicate is purely local to
//! the group being read; distant stones only matter once the reading
//! actually reaches them.

use crate::board::Board;
use crate::color::opposite;

impl Board {
    /// Refresh every group's ladder flag. Cached until the next play.
    pub(crate) fn update_shicho(&mut self) {
        if self.shicho_updated {
            return;
        }

        for index in 0..self.length {
            // Only leader slots carry a live record.
            if self.ren_ids[index as usize] != index {
                continue;
            }

            // Lone stones are not read as ladders.
            if self.rens[index as usize].positions.len() < 2 {
                self.rens[index as usize].shicho = false;
                continue;
            }

            self.rens[index as usize].shicho = self.is_shicho_ren(index);
        }

        self.shicho_updated = true;
    }

    /// Read out the group covering `index`. Returns true iff some line of
    /// forced play ends with the group captured.
    fn is_shicho_ren(&self, index: i32) -> bool {
        if self.rens[self.ren_ids[index as usize] as usize].spaces.len() > 1 {
            return false;
        }

        // Depth-first via an explicit stack of board copies, so memory is
        // bounded by reading depth. The budget caps pathological positions;
        // an exhausted budget reads as "not ladder".
        let budget = 2 * (self.width() * self.height()) as usize;
        let mut popped = 0usize;
        let mut stack: Vec<Board> = vec![self.clone()];

        while let Some(board) = stack.pop() {
            popped += 1;
            if popped > budget {
                return false;
            }

            let ren_id = board.ren_ids[index as usize];
            if ren_id == -1 {
                continue;
            }
            let color = board.rens[ren_id as usize].color;
            let op_color = opposite(color);

            // An adjacent attacker in atari means the defender captures out.
            let mut escaped = false;
            'positions: for &pos in &board.rens[ren_id as usize].positions {
                for a in board.arounds() {
                    let target_id = board.ren_ids[(pos + a) as usize];
                    if target_id != -1
                        && board.rens[target_id as usize].color == op_color
                        && board.rens[target_id as usize].spaces.len() == 1
                    {
                        escaped = true;
                        break 'positions;
                    }
                }
            }
            if escaped {
                continue;
            }

            // The defender's only try is the single liberty.
            let Some(&escape_pos) = board.rens[ren_id as usize].spaces.iter().next() else {
                continue;
            };
            let mut curr = board.clone();
            if curr.play(curr.pos_x(escape_pos), curr.pos_y(escape_pos), color) < 0 {
                // No escape move at all; a nakade shape dies back on the
                // capturer instead.
                if self.is_nakade(&board.rens[ren_id as usize].positions) {
                    continue;
                }
                return true;
            }

            let curr_id = curr.ren_ids[index as usize];
            if curr_id == -1 {
                continue;
            }
            let spaces = curr.rens[curr_id as usize].spaces.len();
            if spaces == 1 {
                if self.is_nakade(&curr.rens[curr_id as usize].positions) {
                    continue;
                }
                return true;
            } else if spaces > 2 {
                continue;
            }

            // Two liberties: the attacker tries both.
            let next_positions: Vec<i32> =
                curr.rens[curr_id as usize].spaces.iter().copied().collect();
            for next_pos in next_positions {
                let mut next = curr.clone();
                next.play(next.pos_x(next_pos), next.pos_y(next_pos), op_color);
                stack.push(next);
            }
        }

        false
    }
}
