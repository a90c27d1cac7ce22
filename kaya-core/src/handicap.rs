//! Fixed-handicap placement.
//!
//! Star-point positions for 2..=9 stones, in the conventional order. Boards
//! of 13 and up use the fourth line for the corner points, smaller boards
//! the third.

/// The handicap stone coordinates for `handicap` stones on a
/// `width` x `height` board. Empty for handicaps below 2.
pub fn handicap_positions(width: i32, height: i32, handicap: u32) -> Vec<(i32, i32)> {
    let mut positions = Vec::new();
    let ver_line = if width >= 13 { 3 } else { 2 };
    let hor_line = if height >= 13 { 3 } else { 2 };

    if handicap >= 2 {
        positions.push((width - ver_line - 1, hor_line));
        positions.push((ver_line, height - hor_line - 1));
    }
    if handicap >= 3 {
        positions.push((ver_line, hor_line));
    }
    if handicap >= 4 {
        positions.push((width - ver_line - 1, height - hor_line - 1));
    }
    if handicap == 5 {
        positions.push((width / 2, height / 2));
    }
    if handicap >= 6 {
        positions.push((ver_line, height / 2));
        positions.push((width - ver_line - 1, height / 2));
    }
    if handicap == 7 {
        positions.push((width / 2, height / 2));
    }
    if handicap >= 8 {
        positions.push((width / 2, hor_line));
        positions.push((width / 2, height - hor_line - 1));
    }
    if handicap == 9 {
        positions.push((width / 2, height / 2));
    }

    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::color::BLACK;

    #[test]
    fn counts_match_the_handicap() {
        for handicap in 2..=9 {
            let positions = handicap_positions(19, 19, handicap);
            assert_eq!(positions.len(), handicap as usize, "handicap {handicap}");
        }
        assert!(handicap_positions(19, 19, 0).is_empty());
        assert!(handicap_positions(19, 19, 1).is_empty());
    }

    #[test]
    fn nineteen_uses_the_fourth_line() {
        let positions = handicap_positions(19, 19, 9);
        assert!(positions.contains(&(3, 3)));
        assert!(positions.contains(&(15, 15)));
        assert!(positions.contains(&(9, 9)));
    }

    #[test]
    fn nine_uses_the_third_line() {
        let positions = handicap_positions(9, 9, 5);
        assert!(positions.contains(&(2, 2)));
        assert!(positions.contains(&(6, 6)));
        assert!(positions.contains(&(4, 4)));
    }

    #[test]
    fn positions_are_playable() {
        for handicap in 2..=9 {
            let mut board = Board::new(19, 19);
            for (x, y) in handicap_positions(19, 19, handicap) {
                assert!(board.play(x, y, BLACK) >= 0);
            }
        }
    }
}
