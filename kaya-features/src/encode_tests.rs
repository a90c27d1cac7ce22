use kaya_core::{Board, Rule, BLACK, WHITE};

use crate::encode::encode;
use crate::schema::{MODEL_AREA, MODEL_FEATURES, MODEL_INPUT_SIZE, MODEL_SIZE};

fn canvas(board: &Board, x: i32, y: i32) -> usize {
    let offset_x = (MODEL_SIZE as i32 - board.width()) / 2;
    let offset_y = (MODEL_SIZE as i32 - board.height()) / 2;
    ((offset_y + y) * MODEL_SIZE as i32 + (offset_x + x)) as usize
}

fn plane(inputs: &[f32], plane: usize) -> &[f32] {
    &inputs[MODEL_AREA * plane..MODEL_AREA * (plane + 1)]
}

#[test]
fn empty_board_masks_and_scalars() {
    let mut board = Board::new(9, 9);
    let inputs = encode(&mut board, BLACK, 7.5, Rule::Chinese, false);

    assert_eq!(inputs.len(), MODEL_INPUT_SIZE);

    // 81 empty cells, centered; the padding mask marks the same cells.
    let empties: f32 = plane(&inputs, 0).iter().sum();
    assert_eq!(empties, 81.0);
    let mask: f32 = plane(&inputs, MODEL_FEATURES).iter().sum();
    assert_eq!(mask, 81.0);
    assert_eq!(plane(&inputs, MODEL_FEATURES)[canvas(&board, 0, 0)], 1.0);
    assert_eq!(plane(&inputs, MODEL_FEATURES)[0], 0.0);

    // Side to move, komi, rules.
    let info = MODEL_AREA * (MODEL_FEATURES + 1);
    assert_eq!(inputs[info], 1.0);
    assert_eq!(inputs[info + 1], 0.0);
    assert!((inputs[info + 2] - 7.5 / 13.0).abs() < 1e-6);
    assert_eq!(inputs[info + 3], 0.0);
    assert_eq!(inputs[info + 4], 0.0);
    assert_eq!(inputs[info + 5], 1.0);
    assert_eq!(inputs[info + 6], 0.0);
}

#[test]
fn stone_planes_follow_the_side_to_move() {
    let mut board = Board::new(9, 9);
    board.play(2, 2, BLACK);
    board.play(6, 6, WHITE);

    let from_black = encode(&mut board, BLACK, 7.5, Rule::Chinese, false);
    assert_eq!(plane(&from_black, 1)[canvas(&board, 2, 2)], 1.0);
    assert_eq!(plane(&from_black, 14)[canvas(&board, 6, 6)], 1.0);
    assert_eq!(plane(&from_black, 0)[canvas(&board, 2, 2)], 0.0);

    let from_white = encode(&mut board, WHITE, 7.5, Rule::Chinese, false);
    assert_eq!(plane(&from_white, 1)[canvas(&board, 6, 6)], 1.0);
    assert_eq!(plane(&from_white, 14)[canvas(&board, 2, 2)], 1.0);

    // Komi flips sign with the perspective.
    let info = MODEL_AREA * (MODEL_FEATURES + 1);
    assert!(from_black[info + 2] > 0.0);
    assert!(from_white[info + 2] < 0.0);
    assert_eq!(from_white[info + 1], 1.0);
}

#[test]
fn liberty_planes_clamp_at_eight() {
    let mut board = Board::new(9, 9);
    board.play(4, 4, BLACK);

    let inputs = encode(&mut board, BLACK, 7.5, Rule::Chinese, false);
    // A lone stone with four liberties lights plane 2 + 4.
    assert_eq!(plane(&inputs, 6)[canvas(&board, 4, 4)], 1.0);

    // A long chain clamps to plane 2 + 8.
    let mut board = Board::new(9, 9);
    for x in 0..6 {
        board.play(x, 4, BLACK);
    }
    let inputs = encode(&mut board, BLACK, 7.5, Rule::Chinese, false);
    assert_eq!(plane(&inputs, 10)[canvas(&board, 0, 4)], 1.0);
}

#[test]
fn history_planes_are_newest_first() {
    let mut board = Board::new(9, 9);
    board.play(0, 0, BLACK);
    board.play(8, 8, WHITE);
    board.play(1, 1, BLACK);
    board.play(2, 2, BLACK);

    let inputs = encode(&mut board, BLACK, 7.5, Rule::Chinese, false);
    // Own history: planes 11..=13, newest move first.
    assert_eq!(plane(&inputs, 11)[canvas(&board, 2, 2)], 1.0);
    assert_eq!(plane(&inputs, 12)[canvas(&board, 1, 1)], 1.0);
    assert_eq!(plane(&inputs, 13)[canvas(&board, 0, 0)], 1.0);
    // Opponent history on plane 24.
    assert_eq!(plane(&inputs, 24)[canvas(&board, 8, 8)], 1.0);
}

#[test]
fn line_planes_mark_the_rings() {
    let mut board = Board::new(9, 9);
    let inputs = encode(&mut board, BLACK, 7.5, Rule::Chinese, false);

    // First line: the 32-cell outer ring of a 9x9 board.
    let first: f32 = plane(&inputs, 27).iter().sum();
    assert_eq!(first, 32.0);
    assert_eq!(plane(&inputs, 27)[canvas(&board, 0, 0)], 1.0);
    assert_eq!(plane(&inputs, 27)[canvas(&board, 4, 4)], 0.0);

    // Second line ring of the inner 7x7.
    let second: f32 = plane(&inputs, 28).iter().sum();
    assert_eq!(second, 24.0);
    assert_eq!(plane(&inputs, 28)[canvas(&board, 1, 1)], 1.0);
}

#[test]
fn ko_plane_follows_the_barred_side() {
    let mut board = Board::new(9, 9);
    board.play(4, 3, BLACK);
    board.play(3, 4, BLACK);
    board.play(5, 4, BLACK);
    board.play(4, 5, BLACK);
    board.play(3, 3, WHITE);
    board.play(5, 3, WHITE);
    board.play(4, 2, WHITE);
    board.play(4, 4, WHITE);
    assert_eq!(board.get_ko(BLACK), (4, 3));

    let info = MODEL_AREA * (MODEL_FEATURES + 1);

    // Black to move is barred: plane and scalar both fire.
    let from_black = encode(&mut board, BLACK, 7.5, Rule::Chinese, false);
    assert_eq!(plane(&from_black, 31)[canvas(&board, 4, 3)], 1.0);
    assert_eq!(from_black[info + 4], 1.0);

    // White is not barred.
    let from_white = encode(&mut board, WHITE, 7.5, Rule::Chinese, false);
    assert!(plane(&from_white, 31).iter().all(|&v| v == 0.0));
    assert_eq!(from_white[info + 4], 0.0);
}

#[test]
fn rule_and_superko_scalars() {
    let mut board = Board::new(9, 9);
    let info = MODEL_AREA * (MODEL_FEATURES + 1);

    let jp = encode(&mut board, BLACK, 6.5, Rule::Japanese, true);
    assert_eq!(jp[info + 3], 1.0);
    assert_eq!(jp[info + 5], 0.0);
    assert_eq!(jp[info + 6], 1.0);

    let com = encode(&mut board, BLACK, 6.5, Rule::Computer, false);
    assert_eq!(com[info + 5], 1.0);
    assert_eq!(com[info + 6], 0.0);
}

#[test]
fn shicho_plane_marks_laddered_groups() {
    let mut board = Board::new(9, 9);
    for x in [5, 6, 7] {
        board.play(x, 2, BLACK);
        board.play(x, 1, WHITE);
        board.play(x, 3, WHITE);
    }
    board.play(4, 2, WHITE);
    assert!(board.is_shicho(5, 2));

    // Black to move sees its own group flagged on plane 2.
    let inputs = encode(&mut board, BLACK, 7.5, Rule::Chinese, false);
    assert_eq!(plane(&inputs, 2)[canvas(&board, 5, 2)], 1.0);
    assert_eq!(plane(&inputs, 2)[canvas(&board, 6, 2)], 1.0);

    // White to move sees it as an opponent ladder on plane 15.
    let inputs = encode(&mut board, WHITE, 7.5, Rule::Chinese, false);
    assert_eq!(plane(&inputs, 15)[canvas(&board, 5, 2)], 1.0);
    assert_eq!(plane(&inputs, 2)[canvas(&board, 5, 2)], 0.0);
}
