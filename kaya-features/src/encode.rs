//! Board → input-tensor encoding.
//!
//! All stone planes are side-relative: "own" means the side to move. The
//! board is centered into the model canvas and the final plane masks the
//! real board cells.

use kaya_core::{Board, Color, Rule, BLACK};

use crate::schema::{MODEL_AREA, MODEL_FEATURES, MODEL_INPUT_SIZE, MODEL_SIZE};

/// Input plane indices. `OWN_*` planes flip with the side to move.
const PLANE_EMPTY: usize = 0;
const PLANE_OWN_STONES: usize = 1;
const PLANE_OWN_SHICHO: usize = 2;
// Own liberty indicators occupy planes 3..=10 (PLANE_OWN_SHICHO + count).
const PLANE_OWN_HISTORY: usize = 11;
const PLANE_OPP_STONES: usize = 14;
const PLANE_OPP_SHICHO: usize = 15;
// Opponent liberty indicators occupy planes 16..=23.
const PLANE_OPP_HISTORY: usize = 24;
const PLANE_LINES: usize = 27;
const PLANE_KO: usize = 31;

/// Encode `board` from the perspective of `color` to move.
///
/// The board's ladder cache is refreshed on the way, hence `&mut`.
pub fn encode(board: &mut Board, color: Color, komi: f32, rule: Rule, superko: bool) -> Vec<f32> {
    let mut inputs = vec![0.0f32; MODEL_INPUT_SIZE];
    encode_into(board, color, komi, rule, superko, &mut inputs);
    inputs
}

/// Encode into a caller-provided row of `MODEL_INPUT_SIZE` floats.
pub fn encode_into(
    board: &mut Board,
    color: Color,
    komi: f32,
    rule: Rule,
    superko: bool,
    inputs: &mut [f32],
) {
    debug_assert_eq!(inputs.len(), MODEL_INPUT_SIZE);

    let width = board.width();
    let height = board.height();
    let offset_x = (MODEL_SIZE as i32 - width) / 2;
    let offset_y = (MODEL_SIZE as i32 - height) / 2;
    let canvas = |x: i32, y: i32| -> usize {
        ((offset_y + y) * MODEL_SIZE as i32 + (offset_x + x)) as usize
    };

    inputs.fill(0.0);

    // Stones, liberties, ladders, and the padding mask.
    for y in 0..height {
        for x in 0..width {
            let index = canvas(x, y);
            inputs[MODEL_AREA * MODEL_FEATURES + index] = 1.0;

            let cell = board.get_color(x, y) * color;
            if cell == 0 {
                inputs[MODEL_AREA * PLANE_EMPTY + index] = 1.0;
                continue;
            }

            let shicho = if board.is_shicho(x, y) { 1.0 } else { 0.0 };
            let spaces = board.get_ren_space(x, y).min(8) as usize;

            if cell == BLACK {
                inputs[MODEL_AREA * PLANE_OWN_STONES + index] = 1.0;
                inputs[MODEL_AREA * PLANE_OWN_SHICHO + index] = shicho;
                inputs[MODEL_AREA * (PLANE_OWN_SHICHO + spaces) + index] = 1.0;
            } else {
                inputs[MODEL_AREA * PLANE_OPP_STONES + index] = 1.0;
                inputs[MODEL_AREA * PLANE_OPP_SHICHO + index] = shicho;
                inputs[MODEL_AREA * (PLANE_OPP_SHICHO + spaces) + index] = 1.0;
            }
        }
    }

    // Last three moves of each side, newest first.
    let mut own_moves = board.get_histories(color);
    let mut opp_moves = board.get_histories(-color);
    own_moves.reverse();
    opp_moves.reverse();

    for (i, (x, y)) in own_moves.into_iter().take(3).enumerate() {
        inputs[MODEL_AREA * (PLANE_OWN_HISTORY + i) + canvas(x, y)] = 1.0;
    }
    for (i, (x, y)) in opp_moves.into_iter().take(3).enumerate() {
        inputs[MODEL_AREA * (PLANE_OPP_HISTORY + i) + canvas(x, y)] = 1.0;
    }

    // First-to-fourth-line rings.
    for i in 0..4 {
        let begin_x = offset_x + i;
        let end_x = offset_x + width - i;
        let begin_y = offset_y + i;
        let end_y = offset_y + height - i;
        let plane = MODEL_AREA * (PLANE_LINES + i as usize);

        for y in begin_y..end_y {
            inputs[plane + (y * MODEL_SIZE as i32 + begin_x) as usize] = 1.0;
            inputs[plane + (y * MODEL_SIZE as i32 + end_x - 1) as usize] = 1.0;
        }
        for x in begin_x..end_x {
            inputs[plane + (begin_y * MODEL_SIZE as i32 + x) as usize] = 1.0;
            inputs[plane + ((end_y - 1) * MODEL_SIZE as i32 + x) as usize] = 1.0;
        }
    }

    // Ko recapture point, only when the side to move is barred.
    let (ko_x, ko_y) = board.get_ko(color);
    let has_ko = ko_x >= 0 && ko_y >= 0;
    if has_ko {
        inputs[MODEL_AREA * PLANE_KO + canvas(ko_x, ko_y)] = 1.0;
    }

    // Game-state scalars.
    let info = MODEL_AREA * (MODEL_FEATURES + 1);
    if color == BLACK {
        inputs[info] = 1.0;
    } else {
        inputs[info + 1] = 1.0;
    }
    inputs[info + 2] = komi * color as f32 / 13.0;
    if superko {
        inputs[info + 3] = 1.0;
    }
    if has_ko {
        inputs[info + 4] = 1.0;
    }
    if rule != Rule::Japanese {
        inputs[info + 5] = 1.0;
    } else {
        inputs[info + 6] = 1.0;
    }
}
