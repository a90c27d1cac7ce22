//! Single-board evaluation: one inference pass, filtered into candidates.

use std::sync::Arc;

use kaya_core::{Board, Color, Rule, WHITE};
use kaya_features::{encode_into, MODEL_INPUT_SIZE, MODEL_OUTPUT_SIZE, MODEL_SIZE, VALUE_OFFSET};
use kaya_infer::Inference;

use crate::policy::PolicyEntry;

/// Holds the last inference result for one board + side to move.
///
/// The raw policy plane is reduced to legal, non-settled cells; the value is
/// mapped to [-1, 1] and flipped to the black-positive convention. A second
/// `evaluate` call is a no-op until [`Evaluator::clear`].
pub struct Evaluator {
    infer: Arc<dyn Inference>,
    komi: f32,
    rule: Rule,
    superko: bool,
    policies: Vec<PolicyEntry>,
    value: f32,
    evaluated: bool,
}

impl Evaluator {
    pub fn new(infer: Arc<dyn Inference>, komi: f32, rule: Rule, superko: bool) -> Self {
        Self {
            infer,
            komi,
            rule,
            superko,
            policies: Vec::new(),
            value: 0.0,
            evaluated: false,
        }
    }

    pub fn clear(&mut self) {
        self.policies.clear();
        self.value = 0.0;
        self.evaluated = false;
    }

    /// Run the model on `board` for `color` to move.
    pub fn evaluate(&mut self, board: &mut Board, color: Color) {
        if self.evaluated {
            return;
        }

        let mut inputs = vec![0.0f32; MODEL_INPUT_SIZE];
        let mut outputs = vec![0.0f32; MODEL_OUTPUT_SIZE];
        encode_into(board, color, self.komi, self.rule, self.superko, &mut inputs);
        self.infer.execute(&inputs, &mut outputs, 1);

        let width = board.width();
        let height = board.height();
        let offset_x = (MODEL_SIZE as i32 - width) / 2;
        let offset_y = (MODEL_SIZE as i32 - height) / 2;

        // Keep only cells the side may play and that are not already
        // settled for either side.
        let enableds = board.get_enableds(color, true);
        let territories = board.get_territories(color);

        for y in 0..height {
            for x in 0..width {
                let board_index = (y * width + x) as usize;
                let model_index =
                    ((offset_y + y) * MODEL_SIZE as i32 + (offset_x + x)) as usize;

                if enableds[board_index] && territories[board_index] == 0 {
                    self.policies
                        .push(PolicyEntry::new(x, y, outputs[model_index]));
                }
            }
        }

        self.value = outputs[VALUE_OFFSET] * 2.0 - 1.0;
        if color == WHITE {
            self.value = -self.value;
        }

        self.evaluated = true;
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    pub fn policies(&self) -> &[PolicyEntry] {
        &self.policies
    }

    /// Black-positive value in [-1, 1].
    pub fn value(&self) -> f32 {
        self.value
    }
}
