//! kaya-features: model I/O geometry and the board → input-tensor encoder.

pub mod encode;
pub mod schema;

#[cfg(test)]
mod encode_tests;

pub use encode::{encode, encode_into};
pub use schema::{
    MODEL_AREA, MODEL_FEATURES, MODEL_INFOS, MODEL_INPUT_SIZE, MODEL_OUTPUT_SIZE,
    MODEL_PREDICTIONS, MODEL_SIZE, MODEL_VALUES, VALUE_OFFSET,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
