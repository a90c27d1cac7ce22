//! kaya-core: Go rules, group tracking, ko/ladder/seki analysis, territory
//! scoring, compact board snapshots, and the engine configuration schema.

pub mod board;
pub mod color;
pub mod config;
pub mod handicap;
pub mod history;
pub mod pattern;

mod area;
mod ladder;
mod ren;
mod seki;


pub use board::Board;
pub use color::{opposite, Color, BLACK, EDGE, EMPTY, PASS, WHITE};
pub use config::{
    Config, ConfigError, Criterion, GameConfig, InferenceConfig, Rule, SearchConfig, SearchRule,
};
pub use handicap::handicap_positions;
pub use history::History;
pub use pattern::Pattern;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
