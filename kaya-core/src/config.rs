//! Engine configuration schema.
//!
//! One YAML document with `game`, `search` and `inference` sections. Every
//! field has a default so partial files load; validation catches the values
//! the engine cannot run with.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {msg}")]
    Invalid { msg: &'static str },
}

/// Scoring rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rule {
    #[serde(rename = "ch")]
    Chinese,
    #[serde(rename = "jp")]
    Japanese,
    #[serde(rename = "com")]
    Computer,
}

/// Child-selection rule used at the root of each descent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchRule {
    Pucb,
    Ucb1,
}

/// How the final move is picked from the candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    Lcb,
    Visits,
}

/// Root configuration document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
}

/// Board geometry and rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct GameConfig {
    #[serde(default = "default_boardsize")]
    pub boardsize: i32,
    #[serde(default = "default_komi")]
    pub komi: f32,
    #[serde(default = "default_rule")]
    pub rule: Rule,
    /// Announce positional superko to the model. Not enforced as illegal.
    #[serde(default)]
    pub superko: bool,
}

/// Search behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchConfig {
    /// Target search-tree visits per move.
    #[serde(default = "default_visits")]
    pub visits: u32,
    /// Target leaf evaluations per move; 0 disables the playout criterion.
    #[serde(default)]
    pub playouts: u32,
    #[serde(default = "default_search_rule")]
    pub search: SearchRule,
    /// Policy sharpening for the expansion rule. Must be positive.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Gumbel noise scale for expansion, 0..=1.
    #[serde(default)]
    pub randomness: f32,
    #[serde(default = "default_criterion")]
    pub criterion: Criterion,
    /// Expansion width cap; 0 lets the search widen on its own.
    #[serde(default)]
    pub width: i32,
    /// Wall-clock bound per `wait_evaluation`, in seconds.
    #[serde(default = "default_timelimit")]
    pub timelimit: f32,
    /// Keep searching after the wait returns.
    #[serde(default)]
    pub ponder: bool,
    /// Back-propagate leaf values only, cancelling interior contributions.
    #[serde(default)]
    pub eval_leaf_only: bool,
    /// Search worker threads.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Resign when the best candidate's win chance drops below this.
    #[serde(default = "default_resign")]
    pub resign: f32,
    /// Do not resign while the predicted score margin is inside this bound.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    /// Do not resign before this turn.
    #[serde(default = "default_min_turn")]
    pub min_turn: u32,
    /// Play the opening from the raw policy until this turn.
    #[serde(default)]
    pub initial_turn: u32,
}

/// Inference service sizing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct InferenceConfig {
    /// Maximum positions folded into one model forward.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Device list; -1 is the CPU.
    #[serde(default = "default_gpus")]
    pub gpus: Vec<i32>,
    #[serde(default)]
    pub fp16: bool,
    /// Executors (worker threads) per device.
    #[serde(default = "default_threads_per_gpu")]
    pub threads_per_gpu: usize,
}

fn default_boardsize() -> i32 {
    19
}
fn default_komi() -> f32 {
    7.5
}
fn default_rule() -> Rule {
    Rule::Chinese
}
fn default_visits() -> u32 {
    800
}
fn default_search_rule() -> SearchRule {
    SearchRule::Pucb
}
fn default_temperature() -> f32 {
    1.0
}
fn default_criterion() -> Criterion {
    Criterion::Lcb
}
fn default_timelimit() -> f32 {
    120.0
}
fn default_threads() -> usize {
    4
}
fn default_resign() -> f32 {
    0.05
}
fn default_min_score() -> f32 {
    5.0
}
fn default_min_turn() -> u32 {
    50
}
fn default_batch_size() -> usize {
    2048
}
fn default_gpus() -> Vec<i32> {
    vec![-1]
}
fn default_threads_per_gpu() -> usize {
    1
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            boardsize: default_boardsize(),
            komi: default_komi(),
            rule: default_rule(),
            superko: false,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            visits: default_visits(),
            playouts: 0,
            search: default_search_rule(),
            temperature: default_temperature(),
            randomness: 0.0,
            criterion: default_criterion(),
            width: 0,
            timelimit: default_timelimit(),
            ponder: false,
            eval_leaf_only: false,
            threads: default_threads(),
            resign: default_resign(),
            min_score: default_min_score(),
            min_turn: default_min_turn(),
            initial_turn: 0,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            gpus: default_gpus(),
            fp16: false,
            threads_per_gpu: default_threads_per_gpu(),
        }
    }
}

impl Config {
    /// Load and validate a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game.boardsize < 2 || self.game.boardsize > 19 {
            return Err(ConfigError::Invalid {
                msg: "boardsize must be in 2..=19",
            });
        }
        if !(self.search.temperature.is_finite() && self.search.temperature > 0.0) {
            return Err(ConfigError::Invalid {
                msg: "temperature must be finite and > 0",
            });
        }
        if !(0.0..=1.0).contains(&self.search.randomness) {
            return Err(ConfigError::Invalid {
                msg: "randomness must be in 0..=1",
            });
        }
        if self.search.threads == 0 {
            return Err(ConfigError::Invalid {
                msg: "threads must be > 0",
            });
        }
        if self.inference.batch_size == 0 {
            return Err(ConfigError::Invalid {
                msg: "batch-size must be > 0",
            });
        }
        if self.inference.gpus.is_empty() || self.inference.threads_per_gpu == 0 {
            return Err(ConfigError::Invalid {
                msg: "at least one device and one thread per device required",
            });
        }
        Ok(())
    }
}
