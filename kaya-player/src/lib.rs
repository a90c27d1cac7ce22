//! kaya-player: drives the search tree from game events.
//!
//! A [`player::Player`] owns the node pool, a worker [`thread_pool::ThreadPool`]
//! and one dispatcher thread. Externally visible operations pause the
//! dispatch loop, drain in-flight workers, mutate the tree, and resume; the
//! dispatcher otherwise keeps one evaluation task per worker in flight.

pub mod player;
pub mod thread_pool;


pub use kaya_search::Candidate;
pub use player::{Player, PlayerConfig, PlayerError};
pub use thread_pool::ThreadPool;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
