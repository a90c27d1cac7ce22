//! kaya-infer: amortizes neural-network forward passes across many search
//! threads and one or more devices.
//!
//! A [`model::Model`] performs one forward pass; an [`executor::Executor`]
//! owns one model instance plus one device-worker thread that folds queued
//! requests into bounded batches; the [`service::InferenceService`] spreads
//! callers over executors by queue load. The search side only ever sees the
//! [`service::Inference`] trait.

pub mod executor;
pub mod model;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use executor::Executor;
pub use model::{Model, ModelError, UniformModel};
pub use service::{Inference, InferenceService, ServiceError, ServiceStats};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_nonempty() {
        assert!(!VERSION.is_empty());
    }
}
