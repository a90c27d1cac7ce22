//! Load-balanced dispatch across executors.

use std::sync::Mutex;

use thiserror::Error;

use kaya_features::MODEL_OUTPUT_SIZE;

use crate::executor::Executor;
use crate::model::{Model, ModelError};

/// Service construction errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid service config: {msg}")]
    Invalid { msg: &'static str },
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Aggregate executor counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceStats {
    /// Model forward passes across all executors.
    pub forwards: u64,
    /// Input rows evaluated.
    pub rows: u64,
    /// Failed forward passes (answered with zeros).
    pub errors: u64,
}

/// The synchronous inference seam the search depends on.
///
/// `inputs` is `batch` rows of `MODEL_INPUT_SIZE` floats, `outputs` receives
/// `batch` rows of `MODEL_OUTPUT_SIZE`. Implementations are thread-safe and
/// may block the caller while a batch is assembled.
pub trait Inference: Send + Sync {
    fn execute(&self, inputs: &[f32], outputs: &mut [f32], batch: usize);
}

/// One executor per `(device, thread-on-device)` pair, with requests routed
/// to the least-loaded executor.
pub struct InferenceService {
    /// Serializes executor choice so concurrent dispatches see each other's
    /// reservations.
    dispatch: Mutex<()>,
    executors: Vec<Executor>,
}

impl InferenceService {
    /// Build one model per `(device, thread)` slot via `factory`. A factory
    /// failure (missing weights, bad device) aborts construction.
    pub fn new<F>(
        devices: &[i32],
        threads_per_device: usize,
        batch_size: usize,
        factory: F,
    ) -> Result<Self, ServiceError>
    where
        F: Fn(i32) -> Result<Box<dyn Model>, ModelError>,
    {
        if devices.is_empty() {
            return Err(ServiceError::Invalid {
                msg: "at least one device required",
            });
        }
        if threads_per_device == 0 {
            return Err(ServiceError::Invalid {
                msg: "threads_per_device must be > 0",
            });
        }
        if batch_size == 0 {
            return Err(ServiceError::Invalid {
                msg: "batch_size must be > 0",
            });
        }

        let mut executors = Vec::with_capacity(devices.len() * threads_per_device);
        for &device in devices {
            for _ in 0..threads_per_device {
                executors.push(Executor::new(factory(device)?, batch_size));
            }
        }

        Ok(Self {
            dispatch: Mutex::new(()),
            executors,
        })
    }

    pub fn executor_count(&self) -> usize {
        self.executors.len()
    }

    pub fn stats_snapshot(&self) -> ServiceStats {
        let mut stats = ServiceStats::default();
        for executor in &self.executors {
            stats.forwards += executor.forwards();
            stats.rows += executor.rows();
            stats.errors += executor.errors();
        }
        stats
    }

    /// Release every blocked caller and refuse further work. Only meant for
    /// teardown; later calls answer with zeroed outputs.
    pub fn shutdown(&self) {
        for executor in &self.executors {
            executor.shutdown();
        }
    }
}

impl Inference for InferenceService {
    fn execute(&self, inputs: &[f32], outputs: &mut [f32], batch: usize) {
        debug_assert_eq!(outputs.len(), batch * MODEL_OUTPUT_SIZE);

        // Pick the least-loaded executor and reserve the rows under the
        // dispatch lock, so a burst of callers fans out instead of piling
        // onto one momentarily idle queue.
        let index = {
            let _guard = self.dispatch.lock().unwrap();
            let mut min_index = 0;
            let mut min_load = usize::MAX;
            for (i, executor) in self.executors.iter().enumerate() {
                let load = executor.load();
                if load < min_load {
                    min_index = i;
                    min_load = load;
                }
            }
            self.executors[min_index].add_reserved(batch);
            min_index
        };

        let result = self.executors[index].execute(inputs.to_vec(), batch);
        outputs.copy_from_slice(&result);
    }
}
