//! One model instance, one device-worker thread, one bounded-batch queue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use kaya_features::{MODEL_INPUT_SIZE, MODEL_OUTPUT_SIZE};

use crate::model::Model;

/// A queued inference request. The caller blocks on the channel until the
/// worker has scattered its slice of the batch back.
struct Job {
    inputs: Vec<f32>,
    size: usize,
    tx: mpsc::Sender<Vec<f32>>,
}

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    /// Sum of sizes of queued jobs.
    waiting: usize,
    /// Rows promised by the dispatcher but not yet queued.
    reserved: usize,
    terminated: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    condvar: Condvar,
    batch_size: usize,
    forwards: AtomicU64,
    rows: AtomicU64,
    errors: AtomicU64,
}

/// Executes inference requests on one device-worker thread, folding queued
/// requests into batches of up to `batch_size` rows per forward pass.
pub struct Executor {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Executor {
    pub fn new(model: Box<dyn Model>, batch_size: usize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::default()),
            condvar: Condvar::new(),
            batch_size: batch_size.max(1),
            forwards: AtomicU64::new(0),
            rows: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("kaya-infer-worker".to_string())
            .spawn(move || worker_loop(worker_shared, model))
            .ok();

        // Without a worker thread nothing would ever drain the queue; fail
        // closed so callers get immediate zero answers instead of blocking.
        if worker.is_none() {
            if let Ok(mut state) = shared.state.lock() {
                state.terminated = true;
            }
        }

        Self { shared, worker }
    }

    /// Run `size` rows through the model, blocking until the outputs are
    /// ready. A terminated executor answers immediately with zeros.
    pub fn execute(&self, inputs: Vec<f32>, size: usize) -> Vec<f32> {
        debug_assert_eq!(inputs.len(), size * MODEL_INPUT_SIZE);
        let (tx, rx) = mpsc::channel();

        {
            let mut state = match self.shared.state.lock() {
                Ok(state) => state,
                Err(_) => return vec![0.0; size * MODEL_OUTPUT_SIZE],
            };
            state.reserved = state.reserved.saturating_sub(size);
            if state.terminated {
                return vec![0.0; size * MODEL_OUTPUT_SIZE];
            }
            state.waiting += size;
            state.jobs.push_back(Job { inputs, size, tx });
            self.shared.condvar.notify_all();
        }

        rx.recv()
            .unwrap_or_else(|_| vec![0.0; size * MODEL_OUTPUT_SIZE])
    }

    /// Queued plus promised rows, the dispatcher's load measure.
    pub fn load(&self) -> usize {
        match self.shared.state.lock() {
            Ok(state) => state.waiting + state.reserved,
            Err(_) => usize::MAX,
        }
    }

    /// Promise `size` rows to this executor ahead of the actual `execute`.
    pub fn add_reserved(&self, size: usize) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.reserved += size;
        }
    }

    pub fn forwards(&self) -> u64 {
        self.shared.forwards.load(Ordering::Relaxed)
    }

    pub fn rows(&self) -> u64 {
        self.shared.rows.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.shared.errors.load(Ordering::Relaxed)
    }

    /// Stop accepting work and release every queued caller with zeroed
    /// outputs. Callers blocked mid-batch still receive real results.
    pub fn shutdown(&self) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.terminated = true;
            self.shared.condvar.notify_all();
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: Arc<Shared>, mut model: Box<dyn Model>) {
    loop {
        // Collect up to batch_size rows, or every drained job on shutdown.
        let mut jobs: Vec<Job> = Vec::new();

        {
            let Ok(guard) = shared.state.lock() else {
                return;
            };
            let Ok(mut state) = shared
                .condvar
                .wait_while(guard, |s| s.jobs.is_empty() && !s.terminated)
            else {
                return;
            };

            if state.terminated {
                // Unblock every caller; shutdown only happens at teardown,
                // so zero outputs are acceptable.
                while let Some(job) = state.jobs.pop_front() {
                    state.waiting = state.waiting.saturating_sub(job.size);
                    let _ = job.tx.send(vec![0.0; job.size * MODEL_OUTPUT_SIZE]);
                }
                return;
            }

            let mut batch_rows = 0;
            while batch_rows < shared.batch_size {
                let Some(job) = state.jobs.pop_front() else {
                    break;
                };
                state.waiting = state.waiting.saturating_sub(job.size);
                batch_rows += job.size;
                jobs.push(job);
            }
        }

        if jobs.is_empty() {
            continue;
        }

        // Concatenate, forward once, scatter back.
        let total: usize = jobs.iter().map(|j| j.size).sum();
        let mut inputs = Vec::with_capacity(total * MODEL_INPUT_SIZE);
        for job in &jobs {
            inputs.extend_from_slice(&job.inputs);
        }
        let mut outputs = vec![0.0f32; total * MODEL_OUTPUT_SIZE];

        if let Err(err) = model.forward(&inputs, &mut outputs, total) {
            // Degrade to a neutral evaluation and keep serving.
            eprintln!("kaya-infer-worker: {err}");
            outputs.fill(0.0);
            shared.errors.fetch_add(1, Ordering::Relaxed);
        }

        shared.forwards.fetch_add(1, Ordering::Relaxed);
        shared.rows.fetch_add(total as u64, Ordering::Relaxed);

        let mut offset = 0;
        for job in jobs {
            let rows = job.size * MODEL_OUTPUT_SIZE;
            let _ = job.tx.send(outputs[offset..offset + rows].to_vec());
            offset += rows;
        }
    }
}
