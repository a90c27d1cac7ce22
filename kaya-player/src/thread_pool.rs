//! Fixed-size task executor for search workers.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    state: Mutex<PoolState>,
    condvar: Condvar,
}

struct PoolState {
    tasks: VecDeque<Task>,
    terminated: bool,
}

/// A plain queue of tasks over a fixed set of worker threads. Tasks run in
/// submission order; shutdown drops whatever is still queued.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(threads: usize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                tasks: VecDeque::new(),
                terminated: false,
            }),
            condvar: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(threads);
        for i in 0..threads {
            let worker_shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("kaya-worker-{i}"))
                .spawn(move || worker_loop(worker_shared));
            if let Ok(handle) = handle {
                workers.push(handle);
            }
        }

        Self { shared, workers }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn submit(&self, task: Task) {
        {
            let mut state = self.shared.state.lock().unwrap();
            if state.terminated {
                return;
            }
            state.tasks.push_back(task);
        }
        self.shared.condvar.notify_all();
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.terminated = true;
            self.shared.condvar.notify_all();
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let task = {
            let Ok(guard) = shared.state.lock() else {
                return;
            };
            let Ok(mut state) = shared
                .condvar
                .wait_while(guard, |s| s.tasks.is_empty() && !s.terminated)
            else {
                return;
            };

            if state.terminated {
                return;
            }
            state.tasks.pop_front()
        };

        if let Some(task) = task {
            task();
        }
    }
}
