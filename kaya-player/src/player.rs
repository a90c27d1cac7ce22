//! The player: search orchestration between game events.
//!
//! One dispatcher thread feeds evaluation tasks to the worker pool whenever
//! search is live and a worker slot is free. Every externally visible
//! mutation runs a pause-drain-mutate-resume section: raise `paused`, wait
//! for `runnings == 0`, change the tree, drop `paused`, notify. That drain
//! is the only cancellation point a running descent ever observes.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

use kaya_core::{handicap_positions, opposite, Color, Config, Rule, BLACK};
use kaya_infer::Inference;
use kaya_search::{Candidate, Node, NodeContext, NodePool, NodeResult, SearchOptions};

use crate::thread_pool::ThreadPool;

/// Player construction errors.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("invalid player config: {msg}")]
    InvalidConfig { msg: &'static str },
}

/// Static player setup. Search-mode knobs arrive per episode through
/// [`Player::start_evaluation`].
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub threads: usize,
    pub width: i32,
    pub height: i32,
    pub komi: f32,
    pub rule: Rule,
    pub superko: bool,
    pub eval_leaf_only: bool,
}

impl PlayerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            threads: config.search.threads,
            width: config.game.boardsize,
            height: config.game.boardsize,
            komi: config.game.komi,
            rule: config.game.rule,
            superko: config.game.superko,
            eval_leaf_only: config.search.eval_leaf_only,
        }
    }
}

/// Per-episode search mode, latched by `start_evaluation` and applied at
/// the root of every descent.
#[derive(Debug, Clone, Copy)]
struct SearchMode {
    equally: bool,
    use_ucb1: bool,
    width: i32,
    temperature: f32,
    noise: f32,
}

struct PlayerState {
    root: Arc<Node>,
    mode: SearchMode,
    /// Dispatched evaluation tasks this episode, seeded from the root.
    search_visits: i64,
    /// Completed playouts this episode, seeded from the root.
    search_playouts: i64,
    runnings: i32,
    paused: bool,
    stopped: bool,
    terminated: bool,
}

struct PlayerShared {
    state: Mutex<PlayerState>,
    condvar: Condvar,
    pool: NodePool,
    workers: ThreadPool,
    eval_leaf_only: bool,
}

/// Orchestrates the search tree across moves, pondering and cancellation.
pub struct Player {
    shared: Arc<PlayerShared>,
    dispatcher: Option<JoinHandle<()>>,
}

impl Player {
    pub fn new(infer: Arc<dyn Inference>, config: PlayerConfig) -> Result<Self, PlayerError> {
        if config.threads == 0 {
            return Err(PlayerError::InvalidConfig {
                msg: "threads must be > 0",
            });
        }
        if config.width < 2 || config.height < 2 {
            return Err(PlayerError::InvalidConfig {
                msg: "board must be at least 2x2",
            });
        }

        let pool = NodePool::new(NodeContext {
            infer,
            width: config.width,
            height: config.height,
            komi: config.komi,
            rule: config.rule,
            superko: config.superko,
        });
        let root = pool.create_root();

        let shared = Arc::new(PlayerShared {
            state: Mutex::new(PlayerState {
                root,
                mode: SearchMode {
                    equally: false,
                    use_ucb1: false,
                    width: 0,
                    temperature: 1.0,
                    noise: 0.0,
                },
                search_visits: 0,
                search_playouts: 0,
                runnings: 0,
                paused: false,
                stopped: true,
                terminated: false,
            }),
            condvar: Condvar::new(),
            pool,
            workers: ThreadPool::new(config.threads),
            eval_leaf_only: config.eval_leaf_only,
        });

        let dispatcher_shared = Arc::clone(&shared);
        let dispatcher = thread::Builder::new()
            .name("kaya-player-dispatch".to_string())
            .spawn(move || dispatcher_loop(dispatcher_shared))
            .ok();

        Ok(Self { shared, dispatcher })
    }

    /// Drop the whole tree and restart from an empty board. Configuration
    /// survives.
    pub fn initialize(&self) {
        self.paused_section(|shared, state| {
            let old_root = Arc::clone(&state.root);
            state.root = shared.pool.create_root();
            release_subtree(&shared.pool, &old_root, &state.root);
            state.search_visits = 0;
            state.search_playouts = 0;
        });
    }

    /// Advance the game by one move of the side to play. Returns captured
    /// stones, or -1 when the move is rejected (the tree is untouched).
    pub fn play(&self, x: i32, y: i32) -> i32 {
        self.paused_section(|shared, state| {
            let old_root = Arc::clone(&state.root);
            let next = old_root.get_child(&shared.pool, x, y);
            let captured = next.captured();

            if captured < 0 {
                // The scratch node never joined the tree; recycle it.
                shared.pool.release(&next);
                return -1;
            }

            state.root = next;
            release_subtree(&shared.pool, &old_root, &state.root);
            captured
        })
    }

    /// Place fixed handicap stones on the star points, passing for white
    /// between them.
    pub fn set_handicap(&self, handicap: u32) {
        let (width, height) = {
            let context = self.shared.pool.context();
            (context.width, context.height)
        };

        for (x, y) in handicap_positions(width, height, handicap) {
            if self.get_color() != BLACK {
                self.play(-1, -1);
            }
            self.play(x, y);
        }
    }

    /// A synthetic pass candidate carrying the current root value.
    pub fn get_pass(&self) -> Vec<Candidate> {
        self.paused_section(|_, state| {
            vec![Candidate {
                x: -1,
                y: -1,
                color: opposite(state.root.color()),
                visits: 0,
                playouts: 0,
                policy: 1.0,
                value: state.root.get_value(),
                variations: Vec::new(),
            }]
        })
    }

    /// Sample one move from the raw policy sharpened by `1/temperature`.
    pub fn get_random(&self, temperature: f32) -> Vec<Candidate> {
        self.paused_section(|_, state| {
            let (x, y) = state.root.get_random_move(temperature);
            vec![Candidate {
                x,
                y,
                color: opposite(state.root.color()),
                visits: 0,
                playouts: 0,
                policy: 1.0,
                value: state.root.get_value(),
                variations: Vec::new(),
            }]
        })
    }

    /// Switch the search mode and let the dispatcher run. Episode counters
    /// continue from the root's accumulated statistics, so pondered work
    /// counts toward the next wait.
    pub fn start_evaluation(
        &self,
        equally: bool,
        use_ucb1: bool,
        width: i32,
        temperature: f32,
        noise: f32,
    ) {
        self.paused_section(|_, state| {
            state.mode = SearchMode {
                equally,
                use_ucb1,
                width,
                temperature: if temperature > 0.0 { temperature } else { 1.0 },
                noise,
            };
            state.search_visits = state.root.get_visits() as i64;
            state.search_playouts = state.root.get_playouts();
            state.stopped = false;
        });
    }

    /// Block until the episode reaches both targets or the time limit
    /// passes. With `stop`, search transitions to stopped on return.
    pub fn wait_evaluation(&self, visits: i64, playouts: i64, timelimit: f32, stop: bool) {
        let deadline = Instant::now() + Duration::from_secs_f32(timelimit.max(0.0));
        let mut state = self.shared.state.lock().unwrap();

        loop {
            if state.search_visits >= visits && state.search_playouts >= playouts {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let (guard, _) = self
                .shared
                .condvar
                .wait_timeout(state, deadline - now)
                .unwrap();
            state = guard;
        }

        if stop {
            state.stopped = true;
            self.shared.condvar.notify_all();
        }
    }

    /// The root's children with their statistics; falls back to the raw
    /// policy's best move when nothing has been expanded.
    pub fn get_candidates(&self) -> Vec<Candidate> {
        self.paused_section(|_, state| {
            let mut candidates: Vec<Candidate> = state
                .root
                .get_children()
                .iter()
                .map(|child| Candidate {
                    x: child.x(),
                    y: child.y(),
                    color: child.color(),
                    visits: child.get_visits(),
                    playouts: child.get_playouts(),
                    policy: child.prior(),
                    value: child.get_value(),
                    variations: child.get_variations(),
                })
                .collect();

            if candidates.is_empty() {
                let (x, y) = state.root.get_policy_move();
                candidates.push(Candidate {
                    x,
                    y,
                    color: opposite(state.root.color()),
                    visits: 0,
                    playouts: 0,
                    policy: 1.0,
                    value: state.root.get_value(),
                    variations: Vec::new(),
                });
            }

            candidates
        })
    }

    /// The color that moves next.
    pub fn get_color(&self) -> Color {
        let root = {
            let state = self.shared.state.lock().unwrap();
            Arc::clone(&state.root)
        };
        opposite(root.color())
    }

    /// Compact snapshot of the root board.
    pub fn get_board_state(&self) -> Vec<i32> {
        let root = {
            let state = self.shared.state.lock().unwrap();
            Arc::clone(&state.root)
        };
        root.get_board_state()
    }

    /// `(search_visits, search_playouts)` of the current episode.
    pub fn search_totals(&self) -> (i64, i64) {
        let state = self.shared.state.lock().unwrap();
        (state.search_visits, state.search_playouts)
    }

    /// `(total, in-use, free)` node-pool counts.
    pub fn pool_counts(&self) -> (usize, usize, usize) {
        self.shared.pool.counts()
    }

    fn paused_section<R>(&self, f: impl FnOnce(&PlayerShared, &mut PlayerState) -> R) -> R {
        let shared = &self.shared;
        let mut state: MutexGuard<'_, PlayerState> = shared.state.lock().unwrap();

        state.paused = true;
        while state.runnings > 0 {
            state = shared.condvar.wait(state).unwrap();
        }

        let result = f(shared, &mut state);

        state.paused = false;
        shared.condvar.notify_all();
        result
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.terminated = true;
            state.stopped = true;
            self.shared.condvar.notify_all();
        }
        if let Some(dispatcher) = self.dispatcher.take() {
            let _ = dispatcher.join();
        }
    }
}

fn dispatcher_loop(shared: Arc<PlayerShared>) {
    let pool_size = shared.workers.size() as i32;

    loop {
        {
            let Ok(guard) = shared.state.lock() else {
                return;
            };
            let Ok(mut state) = shared.condvar.wait_while(guard, |s| {
                !s.terminated && (s.stopped || s.paused || s.runnings >= pool_size)
            }) else {
                return;
            };

            if state.terminated {
                return;
            }

            state.search_visits += 1;
            state.runnings += 1;
        }

        let task_shared = Arc::clone(&shared);
        shared.workers.submit(Box::new(move || {
            let playouts = run_descent(&task_shared);

            let mut state = task_shared.state.lock().unwrap();
            state.runnings -= 1;
            state.search_playouts += playouts;
            task_shared.condvar.notify_all();
        }));
    }
}

/// One full descent: walk down from the root, then push the leaf value
/// back up the captured path. Returns the net playouts of the descent.
fn run_descent(shared: &PlayerShared) -> i64 {
    let (root, mode) = {
        let state = shared.state.lock().unwrap();
        (Arc::clone(&state.root), state.mode)
    };

    let mut opts = SearchOptions {
        equally: mode.equally,
        use_ucb1: mode.use_ucb1,
        width: mode.width,
        temperature: mode.temperature,
        noise: mode.noise,
    };

    let mut path = vec![root];
    let mut playouts: i64 = 0;

    let value = loop {
        let result: NodeResult = match path.last() {
            Some(node) => node.evaluate(&shared.pool, &opts, shared.eval_leaf_only),
            None => return 0,
        };

        match result.next {
            Some(next) => {
                if result.playouts < 0 {
                    // The tip of the path stopped being a leaf: withdraw its
                    // own evaluation from everything above it.
                    for node in &path {
                        node.cancel_value(result.value);
                        node.add_playouts(-1);
                    }
                    playouts -= 1;
                }
                path.push(next);
            }
            None => {
                playouts += result.playouts as i64;
                break result.value;
            }
        }

        // Root-only knobs never apply below the root.
        opts = SearchOptions::inner();
    };

    for node in &path {
        node.update_value(value);
        node.add_playouts(1);
    }

    playouts
}

/// Return every node of `old_root`'s subtree to the pool except `keep`.
/// Children are collected before each release since releasing clears them.
fn release_subtree(pool: &NodePool, old_root: &Arc<Node>, keep: &Arc<Node>) {
    let mut stack = vec![Arc::clone(old_root)];

    while let Some(node) = stack.pop() {
        if Arc::ptr_eq(&node, keep) {
            continue;
        }
        stack.extend(node.get_children());
        pool.release(&node);
    }
}
