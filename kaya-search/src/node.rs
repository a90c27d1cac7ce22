//! Search-tree nodes: selection, coordinated expansion, statistics.
//!
//! Locking: structural state (board, evaluator, children, expansion queues)
//! sits behind one `RwLock`; the value accumulator behind another; visit
//! and playout counters are atomics. Backpropagation therefore runs
//! concurrently with selection elsewhere in the tree. Locks are only ever
//! taken parent → child, never upward; workers carry the ancestor path on
//! their own stack, so nodes need no parent pointers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicI8, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rustc_hash::{FxHashMap, FxHashSet};

use kaya_core::{opposite, Color, PASS, WHITE};

use crate::evaluator::Evaluator;
use crate::policy::{temperature_power, PolicyEntry};
use crate::pool::NodePool;

/// Root-level knobs for one selection step. Levels below the root always
/// run with [`SearchOptions::inner`].
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    /// Spread visits evenly over root candidates instead of maximizing.
    pub equally: bool,
    /// UCB1 instead of PUCB for descending into existing children.
    pub use_ucb1: bool,
    /// Cap on expanded-or-queued children; 0 means uncapped.
    pub width: i32,
    /// Prior sharpening for the expansion rule.
    pub temperature: f32,
    /// Gumbel noise scale for the expansion rule.
    pub noise: f32,
}

impl SearchOptions {
    /// The fixed settings used below the root.
    pub fn inner() -> Self {
        Self {
            equally: false,
            use_ucb1: false,
            width: 0,
            temperature: 1.0,
            noise: 0.0,
        }
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::inner()
    }
}

/// Outcome of one `evaluate` step.
///
/// `next == None` ends the descent: `value` is the leaf evaluation and
/// `playouts` is 1. Otherwise the worker descends into `next`; `playouts`
/// is -1 when this step turned a former leaf into an interior node and the
/// caller should cancel `value` (the node's own evaluation) from the path.
pub struct NodeResult {
    pub next: Option<Arc<Node>>,
    pub value: f32,
    pub playouts: i32,
}

struct NodeState {
    board: kaya_core::Board,
    evaluator: Evaluator,
    children: FxHashMap<i32, Arc<Node>>,
    policies: Vec<PolicyEntry>,
    /// FIFO of candidates picked for expansion but not yet materialized.
    waiting_queue: VecDeque<PolicyEntry>,
    waiting_set: FxHashSet<i32>,
}

struct ValueStats {
    value: f32,
    count: i64,
}

pub struct Node {
    state: RwLock<NodeState>,
    // Identity of the move that produced this node. Written only while the
    // node is unshared (pool init / pause sections), read lock-free by the
    // selection formulas.
    x: AtomicI32,
    y: AtomicI32,
    color: AtomicI8,
    captured: AtomicI32,
    prior_bits: AtomicU32,
    visits: AtomicU32,
    playouts: AtomicI64,
    values: RwLock<ValueStats>,
}

impl Node {
    pub(crate) fn new(board: kaya_core::Board, evaluator: Evaluator) -> Self {
        Self {
            state: RwLock::new(NodeState {
                board,
                evaluator,
                children: FxHashMap::default(),
                policies: Vec::new(),
                waiting_queue: VecDeque::new(),
                waiting_set: FxHashSet::default(),
            }),
            x: AtomicI32::new(-1),
            y: AtomicI32::new(-1),
            // The root represents "before black's first move".
            color: AtomicI8::new(WHITE),
            captured: AtomicI32::new(0),
            prior_bits: AtomicU32::new(0.0f32.to_bits()),
            visits: AtomicU32::new(0),
            playouts: AtomicI64::new(0),
            values: RwLock::new(ValueStats {
                value: 0.0,
                count: 0,
            }),
        }
    }

    /// Return the node to its fresh-root shape for reuse from the pool.
    pub(crate) fn reset(&self) {
        let mut state = self.state.write().unwrap();
        state.board.clear();
        state.evaluator.clear();
        state.children.clear();
        state.policies.clear();
        state.waiting_queue.clear();
        state.waiting_set.clear();
        drop(state);

        self.x.store(-1, Ordering::SeqCst);
        self.y.store(-1, Ordering::SeqCst);
        self.color.store(WHITE, Ordering::SeqCst);
        self.captured.store(0, Ordering::SeqCst);
        self.prior_bits.store(0.0f32.to_bits(), Ordering::SeqCst);
        self.visits.store(0, Ordering::SeqCst);
        self.playouts.store(0, Ordering::SeqCst);
        let mut values = self.values.write().unwrap();
        values.value = 0.0;
        values.count = 0;
    }

    /// Initialize this node as the continuation of `prev` by `(x, y)`.
    fn set_as_next_node(&self, prev: &Node, prev_state: &NodeState, x: i32, y: i32, prior: f32) {
        let mut state = self.state.write().unwrap();
        let color = opposite(prev.color());
        state.board.copy_from(&prev_state.board);
        let captured = state.board.play(x, y, color);
        drop(state);

        self.x.store(x, Ordering::SeqCst);
        self.y.store(y, Ordering::SeqCst);
        self.color.store(color, Ordering::SeqCst);
        self.captured.store(captured, Ordering::SeqCst);
        self.prior_bits.store(prior.to_bits(), Ordering::SeqCst);
    }

    /// One selection step: evaluate on first visit, otherwise schedule or
    /// materialize an expansion, or hand back the best existing child.
    ///
    /// `eval_leaf_only` applies to the whole search and controls the
    /// cancel signal when a node stops being a leaf.
    pub fn evaluate(
        &self,
        pool: &NodePool,
        opts: &SearchOptions,
        eval_leaf_only: bool,
    ) -> NodeResult {
        let mut guard = self.state.write().unwrap();
        let state = &mut *guard;

        if !state.evaluator.is_evaluated() {
            let to_move = opposite(self.color());
            state.evaluator.evaluate(&mut state.board, to_move);
            state.policies = state.evaluator.policies().to_vec();
        }

        let visits = self.visits.fetch_add(1, Ordering::SeqCst) + 1;

        // First visit and terminal nodes report their own evaluation.
        if visits == 1 || state.policies.is_empty() {
            return NodeResult {
                next: None,
                value: state.evaluator.value(),
                playouts: 1,
            };
        }

        let board_width = state.board.width();

        // Expansion scheduling: while there is both policy and width room,
        // pick the best adjusted candidate and queue it if it is new.
        let registered = state.children.len() + state.waiting_set.len();
        if registered < state.policies.len()
            && (opts.width <= 0 || (registered as i32) < opts.width)
        {
            let mean = self.get_value();
            let win_chance = (mean * opposite(self.color()) as f32) / 2.0 + 0.5;
            let power = temperature_power(win_chance, opts.temperature);
            // With a handful of candidates, noise only hurts.
            let noise = if state.policies.len() <= 4 {
                0.0
            } else {
                opts.noise
            };

            let mut rng = rand::thread_rng();
            let mut best: Option<(usize, (u8, f32))> = None;

            for (i, entry) in state.policies.iter().enumerate() {
                let position = entry.y * board_width + entry.x;
                let present = state.children.contains_key(&position)
                    || state.waiting_set.contains(&position);
                // Under `equally`, fresh candidates outrank expanded ones
                // outright, giving even sibling coverage.
                let kind: u8 = if opts.equally && present { 0 } else { 1 };
                let priority = entry.priority(power, noise, &mut rng);

                let better = match &best {
                    None => true,
                    Some((_, (best_kind, best_priority))) => {
                        kind > *best_kind || (kind == *best_kind && priority > *best_priority)
                    }
                };
                if better {
                    best = Some((i, (kind, priority)));
                }
            }

            if let Some((i, _)) = best {
                state.policies[i].visits += 1;
                let entry = state.policies[i].clone();
                let position = entry.y * board_width + entry.x;
                if !state.children.contains_key(&position)
                    && !state.waiting_set.contains(&position)
                {
                    state.waiting_set.insert(position);
                    state.waiting_queue.push_back(entry);
                }
            }
        }

        // Materialize the oldest queued candidate. FIFO keeps sibling
        // creation fair when many workers race through here.
        if !state.waiting_queue.is_empty()
            && (opts.width <= 0 || (state.children.len() as i32) < opts.width)
        {
            if let Some(entry) = state.waiting_queue.pop_front() {
                let position = entry.y * board_width + entry.x;
                state.waiting_set.remove(&position);

                if !state.children.contains_key(&position) {
                    let node = pool.acquire();
                    node.set_as_next_node(self, state, entry.x, entry.y, entry.prior);
                    state.children.insert(position, Arc::clone(&node));

                    // Branching event: the node's own evaluation stops
                    // counting once it has a child.
                    let playouts =
                        if eval_leaf_only && state.children.len() == 1 {
                            -1
                        } else {
                            0
                        };
                    return NodeResult {
                        next: Some(node),
                        value: state.evaluator.value(),
                        playouts,
                    };
                }
            }
        }

        // Descend into the best existing child.
        let mut children: Vec<(Arc<Node>, f32)> = state
            .children
            .values()
            .map(|child| {
                let score = child.get_value_lcb() * child.color() as f32;
                (Arc::clone(child), score)
            })
            .collect();

        if children.is_empty() {
            return NodeResult {
                next: None,
                value: state.evaluator.value(),
                playouts: 1,
            };
        }

        if opts.width > 0 && children.len() as i32 > opts.width {
            children.sort_by(|a, b| b.1.total_cmp(&a.1));
            children.truncate(opts.width as usize);
        }

        let total_visits = visits as i32;
        let mut max_node = Arc::clone(&children[0].0);
        let mut max_priority = -1.0f32;

        for (child, _) in &children {
            let priority = if opts.equally {
                let child_visits = child.get_visits() as f32;
                let value = child.get_value() * child.color() as f32;
                1.0 / (child_visits + 1.0 - value * 0.5)
            } else if opts.use_ucb1 {
                child.priority_ucb1(total_visits)
            } else {
                child.priority_pucb(total_visits)
            };

            if max_priority < priority {
                max_node = Arc::clone(child);
                max_priority = priority;
            }
        }

        NodeResult {
            next: Some(max_node),
            value: 0.0,
            playouts: 0,
        }
    }

    /// Add one back-propagated value sample.
    pub fn update_value(&self, value: f32) {
        let mut values = self.values.write().unwrap();
        values.value += value;
        values.count += 1;
    }

    /// Remove one previously added value sample (leaf-only accounting).
    pub fn cancel_value(&self, value: f32) {
        let mut values = self.values.write().unwrap();
        values.value -= value;
        values.count -= 1;
    }

    pub fn add_playouts(&self, playouts: i64) {
        self.playouts.fetch_add(playouts, Ordering::SeqCst);
    }

    /// Sample a move from the raw policy sharpened by `1/temperature`.
    /// Never searches; returns a pass when there are no candidates.
    pub fn get_random_move(&self, temperature: f32) -> (i32, i32) {
        let temperature = temperature.max(0.1);
        let mut guard = self.state.write().unwrap();
        let state = &mut *guard;

        if !state.evaluator.is_evaluated() {
            let to_move = opposite(self.color());
            state.evaluator.evaluate(&mut state.board, to_move);
            state.policies = state.evaluator.policies().to_vec();
        }

        if state.policies.is_empty() {
            return PASS;
        }

        let weights: Vec<f32> = state
            .policies
            .iter()
            .map(|p| p.prior.max(0.0).powf(1.0 / temperature))
            .collect();

        match WeightedIndex::new(&weights) {
            Ok(dist) => {
                let index = dist.sample(&mut rand::thread_rng());
                (state.policies[index].x, state.policies[index].y)
            }
            // Degenerate weights: fall back to the strongest prior.
            Err(_) => best_prior(&state.policies),
        }
    }

    /// The raw-policy argmax move, or a pass without candidates.
    pub fn get_policy_move(&self) -> (i32, i32) {
        let mut guard = self.state.write().unwrap();
        let state = &mut *guard;

        if !state.evaluator.is_evaluated() {
            let to_move = opposite(self.color());
            state.evaluator.evaluate(&mut state.board, to_move);
            state.policies = state.evaluator.policies().to_vec();
        }

        if state.policies.is_empty() {
            return PASS;
        }
        best_prior(&state.policies)
    }

    pub fn x(&self) -> i32 {
        self.x.load(Ordering::SeqCst)
    }

    pub fn y(&self) -> i32 {
        self.y.load(Ordering::SeqCst)
    }

    pub fn color(&self) -> Color {
        self.color.load(Ordering::SeqCst)
    }

    pub fn captured(&self) -> i32 {
        self.captured.load(Ordering::SeqCst)
    }

    pub fn prior(&self) -> f32 {
        f32::from_bits(self.prior_bits.load(Ordering::SeqCst))
    }

    pub fn get_children(&self) -> Vec<Arc<Node>> {
        self.state
            .read()
            .unwrap()
            .children
            .values()
            .map(Arc::clone)
            .collect()
    }

    /// The child reached by `(x, y)`, or a fresh continuation node that is
    /// NOT registered as a child (the caller owns it).
    pub fn get_child(&self, pool: &NodePool, x: i32, y: i32) -> Arc<Node> {
        let state = self.state.write().unwrap();
        let position = y * state.board.width() + x;

        if let Some(child) = state.children.get(&position) {
            return Arc::clone(child);
        }

        let node = pool.acquire();
        node.set_as_next_node(self, &state, x, y, 1.0);
        node
    }

    pub fn get_visits(&self) -> u32 {
        self.visits.load(Ordering::SeqCst)
    }

    pub fn get_playouts(&self) -> i64 {
        self.playouts.load(Ordering::SeqCst)
    }

    /// Mean back-propagated value, black-positive; 0 before any sample.
    pub fn get_value(&self) -> f32 {
        let values = self.values.read().unwrap();
        if values.count == 0 {
            0.0
        } else {
            values.value / values.count as f32
        }
    }

    /// Lower confidence bound on the mean value, from this node's own
    /// color's perspective.
    pub fn get_value_lcb(&self) -> f32 {
        let (value, count) = {
            let values = self.values.read().unwrap();
            (values.value, values.count)
        };
        if count == 0 {
            return 0.0;
        }
        let mean = value / count as f32;
        let lower = 1.96 * 0.5 / ((self.get_visits() + 1) as f32).sqrt();
        mean - lower * self.color() as f32
    }

    /// PUCB priority seen from the parent. Unevaluated nodes sink to a
    /// sentinel so they are only picked when nothing has a value yet.
    pub fn priority_pucb(&self, total_visits: i32) -> f32 {
        let (value, count) = {
            let values = self.values.read().unwrap();
            (values.value, values.count)
        };
        if count == 0 {
            return -99.0;
        }
        let c_puct = ((1.0 + total_visits as f64 + 19652.0) / 19652.0).ln() as f32 + 1.25;
        let q = (value / count as f32) * self.color() as f32;
        let upper = c_puct * self.prior() * (total_visits as f32).sqrt()
            / (1 + self.get_visits()) as f32;
        q + 2.0 * upper
    }

    /// UCB1 priority seen from the parent.
    pub fn priority_ucb1(&self, total_visits: i32) -> f32 {
        let (value, count) = {
            let values = self.values.read().unwrap();
            (values.value, values.count)
        };
        if count == 0 {
            return -99.0;
        }
        let q = (value / count as f32) * self.color() as f32;
        let upper = 0.5 * ((total_visits as f32).ln() / (self.get_visits() + 1) as f32).sqrt();
        q + upper
    }

    /// Principal variation: this node's move, then the most-visited child's
    /// variation, recursively.
    pub fn get_variations(&self) -> Vec<(i32, i32)> {
        let state = self.state.read().unwrap();
        let mut variations = vec![(self.x(), self.y())];

        let mut max_visits = 0;
        let mut max_child: Option<Arc<Node>> = None;
        for child in state.children.values() {
            let child_visits = child.get_visits();
            if child_visits > max_visits {
                max_visits = child_visits;
                max_child = Some(Arc::clone(child));
            }
        }
        drop(state);

        if let Some(child) = max_child {
            variations.extend(child.get_variations());
        }

        variations
    }

    pub fn get_board_state(&self) -> Vec<i32> {
        self.state.read().unwrap().board.get_state()
    }
}

fn best_prior(policies: &[PolicyEntry]) -> (i32, i32) {
    let mut best = &policies[0];
    for policy in policies {
        if policy.prior > best.prior {
            best = policy;
        }
    }
    (best.x, best.y)
}
