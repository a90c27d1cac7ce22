//! Pooled node storage.
//!
//! One pool per player. It grows on demand and never shrinks; released
//! nodes are reset and parked on a free list. Release only ever happens
//! while the owning player has drained its workers, so no live descent can
//! hold a pointer into a recycled node.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashSet;

use kaya_core::{Board, Rule};
use kaya_infer::Inference;

use crate::evaluator::Evaluator;
use crate::node::Node;

/// Everything a fresh node needs.
#[derive(Clone)]
pub struct NodeContext {
    pub infer: Arc<dyn Inference>,
    pub width: i32,
    pub height: i32,
    pub komi: f32,
    pub rule: Rule,
    pub superko: bool,
}

struct PoolInner {
    nodes: Vec<Arc<Node>>,
    free: Vec<Arc<Node>>,
    used: FxHashSet<usize>,
}

pub struct NodePool {
    context: NodeContext,
    inner: Mutex<PoolInner>,
}

impl NodePool {
    pub fn new(context: NodeContext) -> Self {
        Self {
            context,
            inner: Mutex::new(PoolInner {
                nodes: Vec::new(),
                free: Vec::new(),
                used: FxHashSet::default(),
            }),
        }
    }

    pub fn context(&self) -> &NodeContext {
        &self.context
    }

    /// A brand-new node for use as a root. Roots never come from the free
    /// list; the previous root may still be referenced while it is swapped
    /// out.
    pub fn create_root(&self) -> Arc<Node> {
        let node = Arc::new(self.new_node());
        let mut inner = self.inner.lock().unwrap();
        inner.used.insert(Arc::as_ptr(&node) as usize);
        inner.nodes.push(Arc::clone(&node));
        node
    }

    /// A node for tree growth: recycled when possible.
    pub fn acquire(&self) -> Arc<Node> {
        let mut inner = self.inner.lock().unwrap();

        let node = match inner.free.pop() {
            Some(node) => node,
            None => {
                let node = Arc::new(self.new_node());
                inner.nodes.push(Arc::clone(&node));
                node
            }
        };

        inner.used.insert(Arc::as_ptr(&node) as usize);
        node
    }

    /// Reset a node and park it for reuse. Unknown nodes are ignored.
    pub fn release(&self, node: &Arc<Node>) {
        let mut inner = self.inner.lock().unwrap();
        let key = Arc::as_ptr(node) as usize;
        if !inner.used.remove(&key) {
            return;
        }
        node.reset();
        inner.free.push(Arc::clone(node));
    }

    /// `(total, in-use, free)` node counts, for diagnostics.
    pub fn counts(&self) -> (usize, usize, usize) {
        let inner = self.inner.lock().unwrap();
        (inner.nodes.len(), inner.used.len(), inner.free.len())
    }

    fn new_node(&self) -> Node {
        let board = Board::new(self.context.width, self.context.height);
        let evaluator = Evaluator::new(
            Arc::clone(&self.context.infer),
            self.context.komi,
            self.context.rule,
            self.context.superko,
        );
        Node::new(board, evaluator)
    }
}
