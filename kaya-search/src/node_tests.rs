use std::sync::Arc;

use kaya_core::{Rule, BLACK, PASS, WHITE};
use kaya_features::{MODEL_AREA, MODEL_OUTPUT_SIZE, VALUE_OFFSET};
use kaya_infer::Inference;

use crate::node::{Node, NodeResult, SearchOptions};
use crate::pool::{NodeContext, NodePool};

/// Uniform policy plus a fixed raw win probability, no batching involved.
struct StubInfer {
    raw_value: f32,
}

impl Inference for StubInfer {
    fn execute(&self, _inputs: &[f32], outputs: &mut [f32], batch: usize) {
        for row in 0..batch {
            let base = row * MODEL_OUTPUT_SIZE;
            for cell in 0..MODEL_AREA {
                outputs[base + cell] = 1.0 / MODEL_AREA as f32;
            }
            outputs[base + VALUE_OFFSET] = self.raw_value;
        }
    }
}

fn make_pool(raw_value: f32, size: i32) -> NodePool {
    NodePool::new(NodeContext {
        infer: Arc::new(StubInfer { raw_value }),
        width: size,
        height: size,
        komi: 7.5,
        rule: Rule::Chinese,
        superko: false,
    })
}

/// One worker descent: walk down, then back the leaf value up the path.
/// Mirrors what the player's search task does.
fn descend(root: &Arc<Node>, pool: &NodePool, opts: SearchOptions, eval_leaf_only: bool) -> i64 {
    let mut path = vec![Arc::clone(root)];
    let mut level_opts = opts;
    let mut playouts: i64 = 0;

    let value = loop {
        let result: NodeResult = path
            .last()
            .expect("path never empty")
            .evaluate(pool, &level_opts, eval_leaf_only);

        match result.next {
            Some(next) => {
                if result.playouts < 0 {
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

        level_opts = SearchOptions::inner();
    };

    for node in &path {
        node.update_value(value);
        node.add_playouts(1);
    }

    playouts
}

#[test]
fn first_visit_is_a_leaf_evaluation() {
    let pool = make_pool(0.5, 9);
    let root = pool.create_root();

    let result = root.evaluate(&pool, &SearchOptions::inner(), false);
    assert!(result.next.is_none());
    assert_eq!(result.playouts, 1);
    assert!(result.value.abs() < 1e-6);
    assert_eq!(root.get_visits(), 1);
    assert!(root.get_children().is_empty());
}

#[test]
fn children_visits_sum_to_root_visits_minus_one() {
    let pool = make_pool(0.5, 9);
    let root = pool.create_root();

    for _ in 0..20 {
        descend(&root, &pool, SearchOptions::inner(), false);
    }

    let children = root.get_children();
    assert!(!children.is_empty());
    let child_visits: u32 = children.iter().map(|c| c.get_visits()).sum();
    assert_eq!(child_visits, root.get_visits() - 1);

    // The root plays white-before-first-move, so every child is black.
    for child in &children {
        assert_eq!(child.color(), BLACK);
    }
}

#[test]
fn width_caps_expansion() {
    let pool = make_pool(0.5, 9);
    let root = pool.create_root();
    let opts = SearchOptions {
        width: 2,
        ..SearchOptions::inner()
    };

    for _ in 0..15 {
        descend(&root, &pool, opts, false);
    }

    assert!(root.get_children().len() <= 2);
    assert!(root.get_visits() >= 15);
}

#[test]
fn equally_mode_spreads_over_fresh_candidates() {
    let pool = make_pool(0.5, 9);
    let root = pool.create_root();
    let opts = SearchOptions {
        equally: true,
        ..SearchOptions::inner()
    };

    for _ in 0..8 {
        descend(&root, &pool, opts, false);
    }

    // Every descent past the first materializes a new sibling.
    assert_eq!(root.get_children().len(), 7);
}

#[test]
fn lcb_stays_below_the_mean_for_black_children() {
    let pool = make_pool(0.7, 9);
    let root = pool.create_root();

    for _ in 0..12 {
        descend(&root, &pool, SearchOptions::inner(), false);
    }

    for child in root.get_children() {
        assert_eq!(child.color(), BLACK);
        assert!(child.get_value_lcb() <= child.get_value() + 1e-6);
        assert!(child.get_value().abs() <= 1.0 + 1e-6);
        assert!(child.get_value_lcb().abs() <= 2.0);
    }
}

#[test]
fn leaf_only_accounting_keeps_leaf_averages() {
    let pool = make_pool(0.7, 9);
    let root = pool.create_root();

    // First descent: the root itself is the leaf (value 0.4 black-positive).
    descend(&root, &pool, SearchOptions::inner(), true);
    assert!((root.get_value() - 0.4).abs() < 1e-5);
    assert_eq!(root.get_playouts(), 1);

    // Second descent births the first child; the root's own evaluation is
    // cancelled and only the child leaf (-0.4, white to move) remains.
    descend(&root, &pool, SearchOptions::inner(), true);
    assert!((root.get_value() + 0.4).abs() < 1e-5);
    assert_eq!(root.get_playouts(), 1);
}

#[test]
fn plain_accounting_mixes_interior_values() {
    let pool = make_pool(0.7, 9);
    let root = pool.create_root();

    descend(&root, &pool, SearchOptions::inner(), false);
    descend(&root, &pool, SearchOptions::inner(), false);

    // 0.4 from the root's own evaluation, -0.4 from the child leaf.
    assert!(root.get_value().abs() < 1e-5);
    assert_eq!(root.get_playouts(), 2);
}

#[test]
fn variations_follow_most_visited_children() {
    let pool = make_pool(0.5, 9);
    let root = pool.create_root();

    for _ in 0..10 {
        descend(&root, &pool, SearchOptions::inner(), false);
    }

    let variations = root.get_variations();
    assert_eq!(variations[0], PASS);
    assert!(variations.len() >= 2);
    let (x, y) = variations[1];
    assert!((0..9).contains(&x) && (0..9).contains(&y));
}

#[test]
fn get_child_returns_registered_or_fresh_nodes() {
    let pool = make_pool(0.5, 9);
    let root = pool.create_root();

    for _ in 0..5 {
        descend(&root, &pool, SearchOptions::inner(), false);
    }

    // An existing child comes back as the same node.
    let child = &root.get_children()[0];
    let (x, y) = (child.x(), child.y());
    let looked_up = root.get_child(&pool, x, y);
    assert!(Arc::ptr_eq(child, &looked_up));

    // A move without a node gets a fresh continuation, not registered.
    let before = root.get_children().len();
    let fresh = root.get_child(&pool, 8, 8);
    assert_eq!(fresh.color(), BLACK);
    assert_eq!(fresh.captured(), 0);
    assert_eq!(root.get_children().len(), before);
}

#[test]
fn pass_children_flip_color_without_capture() {
    let pool = make_pool(0.5, 9);
    let root = pool.create_root();

    let pass = root.get_child(&pool, -1, -1);
    assert_eq!(pass.color(), BLACK);
    assert_eq!(pass.captured(), 0);

    let reply = pass.get_child(&pool, 4, 4);
    assert_eq!(reply.color(), WHITE);
}

#[test]
fn random_and_policy_moves_are_legal() {
    let pool = make_pool(0.5, 9);
    let root = pool.create_root();

    let (x, y) = root.get_policy_move();
    assert!((0..9).contains(&x) && (0..9).contains(&y));

    for temperature in [0.0, 0.5, 1.0, 4.0] {
        let (x, y) = root.get_random_move(temperature);
        assert!((0..9).contains(&x) && (0..9).contains(&y));
    }
}

#[test]
fn settled_positions_evaluate_as_terminal() {
    let pool = make_pool(0.5, 5);
    let root = pool.create_root();

    // Build two-eyed black walls via get_child, passing for white.
    let mut node = Arc::clone(&root);
    for y in 0..5 {
        for x in [1, 3] {
            node = node.get_child(&pool, x, y);
            node = node.get_child(&pool, -1, -1);
        }
    }

    // Whole board settled: no candidates survive the territory filter.
    let result = node.evaluate(&pool, &SearchOptions::inner(), false);
    assert!(result.next.is_none());
    let result = node.evaluate(&pool, &SearchOptions::inner(), false);
    assert!(result.next.is_none());
    assert_eq!(result.playouts, 1);
    assert_eq!(node.get_policy_move(), PASS);
}

#[test]
fn pool_recycles_released_nodes() {
    let pool = make_pool(0.5, 9);
    let root = pool.create_root();

    for _ in 0..6 {
        descend(&root, &pool, SearchOptions::inner(), false);
    }

    let (total_before, used_before, free_before) = pool.counts();
    assert_eq!(free_before, 0);

    let children = root.get_children();
    for child in &children {
        pool.release(child);
    }

    let (total_after, used_after, free_after) = pool.counts();
    assert_eq!(total_after, total_before);
    assert_eq!(used_after, used_before - children.len());
    assert_eq!(free_after, children.len());

    // Recycled nodes come back blank.
    let recycled = pool.acquire();
    assert_eq!(recycled.get_visits(), 0);
    assert!(recycled.get_children().is_empty());
}
