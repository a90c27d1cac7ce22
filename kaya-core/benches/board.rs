use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kaya_core::{Board, BLACK, EMPTY, WHITE};

/// Deterministic pseudo-game: scatter stones with a multiplicative walk.
fn sample_board(size: i32, stones: usize) -> Board {
    let mut board = Board::new(size, size);
    let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut color = BLACK;

    let mut placed = 0;
    while placed < stones {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let x = ((seed >> 33) % size as u64) as i32;
        let y = ((seed >> 17) % size as u64) as i32;
        if board.get_color(x, y) == EMPTY && board.play(x, y, color) >= 0 {
            color = -color;
            placed += 1;
        }
    }

    board
}

fn bench_play(c: &mut Criterion) {
    c.bench_function("play_100_stones_19x19", |b| {
        b.iter(|| black_box(sample_board(19, 100)))
    });
}

fn bench_legality(c: &mut Criterion) {
    let board = sample_board(19, 120);
    c.bench_function("get_enableds_19x19", |b| {
        b.iter(|| black_box(board.get_enableds(BLACK, true)))
    });
}

fn bench_territory(c: &mut Criterion) {
    let board = sample_board(19, 120);
    c.bench_function("get_territories_19x19", |b| {
        b.iter_batched(
            || board.clone(),
            |mut board| black_box(board.get_territories(WHITE)),
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_state(c: &mut Criterion) {
    let board = sample_board(19, 120);
    let state = board.get_state();
    c.bench_function("load_state_19x19", |b| {
        b.iter_batched(
            || Board::new(19, 19),
            |mut fresh| {
                fresh.load_state(black_box(&state));
                black_box(fresh)
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_play, bench_legality, bench_territory, bench_state);
criterion_main!(benches);
