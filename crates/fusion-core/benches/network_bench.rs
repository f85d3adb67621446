//! Criterion benchmarks for router network discovery and dispatch.
//!
//! Three benchmark groups:
//! - `discovery`: bulk placement of a filled square, one network
//! - `split`: removing a router from a long line and settling the tick
//! - `offer`: round-robin offers over a network with many destinations

use criterion::{Criterion, criterion_group, criterion_main};
use fusion_core::engine::RouterEngine;
use fusion_core::grid::{Cell, GridPosition, TileGrid};
use fusion_core::id::ConsumerId;
use fusion_core::test_utils::*;
use std::hint::black_box;

// ===========================================================================
// Layout builders
// ===========================================================================

/// A `side` x `side` block of routers.
fn square(side: i32) -> Vec<GridPosition> {
    (0..side)
        .flat_map(|y| (0..side).map(move |x| pos(x, y)))
        .collect()
}

/// A line of `len` routers with a consumer under every cell.
fn fed_line(len: usize) -> (RouterEngine, TileGrid) {
    let mut grid = TileGrid::new();
    for i in 0..len {
        grid.set(pos(i as i32, 1), Cell::Consumer(ConsumerId(i as u32)));
    }
    let cells = line_positions(0, 0, len);
    paint_routers(&mut grid, &cells);
    let mut engine = RouterEngine::new();
    engine.place_all(cells, &grid).expect("bulk placement");
    (engine, grid)
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_discovery(c: &mut Criterion) {
    let cells = square(64);
    let mut grid = TileGrid::new();
    paint_routers(&mut grid, &cells);

    c.bench_function("discovery/square_64", |b| {
        b.iter(|| {
            let mut engine = RouterEngine::new();
            engine
                .place_all(cells.iter().copied(), &grid)
                .expect("bulk placement");
            black_box(engine.network_count())
        })
    });
}

fn bench_split(c: &mut Criterion) {
    c.bench_function("split/line_4096", |b| {
        b.iter_batched(
            || fed_line(4096),
            |(mut engine, mut grid)| {
                remove_router(&mut engine, &mut grid, pos(2048, 0));
                black_box(engine.end_tick(&grid))
            },
            criterion::BatchSize::LargeInput,
        )
    });
}

fn bench_offer(c: &mut Criterion) {
    let (mut engine, _grid) = fed_line(1024);
    let net = engine.network_at(pos(0, 0)).expect("network");
    let mut sink = RecordingSink::new();

    c.bench_function("offer/ring_1024", |b| {
        b.iter(|| {
            sink.deliveries.clear();
            black_box(engine.offer(net, ore(), &mut sink))
        })
    });
}

criterion_group!(benches, bench_discovery, bench_split, bench_offer);
criterion_main!(benches);
