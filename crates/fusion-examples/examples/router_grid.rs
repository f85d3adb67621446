//! Router grid example: merging, fair dispatch, splitting, and reload.
//!
//! Lays out two router lines with consumers beside them, bridges them into
//! one network, offers items round-robin, cuts the bridge again and shows
//! the split at the tick boundary. Finishes with a save/restore cycle.
//!
//! Run with: `RUST_LOG=fusion_core=debug cargo run -p fusion-examples --example router_grid`

use fusion_core::config::RouterConfig;
use fusion_core::engine::RouterEngine;
use fusion_core::grid::{Cell, TileGrid};
use fusion_core::test_utils::{RecordingSink, add_consumer, consumer, ore, pos, remove_router};

fn print_networks(engine: &RouterEngine) {
    for (id, network) in engine.networks() {
        println!(
            "  {:?}: {} routers, {} edges{}",
            id,
            network.len(),
            network.ring().len(),
            if network.is_stale() { " (stale)" } else { "" }
        );
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut engine = RouterEngine::new();
    let mut grid = TileGrid::new();

    // --- Two separate lines ---

    for x in [0, 1, 3, 4] {
        grid.set(pos(x, 0), Cell::Router);
        engine.on_placed(pos(x, 0), &grid).expect("empty cell");
    }
    for (i, x) in [0, 1, 3, 4].into_iter().enumerate() {
        add_consumer(&mut engine, &mut grid, pos(x, 1), consumer(i as u32));
    }

    println!("=== Two lines ===");
    print_networks(&engine);

    // --- Bridge them ---

    grid.set(pos(2, 0), Cell::Router);
    engine.on_placed(pos(2, 0), &grid).expect("empty cell");

    println!("\n=== Bridged ===");
    print_networks(&engine);

    // --- Round-robin dispatch ---

    let mut sink = RecordingSink::new().with_capacity(consumer(2), 1);
    println!("\n=== Offering 9 items from (0,0) ===");
    for n in 0..9 {
        let outcome = engine
            .offer_from(pos(0, 0), ore(), &grid, &mut sink)
            .expect("router exists");
        println!("  item {n}: {outcome:?}");
    }
    for id in 0..4 {
        println!("  consumer {id} received {}", sink.delivered_to(consumer(id)));
    }

    // --- Cut the bridge ---

    remove_router(&mut engine, &mut grid, pos(2, 0));
    println!("\n=== Bridge removed (same tick) ===");
    print_networks(&engine);

    let summary = engine.end_tick(&grid);
    println!(
        "\n=== After tick {}: {} actions, {} rebuilt, {} dissolved ===",
        summary.tick,
        summary.actions,
        summary.rebuilt.len(),
        summary.dissolved.len()
    );
    print_networks(&engine);

    // --- Save and restore ---

    engine.set_blend_bits(pos(0, 0), 0b0110).expect("router exists");
    let data = engine.serialize().expect("serialize");
    tracing::info!(bytes = data.len(), routers = engine.router_count(), "snapshot written");
    let restored =
        RouterEngine::restore(&data, &grid, RouterConfig::default()).expect("restore");

    println!("\n=== Restored from {} bytes ===", data.len());
    print_networks(&restored);
    println!("  events logged before save: {}", engine.events().len());
}
