//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::dispatch::DestinationSink;
use crate::engine::RouterEngine;
use crate::grid::{Cell, GridPosition, TileGrid};
use crate::id::*;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// ===========================================================================
// Ids and positions
// ===========================================================================

pub fn pos(x: i32, y: i32) -> GridPosition {
    GridPosition::new(x, y)
}

pub fn ore() -> ItemTypeId {
    ItemTypeId(0)
}

pub fn ingot() -> ItemTypeId {
    ItemTypeId(1)
}

pub fn consumer(n: u32) -> ConsumerId {
    ConsumerId(n)
}

/// `len` positions in a horizontal line starting at `(x, y)`.
pub fn line_positions(x: i32, y: i32, len: usize) -> Vec<GridPosition> {
    (0..len as i32).map(|i| pos(x + i, y)).collect()
}

/// The border of a `width` x `height` rectangle with its corner at `(x, y)`,
/// walked clockwise.
pub fn loop_positions(x: i32, y: i32, width: i32, height: i32) -> Vec<GridPosition> {
    let mut out = Vec::new();
    for i in 0..width {
        out.push(pos(x + i, y));
    }
    for j in 1..height {
        out.push(pos(x + width - 1, y + j));
    }
    for i in (0..width - 1).rev() {
        out.push(pos(x + i, y + height - 1));
    }
    for j in (1..height - 1).rev() {
        out.push(pos(x, y + j));
    }
    out
}

// ===========================================================================
// Grid and engine setup
// ===========================================================================

/// Mark every position in `positions` as a router cell.
pub fn paint_routers(grid: &mut TileGrid, positions: &[GridPosition]) {
    for &p in positions {
        grid.set(p, Cell::Router);
    }
}

/// Paint routers into `grid` and place them one at a time.
pub fn place_routers(
    engine: &mut RouterEngine,
    grid: &mut TileGrid,
    positions: &[GridPosition],
) -> Vec<RouterId> {
    paint_routers(grid, positions);
    positions
        .iter()
        .map(|&p| engine.on_placed(p, grid).expect("router placement"))
        .collect()
}

/// Clear `p` from the grid and report the removal to the engine.
pub fn remove_router(engine: &mut RouterEngine, grid: &mut TileGrid, p: GridPosition) {
    grid.clear(p);
    engine.on_removed(p).expect("router removal");
}

/// Put a consumer at `p` and tell every adjacent router about it.
pub fn add_consumer(engine: &mut RouterEngine, grid: &mut TileGrid, p: GridPosition, id: ConsumerId) {
    grid.set(p, Cell::Consumer(id));
    notify_neighbors(engine, grid, p);
}

/// Tell every router orthogonally next to `p` that `p` changed.
pub fn notify_neighbors(engine: &mut RouterEngine, grid: &TileGrid, p: GridPosition) {
    for dir in crate::grid::Direction::all() {
        let Some(n) = p.step(dir) else {
            continue;
        };
        if engine.router_at(n).is_some() {
            engine.on_neighbor_changed(n, grid).expect("neighbor update");
        }
    }
}

// ===========================================================================
// Invariant checks
// ===========================================================================

/// Assert that membership is symmetric and disjoint: every router points at
/// exactly one network that lists it, and no network lists a router twice
/// or a router that points elsewhere.
pub fn assert_membership_consistent(engine: &RouterEngine) {
    let mut seen = BTreeSet::new();
    for (net_id, network) in engine.networks() {
        for &member in network.members() {
            assert!(seen.insert(member), "router {member:?} listed twice");
            assert_eq!(
                engine.network_of(member),
                Some(net_id),
                "router {member:?} listed by {net_id:?} but points elsewhere"
            );
        }
    }
    for (id, node) in engine.routers() {
        if let Some(net) = node.network() {
            assert!(
                engine.network(net).is_some_and(|n| n.members().contains(&id)),
                "router {id:?} points at {net:?} which does not list it"
            );
        }
    }
}

/// The 4-connected components of `positions`, each sorted.
pub fn components(positions: &BTreeSet<GridPosition>) -> Vec<BTreeSet<GridPosition>> {
    let mut unvisited = positions.clone();
    let mut out = Vec::new();
    while let Some(&start) = unvisited.iter().next() {
        unvisited.remove(&start);
        let mut component = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(p) = queue.pop_front() {
            for dir in crate::grid::Direction::all() {
                let Some(n) = p.step(dir) else {
                    continue;
                };
                if unvisited.remove(&n) {
                    component.insert(n);
                    queue.push_back(n);
                }
            }
        }
        out.push(component);
    }
    out
}

/// Router positions grouped by network.
pub fn networks_by_position(engine: &RouterEngine) -> Vec<BTreeSet<GridPosition>> {
    let mut groups: BTreeMap<NetworkId, BTreeSet<GridPosition>> = BTreeMap::new();
    for (_, node) in engine.routers() {
        if let Some(net) = node.network() {
            groups.entry(net).or_default().insert(node.position());
        }
    }
    groups.into_values().collect()
}

// ===========================================================================
// RecordingSink
// ===========================================================================

/// A [`DestinationSink`] with per-consumer capacity that records every
/// delivery. Consumers not given a capacity accept without limit.
#[derive(Debug, Default)]
pub struct RecordingSink {
    capacity: BTreeMap<ConsumerId, u32>,
    refuse: BTreeSet<ConsumerId>,
    flaky: BTreeSet<ConsumerId>,
    /// Every successful transfer, in order.
    pub deliveries: Vec<(ConsumerId, GridPosition, ItemTypeId)>,
    /// Every commit that was attempted and failed.
    pub failed_commits: Vec<ConsumerId>,
    /// Number of `can_accept` calls made.
    pub probes: std::cell::Cell<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit how many items `id` will take.
    pub fn with_capacity(mut self, id: ConsumerId, capacity: u32) -> Self {
        self.capacity.insert(id, capacity);
        self
    }

    /// Make `id` refuse every item.
    pub fn refusing(mut self, id: ConsumerId) -> Self {
        self.refuse.insert(id);
        self
    }

    /// Make `id` answer yes to `can_accept` but fail every commit.
    pub fn flaky(mut self, id: ConsumerId) -> Self {
        self.flaky.insert(id);
        self
    }

    pub fn set_capacity(&mut self, id: ConsumerId, capacity: u32) {
        self.capacity.insert(id, capacity);
    }

    pub fn heal(&mut self, id: ConsumerId) {
        self.flaky.remove(&id);
    }

    /// Delivery targets in order.
    pub fn destinations(&self) -> Vec<ConsumerId> {
        self.deliveries.iter().map(|&(d, _, _)| d).collect()
    }

    pub fn delivered_to(&self, id: ConsumerId) -> usize {
        self.deliveries.iter().filter(|&&(d, _, _)| d == id).count()
    }
}

impl DestinationSink for RecordingSink {
    fn can_accept(&self, destination: ConsumerId, _source: GridPosition, _item: ItemTypeId) -> bool {
        self.probes.set(self.probes.get() + 1);
        if self.refuse.contains(&destination) {
            return false;
        }
        self.capacity.get(&destination).is_none_or(|&c| c > 0)
    }

    fn commit_transfer(&mut self, destination: ConsumerId, source: GridPosition, item: ItemTypeId) -> bool {
        if self.flaky.contains(&destination) {
            self.failed_commits.push(destination);
            return false;
        }
        if let Some(c) = self.capacity.get_mut(&destination) {
            if *c == 0 {
                self.failed_commits.push(destination);
                return false;
            }
            *c -= 1;
        }
        self.deliveries.push((destination, source, item));
        true
    }
}
