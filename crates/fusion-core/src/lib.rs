//! Fusion Core -- connectivity and fair dispatch for router networks.
//!
//! Router cells placed on a grid join into networks: every 4-connected
//! component of routers is one network, and all routers in it share a single
//! circular list of outputs. An item offered to a network is handed to the
//! next consumer around that list that will take it, so repeated offers are
//! spread evenly over every consumer the network touches.
//!
//! # Topology changes
//!
//! Placing a router joins it, and every network it touches, into one network
//! immediately. Removing a router never recomputes connectivity on the spot:
//! the network is marked stale and each surviving fragment is rediscovered
//! lazily, either when one of its routers offers an item or at the next tick
//! boundary.
//!
//! ```rust,ignore
//! let mut engine = RouterEngine::new();
//! engine.on_placed(GridPosition::new(0, 0), &grid)?;
//! engine.on_placed(GridPosition::new(1, 0), &grid)?;
//! let outcome = engine.offer_from(GridPosition::new(0, 0), ItemTypeId(3), &grid, &mut sink)?;
//! engine.on_removed(GridPosition::new(1, 0))?;
//! engine.end_tick(&grid);
//! ```
//!
//! # Key Types
//!
//! - [`engine::RouterEngine`] -- Lifecycle hooks, offers and the tick boundary.
//! - [`network::Topology`] -- Routers, networks and discovery traversal.
//! - [`ring::OutputRing`] -- Circular edge list with a dispatch cursor.
//! - [`dispatch::DestinationSink`] -- Host callbacks for accepting items.
//! - [`grid::GridAdjacency`] -- Host callbacks for reading the tile map.
//! - [`event::EventLog`] -- Bounded log of topology and dispatch events.
//! - [`serialize`] -- Versioned snapshots via bitcode.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod event;
pub mod grid;
pub mod id;
pub mod network;
pub mod pending;
pub mod ring;
pub mod serialize;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
