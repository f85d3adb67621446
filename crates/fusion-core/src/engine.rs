//! The routing engine: lifecycle hooks, the offer entry points, and the
//! tick boundary.
//!
//! # Tick model
//!
//! Within a tick the host may place and remove routers, report neighbor
//! changes, and offer items in any interleaving. Placement and neighbor
//! changes take effect at once. Removal only destroys the router and marks
//! its network stale; rediscovery of the surviving fragments is queued and
//! runs in [`RouterEngine::end_tick`], so an offer never sees a half-rebuilt
//! ring. Offers made through [`RouterEngine::offer_from`] revalidate a stale
//! network before walking it.
//!
//! ```rust,ignore
//! let id = engine.on_placed(pos, &grid)?;
//! let outcome = engine.offer_from(pos, item, &grid, &mut sink)?;
//! engine.on_removed(pos)?;
//! let summary = engine.end_tick(&grid);
//! ```

use crate::config::RouterConfig;
use crate::dispatch::{DestinationSink, OfferOutcome};
use crate::event::{EventLog, RouterEvent};
use crate::grid::{Direction, GridAdjacency, GridPosition, destinations_around};
use crate::id::{ItemTypeId, NetworkId, RouterId, Ticks};
use crate::network::{Network, RebuildReport, RouterError, RouterNode, Topology};
use crate::pending::{PendingAction, PendingQueue};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// TickSummary
// ---------------------------------------------------------------------------

/// What [`RouterEngine::end_tick`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick that just ended.
    pub tick: Ticks,
    /// Pending actions drained.
    pub actions: usize,
    /// Networks created by rediscovery.
    pub rebuilt: Vec<NetworkId>,
    /// Stale networks removed because nothing was left in them.
    pub dissolved: Vec<NetworkId>,
}

// ---------------------------------------------------------------------------
// RouterEngine
// ---------------------------------------------------------------------------

/// Owns every router network and serves offers against them.
#[derive(Debug)]
pub struct RouterEngine {
    topology: Topology,
    pending: PendingQueue,
    events: EventLog,
    config: RouterConfig,
    tick: Ticks,
}

impl Default for RouterEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterEngine {
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            topology: Topology::new(),
            pending: PendingQueue::with_max_history(config.action_history),
            events: EventLog::new(config.event_capacity),
            config,
            tick: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle hooks
    // -----------------------------------------------------------------------

    /// A router was placed at `pos`. Registers it, joins it with every
    /// adjacent network and rebuilds the resulting network's ring.
    pub fn on_placed(
        &mut self,
        pos: GridPosition,
        grid: &impl GridAdjacency,
    ) -> Result<RouterId, RouterError> {
        let id = self
            .topology
            .insert_router(pos, destinations_around(grid, pos))?;
        debug!(?id, ?pos, "router placed");
        self.rebuild_from(id, grid);
        Ok(id)
    }

    /// Place many routers at once, then discover networks a single time.
    /// Each resulting network is built once instead of being re-merged on
    /// every placement.
    pub fn place_all(
        &mut self,
        positions: impl IntoIterator<Item = GridPosition>,
        grid: &impl GridAdjacency,
    ) -> Result<Vec<RouterId>, RouterError> {
        let mut placed = Vec::new();
        let mut failure = None;
        for pos in positions {
            match self.topology.insert_router(pos, destinations_around(grid, pos)) {
                Ok(id) => placed.push(id),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        // Routers registered before a failure still need a network.
        for &id in &placed {
            if self.topology.network_of(id).is_none() {
                self.rebuild_from(id, grid);
            }
        }
        debug!(count = placed.len(), "routers placed in bulk");
        match failure {
            Some(e) => Err(e),
            None => Ok(placed),
        }
    }

    /// The router at `pos` was removed. Its network becomes stale; the
    /// routers around it are rediscovered at the end of the tick.
    pub fn on_removed(&mut self, pos: GridPosition) -> Result<(), RouterError> {
        let (id, node) = self.topology.remove_router(pos)?;
        debug!(?id, ?pos, "router removed");

        for dir in Direction::all() {
            if let Some(router) = pos.step(dir).and_then(|n| self.topology.router_at(n)) {
                self.pending.push(PendingAction::Rediscover { router });
            }
        }

        if let Some(network) = node.network() {
            debug!(?network, "router network marked stale");
            self.events.emit(RouterEvent::NetworkStale {
                network,
                tick: self.tick,
            });
            self.pending.push(PendingAction::Prune { network });
        }
        Ok(())
    }

    /// Something next to the router at `pos` changed (a consumer was placed,
    /// removed, or changed what it accepts). Recomputes the router's
    /// destinations and rebuilds its network's ring.
    pub fn on_neighbor_changed(
        &mut self,
        pos: GridPosition,
        grid: &impl GridAdjacency,
    ) -> Result<(), RouterError> {
        let id = self
            .topology
            .router_at(pos)
            .ok_or(RouterError::NotARouter(pos))?;
        let network = self
            .topology
            .set_destinations(id, destinations_around(grid, pos));

        if let Some(network) = network {
            let edges = self.topology.rebuild_ring(network);
            self.events.emit(RouterEvent::RingRebuilt {
                network,
                edges,
                tick: self.tick,
            });
        }
        Ok(())
    }

    /// Rebuild the network of the router at `pos` from that router if the
    /// network is stale. Returns the router's (possibly new) network.
    pub fn revalidate(
        &mut self,
        pos: GridPosition,
        grid: &impl GridAdjacency,
    ) -> Result<NetworkId, RouterError> {
        let id = self
            .topology
            .router_at(pos)
            .ok_or(RouterError::NotARouter(pos))?;
        self.revalidate_router(id, grid)
            .ok_or(RouterError::NotARouter(pos))
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Offer `item` to the destinations of `network`, walking its current
    /// ring at most once.
    pub fn offer(
        &mut self,
        network: NetworkId,
        item: ItemTypeId,
        sink: &mut impl DestinationSink,
    ) -> OfferOutcome {
        let outcome = self.topology.offer(network, item, sink);

        trace!(?network, ?item, ?outcome, "offer");
        match outcome {
            OfferOutcome::Delivered {
                source,
                destination,
            } => self.events.emit(RouterEvent::ItemDispatched {
                network,
                source,
                destination,
                item,
                tick: self.tick,
            }),
            OfferOutcome::CommitRejected { destination, .. } => {
                warn!(?network, ?destination, ?item, "destination accepted but refused commit");
                self.events.emit(RouterEvent::CommitRejected {
                    network,
                    destination,
                    item,
                    tick: self.tick,
                });
            }
            OfferOutcome::NoTaker | OfferOutcome::NoOutputs => {}
        }
        outcome
    }

    /// Offer `item` on behalf of the router at `pos`. A stale network is
    /// rebuilt from that router first.
    pub fn offer_from(
        &mut self,
        pos: GridPosition,
        item: ItemTypeId,
        grid: &impl GridAdjacency,
        sink: &mut impl DestinationSink,
    ) -> Result<OfferOutcome, RouterError> {
        let network = self.revalidate(pos, grid)?;
        Ok(self.offer(network, item, sink))
    }

    // -----------------------------------------------------------------------
    // Tick boundary
    // -----------------------------------------------------------------------

    /// Run every deferred action, then advance the tick counter.
    pub fn end_tick(&mut self, grid: &impl GridAdjacency) -> TickSummary {
        let mut summary = TickSummary {
            tick: self.tick,
            ..Default::default()
        };

        let actions = self.pending.drain(self.tick);
        summary.actions = actions.len();

        for action in actions {
            match action {
                PendingAction::Rediscover { router } => {
                    let Some(network) = self.topology.network_of(router) else {
                        continue;
                    };
                    if !self.is_stale(network) {
                        continue;
                    }
                    if let Some((rebuilt, report)) = self.rebuild_from(router, grid) {
                        summary.rebuilt.push(rebuilt);
                        summary.dissolved.extend(report.dissolved);
                    }
                }
                PendingAction::Prune { network } => {
                    if self.topology.prune(network) {
                        debug!(?network, "pruned empty router network");
                        self.events.emit(RouterEvent::NetworkDissolved {
                            network,
                            tick: self.tick,
                        });
                        summary.dissolved.push(network);
                    }
                }
            }
        }

        self.tick += 1;
        summary
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn router_at(&self, pos: GridPosition) -> Option<RouterId> {
        self.topology.router_at(pos)
    }

    pub fn router(&self, id: RouterId) -> Option<&RouterNode> {
        self.topology.router(id)
    }

    pub fn routers(&self) -> impl Iterator<Item = (RouterId, &RouterNode)> + '_ {
        self.topology.routers()
    }

    pub fn network_of(&self, id: RouterId) -> Option<NetworkId> {
        self.topology.network_of(id)
    }

    /// The network of the router at `pos`.
    pub fn network_at(&self, pos: GridPosition) -> Option<NetworkId> {
        self.router_at(pos).and_then(|id| self.network_of(id))
    }

    pub fn network(&self, id: NetworkId) -> Option<&Network> {
        self.topology.network(id)
    }

    pub fn networks(&self) -> impl Iterator<Item = (NetworkId, &Network)> + '_ {
        self.topology.networks()
    }

    pub fn router_count(&self) -> usize {
        self.topology.router_count()
    }

    pub fn network_count(&self) -> usize {
        self.topology.network_count()
    }

    pub fn is_stale(&self, network: NetworkId) -> bool {
        self.topology.network(network).is_some_and(|n| n.is_stale())
    }

    pub fn tick(&self) -> Ticks {
        self.tick
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventLog {
        &mut self.events
    }

    pub fn pending_actions(&self) -> &PendingQueue {
        &self.pending
    }

    /// Set the rendering layer's per-router attribute.
    pub fn set_blend_bits(&mut self, pos: GridPosition, bits: u16) -> Result<(), RouterError> {
        let id = self
            .topology
            .router_at(pos)
            .ok_or(RouterError::NotARouter(pos))?;
        self.topology.set_blend_bits(id, bits);
        Ok(())
    }

    pub(crate) fn set_tick(&mut self, tick: Ticks) {
        self.tick = tick;
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn revalidate_router(&mut self, id: RouterId, grid: &impl GridAdjacency) -> Option<NetworkId> {
        match self.topology.network_of(id) {
            Some(network) if !self.is_stale(network) => Some(network),
            _ => self.rebuild_from(id, grid).map(|(network, _)| network),
        }
    }

    /// Discovery from `root` plus the events it implies.
    fn rebuild_from(
        &mut self,
        root: RouterId,
        grid: &impl GridAdjacency,
    ) -> Option<(NetworkId, RebuildReport)> {
        let (network, report) = self
            .topology
            .rebuild_from(root, grid, self.config.traversal)?;
        let tick = self.tick;

        self.events.emit(RouterEvent::NetworkFormed {
            network,
            root,
            tick,
        });
        for &(absorbed, absorbed_members) in &report.merged {
            self.events.emit(RouterEvent::NetworksMerged {
                survivor: network,
                absorbed,
                absorbed_members,
                tick,
            });
        }
        for &dissolved in &report.dissolved {
            self.events.emit(RouterEvent::NetworkDissolved {
                network: dissolved,
                tick,
            });
        }
        self.events.emit(RouterEvent::NetworkRebuilt {
            network,
            members: report.members,
            edges: report.edges,
            tick,
        });
        Some((network, report))
    }
}

// ===========================================================================
// Tests
// ===========================================================================
