//! Router networks: connected components of router nodes.
//!
//! [`Topology`] owns every router and every network. Networks are discovered
//! by traversal over 4-connected router cells; when the traversal reaches a
//! router that belongs to another valid network, that network is absorbed
//! whole and its members are not walked again. Removal never recomputes
//! connectivity on the spot: it marks the network stale, and a later rebuild
//! from any surviving member discovers the fragment that member is in.
//!
//! Invariants maintained here:
//! - a router is in `network.members` iff `router.network == Some(network)`;
//! - no router appears in two networks, or twice in one;
//! - a non-stale network is exactly one 4-connected component of routers.

use crate::config::Traversal;
use crate::dispatch::{self, DestinationSink, OfferOutcome};
use crate::grid::{Direction, GridAdjacency, GridPosition};
use crate::id::{ConsumerId, ItemTypeId, NetworkId, RouterId};
use crate::ring::OutputRing;
use slotmap::SlotMap;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from router lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    #[error("a router is already registered at {0:?}")]
    PositionOccupied(GridPosition),
    #[error("no router registered at {0:?}")]
    NotARouter(GridPosition),
}

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

/// One grid cell participating in routing.
#[derive(Debug, Clone)]
pub struct RouterNode {
    position: GridPosition,
    /// `None` only between registration and the first rebuild.
    network: Option<NetworkId>,
    /// Eligible destinations around this router, recomputed on neighbor change.
    destinations: Vec<ConsumerId>,
    /// Opaque per-router attribute owned by the rendering layer; persisted.
    blend_bits: u16,
}

impl RouterNode {
    pub fn position(&self) -> GridPosition {
        self.position
    }

    pub fn network(&self) -> Option<NetworkId> {
        self.network
    }

    pub fn destinations(&self) -> &[ConsumerId] {
        &self.destinations
    }

    pub fn blend_bits(&self) -> u16 {
        self.blend_bits
    }
}

/// One connected component of routers, with its output ring and cursor.
#[derive(Debug, Clone, Default)]
pub struct Network {
    members: Vec<RouterId>,
    ring: OutputRing,
    stale: bool,
}

impl Network {
    /// Members in discovery order. This order fixes the ring's enumeration.
    pub fn members(&self) -> &[RouterId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn ring(&self) -> &OutputRing {
        &self.ring
    }

    /// Whether a member has been removed since the last rebuild.
    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

/// What a single [`Topology::rebuild_from`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Networks absorbed whole, with how many members each brought.
    pub merged: Vec<(NetworkId, usize)>,
    /// Stale networks left empty by this rebuild and therefore removed.
    pub dissolved: Vec<NetworkId>,
    /// Membership size after the rebuild.
    pub members: usize,
    /// Ring length after the rebuild.
    pub edges: usize,
}

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

/// Every router, the position index, and every network.
#[derive(Debug, Default)]
pub struct Topology {
    routers: SlotMap<RouterId, RouterNode>,
    by_position: BTreeMap<GridPosition, RouterId>,
    networks: SlotMap<NetworkId, Network>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Queries --

    pub fn router(&self, id: RouterId) -> Option<&RouterNode> {
        self.routers.get(id)
    }

    pub fn router_at(&self, pos: GridPosition) -> Option<RouterId> {
        self.by_position.get(&pos).copied()
    }

    pub fn routers(&self) -> impl Iterator<Item = (RouterId, &RouterNode)> + '_ {
        self.routers.iter()
    }

    pub fn router_count(&self) -> usize {
        self.routers.len()
    }

    pub fn network(&self, id: NetworkId) -> Option<&Network> {
        self.networks.get(id)
    }

    pub fn networks(&self) -> impl Iterator<Item = (NetworkId, &Network)> + '_ {
        self.networks.iter()
    }

    pub fn network_count(&self) -> usize {
        self.networks.len()
    }

    pub fn network_of(&self, router: RouterId) -> Option<NetworkId> {
        self.routers.get(router).and_then(|r| r.network)
    }

    // -- Router lifecycle --

    /// Register a router at `pos` without assigning it to a network.
    pub fn insert_router(
        &mut self,
        pos: GridPosition,
        destinations: Vec<ConsumerId>,
    ) -> Result<RouterId, RouterError> {
        if self.by_position.contains_key(&pos) {
            return Err(RouterError::PositionOccupied(pos));
        }
        let id = self.routers.insert(RouterNode {
            position: pos,
            network: None,
            destinations,
            blend_bits: 0,
        });
        self.by_position.insert(pos, id);
        Ok(id)
    }

    /// Destroy the router at `pos`, drop it from its network's membership
    /// and mark that network stale. The ring is left untouched.
    pub fn remove_router(&mut self, pos: GridPosition) -> Result<(RouterId, RouterNode), RouterError> {
        let id = self
            .by_position
            .remove(&pos)
            .ok_or(RouterError::NotARouter(pos))?;
        let node = self
            .routers
            .remove(id)
            .ok_or(RouterError::NotARouter(pos))?;

        if let Some(network) = node.network.and_then(|n| self.networks.get_mut(n)) {
            network.members.retain(|&m| m != id);
            network.stale = true;
        }
        Ok((id, node))
    }

    /// Replace a router's destination list. Returns its network, if any.
    pub fn set_destinations(&mut self, id: RouterId, destinations: Vec<ConsumerId>) -> Option<NetworkId> {
        let node = self.routers.get_mut(id)?;
        node.destinations = destinations;
        node.network
    }

    pub fn set_blend_bits(&mut self, id: RouterId, bits: u16) -> bool {
        match self.routers.get_mut(id) {
            Some(node) => {
                node.blend_bits = bits;
                true
            }
            None => false,
        }
    }

    // -- Network discovery --

    /// Create a fresh network and fill it with the full connected component
    /// containing `root`, merging any valid network met along the way.
    ///
    /// Routers taken from stale networks are removed from those networks;
    /// a stale network left empty is removed and listed in the report.
    /// A root that already sits in a valid network is left alone and that
    /// network is returned with an empty merge list.
    pub fn rebuild_from(
        &mut self,
        root: RouterId,
        grid: &impl GridAdjacency,
        traversal: Traversal,
    ) -> Option<(NetworkId, RebuildReport)> {
        let current = self.routers.get(root)?.network;
        if let Some(existing) = current.filter(|&n| self.is_valid(n)) {
            let network = &self.networks[existing];
            let report = RebuildReport {
                members: network.members.len(),
                edges: network.ring.len(),
                ..RebuildReport::default()
            };
            return Some((existing, report));
        }

        let net = self.networks.insert(Network::default());
        let mut report = RebuildReport::default();
        let mut touched: BTreeSet<NetworkId> = BTreeSet::new();
        let mut frontier: VecDeque<RouterId> = VecDeque::new();

        self.claim(net, root, &mut touched);
        frontier.push_back(root);

        loop {
            let next = match traversal {
                Traversal::BreadthFirst => frontier.pop_front(),
                Traversal::DepthFirst => frontier.pop_back(),
            };
            let Some(current) = next else {
                break;
            };
            let Some(origin) = self.routers.get(current).map(|r| r.position) else {
                continue;
            };

            for dir in Direction::all() {
                let Some(neighbor) = self.router_neighbor(grid, origin, dir) else {
                    continue;
                };
                let owner = self.routers[neighbor].network;
                match owner {
                    // Already visited (cycles in the layout end here).
                    Some(n) if n == net => {}
                    Some(other) if self.is_valid(other) => {
                        let absorbed = self.absorb(net, other);
                        debug!(?net, ?other, absorbed, "merged router networks");
                        report.merged.push((other, absorbed));
                    }
                    _ => {
                        self.claim(net, neighbor, &mut touched);
                        frontier.push_back(neighbor);
                    }
                }
            }
        }

        for stale in touched {
            if self.shed_departed(stale) {
                debug!(network = ?stale, "stale router network emptied");
                report.dissolved.push(stale);
            }
        }

        report.members = self.networks[net].members.len();
        report.edges = self.rebuild_ring(net);
        debug!(
            ?net,
            members = report.members,
            edges = report.edges,
            "rebuilt router network"
        );
        Some((net, report))
    }

    /// Rebuild the output ring of `net` from its members' destinations.
    /// Returns the new ring length.
    pub fn rebuild_ring(&mut self, net: NetworkId) -> usize {
        let Some(network) = self.networks.get(net) else {
            return 0;
        };
        let routers = &self.routers;
        let ring = OutputRing::build(network.members.iter().filter_map(|&m| {
            routers
                .get(m)
                .map(|r| (m, r.position, r.destinations.as_slice()))
        }));
        let edges = ring.len();
        self.networks[net].ring = ring;
        edges
    }

    /// Remove `net` if it is stale and has no members left.
    pub fn prune(&mut self, net: NetworkId) -> bool {
        let empty_and_stale = self
            .networks
            .get(net)
            .is_some_and(|n| n.stale && n.members.is_empty());
        if empty_and_stale {
            self.networks.remove(net);
        }
        empty_and_stale
    }

    // -- Dispatch --

    /// Run one offer over the ring of `net`. Edges whose source router has
    /// been removed since the ring was built are skipped.
    pub fn offer(
        &mut self,
        net: NetworkId,
        item: ItemTypeId,
        sink: &mut impl DestinationSink,
    ) -> OfferOutcome {
        let routers = &self.routers;
        let Some(network) = self.networks.get_mut(net) else {
            return OfferOutcome::NoOutputs;
        };
        dispatch::offer(&mut network.ring, item, sink, |r| routers.contains_key(r))
    }

    // -- Internals --

    /// The registered router orthogonally next to `origin`, if the grid
    /// reports a router-type cell there.
    fn router_neighbor(
        &self,
        grid: &impl GridAdjacency,
        origin: GridPosition,
        dir: Direction,
    ) -> Option<RouterId> {
        let cell = grid.neighbor(origin, dir)?;
        if !cell.is_router_type() {
            return None;
        }
        self.by_position.get(&origin.step(dir)?).copied()
    }

    fn is_valid(&self, net: NetworkId) -> bool {
        self.networks.get(net).is_some_and(|n| !n.stale)
    }

    /// Point `router` at `net` and append it to the membership. Remembers
    /// the stale network it came from so that network can be cleaned up.
    fn claim(&mut self, net: NetworkId, router: RouterId, touched: &mut BTreeSet<NetworkId>) {
        let node = &mut self.routers[router];
        if let Some(previous) = node.network {
            touched.insert(previous);
        }
        node.network = Some(net);
        self.networks[net].members.push(router);
    }

    /// Move every member of `absorbed` into `survivor` and discard
    /// `absorbed` (ring and cursor included).
    fn absorb(&mut self, survivor: NetworkId, absorbed: NetworkId) -> usize {
        let Some(other) = self.networks.remove(absorbed) else {
            return 0;
        };
        for &m in &other.members {
            if let Some(node) = self.routers.get_mut(m) {
                node.network = Some(survivor);
            }
        }
        let count = other.members.len();
        self.networks[survivor].members.extend(other.members);
        count
    }

    /// Drop members of a stale network that now point elsewhere. Removes the
    /// network and returns `true` if nothing is left.
    fn shed_departed(&mut self, stale: NetworkId) -> bool {
        let routers = &self.routers;
        let Some(network) = self.networks.get_mut(stale) else {
            return false;
        };
        network
            .members
            .retain(|&m| routers.get(m).and_then(|r| r.network) == Some(stale));
        if network.members.is_empty() {
            self.networks.remove(stale);
            return true;
        }
        false
    }
}

// ===========================================================================
// Tests
// ===========================================================================
