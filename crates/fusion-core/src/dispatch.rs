//! Fair round-robin offer protocol over an [`OutputRing`].
//!
//! An offer walks at most one revolution of the ring, starting at the edge
//! after the cursor. The first destination that both accepts and commits the
//! item receives it, and the cursor moves onto that edge so the next offer
//! begins one step further around.

use crate::grid::GridPosition;
use crate::id::{ConsumerId, ItemTypeId, RouterId};
use crate::ring::OutputRing;

// ---------------------------------------------------------------------------
// Destination collaborator
// ---------------------------------------------------------------------------

/// The host side of a delivery: the consumers adjacent to routers.
pub trait DestinationSink {
    /// Whether `destination` would take `item` from the router at `source`.
    /// Must not change any state.
    fn can_accept(&self, destination: ConsumerId, source: GridPosition, item: ItemTypeId) -> bool;

    /// Hand `item` to `destination`. Returns `false` if the transfer did not
    /// happen, even when [`can_accept`](Self::can_accept) said yes.
    fn commit_transfer(
        &mut self,
        destination: ConsumerId,
        source: GridPosition,
        item: ItemTypeId,
    ) -> bool;
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of one offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// The item was handed over and the cursor moved to this edge.
    Delivered {
        source: RouterId,
        destination: ConsumerId,
    },
    /// `destination` accepted the check but refused the commit. The cursor
    /// did not move and the item is still the caller's.
    CommitRejected {
        source: RouterId,
        destination: ConsumerId,
    },
    /// A full revolution found no destination willing to accept.
    NoTaker,
    /// The ring is empty (or the network does not exist).
    NoOutputs,
}

impl OfferOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, OfferOutcome::Delivered { .. })
    }

    /// The destination that received the item, if any.
    pub fn destination(&self) -> Option<ConsumerId> {
        match self {
            OfferOutcome::Delivered { destination, .. } => Some(*destination),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Offer
// ---------------------------------------------------------------------------

/// Run one offer of `item` over `ring`.
///
/// `is_live` filters out edges whose source router has been destroyed since
/// the ring was built; such edges are passed over without consulting the
/// sink.
pub fn offer(
    ring: &mut OutputRing,
    item: ItemTypeId,
    sink: &mut impl DestinationSink,
    is_live: impl Fn(RouterId) -> bool,
) -> OfferOutcome {
    if ring.is_empty() {
        return OfferOutcome::NoOutputs;
    }

    let mut taker = None;
    for (index, edge) in ring.revolution() {
        if !is_live(edge.source) {
            continue;
        }
        if sink.can_accept(edge.destination, edge.source_position, item) {
            taker = Some((index, *edge));
            break;
        }
    }

    let Some((index, edge)) = taker else {
        return OfferOutcome::NoTaker;
    };

    if !sink.commit_transfer(edge.destination, edge.source_position, item) {
        return OfferOutcome::CommitRejected {
            source: edge.source,
            destination: edge.destination,
        };
    }

    ring.advance_cursor_to(index);
    OfferOutcome::Delivered {
        source: edge.source,
        destination: edge.destination,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::collections::BTreeSet;

    /// Sink where every consumer accepts unless listed as full; commits fail
    /// for consumers listed as flaky.
    #[derive(Default)]
    struct Sink {
        full: BTreeSet<ConsumerId>,
        flaky: BTreeSet<ConsumerId>,
        delivered: Vec<ConsumerId>,
        checks: usize,
    }

    impl DestinationSink for Sink {
        fn can_accept(&self, destination: ConsumerId, _: GridPosition, _: ItemTypeId) -> bool {
            !self.full.contains(&destination)
        }

        fn commit_transfer(&mut self, destination: ConsumerId, _: GridPosition, _: ItemTypeId) -> bool {
            self.checks += 1;
            if self.flaky.contains(&destination) {
                return false;
            }
            self.delivered.push(destination);
            true
        }
    }

    fn ring_of(count: u32) -> (RouterId, OutputRing) {
        let mut sm = SlotMap::<RouterId, ()>::with_key();
        let router = sm.insert(());
        let dests: Vec<ConsumerId> = (0..count).map(ConsumerId).collect();
        let ring = OutputRing::build([(router, GridPosition::new(0, 0), &dests[..])]);
        (router, ring)
    }

    const ITEM: ItemTypeId = ItemTypeId(0);

    // -----------------------------------------------------------------------
    // Test 1: empty ring reports no outputs
    // -----------------------------------------------------------------------
    #[test]
    fn empty_ring_has_no_outputs() {
        let mut ring = OutputRing::new();
        let mut sink = Sink::default();
        assert_eq!(offer(&mut ring, ITEM, &mut sink, |_| true), OfferOutcome::NoOutputs);
    }

    // -----------------------------------------------------------------------
    // Test 2: consecutive offers rotate across every destination
    // -----------------------------------------------------------------------
    #[test]
    fn consecutive_offers_rotate() {
        let (_, mut ring) = ring_of(3);
        let mut sink = Sink::default();

        for _ in 0..4 {
            assert!(offer(&mut ring, ITEM, &mut sink, |_| true).is_delivered());
        }
        // Cursor starts on edge 0, so the first offer resumes at edge 1.
        assert_eq!(
            sink.delivered,
            vec![ConsumerId(1), ConsumerId(2), ConsumerId(0), ConsumerId(1)]
        );
    }

    // -----------------------------------------------------------------------
    // Test 3: full destinations are skipped, not retried
    // -----------------------------------------------------------------------
    #[test]
    fn full_destination_is_skipped() {
        let (_, mut ring) = ring_of(3);
        let mut sink = Sink::default();
        sink.full.insert(ConsumerId(1));

        let outcome = offer(&mut ring, ITEM, &mut sink, |_| true);
        assert_eq!(outcome.destination(), Some(ConsumerId(2)));
        assert_eq!(ring.cursor(), Some(2));
    }

    // -----------------------------------------------------------------------
    // Test 4: nobody accepting ends after one revolution
    // -----------------------------------------------------------------------
    #[test]
    fn no_taker_after_one_revolution() {
        let (_, mut ring) = ring_of(3);
        let mut sink = Sink::default();
        sink.full.extend([ConsumerId(0), ConsumerId(1), ConsumerId(2)]);

        assert_eq!(offer(&mut ring, ITEM, &mut sink, |_| true), OfferOutcome::NoTaker);
        assert_eq!(ring.cursor(), Some(0));
        assert_eq!(sink.checks, 0);
    }

    // -----------------------------------------------------------------------
    // Test 5: accept-then-refuse leaves the cursor in place
    // -----------------------------------------------------------------------
    #[test]
    fn commit_rejection_does_not_advance() {
        let (router, mut ring) = ring_of(3);
        let mut sink = Sink::default();
        sink.flaky.insert(ConsumerId(1));

        let outcome = offer(&mut ring, ITEM, &mut sink, |_| true);
        assert_eq!(
            outcome,
            OfferOutcome::CommitRejected {
                source: router,
                destination: ConsumerId(1),
            }
        );
        assert_eq!(ring.cursor(), Some(0));
        // Only one commit attempted: no retry inside the same offer.
        assert_eq!(sink.checks, 1);

        // The next offer starts from the same place.
        sink.flaky.clear();
        let outcome = offer(&mut ring, ITEM, &mut sink, |_| true);
        assert_eq!(outcome.destination(), Some(ConsumerId(1)));
    }

    // -----------------------------------------------------------------------
    // Test 6: edges from dead sources are passed over
    // -----------------------------------------------------------------------
    #[test]
    fn dead_source_edges_are_skipped() {
        let (_, mut ring) = ring_of(2);
        let mut sink = Sink::default();
        assert_eq!(offer(&mut ring, ITEM, &mut sink, |_| false), OfferOutcome::NoTaker);
        assert!(sink.delivered.is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 7: a single-edge ring delivers every time
    // -----------------------------------------------------------------------
    #[test]
    fn single_edge_ring_repeats() {
        let (_, mut ring) = ring_of(1);
        let mut sink = Sink::default();
        for _ in 0..3 {
            assert_eq!(
                offer(&mut ring, ITEM, &mut sink, |_| true).destination(),
                Some(ConsumerId(0))
            );
        }
    }
}
