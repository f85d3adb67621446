//! Router events recorded into a fixed-capacity ring buffer.
//!
//! The engine records topology changes and dispatch results as they happen.
//! Hosts read them back with [`EventLog::iter`] or take them with
//! [`EventLog::drain`]. Kinds can be suppressed, in which case they are never
//! stored.

use crate::id::{ConsumerId, ItemTypeId, NetworkId, RouterId, Ticks};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A routing event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    // -- Topology --
    NetworkFormed {
        network: NetworkId,
        root: RouterId,
        tick: Ticks,
    },
    NetworksMerged {
        survivor: NetworkId,
        absorbed: NetworkId,
        absorbed_members: usize,
        tick: Ticks,
    },
    NetworkStale {
        network: NetworkId,
        tick: Ticks,
    },
    NetworkRebuilt {
        network: NetworkId,
        members: usize,
        edges: usize,
        tick: Ticks,
    },
    NetworkDissolved {
        network: NetworkId,
        tick: Ticks,
    },
    RingRebuilt {
        network: NetworkId,
        edges: usize,
        tick: Ticks,
    },

    // -- Dispatch --
    ItemDispatched {
        network: NetworkId,
        source: RouterId,
        destination: ConsumerId,
        item: ItemTypeId,
        tick: Ticks,
    },
    CommitRejected {
        network: NetworkId,
        destination: ConsumerId,
        item: ItemTypeId,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NetworkFormed,
    NetworksMerged,
    NetworkStale,
    NetworkRebuilt,
    NetworkDissolved,
    RingRebuilt,
    ItemDispatched,
    CommitRejected,
}

const EVENT_KIND_COUNT: usize = 8;

impl RouterEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RouterEvent::NetworkFormed { .. } => EventKind::NetworkFormed,
            RouterEvent::NetworksMerged { .. } => EventKind::NetworksMerged,
            RouterEvent::NetworkStale { .. } => EventKind::NetworkStale,
            RouterEvent::NetworkRebuilt { .. } => EventKind::NetworkRebuilt,
            RouterEvent::NetworkDissolved { .. } => EventKind::NetworkDissolved,
            RouterEvent::RingRebuilt { .. } => EventKind::RingRebuilt,
            RouterEvent::ItemDispatched { .. } => EventKind::ItemDispatched,
            RouterEvent::CommitRejected { .. } => EventKind::CommitRejected,
        }
    }

    pub fn tick(&self) -> Ticks {
        match self {
            RouterEvent::NetworkFormed { tick, .. }
            | RouterEvent::NetworksMerged { tick, .. }
            | RouterEvent::NetworkStale { tick, .. }
            | RouterEvent::NetworkRebuilt { tick, .. }
            | RouterEvent::NetworkDissolved { tick, .. }
            | RouterEvent::RingRebuilt { tick, .. }
            | RouterEvent::ItemDispatched { tick, .. }
            | RouterEvent::CommitRejected { tick, .. } => *tick,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventLog
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer of events. When full, the oldest event is
/// dropped.
#[derive(Debug)]
pub struct EventLog {
    events: Vec<Option<RouterEvent>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    total_written: u64,
    dropped: u64,
    suppressed: [bool; EVENT_KIND_COUNT],
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventLog {
    /// Create a log with the given capacity. A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
            dropped: 0,
            suppressed: [false; EVENT_KIND_COUNT],
        }
    }

    /// Record an event unless its kind is suppressed.
    pub fn emit(&mut self, event: RouterEvent) {
        if self.suppressed[event.kind().index()] {
            return;
        }
        let capacity = self.capacity();
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % capacity;
        if self.len < capacity {
            self.len += 1;
        } else {
            self.dropped += 1;
        }
        self.total_written += 1;
    }

    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total events recorded since creation, including dropped ones.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Number of events dropped because the log was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &RouterEvent> + '_ {
        let capacity = self.capacity();
        let start = if self.len < capacity { 0 } else { self.head };
        (0..self.len).filter_map(move |i| self.events[(start + i) % capacity].as_ref())
    }

    /// Remove and return all stored events, oldest first.
    pub fn drain(&mut self) -> Vec<RouterEvent> {
        let capacity = self.capacity();
        let start = if self.len < capacity { 0 } else { self.head };
        let mut out = Vec::with_capacity(self.len);
        for i in 0..self.len {
            if let Some(event) = self.events[(start + i) % capacity].take() {
                out.push(event);
            }
        }
        self.head = 0;
        self.len = 0;
        out
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn make_network_id() -> NetworkId {
        let mut sm = SlotMap::<NetworkId, ()>::with_key();
        sm.insert(())
    }

    fn stale(tick: Ticks) -> RouterEvent {
        RouterEvent::NetworkStale {
            network: make_network_id(),
            tick,
        }
    }

    #[test]
    fn emit_and_iter_in_order() {
        let mut log = EventLog::new(4);
        log.emit(stale(1));
        log.emit(stale(2));
        let ticks: Vec<Ticks> = log.iter().map(|e| e.tick()).collect();
        assert_eq!(ticks, vec![1, 2]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn full_log_drops_oldest() {
        let mut log = EventLog::new(3);
        for t in 0..5 {
            log.emit(stale(t));
        }
        let ticks: Vec<Ticks> = log.iter().map(|e| e.tick()).collect();
        assert_eq!(ticks, vec![2, 3, 4]);
        assert_eq!(log.total_written(), 5);
        assert_eq!(log.dropped_count(), 2);
    }

    #[test]
    fn suppressed_kinds_are_not_stored() {
        let mut log = EventLog::new(4);
        log.suppress(EventKind::NetworkStale);
        log.emit(stale(1));
        assert!(log.is_empty());
        assert_eq!(log.total_written(), 0);

        log.unsuppress(EventKind::NetworkStale);
        log.emit(stale(2));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn drain_empties_after_wrap() {
        let mut log = EventLog::new(2);
        log.emit(stale(1));
        log.emit(stale(2));
        log.emit(stale(3));
        let drained: Vec<Ticks> = log.drain().iter().map(|e| e.tick()).collect();
        assert_eq!(drained, vec![2, 3]);
        assert!(log.is_empty());

        log.emit(stale(4));
        let ticks: Vec<Ticks> = log.iter().map(|e| e.tick()).collect();
        assert_eq!(ticks, vec![4]);
    }

    #[test]
    fn zero_capacity_clamped() {
        let log = EventLog::new(0);
        assert_eq!(log.capacity(), 1);
    }

    #[test]
    fn kind_matches_variant() {
        let e = RouterEvent::NetworkDissolved {
            network: make_network_id(),
            tick: 0,
        };
        assert_eq!(e.kind(), EventKind::NetworkDissolved);
    }
}
