//! Output ring: the circular sequence of (source router, destination) edges
//! derived from a network's membership.
//!
//! Edges live in a flat arena and link to each other by index, so a rebuild
//! replaces the whole arena at once and no edge can outlive it. The ring
//! also carries the dispatch cursor, the edge after which the next offer
//! resumes.

use crate::grid::GridPosition;
use crate::id::{ConsumerId, RouterId};

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// One (source, destination) pair in the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// The router the item leaves from.
    pub source: RouterId,
    /// Grid position of `source`, reported to the destination collaborator.
    pub source_position: GridPosition,
    /// The consumer the item is delivered to.
    pub destination: ConsumerId,
    next: usize,
    prev: usize,
}

impl Edge {
    /// Arena index of the successor edge.
    pub fn next(&self) -> usize {
        self.next
    }

    /// Arena index of the predecessor edge.
    pub fn prev(&self) -> usize {
        self.prev
    }
}

// ---------------------------------------------------------------------------
// OutputRing
// ---------------------------------------------------------------------------

/// Circular edge sequence plus the per-network dispatch cursor.
///
/// Invariant: `cursor` is `Some` exactly when the ring is non-empty, and then
/// indexes a valid edge of the current arena.
#[derive(Debug, Clone, Default)]
pub struct OutputRing {
    edges: Vec<Edge>,
    cursor: Option<usize>,
}

impl OutputRing {
    /// An empty ring. No dispatch is possible through it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ring from `(source, position, destinations)` triples in member
    /// order. Each destination of each member yields one edge; the sequence
    /// is then closed into a circle and the cursor reset to the first edge.
    pub fn build<'a, I>(members: I) -> Self
    where
        I: IntoIterator<Item = (RouterId, GridPosition, &'a [ConsumerId])>,
    {
        let mut edges = Vec::new();
        for (source, source_position, destinations) in members {
            for &destination in destinations {
                let index = edges.len();
                edges.push(Edge {
                    source,
                    source_position,
                    destination,
                    next: index + 1,
                    prev: index.wrapping_sub(1),
                });
            }
        }

        let Some(last) = edges.len().checked_sub(1) else {
            return Self::new();
        };
        edges[last].next = 0;
        edges[0].prev = last;

        Self {
            edges,
            cursor: Some(0),
        }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// The edge at an arena index.
    pub fn edge(&self, index: usize) -> Option<&Edge> {
        self.edges.get(index)
    }

    /// All edges in enumeration order (not rotated by the cursor).
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Arena index of the edge the cursor refers to.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The edge the cursor refers to.
    pub fn cursor_edge(&self) -> Option<&Edge> {
        self.cursor.and_then(|i| self.edges.get(i))
    }

    /// Point the cursor at `index`. Out-of-range indices are ignored.
    pub(crate) fn advance_cursor_to(&mut self, index: usize) {
        if index < self.edges.len() {
            self.cursor = Some(index);
        }
    }

    /// Successor of the edge at `index`.
    pub fn successor(&self, index: usize) -> Option<usize> {
        self.edges.get(index).map(|e| e.next)
    }

    /// Predecessor of the edge at `index`.
    pub fn predecessor(&self, index: usize) -> Option<usize> {
        self.edges.get(index).map(|e| e.prev)
    }

    /// Arena indices of one full revolution, starting at the edge after the
    /// cursor. Empty for an empty ring.
    pub fn revolution(&self) -> Revolution<'_> {
        let start = self.cursor.and_then(|c| self.successor(c));
        Revolution {
            ring: self,
            next: start,
            remaining: self.edges.len(),
        }
    }
}

/// Iterator over one bounded revolution of an [`OutputRing`].
#[derive(Debug)]
pub struct Revolution<'a> {
    ring: &'a OutputRing,
    next: Option<usize>,
    remaining: usize,
}

impl<'a> Iterator for Revolution<'a> {
    type Item = (usize, &'a Edge);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.next?;
        let edge = self.ring.edges.get(index)?;
        self.remaining -= 1;
        self.next = Some(edge.next);
        Some((index, edge))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

// ===========================================================================
// Tests
// ===========================================================================
