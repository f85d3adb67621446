//! Deferred structural mutations.
//!
//! Removing a router must not rebuild a network while some other entity in
//! the same update pass may still be walking its ring. Removal therefore only
//! queues [`PendingAction`]s, and the engine drains the queue once per tick
//! boundary in [`RouterEngine::end_tick`](crate::engine::RouterEngine::end_tick).

use crate::id::{NetworkId, RouterId, Ticks};

// ---------------------------------------------------------------------------
// PendingAction
// ---------------------------------------------------------------------------

/// A structural change to run at the next tick boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Re-run discovery from a router that neighbored a removed one, if its
    /// network is still stale by then.
    Rediscover { router: RouterId },
    /// Drop a stale network if nothing is left in it.
    Prune { network: NetworkId },
}

// ---------------------------------------------------------------------------
// PendingQueue
// ---------------------------------------------------------------------------

/// Actions waiting for the next tick boundary, with optional history.
#[derive(Debug, Default)]
pub struct PendingQueue {
    pending: Vec<PendingAction>,
    history: Vec<(Ticks, PendingAction)>,
    /// 0 = no history.
    max_history: usize,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue that retains up to `max_history` drained actions.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            pending: Vec::new(),
            history: Vec::new(),
            max_history,
        }
    }

    pub fn push(&mut self, action: PendingAction) {
        self.pending.push(action);
    }

    pub fn push_batch(&mut self, actions: impl IntoIterator<Item = PendingAction>) {
        self.pending.extend(actions);
    }

    /// Take every pending action in submission order, recording them in the
    /// history under `tick`.
    pub fn drain(&mut self, tick: Ticks) -> Vec<PendingAction> {
        let actions: Vec<PendingAction> = self.pending.drain(..).collect();

        if self.max_history > 0 {
            self.history.extend(actions.iter().map(|&a| (tick, a)));
            let excess = self.history.len().saturating_sub(self.max_history);
            if excess > 0 {
                self.history.drain(..excess);
            }
        }

        actions
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> &[PendingAction] {
        &self.pending
    }

    pub fn history(&self) -> &[(Ticks, PendingAction)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

// ===========================================================================
// Tests
// ===========================================================================
