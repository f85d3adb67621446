use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a placed router node.
    pub struct RouterId;

    /// Identifies a router network (one connected component of routers).
    pub struct NetworkId;
}

/// Identifies an eligible destination (a consumer block) adjacent to a router.
/// Assigned by the host; the core never interprets the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConsumerId(pub u32);

/// Simulation tick counter.
pub type Ticks = u64;

/// Identifies an item type. This is the payload of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemTypeId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn consumer_id_equality() {
        assert_eq!(ConsumerId(3), ConsumerId(3));
        assert_ne!(ConsumerId(3), ConsumerId(4));
    }

    #[test]
    fn removed_router_key_is_not_reused() {
        let mut sm = SlotMap::<RouterId, ()>::with_key();
        let a = sm.insert(());
        sm.remove(a);
        let b = sm.insert(());
        assert_ne!(a, b);
        assert!(!sm.contains_key(a));
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ItemTypeId(0), "copper");
        map.insert(ItemTypeId(1), "lead");
        assert_eq!(map[&ItemTypeId(1)], "lead");
    }
}
