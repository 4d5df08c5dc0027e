use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a movable entity (an ingredient or a container).
    pub struct EntityId;
}

/// Identifies a workstation. Dense: the n-th registered workstation has id n.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(pub u32);

/// Identifies a dispenser (spawn-on-touch basket or stack).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DispenserId(pub u32);

/// Identifies a delivery zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub u32);

/// Identifies one active pointer or finger, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InputId(pub u64);

/// Identifies a remote player that can be bound to a workstation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u32);

/// Identifies a task handed out by the remote task layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u32);

/// Handle returned by the event bus for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

impl SlotId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl DispenserId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_id_equality_and_order() {
        assert_eq!(SlotId(2), SlotId(2));
        assert_ne!(SlotId(2), SlotId(3));
        assert!(SlotId(1) < SlotId(4));
    }

    #[test]
    fn dense_ids_map_to_indices() {
        assert_eq!(SlotId(7).index(), 7);
        assert_eq!(DispenserId(0).index(), 0);
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(InputId(10), "left thumb");
        map.insert(InputId(11), "right thumb");
        assert_eq!(map[&InputId(10)], "left thumb");
    }

    #[test]
    fn entity_ids_come_from_slotmap() {
        let mut sm = slotmap::SlotMap::<EntityId, ()>::with_key();
        let a = sm.insert(());
        let b = sm.insert(());
        assert_ne!(a, b);
    }
}
