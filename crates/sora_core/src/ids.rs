//! Identity generation
//!
//! Entities, components and aspects get process-unique ids from an
//! [`IdAllocator`]. The allocator is an explicit object shared through `Arc`
//! by everything that mints ids, so two engines in one process never hand out
//! the same id and no id is ever reused.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            #[cfg(test)]
            pub(crate) const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            #[inline]
            pub fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

define_id!(
    /// Entity handle. Monotonic, never reused.
    EntityId,
    "e"
);
define_id!(
    /// Component handle assigned on registration.
    ComponentId,
    "c"
);
define_id!(
    /// Aspect handle assigned on registration.
    AspectId,
    "a"
);

/// Monotonic id source for entities, components and aspects.
#[derive(Debug)]
pub struct IdAllocator {
    entity: AtomicU64,
    component: AtomicU64,
    aspect: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            entity: AtomicU64::new(1),
            component: AtomicU64::new(1),
            aspect: AtomicU64::new(1),
        }
    }

    pub fn next_entity(&self) -> EntityId {
        EntityId(self.entity.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_component(&self) -> ComponentId {
        ComponentId(self.component.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_aspect(&self) -> AspectId {
        AspectId(self.aspect.fetch_add(1, Ordering::Relaxed))
    }

    /// Make sure a caller-chosen component id is never handed out later.
    pub(crate) fn reserve_component(&self, id: ComponentId) {
        self.component.fetch_max(id.0 + 1, Ordering::Relaxed);
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn entity_ids_are_unique_and_monotonic() {
        let ids = IdAllocator::new();
        let mut seen = HashSet::new();
        let mut last = 0;
        for _ in 0..1000 {
            let id = ids.next_entity();
            assert!(id.raw() > last);
            last = id.raw();
            assert!(seen.insert(id));
        }
    }

    #[test]
    fn counters_are_independent() {
        let ids = IdAllocator::new();
        assert_eq!(ids.next_entity().raw(), 1);
        assert_eq!(ids.next_component().raw(), 1);
        assert_eq!(ids.next_aspect().raw(), 1);
        assert_eq!(ids.next_entity().raw(), 2);
    }

    #[test]
    fn shared_allocator_never_repeats_across_threads() {
        let ids = Arc::new(IdAllocator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..250).map(|_| ids.next_entity()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn reserved_component_ids_are_skipped() {
        let ids = IdAllocator::new();
        ids.reserve_component(ComponentId::from_raw(41));
        assert_eq!(ids.next_component().raw(), 42);
        ids.reserve_component(ComponentId::from_raw(3));
        assert_eq!(ids.next_component().raw(), 43);
    }
}
