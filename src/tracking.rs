//! The unit-of-work identity map: one tracked instance per primary key, so
//! repeated reads within a session hand back the same shared instance.
//!
//! The tracker is scoped to one logical session and is not synchronized for
//! concurrent mutation; callers serialize access (the session wraps it in a
//! mutex and the tracking handler locks it per batch).

use std::collections::HashMap;
use std::sync::Arc;

use crate::metadata::DynEntity;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityState {
    Unchanged,
    Modified,
    Added,
    Removed,
}

#[derive(Clone)]
struct TrackedEntity {
    instance: DynEntity,
    state: EntityState,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct TrackingKey {
    entity: &'static str,
    path: String,
}

/// Identity map keyed by entity type and document path.
#[derive(Clone, Default)]
pub struct EntityTracker {
    entries: HashMap<TrackingKey, TrackedEntity>,
}

impl EntityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity resolution: returns the already-tracked instance for this key
    /// if one exists, otherwise registers `instance` as unchanged and returns
    /// it.
    pub fn resolve_or_track(
        &mut self,
        entity: &'static str,
        path: &str,
        instance: DynEntity,
    ) -> DynEntity {
        let key = TrackingKey {
            entity,
            path: path.to_string(),
        };
        match self.entries.get(&key) {
            Some(tracked) => Arc::clone(&tracked.instance),
            None => {
                self.entries.insert(
                    key,
                    TrackedEntity {
                        instance: Arc::clone(&instance),
                        state: EntityState::Unchanged,
                    },
                );
                instance
            }
        }
    }

    pub fn get(&self, entity: &'static str, path: &str) -> Option<DynEntity> {
        self.entries
            .get(&TrackingKey {
                entity,
                path: path.to_string(),
            })
            .map(|tracked| Arc::clone(&tracked.instance))
    }

    pub fn state(&self, entity: &'static str, path: &str) -> Option<EntityState> {
        self.entries
            .get(&TrackingKey {
                entity,
                path: path.to_string(),
            })
            .map(|tracked| tracked.state)
    }

    pub fn set_state(&mut self, entity: &'static str, path: &str, state: EntityState) {
        if let Some(tracked) = self.entries.get_mut(&TrackingKey {
            entity,
            path: path.to_string(),
        }) {
            tracked.state = state;
        }
    }

    /// Stops tracking one entity.
    pub fn detach(&mut self, entity: &'static str, path: &str) {
        self.entries.remove(&TrackingKey {
            entity,
            path: path.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_resolution_returns_the_first_instance() {
        let mut tracker = EntityTracker::new();
        let first: DynEntity = Arc::new("order".to_string());
        let second: DynEntity = Arc::new("order".to_string());

        let resolved_first = tracker.resolve_or_track("Order", "orders/o1", Arc::clone(&first));
        let resolved_second = tracker.resolve_or_track("Order", "orders/o1", second);

        assert!(Arc::ptr_eq(&resolved_first, &first));
        assert!(Arc::ptr_eq(&resolved_second, &first));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn new_entries_register_as_unchanged() {
        let mut tracker = EntityTracker::new();
        tracker.resolve_or_track("Order", "orders/o1", Arc::new(1i64));
        assert_eq!(
            tracker.state("Order", "orders/o1"),
            Some(EntityState::Unchanged)
        );
    }

    #[test]
    fn detach_forgets_the_instance() {
        let mut tracker = EntityTracker::new();
        tracker.resolve_or_track("Order", "orders/o1", Arc::new(1i64));
        tracker.detach("Order", "orders/o1");
        assert!(tracker.get("Order", "orders/o1").is_none());
    }
}
