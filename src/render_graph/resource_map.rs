//! Typed single-slot resource registry
//!
//! A producer publishes a value of type `T`; any later consumer in the same
//! frame looks it up by type. One slot per type: publishing again replaces
//! the previous value (last write wins). Values published as persistent stay
//! valid across frames until replaced.

use crate::error::{GraphError, GraphResult};
use std::any::{Any, TypeId};
use std::collections::HashMap;

struct Slot {
    value: Box<dyn Any>,
    frame: u64,
    persistent: bool,
}

/// Registry of published per-frame results keyed by type
#[derive(Default)]
pub struct ResourceMap {
    slots: HashMap<TypeId, Slot>,
}

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `value` for `frame`, replacing whatever was stored for `T`.
    pub fn set<T: 'static>(&mut self, value: T, frame: u64, persistent: bool) {
        let replaced = self.slots.insert(
            TypeId::of::<T>(),
            Slot {
                value: Box::new(value),
                frame,
                persistent,
            },
        );
        if let Some(old) = replaced {
            if old.frame == frame {
                log::trace!(
                    "{} published twice in frame {frame}, keeping the latest",
                    std::any::type_name::<T>()
                );
            }
        }
    }

    /// Look up the current value of `T` for `frame`.
    pub fn get<T: 'static>(&self, frame: u64) -> GraphResult<&T> {
        self.slots
            .get(&TypeId::of::<T>())
            .filter(|slot| slot.persistent || slot.frame == frame)
            .and_then(|slot| slot.value.downcast_ref::<T>())
            .ok_or(GraphError::ResourceNotPublished {
                type_name: std::any::type_name::<T>(),
            })
    }

    pub fn is_valid<T: 'static>(&self, frame: u64) -> bool {
        self.get::<T>(frame).is_ok()
    }

    /// Remove `T` regardless of persistence.
    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.slots
            .remove(&TypeId::of::<T>())
            .and_then(|slot| slot.value.downcast::<T>().ok())
            .map(|value| *value)
    }

    /// Drop every non-persistent slot. Called at the frame boundary.
    pub fn end_frame(&mut self) {
        self.slots.retain(|_, slot| slot.persistent);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Exposure(f32);

    #[test]
    fn test_last_write_wins() {
        let mut map = ResourceMap::new();
        map.set(Exposure(1.0), 0, false);
        map.set(Exposure(2.0), 0, false);
        assert_eq!(map.get::<Exposure>(0), Ok(&Exposure(2.0)));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_missing_is_error() {
        let map = ResourceMap::new();
        assert!(matches!(
            map.get::<Exposure>(0),
            Err(GraphError::ResourceNotPublished { .. })
        ));
    }

    #[test]
    fn test_previous_frame_value_is_invalid() {
        let mut map = ResourceMap::new();
        map.set(Exposure(1.0), 3, false);
        assert!(map.is_valid::<Exposure>(3));
        assert!(!map.is_valid::<Exposure>(4));
    }

    #[test]
    fn test_persistent_survives_end_frame() {
        let mut map = ResourceMap::new();
        map.set(Exposure(1.0), 0, true);
        map.set(7u32, 0, false);
        map.end_frame();
        assert!(map.is_valid::<Exposure>(5));
        assert!(!map.is_valid::<u32>(0));
        assert_eq!(map.remove::<Exposure>(), Some(Exposure(1.0)));
        assert!(map.is_empty());
    }
}
