//! Event dispatch to feature loaders

use crate::types::{Event, EventType};

use super::registry::FeatureRegistry;

/// Routes events to the loaders registered for their feature
///
/// The dispatcher holds no per-event state; all state lives in the loaders'
/// own models.
pub struct Dispatcher;

impl Dispatcher {
    /// Invoke every loader registered for `ty`'s feature, in registration
    /// order. Returns the number of loaders invoked.
    ///
    /// Features missing from the available set are not dispatched, even when
    /// loaders for them are still registered.
    pub fn dispatch(registry: &FeatureRegistry, event: &Event, ty: &EventType) -> usize {
        let Some(feature) = ty.feature() else {
            return 0;
        };
        if !registry.available().contains(feature) {
            return 0;
        }

        let loaders = registry.loaders_for(feature);
        for loader in loaders {
            loader(event, ty);
        }
        loaders.len()
    }

    /// Dispatch a batch of events, resolving each event's type by index
    ///
    /// Events whose type index is out of range are skipped.
    pub fn dispatch_all(
        registry: &FeatureRegistry,
        types: &[EventType],
        events: &[Event],
    ) -> usize {
        events
            .iter()
            .filter_map(|event| {
                types
                    .get(event.type_index as usize)
                    .map(|ty| Self::dispatch(registry, event, ty))
            })
            .sum()
    }
}
