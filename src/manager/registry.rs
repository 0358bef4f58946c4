//! Feature registry
//!
//! Analysis models announce which features they consume. For every feature
//! bit the registry keeps the loaders in registration order, and it keeps a
//! single ordered list of finalizers that run once all data is sorted.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{Event, EventType, Feature, FeatureSet};

/// Per-event consumer registered for one or more features
pub type Loader = Arc<dyn Fn(&Event, &EventType) + Send + Sync>;

/// Hook run after processing, once per announcement
pub type Finalizer = Arc<dyn Fn() + Send + Sync>;

/// Which feature sets an announcement changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnnounceOutcome {
    pub available: Option<FeatureSet>,
    pub visible: Option<FeatureSet>,
}

#[derive(Default)]
pub struct FeatureRegistry {
    loaders: HashMap<Feature, Vec<Loader>>,
    finalizers: Vec<Finalizer>,
    available: FeatureSet,
    visible: FeatureSet,
    hidden: FeatureSet,
    registered_models: usize,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `loader` under every feature in `features`
    ///
    /// Announced features become visible unless the user explicitly hid them
    /// through [`FeatureRegistry::set_visible`].
    pub fn announce(
        &mut self,
        features: FeatureSet,
        loader: Loader,
        finalizer: Finalizer,
    ) -> AnnounceOutcome {
        let mut outcome = AnnounceOutcome::default();

        if !self.available.contains_all(features) {
            self.available |= features;
            outcome.available = Some(self.available);
        }

        let shown = features.difference(self.hidden);
        if !self.visible.contains_all(shown) {
            self.visible |= shown;
            outcome.visible = Some(self.visible);
        }

        for feature in features.iter() {
            self.loaders
                .entry(feature)
                .or_default()
                .push(Arc::clone(&loader));
        }
        self.finalizers.push(finalizer);

        outcome
    }

    /// Loaders for `feature`, in registration order
    pub fn loaders_for(&self, feature: Feature) -> &[Loader] {
        self.loaders.get(&feature).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Finalizers in registration order
    pub fn finalizers(&self) -> &[Finalizer] {
        &self.finalizers
    }

    pub fn available(&self) -> FeatureSet {
        self.available
    }

    pub fn visible(&self) -> FeatureSet {
        self.visible
    }

    /// Returns whether the visible set changed
    ///
    /// Available features left out of `features` count as hidden by the user.
    pub fn set_visible(&mut self, features: FeatureSet) -> bool {
        let changed = self.visible != features;
        self.visible = features;
        self.hidden = self.available.difference(features);
        changed
    }

    /// Clear visibility, including the user's hidden choices
    pub fn reset_visible(&mut self) -> bool {
        let changed = !self.visible.is_empty();
        self.visible = FeatureSet::EMPTY;
        self.hidden = FeatureSet::EMPTY;
        changed
    }

    /// Forget which features are available. Loaders stay registered.
    pub fn reset_available(&mut self) -> bool {
        let changed = !self.available.is_empty();
        self.available = FeatureSet::EMPTY;
        changed
    }

    /// Hand out an id for a model proxy
    pub fn register_model_proxy(&mut self) -> usize {
        let id = self.registered_models;
        self.registered_models += 1;
        id
    }

    pub fn registered_models(&self) -> usize {
        self.registered_models
    }
}

impl std::fmt::Debug for FeatureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureRegistry")
            .field("features", &self.loaders.keys().collect::<Vec<_>>())
            .field("finalizers", &self.finalizers.len())
            .field("available", &self.available)
            .field("visible", &self.visible)
            .finish()
    }
}
