//! Render feature lifecycle
//!
//! A feature declares passes against the graph every frame and owns whatever
//! persistent state it needs between frames. [`FeatureHandle`] guarantees the
//! feature's `cleanup` runs exactly once: on `dispose`, or from `Drop` with
//! an error log when the owner forgot to dispose.

use crate::render_graph::RenderGraph;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A unit of rendering that declares passes into the graph
pub trait RenderFeature {
    /// Per-frame input; `()` for features that only read the resource map
    type Input<'a>;

    fn name(&self) -> &'static str;

    fn render(&mut self, graph: &mut RenderGraph, input: Self::Input<'_>);

    /// Release owned resources. `disposing` is false when reached from a
    /// missed dispose.
    fn cleanup(&mut self, _disposing: bool) {}
}

#[derive(Default)]
struct LeakTrackerState {
    next_id: u64,
    live: HashMap<u64, &'static str>,
}

/// Registry of live feature handles, checked at shutdown
#[derive(Clone, Default)]
pub struct LeakTracker {
    state: Arc<Mutex<LeakTrackerState>>,
}

impl LeakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, name: &'static str) -> u64 {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.live.insert(id, name);
        id
    }

    fn unregister(&self, id: u64) {
        self.state.lock().live.remove(&id);
    }

    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Names of features still alive, logged as warnings.
    pub fn report(&self) -> Vec<&'static str> {
        let state = self.state.lock();
        let mut names: Vec<&'static str> = state.live.values().copied().collect();
        names.sort_unstable();
        for name in &names {
            log::warn!("render feature '{name}' is still alive");
        }
        names
    }
}

impl std::fmt::Debug for LeakTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeakTracker")
            .field("live", &self.live_count())
            .finish()
    }
}

/// Owning wrapper that enforces the dispose contract of a [`RenderFeature`]
pub struct FeatureHandle<F: RenderFeature> {
    feature: F,
    disposed: bool,
    tracking: Option<(LeakTracker, u64)>,
}

impl<F: RenderFeature> FeatureHandle<F> {
    pub fn new(feature: F) -> Self {
        Self {
            feature,
            disposed: false,
            tracking: None,
        }
    }

    pub fn tracked(feature: F, tracker: &LeakTracker) -> Self {
        let id = tracker.register(feature.name());
        Self {
            feature,
            disposed: false,
            tracking: Some((tracker.clone(), id)),
        }
    }

    /// Run `cleanup(true)` and drop the feature.
    pub fn dispose(mut self) {
        self.feature.cleanup(true);
        self.disposed = true;
    }
}

impl<F: RenderFeature> Deref for FeatureHandle<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.feature
    }
}

impl<F: RenderFeature> DerefMut for FeatureHandle<F> {
    fn deref_mut(&mut self) -> &mut F {
        &mut self.feature
    }
}

impl<F: RenderFeature> Drop for FeatureHandle<F> {
    fn drop(&mut self) {
        if !self.disposed {
            log::error!(
                "render feature '{}' was dropped without dispose",
                self.feature.name()
            );
            self.feature.cleanup(false);
        }
        if let Some((tracker, id)) = self.tracking.take() {
            tracker.unregister(id);
        }
    }
}
