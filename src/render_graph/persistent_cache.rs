//! Per-view current/history texture pairs for temporal effects

use crate::backend::{TextureDimension, TextureFormat};
use crate::render_graph::graph::RenderGraph;
use crate::render_graph::release_queue::ReleaseQueue;
use crate::render_graph::resource::{TextureDesc, TextureHandle};
use std::collections::HashMap;
use std::hash::Hash;

struct ViewEntry {
    textures: [TextureHandle; 2],
    /// Index into `textures` of the texture written this frame
    current: usize,
    width: u32,
    height: u32,
    depth: u32,
    has_mips: bool,
    was_created: bool,
}

impl ViewEntry {
    fn history(&self) -> TextureHandle {
        if self.was_created {
            self.textures[self.current]
        } else {
            self.textures[1 - self.current]
        }
    }

    fn result(&self) -> (TextureHandle, TextureHandle, bool) {
        (self.textures[self.current], self.history(), self.was_created)
    }
}

/// Keeps two persistent textures per view and swaps their roles on every request.
///
/// The first request for a view returns `was_created = true` with the history
/// handle equal to the current one. Every later request swaps the roles, so
/// its history is the previous request's current and the two never share a
/// backing.
pub struct PersistentRTHandleCache<K: Hash + Eq> {
    label: &'static str,
    format: TextureFormat,
    dimension: TextureDimension,
    has_mips: bool,
    views: HashMap<K, ViewEntry>,
}

impl<K: Hash + Eq> PersistentRTHandleCache<K> {
    pub fn new(label: &'static str, format: TextureFormat, dimension: TextureDimension, has_mips: bool) -> Self {
        Self {
            label,
            format,
            dimension,
            has_mips,
            views: HashMap::new(),
        }
    }

    /// Swap the pair for `view_key` and return `(current, history, was_created)`.
    ///
    /// Call once per view per frame; use [`Self::current_textures`] to look
    /// the pair up again without swapping. A size or depth change recreates
    /// both textures and reports `was_created`.
    /// With `allow_mip_drop` the pair is allocated without a mip chain even
    /// if the cache was configured with mips.
    pub fn get_textures(
        &mut self,
        graph: &mut RenderGraph,
        width: u32,
        height: u32,
        view_key: K,
        allow_mip_drop: bool,
        depth: u32,
    ) -> (TextureHandle, TextureHandle, bool) {
        let has_mips = self.has_mips && !allow_mip_drop;

        if let Some(entry) = self.views.get_mut(&view_key) {
            let same_shape = entry.width == width
                && entry.height == height
                && entry.depth == depth
                && entry.has_mips == has_mips;
            if same_shape {
                entry.current = 1 - entry.current;
                entry.was_created = false;
                return entry.result();
            }

            log::debug!(
                "'{}' view resized to {width}x{height}x{depth}, recreating history",
                self.label
            );
            for handle in entry.textures {
                if let Err(err) = graph.release_persistent_resource(handle) {
                    log::warn!("'{}' failed to release {handle:?}: {err}", self.label);
                }
            }
        }

        let desc = TextureDesc::new(width, height, self.format)
            .with_label(self.label)
            .with_depth(depth)
            .with_dimension(self.dimension)
            .with_mips(has_mips)
            .persistent();
        let entry = ViewEntry {
            textures: [graph.get_texture(desc.clone()), graph.get_texture(desc)],
            current: 0,
            width,
            height,
            depth,
            has_mips,
            was_created: true,
        };
        let result = entry.result();
        self.views.insert(view_key, entry);
        result
    }

    /// The triple returned by the last `get_textures` for `view_key`.
    pub fn current_textures(&self, view_key: &K) -> Option<(TextureHandle, TextureHandle, bool)> {
        self.views.get(view_key).map(ViewEntry::result)
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Forget one view and queue its textures for release.
    pub fn remove_view(&mut self, view_key: &K, queue: &ReleaseQueue) {
        if let Some(entry) = self.views.remove(view_key) {
            for handle in entry.textures {
                queue.release_texture(handle);
            }
        }
    }

    /// Queue every tracked texture for release.
    pub fn dispose(&mut self, queue: &ReleaseQueue) {
        for (_, entry) in self.views.drain() {
            for handle in entry.textures {
                queue.release_texture(handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CommandBuffer;

    fn cache() -> PersistentRTHandleCache<u32> {
        PersistentRTHandleCache::new("TemporalHistory", TextureFormat::Rgba16Float, TextureDimension::Tex2D, false)
    }

    #[test]
    fn test_first_call_history_equals_current() {
        let mut graph = RenderGraph::new();
        let mut cache = cache();
        let (current, history, was_created) = cache.get_textures(&mut graph, 64, 64, 0, false, 1);
        assert!(was_created);
        assert_eq!(current, history);
    }

    #[test]
    fn test_history_is_previous_current() {
        let mut graph = RenderGraph::new();
        let mut cache = cache();
        let (first, _, _) = cache.get_textures(&mut graph, 64, 64, 0, false, 1);
        graph.execute(&mut CommandBuffer::new());

        let (current, history, was_created) = cache.get_textures(&mut graph, 64, 64, 0, false, 1);
        assert!(!was_created);
        assert_eq!(history, first);
        assert_ne!(current, history);
        assert_ne!(
            graph.persistent_texture_backing(current).unwrap(),
            graph.persistent_texture_backing(history).unwrap()
        );
    }

    #[test]
    fn test_successive_calls_swap_without_execute() {
        let mut graph = RenderGraph::new();
        let mut cache = cache();
        let (first, _, created) = cache.get_textures(&mut graph, 64, 64, 0, false, 1);
        assert!(created);

        let (current, history, created) = cache.get_textures(&mut graph, 64, 64, 0, false, 1);
        assert!(!created);
        assert_eq!(history, first);
        assert_ne!(current, first);

        let (third, history, _) = cache.get_textures(&mut graph, 64, 64, 0, false, 1);
        assert_eq!(history, current);
        assert_eq!(third, first);
    }

    #[test]
    fn test_current_textures_does_not_swap() {
        let mut graph = RenderGraph::new();
        let mut cache = cache();
        assert!(cache.current_textures(&0).is_none());
        cache.get_textures(&mut graph, 64, 64, 0, false, 1);
        let swapped = cache.get_textures(&mut graph, 64, 64, 0, false, 1);

        assert_eq!(cache.current_textures(&0), Some(swapped));
        assert_eq!(cache.current_textures(&0), Some(swapped));
    }

    #[test]
    fn test_views_are_independent() {
        let mut graph = RenderGraph::new();
        let mut cache = cache();
        let (scene_view, _, _) = cache.get_textures(&mut graph, 64, 64, 0, false, 1);
        let (game_view, _, created) = cache.get_textures(&mut graph, 64, 64, 1, false, 1);
        assert!(created);
        assert_ne!(scene_view, game_view);
        assert_eq!(cache.view_count(), 2);
    }

    #[test]
    fn test_resize_recreates_pair() {
        let mut graph = RenderGraph::new();
        let mut cache = cache();
        let (old, _, _) = cache.get_textures(&mut graph, 64, 64, 0, false, 1);
        graph.execute(&mut CommandBuffer::new());

        let (current, history, was_created) = cache.get_textures(&mut graph, 128, 64, 0, false, 1);
        assert!(was_created);
        assert_eq!(current, history);
        assert!(graph.persistent_texture_backing(old).is_err());
        assert_eq!(graph.persistent_resource_count(), 2);
    }

    #[test]
    fn test_dispose_releases_everything() {
        let mut graph = RenderGraph::new();
        let mut cache = cache();
        cache.get_textures(&mut graph, 64, 64, 0, false, 1);
        cache.get_textures(&mut graph, 32, 32, 1, false, 1);
        assert_eq!(graph.persistent_resource_count(), 4);

        cache.dispose(&graph.release_queue());
        graph.execute(&mut CommandBuffer::new());
        assert_eq!(graph.persistent_resource_count(), 0);
        assert_eq!(cache.view_count(), 0);
    }

    #[test]
    fn test_mip_drop_allocates_without_mips() {
        let mut graph = RenderGraph::new();
        let mut cache: PersistentRTHandleCache<u32> =
            PersistentRTHandleCache::new("Reflections", TextureFormat::Rgba16Float, TextureDimension::Tex2D, true);
        let (with_mips, _, _) = cache.get_textures(&mut graph, 64, 64, 0, false, 1);
        let (without, _, _) = cache.get_textures(&mut graph, 64, 64, 1, true, 1);
        assert_eq!(graph.texture_desc(with_mips).unwrap().mip_count(), 7);
        assert_eq!(graph.texture_desc(without).unwrap().mip_count(), 1);
    }
}
