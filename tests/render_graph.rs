//! Render graph integration tests: resource registry, history caches and
//! transient aliasing across whole frames.

mod common;

use frame_graph::backend::{Command, CommandBuffer, LoadAction, StoreAction, TextureDimension, TextureFormat};
use frame_graph::render_graph::{AccessMode, PersistentRTHandleCache, RenderGraph, TextureDesc};
use rstest::rstest;

#[derive(Debug, Clone, PartialEq)]
struct Exposure(f32);

#[test]
fn test_history_round_trip_across_frames() {
    common::init_logging();
    let mut graph = RenderGraph::new();
    let mut cache = PersistentRTHandleCache::new("TemporalColor", TextureFormat::Rgba16Float, TextureDimension::Tex2D, false);

    let (first_current, first_history, created) = cache.get_textures(&mut graph, 640, 360, 0u32, false, 1);
    assert!(created);
    assert_eq!(first_history, first_current);
    graph.execute(&mut CommandBuffer::new());

    let (second_current, second_history, created) = cache.get_textures(&mut graph, 640, 360, 0u32, false, 1);
    assert!(!created);
    assert_eq!(second_history, first_current);
    assert_ne!(second_current, first_current);
    assert_ne!(
        graph.persistent_texture_backing(second_current).unwrap(),
        graph.persistent_texture_backing(second_history).unwrap()
    );

    cache.dispose(&graph.release_queue());
    graph.execute(&mut CommandBuffer::new());
    assert_eq!(graph.persistent_resource_count(), 0);
}

#[test]
fn test_views_keep_separate_history() {
    let mut graph = RenderGraph::new();
    let mut cache = PersistentRTHandleCache::new("TemporalColor", TextureFormat::Rgba16Float, TextureDimension::Tex2D, false);

    let (game, _, _) = cache.get_textures(&mut graph, 64, 64, "game", false, 1);
    let (scene_view, _, _) = cache.get_textures(&mut graph, 32, 32, "scene", false, 1);
    graph.execute(&mut CommandBuffer::new());

    let (_, game_history, _) = cache.get_textures(&mut graph, 64, 64, "game", false, 1);
    let (_, scene_history, _) = cache.get_textures(&mut graph, 32, 32, "scene", false, 1);
    assert_eq!(game_history, game);
    assert_eq!(scene_history, scene_view);

    cache.remove_view(&"scene", &graph.release_queue());
    assert_eq!(cache.view_count(), 1);
    cache.dispose(&graph.release_queue());
    graph.execute(&mut CommandBuffer::new());
}

#[test]
fn test_registry_last_write_wins() {
    let mut graph = RenderGraph::new();
    graph.set_resource(Exposure(1.0), false);
    graph.set_resource(Exposure(2.0), false);
    assert_eq!(graph.get_resource::<Exposure>(), &Exposure(2.0));
}

#[test]
#[should_panic(expected = "was not published this frame")]
fn test_missing_producer_panics() {
    let graph = RenderGraph::new();
    graph.get_resource::<Exposure>();
}

#[test]
fn test_registry_entry_from_last_frame_is_not_reused() {
    let mut graph = RenderGraph::new();
    graph.set_resource(Exposure(1.0), false);
    graph.execute(&mut CommandBuffer::new());
    assert!(!graph.is_render_pass_data_valid::<Exposure>());
    assert!(graph.try_get_resource::<Exposure>().is_err());

    graph.set_resource(Exposure(3.0), true);
    graph.execute(&mut CommandBuffer::new());
    assert_eq!(graph.get_resource::<Exposure>(), &Exposure(3.0));
}

#[rstest]
#[case::chain_of_two(2, 2)]
#[case::chain_of_three(3, 2)]
#[case::chain_of_six(6, 2)]
fn test_ping_pong_chain_needs_two_backings(#[case] steps: usize, #[case] expected_backings: u64) {
    common::init_logging();
    let mut graph = RenderGraph::new();
    let desc = TextureDesc::new(256, 256, TextureFormat::Rgba16Float);

    let mut previous = None;
    for step in 0..steps {
        let texture = graph.get_texture(desc.clone());
        let name = format!("Blur {step}");
        let mut pass = graph.add_raster_pass(&name);
        if let Some(source) = previous {
            pass.read_texture("_Source", source);
        }
        pass.write_texture(texture, LoadAction::DontCare, StoreAction::Store);
        drop(pass);
        previous = Some(texture);
    }
    if let Some(last) = previous {
        graph
            .add_generic_pass("Present")
            .use_texture(last, AccessMode::Read);
    }

    let mut cmd = CommandBuffer::new();
    let stats = graph.execute(&mut cmd);
    assert_eq!(stats.passes_executed, steps + 1);
    assert_eq!(stats.backings_created, expected_backings);

    // The same chain next frame is served entirely from the pool
    for step in 0..steps {
        let texture = graph.get_texture(desc.clone());
        let name = format!("Blur {step}");
        graph
            .add_raster_pass(&name)
            .write_texture(texture, LoadAction::DontCare, StoreAction::Store);
    }
    let stats = graph.execute(&mut cmd);
    assert_eq!(stats.backings_created, 0);
}

#[test]
fn test_passes_record_between_samples() {
    let mut graph = RenderGraph::new();
    let target = graph.get_texture(TextureDesc::new(8, 8, TextureFormat::Rgba8Unorm));
    graph
        .add_raster_pass("Fill")
        .write_texture(target, LoadAction::Clear, StoreAction::Store)
        .set_render_function((), |cmd, _ctx, _| cmd.draw_fullscreen("Fill"));

    let mut cmd = CommandBuffer::new();
    graph.execute(&mut cmd);
    let commands = cmd.commands();
    assert_eq!(commands.first(), Some(&Command::BeginSample("Fill".to_string())));
    assert_eq!(commands.last(), Some(&Command::EndSample("Fill".to_string())));
    assert!(commands.contains(&Command::DrawFullscreen { shader: "Fill" }));
}
