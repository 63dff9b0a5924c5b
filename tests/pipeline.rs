//! Whole-pipeline frames: lighting setup, shadows, clustering and the
//! deferred lighting consumer.

mod common;

use frame_graph::backend::{Command, CommandBuffer};
use frame_graph::settings::{ClusterAssignment, RendererSettings};
use frame_graph::{ConfigError, LeakTracker, LightingPipeline, RenderGraph};
use rstest::rstest;

#[rstest]
#[case::gpu_clusters(ClusterAssignment::Gpu)]
#[case::cpu_clusters(ClusterAssignment::Cpu)]
fn test_frames_render_lit_scene(#[case] assignment: ClusterAssignment) {
    common::init_logging();
    let scene = common::lit_scene();
    let mut settings = RendererSettings::default();
    settings.clustering.assignment = assignment;
    let mut pipeline = LightingPipeline::new(settings).unwrap();
    let mut graph = RenderGraph::new();
    let mut cmd = CommandBuffer::new();

    for frame in 0..3 {
        cmd.clear();
        let target = pipeline.render(&mut graph, &scene, 1280, 720);
        let desc = graph.texture_desc(target).unwrap();
        assert_eq!((desc.width, desc.height), (1280, 720));

        let stats = graph.execute(&mut cmd);
        assert_eq!(stats.frame_index, frame);

        let commands = cmd.commands();
        assert!(commands.contains(&Command::DrawFullscreen {
            shader: "DeferredLighting"
        }));
        assert!(commands.contains(&Command::SetGlobalInt {
            name: "_ShadowsEnabled",
            value: 1
        }));
        assert!(common::count_commands(&cmd, |c| matches!(c, Command::DrawShadowCasters { .. })) > 0);
        for name in [
            "_LightData",
            "_LightClusterIndices",
            "_LightClusterList",
            "_DirectionalShadows",
            "_PointShadows",
            "_SpotShadows",
        ] {
            let bound = cmd.find_global_buffer(name).is_some() || cmd.find_global_texture(name).is_some();
            assert!(bound, "{name} was never bound");
        }
    }

    pipeline.dispose();
}

#[test]
fn test_lighting_runs_last() {
    let scene = common::lit_scene();
    let mut pipeline = LightingPipeline::new(RendererSettings::default()).unwrap();
    let mut graph = RenderGraph::new();
    pipeline.render(&mut graph, &scene, 640, 360);

    let mut cmd = CommandBuffer::new();
    graph.execute(&mut cmd);
    let last_sample = cmd.commands().iter().rev().find_map(|c| match c {
        Command::BeginSample(name) => Some(name.clone()),
        _ => None,
    });
    assert_eq!(last_sample.as_deref(), Some("Deferred Lighting"));
    pipeline.dispose();
}

#[test]
fn test_leak_tracker_sees_every_feature() {
    common::init_logging();
    let tracker = LeakTracker::new();
    let pipeline = LightingPipeline::with_tracker(RendererSettings::default(), &tracker).unwrap();
    assert_eq!(
        tracker.report(),
        vec![
            "ClusteredLightCulling",
            "DeferredLighting",
            "LightingSetup",
            "ShadowRenderer"
        ]
    );

    pipeline.dispose();
    assert!(tracker.report().is_empty());
}

#[test]
fn test_dropped_pipeline_still_releases_features() {
    let tracker = LeakTracker::new();
    {
        let _pipeline = LightingPipeline::with_tracker(RendererSettings::default(), &tracker).unwrap();
        assert_eq!(tracker.live_count(), 4);
    }
    assert_eq!(tracker.live_count(), 0);
}

#[test]
fn test_settings_change_between_frames() {
    let scene = common::lit_scene();
    let mut pipeline = LightingPipeline::new(RendererSettings::default()).unwrap();
    let mut graph = RenderGraph::new();
    pipeline.render(&mut graph, &scene, 320, 180);
    graph.execute(&mut CommandBuffer::new());

    let mut settings = pipeline.settings().clone();
    settings.shadows.cascade_count = 2;
    pipeline.set_settings(settings).unwrap();
    pipeline.render(&mut graph, &scene, 320, 180);
    let mut cmd = CommandBuffer::new();
    graph.execute(&mut cmd);
    assert!(cmd.commands().contains(&Command::SetGlobalInt {
        name: "_CascadeCount",
        value: 2
    }));

    let mut invalid = pipeline.settings().clone();
    invalid.clustering.tile_size = 0;
    assert!(matches!(pipeline.set_settings(invalid), Err(ConfigError::Invalid(_))));
    assert_eq!(pipeline.settings().clustering.tile_size, 16);
    pipeline.dispose();
}

#[test]
fn test_settings_from_toml() {
    let settings = RendererSettings::from_toml_str(
        r#"
        [clustering]
        tile_size = 32
        assignment = "cpu"

        [shadows]
        cascade_count = 2
        "#,
    )
    .unwrap();
    assert_eq!(settings.clustering.tile_size, 32);
    assert_eq!(settings.clustering.assignment, ClusterAssignment::Cpu);
    assert_eq!(settings.shadows.cascade_count, 2);
    assert_eq!(settings.shadows.point_resolution, 512);

    let err = RendererSettings::from_toml_str("[shadows]\ncascade_count = 12\n").unwrap_err();
    assert!(err.to_string().contains("cascade_count"));
    assert!(matches!(
        RendererSettings::from_toml_str("[clustering\n"),
        Err(ConfigError::Parse(_))
    ));
}
