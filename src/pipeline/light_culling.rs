//! Clustered light culling
//!
//! The view frustum is cut into screen tiles of `tile_size` pixels and
//! `cluster_depth` logarithmic depth slices. Every local light is assigned to
//! the clusters its bounding sphere touches; shading then looks up a cluster's
//! `(offset, count)` range in a flat light index list.
//!
//! Assignment runs either as a compute dispatch or on the CPU, in which case
//! the finished grid is uploaded and kept on the result for inspection.

use crate::backend::{BufferTarget, CommandBuffer, TextureDimension, TextureFormat};
use crate::error::{GraphError, GraphResult};
use crate::feature::RenderFeature;
use crate::math::{projected_sphere_bounds, Aabb, Sphere};
use crate::pipeline::lighting_setup::LightingSetupResult;
use crate::render_graph::{
    BufferDesc, BufferHandle, PassBuilder, PassContext, RenderGraph, RenderPassData, TextureDesc, TextureHandle,
};
use crate::scene::Camera;
use crate::settings::{ClusterAssignment, ClusterSettings};
use glam::{Mat4, Vec2, Vec3, Vec4};
use std::sync::Arc;

/// Dimensions and depth slicing of the cluster grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterLayout {
    pub screen_width: u32,
    pub screen_height: u32,
    pub tile_size: u32,
    pub cluster_width: u32,
    pub cluster_height: u32,
    pub cluster_depth: u32,
    pub near: f32,
    pub far: f32,
    pub scale: f32,
    pub bias: f32,
}

impl ClusterLayout {
    pub fn new(width: u32, height: u32, near: f32, far: f32, tile_size: u32, cluster_depth: u32) -> GraphResult<Self> {
        if width == 0 || height == 0 || tile_size == 0 || cluster_depth == 0 {
            return Err(GraphError::InvalidArgument(format!(
                "cluster layout needs non-zero size, tile and depth, got {width}x{height}, tile {tile_size}, depth {cluster_depth}"
            )));
        }
        if !(near > 0.0 && far > near) {
            return Err(GraphError::InvalidArgument(format!(
                "cluster layout needs 0 < near < far, got near {near}, far {far}"
            )));
        }

        let log_range = (far / near).log2();
        let depth = cluster_depth as f32;
        Ok(Self {
            screen_width: width,
            screen_height: height,
            tile_size,
            cluster_width: width.div_ceil(tile_size),
            cluster_height: height.div_ceil(tile_size),
            cluster_depth,
            near,
            far,
            scale: depth / log_range,
            bias: -(depth * near.log2() / log_range),
        })
    }

    pub fn from_settings(width: u32, height: u32, near: f32, far: f32, settings: &ClusterSettings) -> GraphResult<Self> {
        Self::new(width, height, near, far, settings.tile_size, settings.cluster_depth)
    }

    pub fn cell_count(&self) -> usize {
        (self.cluster_width * self.cluster_height * self.cluster_depth) as usize
    }

    /// Depth slice of a positive view-space depth, clamped to the grid
    pub fn slice(&self, depth: f32) -> u32 {
        if depth <= 0.0 {
            return 0;
        }
        let slice = (depth.log2() * self.scale + self.bias).floor();
        slice.clamp(0.0, (self.cluster_depth - 1) as f32) as u32
    }

    /// View-space depth where `slice` begins
    pub fn slice_near(&self, slice: u32) -> f32 {
        if slice == 0 {
            return self.near;
        }
        ((slice as f32 - self.bias) / self.scale).exp2()
    }

    /// View-space depth where `slice` ends
    pub fn slice_far(&self, slice: u32) -> f32 {
        if slice + 1 >= self.cluster_depth {
            return self.far;
        }
        self.slice_near(slice + 1)
    }

    /// Tile of a pixel, origin at the bottom left
    pub fn tile(&self, pixel: Vec2) -> (u32, u32) {
        let x = (pixel.x.max(0.0) as u32 / self.tile_size).min(self.cluster_width - 1);
        let y = (pixel.y.max(0.0) as u32 / self.tile_size).min(self.cluster_height - 1);
        (x, y)
    }

    pub fn cluster(&self, pixel: Vec2, depth: f32) -> (u32, u32, u32) {
        let (x, y) = self.tile(pixel);
        (x, y, self.slice(depth))
    }

    pub fn cell_index(&self, x: u32, y: u32, z: u32) -> usize {
        ((z * self.cluster_height + y) * self.cluster_width + x) as usize
    }

    fn ndc_to_pixel(&self, ndc: Vec2) -> Vec2 {
        (ndc * 0.5 + 0.5) * Vec2::new(self.screen_width as f32, self.screen_height as f32)
    }

    fn pixel_to_ndc(&self, pixel: Vec2) -> Vec2 {
        pixel / Vec2::new(self.screen_width as f32, self.screen_height as f32) * 2.0 - 1.0
    }
}

/// A local light in view space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterLight {
    pub light_index: u32,
    pub center: Vec3,
    pub radius: f32,
}

/// View-space bounds of one cluster's frustum section
fn cluster_bounds(layout: &ClusterLayout, inverse_projection: &Mat4, x: u32, y: u32, z: u32) -> Aabb {
    let tile = layout.tile_size as f32;
    let min_px = Vec2::new(x as f32 * tile, y as f32 * tile);
    let max_px = (min_px + tile).min(Vec2::new(layout.screen_width as f32, layout.screen_height as f32));
    let (near, far) = (layout.slice_near(z), layout.slice_far(z));

    let mut points = [Vec3::ZERO; 8];
    let corners = [
        min_px,
        Vec2::new(max_px.x, min_px.y),
        max_px,
        Vec2::new(min_px.x, max_px.y),
    ];
    for (i, corner) in corners.iter().enumerate() {
        let ndc = layout.pixel_to_ndc(*corner);
        let a = inverse_projection.project_point3(ndc.extend(0.0));
        let b = inverse_projection.project_point3(ndc.extend(1.0));
        let along = b - a;
        let at_depth = |depth: f32| {
            if along.z.abs() <= f32::EPSILON {
                a
            } else {
                a + along * ((-depth - a.z) / along.z)
            }
        };
        points[i] = at_depth(near);
        points[i + 4] = at_depth(far);
    }
    Aabb::from_points(&points).unwrap_or(Aabb::new(Vec3::ZERO, Vec3::ZERO))
}

/// NDC rectangle covered by a view-space sphere
fn screen_bounds(center: Vec3, radius: f32, projection: &Mat4, perspective: bool) -> Option<(Vec2, Vec2)> {
    if perspective {
        return projected_sphere_bounds(center, radius, projection);
    }
    let scale = Vec2::new(projection.x_axis.x, projection.y_axis.y);
    let offset = Vec2::new(projection.w_axis.x, projection.w_axis.y);
    let a = (center.truncate() - radius) * scale + offset;
    let b = (center.truncate() + radius) * scale + offset;
    let (min, max) = (a.min(b).max(Vec2::splat(-1.0)), a.max(b).min(Vec2::splat(1.0)));
    (min.x <= max.x && min.y <= max.y).then_some((min, max))
}

/// CPU-built cluster assignment
#[derive(Debug, Clone)]
pub struct ClusterGrid {
    layout: ClusterLayout,
    /// `(offset, count)` into `light_list` per cell
    ranges: Vec<[i32; 2]>,
    light_list: Vec<u32>,
    overflowed_cells: usize,
}

impl ClusterGrid {
    /// Assign view-space lights to every cluster their sphere touches.
    ///
    /// Lists are sorted by light index and capped at `max_lights_per_cell`;
    /// lights past the cap are dropped from that cell.
    pub fn build(
        layout: &ClusterLayout,
        projection: &Mat4,
        perspective: bool,
        lights: &[ClusterLight],
        max_lights_per_cell: u32,
    ) -> Self {
        let inverse_projection = projection.inverse();
        let mut pairs: Vec<(usize, u32)> = Vec::new();

        for light in lights {
            let depth = -light.center.z;
            let (z_min, z_max) = (depth - light.radius, depth + light.radius);
            if z_max < layout.near || z_min > layout.far {
                continue;
            }
            let Some((ndc_min, ndc_max)) = screen_bounds(light.center, light.radius, projection, perspective) else {
                continue;
            };

            let (x0, y0) = layout.tile(layout.ndc_to_pixel(ndc_min));
            let (x1, y1) = layout.tile(layout.ndc_to_pixel(ndc_max));
            let z0 = layout.slice(z_min.max(layout.near));
            let z1 = layout.slice(z_max.min(layout.far));
            let sphere = Sphere::new(light.center, light.radius);

            for z in z0..=z1 {
                for y in y0..=y1 {
                    for x in x0..=x1 {
                        if cluster_bounds(layout, &inverse_projection, x, y, z).intersects_sphere(&sphere) {
                            pairs.push((layout.cell_index(x, y, z), light.light_index));
                        }
                    }
                }
            }
        }
        pairs.sort_unstable();

        let mut ranges = vec![[0i32; 2]; layout.cell_count()];
        let mut light_list = Vec::with_capacity(pairs.len());
        let mut overflowed_cells = 0;
        let mut cursor = 0;
        for (cell, range) in ranges.iter_mut().enumerate() {
            let offset = light_list.len();
            let start = cursor;
            while cursor < pairs.len() && pairs[cursor].0 == cell {
                cursor += 1;
            }
            let assigned = &pairs[start..cursor];
            if assigned.len() > max_lights_per_cell as usize {
                overflowed_cells += 1;
            }
            light_list.extend(
                assigned
                    .iter()
                    .take(max_lights_per_cell as usize)
                    .map(|&(_, light)| light),
            );
            *range = [offset as i32, (light_list.len() - offset) as i32];
        }

        Self {
            layout: *layout,
            ranges,
            light_list,
            overflowed_cells,
        }
    }

    pub fn layout(&self) -> &ClusterLayout {
        &self.layout
    }

    pub fn ranges(&self) -> &[[i32; 2]] {
        &self.ranges
    }

    pub fn light_list(&self) -> &[u32] {
        &self.light_list
    }

    /// Light count of one cluster; out-of-grid coordinates report zero
    pub fn count(&self, x: u32, y: u32, z: u32) -> u32 {
        if x >= self.layout.cluster_width || y >= self.layout.cluster_height || z >= self.layout.cluster_depth {
            return 0;
        }
        self.ranges[self.layout.cell_index(x, y, z)][1] as u32
    }

    pub fn lights(&self, x: u32, y: u32, z: u32) -> &[u32] {
        if x >= self.layout.cluster_width || y >= self.layout.cluster_height || z >= self.layout.cluster_depth {
            return &[];
        }
        let [offset, count] = self.ranges[self.layout.cell_index(x, y, z)];
        &self.light_list[offset as usize..(offset + count) as usize]
    }

    pub fn total_assignments(&self) -> usize {
        self.light_list.len()
    }

    pub fn overflowed_cells(&self) -> usize {
        self.overflowed_cells
    }
}

/// Cluster lookup data for shading passes
#[derive(Debug, Clone)]
pub struct ClusteredLightCullingResult {
    /// `R32G32Sint` 3D texture of `(offset, count)` per cluster
    pub cluster_indices: TextureHandle,
    pub light_list: BufferHandle,
    pub layout: ClusterLayout,
    /// Present when the grid was built on the CPU
    pub grid: Option<Arc<ClusterGrid>>,
}

impl RenderPassData for ClusteredLightCullingResult {
    fn set_inputs(&self, pass: &mut PassBuilder<'_>) {
        pass.read_texture("_LightClusterIndices", self.cluster_indices)
            .read_buffer("_LightClusterList", self.light_list);
    }

    fn set_properties(&self, _ctx: &PassContext<'_>, cmd: &mut CommandBuffer) {
        let layout = &self.layout;
        cmd.set_global_float("_ClusterScale", layout.scale);
        cmd.set_global_float("_ClusterBias", layout.bias);
        cmd.set_global_int("_TileSize", layout.tile_size as i32);
        cmd.set_global_vector(
            "_ClusterDimensions",
            Vec4::new(
                layout.cluster_width as f32,
                layout.cluster_height as f32,
                layout.cluster_depth as f32,
                0.0,
            ),
        );
    }
}

pub struct ClusterCullingInput<'a> {
    pub camera: &'a Camera,
    pub width: u32,
    pub height: u32,
}

pub struct ClusteredLightCulling {
    settings: ClusterSettings,
}

impl ClusteredLightCulling {
    pub fn new(settings: ClusterSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ClusterSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: ClusterSettings) {
        self.settings = settings;
    }

    fn record_gpu_assignment(
        &self,
        graph: &mut RenderGraph,
        layout: ClusterLayout,
        indices: TextureHandle,
        lights: &[ClusterLight],
    ) -> BufferHandle {
        let max_lights = self.settings.max_lights_per_tile;
        let light_list = graph.get_buffer(
            BufferDesc::new(layout.cell_count() as u32 * max_lights, 4).with_label("LightClusterList"),
        );
        let counter = graph.get_buffer(
            BufferDesc::new(1, 4)
                .with_label("LightCounter")
                .with_target(BufferTarget::Raw),
        );
        let bounds: Vec<Vec4> = lights.iter().map(|l| l.center.extend(l.radius)).collect();
        let light_indices: Vec<u32> = lights.iter().map(|l| l.light_index).collect();
        let bounds = graph.get_buffer_with_data("LocalLightBounds", &bounds);
        let light_indices = graph.get_buffer_with_data("LocalLightIndices", &light_indices);
        let light_count = lights.len() as i32;

        let mut pass = graph.add_compute_pass("Clustered Light Culling");
        pass.add_render_pass_data::<LightingSetupResult>(false);
        pass.read_buffer("_LocalLightBounds", bounds)
            .read_buffer("_LocalLightIndices", light_indices)
            .write_storage_texture("_LightClusterIndicesWrite", indices)
            .write_buffer("_LightClusterListWrite", light_list)
            .write_buffer("_LightCounter", counter);
        pass.set_render_function(layout, move |cmd, ctx, layout| {
            cmd.clear_buffer(ctx.buffer(counter), 0);
            cmd.set_global_int("_LocalLightCount", light_count);
            cmd.set_global_int("_MaxLightsPerTile", max_lights as i32);
            cmd.set_global_float("_ClusterScale", layout.scale);
            cmd.set_global_float("_ClusterBias", layout.bias);
            cmd.set_global_int("_TileSize", layout.tile_size as i32);
            cmd.dispatch_compute(
                "ClusterLights",
                layout.cluster_width,
                layout.cluster_height,
                layout.cluster_depth,
            );
        });
        light_list
    }

    fn record_cpu_assignment(
        &self,
        graph: &mut RenderGraph,
        layout: ClusterLayout,
        indices: TextureHandle,
        grid: &ClusterGrid,
    ) -> BufferHandle {
        if grid.overflowed_cells() > 0 {
            log::debug!(
                "{} clusters exceeded {} lights, extra lights dropped",
                grid.overflowed_cells(),
                self.settings.max_lights_per_tile
            );
        }
        let ranges = graph.get_buffer_with_data("LightClusterRanges", grid.ranges());
        let light_list = graph.get_buffer_with_data("LightClusterList", grid.light_list());

        let mut pass = graph.add_compute_pass("Upload Light Clusters");
        pass.read_buffer("_LightClusterRanges", ranges)
            .write_storage_texture("_LightClusterIndicesWrite", indices);
        pass.set_render_function(layout, |cmd, _ctx, layout| {
            cmd.dispatch_compute(
                "CopyClusterRanges",
                layout.cluster_width,
                layout.cluster_height,
                layout.cluster_depth,
            );
        });
        light_list
    }
}

impl RenderFeature for ClusteredLightCulling {
    type Input<'a> = ClusterCullingInput<'a>;

    fn name(&self) -> &'static str {
        "ClusteredLightCulling"
    }

    /// # Panics
    ///
    /// Panics on an invalid layout or when `LightingSetupResult` was not
    /// published earlier in the frame.
    fn render(&mut self, graph: &mut RenderGraph, input: ClusterCullingInput<'_>) {
        let camera = input.camera;
        let layout = ClusterLayout::from_settings(input.width, input.height, camera.near(), camera.far(), &self.settings)
            .unwrap_or_else(|err| panic!("clustered light culling: {err}"));
        let setup = graph.get_resource::<LightingSetupResult>().clone();

        let view = camera.view_matrix();
        let lights: Vec<ClusterLight> = setup
            .local_lights
            .iter()
            .map(|light| ClusterLight {
                light_index: light.light_index,
                center: view.transform_point3(light.sphere.center),
                radius: light.sphere.radius,
            })
            .collect();

        let indices = graph.get_texture(
            TextureDesc::new(layout.cluster_width, layout.cluster_height, TextureFormat::R32G32Sint)
                .with_depth(layout.cluster_depth)
                .with_dimension(TextureDimension::Tex3D)
                .with_label("LightClusterIndices"),
        );

        let (light_list, grid) = match self.settings.assignment {
            ClusterAssignment::Gpu => (self.record_gpu_assignment(graph, layout, indices, &lights), None),
            ClusterAssignment::Cpu => {
                let grid = ClusterGrid::build(
                    &layout,
                    &camera.projection_matrix(),
                    camera.projection.is_perspective(),
                    &lights,
                    self.settings.max_lights_per_tile,
                );
                let light_list = self.record_cpu_assignment(graph, layout, indices, &grid);
                (light_list, Some(Arc::new(grid)))
            }
        };

        log::trace!(
            "clustered {} local lights into {}x{}x{} cells",
            lights.len(),
            layout.cluster_width,
            layout.cluster_height,
            layout.cluster_depth
        );

        graph.set_resource(
            ClusteredLightCullingResult {
                cluster_indices: indices,
                light_list,
                layout,
                grid,
            },
            false,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Command;
    use crate::pipeline::lighting_setup::LocalLight;
    use crate::scene::LightType;
    use approx::assert_relative_eq;

    fn layout() -> ClusterLayout {
        ClusterLayout::new(1920, 1080, 0.3, 1000.0, 16, 32).unwrap()
    }

    fn projection() -> Mat4 {
        Mat4::perspective_rh(60f32.to_radians(), 1920.0 / 1080.0, 0.3, 1000.0)
    }

    #[test]
    fn test_layout_dimensions_and_slicing() {
        let layout = layout();
        assert_eq!((layout.cluster_width, layout.cluster_height), (120, 68));
        assert_relative_eq!(layout.scale, 2.7344, epsilon = 1e-3);
        assert_relative_eq!(layout.bias, 4.7496, epsilon = 1e-3);
        assert_eq!(layout.slice(10.0), 13);
        assert_eq!(layout.slice(0.3), 0);
        assert_eq!(layout.slice(1000.0), 31);
    }

    #[test]
    fn test_slice_depth_range_round_trip() {
        let layout = layout();
        for slice in 0..layout.cluster_depth {
            let mid = (layout.slice_near(slice) * layout.slice_far(slice)).sqrt();
            assert_eq!(layout.slice(mid), slice);
        }
        assert_relative_eq!(layout.slice_far(31), 1000.0);
    }

    #[test]
    fn test_invalid_layout_rejected() {
        assert!(ClusterLayout::new(0, 1080, 0.3, 1000.0, 16, 32).is_err());
        assert!(ClusterLayout::new(1920, 1080, 0.0, 1000.0, 16, 32).is_err());
        assert!(ClusterLayout::new(1920, 1080, 10.0, 5.0, 16, 32).is_err());
        assert!(ClusterLayout::new(1920, 1080, 0.3, 1000.0, 0, 32).is_err());
    }

    #[test]
    fn test_pixel_tiles_from_bottom_left() {
        let layout = layout();
        assert_eq!(layout.tile(Vec2::new(0.0, 0.0)), (0, 0));
        assert_eq!(layout.tile(Vec2::new(1919.0, 1079.0)), (119, 67));
        assert_eq!(layout.cluster(Vec2::new(40.0, 17.0), 10.0), (2, 1, 13));
    }

    #[test]
    fn test_empty_grid_has_zero_counts() {
        let layout = ClusterLayout::new(64, 64, 0.3, 100.0, 16, 8).unwrap();
        let grid = ClusterGrid::build(&layout, &projection(), true, &[], 32);
        assert_eq!(grid.ranges().len(), 4 * 4 * 8);
        assert!(grid.ranges().iter().all(|range| range[1] == 0));
        assert_eq!(grid.total_assignments(), 0);
    }

    #[test]
    fn test_light_lands_in_its_cluster_only() {
        let layout = layout();
        let light = ClusterLight {
            light_index: 7,
            center: Vec3::new(0.0, 0.0, -10.0),
            radius: 0.5,
        };
        let grid = ClusterGrid::build(&layout, &projection(), true, &[light], 32);

        let (x, y, z) = layout.cluster(Vec2::new(960.0, 540.0), 10.0);
        assert_eq!(grid.lights(x, y, z), &[7]);
        assert_eq!(grid.count(x, y, layout.slice(30.0)), 0);
        assert_eq!(grid.count(0, 0, z), 0);
        assert_eq!(grid.count(500, 0, 0), 0);
    }

    #[test]
    fn test_lights_behind_camera_are_skipped() {
        let layout = layout();
        let light = ClusterLight {
            light_index: 0,
            center: Vec3::new(0.0, 0.0, 10.0),
            radius: 1.0,
        };
        let grid = ClusterGrid::build(&layout, &projection(), true, &[light], 32);
        assert_eq!(grid.total_assignments(), 0);
    }

    #[test]
    fn test_cells_capped_at_max_lights() {
        let layout = ClusterLayout::new(64, 64, 0.3, 100.0, 16, 8).unwrap();
        let lights: Vec<ClusterLight> = (0..5)
            .map(|i| ClusterLight {
                light_index: 4 - i,
                center: Vec3::new(0.0, 0.0, -5.0),
                radius: 1.0,
            })
            .collect();
        let grid = ClusterGrid::build(&layout, &projection(), true, &lights, 2);

        assert!(grid.overflowed_cells() > 0);
        assert!(grid.ranges().iter().all(|range| range[1] <= 2));
        let (x, y, z) = layout.cluster(Vec2::new(32.0, 32.0), 5.0);
        // Lowest light indices win
        assert_eq!(grid.lights(x, y, z), &[0, 1]);
    }

    fn publish_lights(graph: &mut RenderGraph, local_lights: Vec<LocalLight>) {
        let light_buffer = graph.get_buffer_with_data("LightData", &[0u32; 4][..]);
        graph.set_resource(
            LightingSetupResult {
                light_buffer,
                light_count: local_lights.len() as u32,
                directional_light_count: 0,
                local_lights: local_lights.into(),
            },
            false,
        );
    }

    #[test]
    fn test_gpu_assignment_resets_counter_before_dispatch() {
        let mut graph = RenderGraph::new();
        publish_lights(&mut graph, vec![]);
        let camera = Camera::default();
        let mut culling = ClusteredLightCulling::new(ClusterSettings::default());
        culling.render(
            &mut graph,
            ClusterCullingInput {
                camera: &camera,
                width: 1920,
                height: 1080,
            },
        );

        let result = graph.get_resource::<ClusteredLightCullingResult>().clone();
        assert!(result.grid.is_none());
        let desc = graph.texture_desc(result.cluster_indices).unwrap();
        assert_eq!((desc.width, desc.height, desc.depth), (120, 68, 32));
        assert_eq!(desc.format, TextureFormat::R32G32Sint);

        let mut cmd = CommandBuffer::new();
        graph.execute(&mut cmd);
        let clear = cmd
            .commands()
            .iter()
            .position(|c| matches!(c, Command::ClearBuffer { value: 0, .. }));
        let dispatch = cmd.commands().iter().position(|c| {
            matches!(c, Command::DispatchCompute { kernel: "ClusterLights", groups: [120, 68, 32] })
        });
        assert!(clear.unwrap() < dispatch.unwrap());
        assert_eq!(cmd.find_global_float("_ClusterScale").map(|s| (s * 100.0).round()), Some(273.0));
    }

    #[test]
    fn test_cpu_assignment_keeps_grid() {
        let mut graph = RenderGraph::new();
        let camera = Camera::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        publish_lights(
            &mut graph,
            vec![LocalLight {
                light_index: 0,
                sphere: Sphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0),
                light_type: LightType::Point,
            }],
        );
        let settings = ClusterSettings {
            assignment: ClusterAssignment::Cpu,
            ..ClusterSettings::default()
        };
        let mut culling = ClusteredLightCulling::new(settings);
        culling.render(
            &mut graph,
            ClusterCullingInput {
                camera: &camera,
                width: 320,
                height: 180,
            },
        );

        let result = graph.get_resource::<ClusteredLightCullingResult>().clone();
        let grid = result.grid.expect("cpu grid");
        assert!(grid.total_assignments() > 0);
        let (x, y, z) = result.layout.cluster(Vec2::new(160.0, 90.0), 10.0);
        assert_eq!(grid.lights(x, y, z), &[0]);
    }

    #[test]
    #[should_panic(expected = "LightingSetupResult")]
    fn test_missing_light_list_panics() {
        let mut graph = RenderGraph::new();
        let camera = Camera::default();
        ClusteredLightCulling::new(ClusterSettings::default()).render(
            &mut graph,
            ClusterCullingInput {
                camera: &camera,
                width: 64,
                height: 64,
            },
        );
    }
}
