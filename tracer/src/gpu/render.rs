use crate::gpu::context::Context;
use crate::gpu::device_buffer::DeviceBuffer;
use crate::gpu::dispatcher::{StageBindings, StageDispatcher};
use crate::gpu::environment::{DeviceTexture, EnvironmentSource};
use crate::gpu::programs::StagePrograms;
use crate::gpu::resources::Resources;
use crate::gpu::stage::PipelineStage;
use crate::gpu::viewport::Viewport;
use crate::scene::bundle::SceneBundle;
use crate::scene::camera::Camera;
use crate::scene::types::{Geom, Intersection, Material, Ray};
use crate::settings::RenderSettings;
use cgmath::Vector3;
use log::trace;
use std::rc::Rc;
use wgpu::TextureView;

/// Progressive path-tracing frame loop. Owns camera state, the iteration
/// counter and the identity of every device buffer; stage execution is the
/// only writer of buffer contents after the initial scene upload.
pub(crate) struct Renderer {
    context: Rc<Context>,
    resources: Resources,
    dispatcher: StageDispatcher,
    buffers: Buffers,
    uniforms: StageUniforms,

    camera: Camera,
    viewport: Viewport,
    max_depth: u32,
    gesture_damping: f32,

    /// completed progressive-refinement passes since the last invalidation
    iteration: u32,

    environment: Option<DeviceTexture>,
}

/// Per-pixel buffers are resized with the viewport; per-primitive buffers are
/// fixed for the scene's lifetime.
struct Buffers {
    rays: DeviceBuffer<Ray>,
    intersections: DeviceBuffer<Intersection>,
    accumulation: DeviceBuffer<[f32; 4]>,
    geoms: DeviceBuffer<Geom>,
    materials: DeviceBuffer<Material>,
    accel: DeviceBuffer<f32>,
}

/// Small scalar slots, refreshed via write_buffer: camera and iteration every
/// frame, ray count on resize, the rest fixed after construction.
struct StageUniforms {
    camera: Rc<wgpu::Buffer>,
    max_depth: Rc<wgpu::Buffer>,
    iteration: Rc<wgpu::Buffer>,
    ray_count: Rc<wgpu::Buffer>,
    geom_count: Rc<wgpu::Buffer>,
    light_count: Rc<wgpu::Buffer>,
    base_emittance: Rc<wgpu::Buffer>,
}

impl Renderer {
    pub(crate) fn new(
        context: Rc<Context>,
        scene: SceneBundle,
        settings: &RenderSettings,
        viewport: Viewport,
    ) -> anyhow::Result<Self> {
        let resources = Resources::new(context.clone());

        let environment = match &scene.environment {
            Some(descriptor) => Some(DeviceTexture::from_file(&context, "environment", &descriptor.path)?),
            None => None,
        };
        let base_emittance = scene
            .environment
            .as_ref()
            .map(|descriptor| descriptor.base_emittance)
            .unwrap_or(Vector3::new(0.0, 0.0, 0.0));

        let pixel_count = viewport.area() as usize;
        let buffers = Buffers {
            rays: DeviceBuffer::new(&resources, "rays", pixel_count),
            intersections: DeviceBuffer::new(&resources, "intersections", pixel_count),
            accumulation: DeviceBuffer::new(&resources, "accumulation", pixel_count),
            geoms: DeviceBuffer::with_contents(&resources, "geoms", scene.geoms.as_slice()),
            materials: DeviceBuffer::with_contents(&resources, "materials", scene.materials.as_slice()),
            accel: DeviceBuffer::with_contents(&resources, "spatial tree", scene.accel.as_slice()),
        };

        let camera_payload = scene.camera.serialize(viewport, scene.max_depth);
        let uniforms = StageUniforms {
            camera: resources.create_uniform_buffer("camera", bytemuck::bytes_of(&camera_payload)),
            max_depth: resources.create_uniform_buffer("max depth", bytemuck::bytes_of(&scene.max_depth)),
            iteration: resources.create_uniform_buffer("iteration", bytemuck::bytes_of(&0u32)),
            ray_count: resources.create_uniform_buffer("ray count", bytemuck::bytes_of(&viewport.area())),
            geom_count: resources.create_uniform_buffer("geom count", bytemuck::bytes_of(&(scene.geoms.len() as u32))),
            light_count: resources.create_uniform_buffer("light count", bytemuck::bytes_of(&scene.light_count)),
            base_emittance: resources.create_uniform_buffer(
                "base emittance",
                bytemuck::bytes_of(&[base_emittance.x, base_emittance.y, base_emittance.z, 0.0_f32]),
            ),
        };

        let programs = StagePrograms::new(&context, &resources, settings.shading_mode);
        let dispatcher = StageDispatcher::new(programs, settings.shading_mode);

        Ok(Self {
            context,
            resources,
            dispatcher,
            buffers,
            uniforms,
            camera: scene.camera,
            viewport,
            max_depth: scene.max_depth,
            gesture_damping: settings.gesture_damping,
            iteration: 0,
            environment,
        })
    }

    /// One progressive-refinement pass: generate rays, then the
    /// intersect/shade pair `max_depth` times, then gather into the
    /// accumulator — all strictly ordered on a single command stream.
    /// Without a presentation target the whole frame is skipped: nothing is
    /// submitted and the iteration counter stays put.
    pub(crate) fn on_frame(&mut self, drawable: Option<&TextureView>) -> bool {
        let Some(display_surface) = drawable else {
            trace!("presentation target unavailable, skipping iteration {}", self.iteration);
            return false;
        };

        self.write_frame_uniforms();

        let mut encoder = self
            .context
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("frame encoder") });

        if self.iteration == 0 {
            // stale sums belong to a previous camera state and are not valid
            // samples of the current view
            encoder.clear_buffer(self.buffers.accumulation.backend(), 0, None);
            Self::clear_display_surface(&mut encoder, display_surface);
        }

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("path tracing pass"),
                timestamp_writes: None,
            });

            let bindings = self.stage_bindings(display_surface);
            let ray_count = self.viewport.area();

            self.dispatch(PipelineStage::GenerateRays, &mut pass, &bindings, ray_count);
            for _ in 0..self.max_depth {
                self.dispatch(PipelineStage::ComputeIntersections, &mut pass, &bindings, ray_count);
                self.dispatch(PipelineStage::Shade, &mut pass, &bindings, ray_count);
            }
            self.dispatch(PipelineStage::FinalGather, &mut pass, &bindings, ray_count);
        }

        self.context.queue().submit(Some(encoder.finish()));
        self.iteration += 1;

        true
    }

    fn dispatch(&self, stage: PipelineStage, pass: &mut wgpu::ComputePass, bindings: &StageBindings, ray_count: u32) {
        self.dispatcher
            .dispatch(stage, pass, self.context.device(), bindings, self.viewport, ray_count);
    }

    #[must_use]
    fn stage_bindings<'a>(&'a self, display_surface: &'a TextureView) -> StageBindings<'a> {
        StageBindings {
            camera: self.uniforms.camera.clone(),
            max_depth: self.uniforms.max_depth.clone(),
            iteration: self.uniforms.iteration.clone(),
            ray_count: self.uniforms.ray_count.clone(),
            geom_count: self.uniforms.geom_count.clone(),
            light_count: self.uniforms.light_count.clone(),
            base_emittance: self.uniforms.base_emittance.clone(),

            rays: self.buffers.rays.backend().clone(),
            intersections: self.buffers.intersections.backend().clone(),
            geoms: self.buffers.geoms.backend().clone(),
            accel: self.buffers.accel.backend().clone(),
            materials: self.buffers.materials.backend().clone(),
            accumulation: self.buffers.accumulation.backend().clone(),

            environment: EnvironmentSource::resolve(self.environment.as_ref(), display_surface),
            display_surface,
        }
    }

    fn write_frame_uniforms(&self) {
        let camera_payload = self.camera.serialize(self.viewport, self.max_depth);
        self.context
            .queue()
            .write_buffer(&self.uniforms.camera, 0, bytemuck::bytes_of(&camera_payload));
        self.context
            .queue()
            .write_buffer(&self.uniforms.iteration, 0, bytemuck::bytes_of(&self.iteration));
    }

    fn clear_display_surface(encoder: &mut wgpu::CommandEncoder, display_surface: &TextureView) {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("display reset pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: display_surface,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
    }

    /// Camera motion invalidates every in-flight progressive estimate.
    pub(crate) fn pan(&mut self, dx: f32, dy: f32) {
        self.camera.pan(dx, dy, self.gesture_damping);
        self.iteration = 0;
    }

    pub(crate) fn zoom(&mut self, dz: f32) {
        if dz.is_nan() {
            return;
        }
        self.camera.zoom(dz);
        self.iteration = 0;
    }

    /// Per-pixel buffers follow the new pixel count; their contents are
    /// discarded, which is fine because the accumulation restarts anyway.
    pub(crate) fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width, height);
        let pixel_count = self.viewport.area() as usize;

        self.buffers.rays.resize(&self.resources, pixel_count);
        self.buffers.intersections.resize(&self.resources, pixel_count);
        self.buffers.accumulation.resize(&self.resources, pixel_count);

        self.context
            .queue()
            .write_buffer(&self.uniforms.ray_count, 0, bytemuck::bytes_of(&self.viewport.area()));

        self.iteration = 0;
    }

    #[must_use]
    pub(crate) fn iteration(&self) -> u32 {
        self.iteration
    }

    #[must_use]
    pub(crate) fn camera(&self) -> &Camera {
        &self.camera
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless_device::tests::create_headless_wgpu_context;
    use crate::gpu::readback::tests::read_buffer;
    use crate::scene::types::GeomKind;
    use cgmath::Point3;
    use test_context::{test_context, TestContext};

    const TEST_VIEWPORT_WIDTH: u32 = 2;
    const TEST_VIEWPORT_HEIGHT: u32 = 2;
    const TEST_MAX_DEPTH: u32 = 2;

    #[must_use]
    fn make_test_scene() -> SceneBundle {
        let camera = Camera::new(
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            45.0,
        );
        let materials = vec![Material::diffuse(0.8, 0.2, 0.2)];
        let geoms = vec![Geom::new(
            GeomKind::Triangle,
            0,
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(4.0, 4.0, 1.0),
        )];

        SceneBundle {
            camera,
            geoms,
            light_count: 0,
            materials,
            accel: vec![0.0; 4],
            environment: None,
            max_depth: TEST_MAX_DEPTH,
        }
    }

    struct Fixture {
        system_under_test: Renderer,
        context: Rc<Context>,
        display_surface: TextureView,
    }

    impl TestContext for Fixture {
        fn setup() -> Self {
            let context = create_headless_wgpu_context();
            let viewport = Viewport::new(TEST_VIEWPORT_WIDTH, TEST_VIEWPORT_HEIGHT);

            let system_under_test = Renderer::new(context.clone(), make_test_scene(), &RenderSettings::default(), viewport)
                .expect("renderer instantiation has failed");

            let display_texture = context.device().create_texture(&wgpu::TextureDescriptor {
                label: Some("test display surface"),
                size: wgpu::Extent3d {
                    width: TEST_VIEWPORT_WIDTH,
                    height: TEST_VIEWPORT_HEIGHT,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::STORAGE_BINDING
                    | wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            });

            Fixture {
                system_under_test,
                context,
                display_surface: display_texture.create_view(&wgpu::TextureViewDescriptor::default()),
            }
        }

        fn teardown(self) {}
    }

    impl Fixture {
        fn wait_for_gpu(&self) {
            use wgpu::wgt::PollType;
            self.context.device().poll(PollType::Wait).expect("failed to poll the device");
        }

        #[must_use]
        fn read_accumulation(&self) -> Vec<[f32; 4]> {
            read_buffer(&self.context, self.system_under_test.buffers.accumulation.backend())
        }
    }

    #[test_context(Fixture)]
    #[test]
    fn test_iteration_advances_once_per_successful_frame(fixture: &mut Fixture) {
        assert_eq!(fixture.system_under_test.iteration(), 0);
        assert!(fixture.system_under_test.on_frame(Some(&fixture.display_surface)));
        assert_eq!(fixture.system_under_test.iteration(), 1);
        assert!(fixture.system_under_test.on_frame(Some(&fixture.display_surface)));
        assert_eq!(fixture.system_under_test.iteration(), 2);
        fixture.wait_for_gpu();
    }

    #[test_context(Fixture)]
    #[test]
    fn test_missing_drawable_skips_the_frame(fixture: &mut Fixture) {
        let _ = fixture.system_under_test.on_frame(Some(&fixture.display_surface));

        let submitted = fixture.system_under_test.on_frame(None);

        assert_eq!(submitted, false);
        assert_eq!(fixture.system_under_test.iteration(), 1);
        fixture.wait_for_gpu();
    }

    #[test_context(Fixture)]
    #[test]
    fn test_accumulation_is_zero_before_the_first_gather(fixture: &mut Fixture) {
        let accumulation = fixture.read_accumulation();

        assert_eq!(accumulation.len(), (TEST_VIEWPORT_WIDTH * TEST_VIEWPORT_HEIGHT) as usize);
        assert!(accumulation.iter().all(|texel| *texel == [0.0; 4]));
    }

    #[test_context(Fixture)]
    #[test]
    fn test_single_frame_populates_every_accumulator_texel(fixture: &mut Fixture) {
        assert!(fixture.system_under_test.on_frame(Some(&fixture.display_surface)));
        fixture.wait_for_gpu();

        assert_eq!(fixture.system_under_test.iteration(), 1);
        let accumulation = fixture.read_accumulation();
        assert_eq!(accumulation.len(), (TEST_VIEWPORT_WIDTH * TEST_VIEWPORT_HEIGHT) as usize);
        for texel in &accumulation {
            assert!(texel[3] >= 1.0, "texel left at its reset state: {texel:?}");
        }
    }

    #[test_context(Fixture)]
    #[test]
    fn test_pan_resets_the_iteration_counter(fixture: &mut Fixture) {
        let _ = fixture.system_under_test.on_frame(Some(&fixture.display_surface));

        fixture.system_under_test.pan(5.0, -3.0);

        assert_eq!(fixture.system_under_test.iteration(), 0);
        fixture.wait_for_gpu();
    }

    #[test_context(Fixture)]
    #[test]
    fn test_finite_zoom_resets_the_iteration_counter(fixture: &mut Fixture) {
        let _ = fixture.system_under_test.on_frame(Some(&fixture.display_surface));

        fixture.system_under_test.zoom(0.5);

        assert_eq!(fixture.system_under_test.iteration(), 0);
        fixture.wait_for_gpu();
    }

    #[test_context(Fixture)]
    #[test]
    fn test_nan_zoom_is_a_complete_no_op(fixture: &mut Fixture) {
        let _ = fixture.system_under_test.on_frame(Some(&fixture.display_surface));
        let position_before = fixture.system_under_test.camera().position();
        let look_at_before = fixture.system_under_test.camera().look_at();

        fixture.system_under_test.zoom(f32::NAN);

        assert_eq!(fixture.system_under_test.iteration(), 1);
        assert_eq!(fixture.system_under_test.camera().position(), position_before);
        assert_eq!(fixture.system_under_test.camera().look_at(), look_at_before);
        fixture.wait_for_gpu();
    }

    #[test_context(Fixture)]
    #[test]
    fn test_resize_follows_the_new_pixel_count_and_restarts_accumulation(fixture: &mut Fixture) {
        let new_width = 3;
        let new_height = 5;
        let _ = fixture.system_under_test.on_frame(Some(&fixture.display_surface));

        fixture.system_under_test.set_viewport(new_width, new_height);

        let expected_count = (new_width * new_height) as usize;
        assert_eq!(fixture.system_under_test.buffers.rays.count(), expected_count);
        assert_eq!(fixture.system_under_test.buffers.intersections.count(), expected_count);
        assert_eq!(fixture.system_under_test.buffers.accumulation.count(), expected_count);
        assert_eq!(fixture.system_under_test.iteration(), 0);
        fixture.wait_for_gpu();
    }
}
