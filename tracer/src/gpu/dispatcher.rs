use crate::gpu::bind_group_builder::BindGroupBuilder;
use crate::gpu::environment::EnvironmentSource;
use crate::gpu::programs::StagePrograms;
use crate::gpu::stage::{thread_group_geometry, PipelineStage, StageExecutionLimits};
use crate::gpu::viewport::Viewport;
use crate::settings::ShadingMode;
use std::rc::Rc;
use wgpu::{Buffer, ComputePass, TextureView};

/// Every handle a stage may need for one frame. The dispatcher only reads
/// these; identity (allocation, resize) belongs to the renderer, contents to
/// the GPU programs.
pub(crate) struct StageBindings<'a> {
    pub camera: Rc<Buffer>,
    pub max_depth: Rc<Buffer>,
    pub iteration: Rc<Buffer>,
    pub ray_count: Rc<Buffer>,
    pub geom_count: Rc<Buffer>,
    pub light_count: Rc<Buffer>,
    pub base_emittance: Rc<Buffer>,

    pub rays: Rc<Buffer>,
    pub intersections: Rc<Buffer>,
    pub geoms: Rc<Buffer>,
    pub accel: Rc<Buffer>,
    pub materials: Rc<Buffer>,
    pub accumulation: Rc<Buffer>,

    pub environment: EnvironmentSource<'a>,
    pub display_surface: &'a TextureView,
}

/// Maps a stage to (bound resources, thread-group geometry, compute program)
/// and issues it on the active pass. Slot numbers are a wire protocol shared
/// with the kernels; reordering them is a breaking change.
pub(crate) struct StageDispatcher {
    programs: StagePrograms,
    limits: StageExecutionLimits,
    shading_mode: ShadingMode,
}

impl StageDispatcher {
    #[must_use]
    pub(crate) fn new(programs: StagePrograms, shading_mode: ShadingMode) -> Self {
        Self { programs, limits: StageExecutionLimits::runtime(), shading_mode }
    }

    pub(crate) fn dispatch(
        &self,
        stage: PipelineStage,
        pass: &mut ComputePass,
        device: &wgpu::Device,
        bindings: &StageBindings,
        viewport: Viewport,
        ray_count: u32,
    ) {
        let pipeline = self.programs.pipeline(stage);
        let bind_group = self.bind_resources(stage, pipeline, device, bindings);
        let geometry = thread_group_geometry(stage, self.limits, viewport, ray_count);

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        let (grid_width, grid_height, grid_depth) = geometry.grid;
        pass.dispatch_workgroups(grid_width, grid_height, grid_depth);
    }

    #[must_use]
    fn bind_resources(
        &self,
        stage: PipelineStage,
        pipeline: &wgpu::ComputePipeline,
        device: &wgpu::Device,
        bindings: &StageBindings,
    ) -> wgpu::BindGroup {
        let layout = pipeline.get_bind_group_layout(0);
        let mut builder = BindGroupBuilder::new(Some("stage resources"), layout);

        match stage {
            PipelineStage::GenerateRays => {
                builder
                    .set_buffer_entry(0, bindings.camera.clone())
                    .set_buffer_entry(1, bindings.max_depth.clone())
                    .set_buffer_entry(2, bindings.rays.clone())
                    .set_buffer_entry(3, bindings.iteration.clone());
            }
            PipelineStage::ComputeIntersections => {
                builder
                    .set_buffer_entry(0, bindings.ray_count.clone())
                    .set_buffer_entry(1, bindings.geom_count.clone())
                    .set_buffer_entry(2, bindings.rays.clone())
                    .set_buffer_entry(3, bindings.intersections.clone())
                    .set_buffer_entry(4, bindings.geoms.clone())
                    .set_buffer_entry(5, bindings.accel.clone());
            }
            PipelineStage::Shade => {
                builder
                    .set_buffer_entry(0, bindings.ray_count.clone())
                    .set_buffer_entry(1, bindings.iteration.clone())
                    .set_buffer_entry(2, bindings.rays.clone())
                    .set_buffer_entry(3, bindings.intersections.clone())
                    .set_buffer_entry(4, bindings.materials.clone())
                    .set_buffer_entry(6, bindings.base_emittance.clone())
                    .set_texture_entry(11, bindings.environment.view().clone());
                if self.shading_mode.uses_light_sampling() {
                    builder
                        .set_buffer_entry(7, bindings.max_depth.clone())
                        .set_buffer_entry(8, bindings.geoms.clone())
                        .set_buffer_entry(9, bindings.geom_count.clone())
                        .set_buffer_entry(10, bindings.light_count.clone());
                }
            }
            PipelineStage::FinalGather => {
                builder
                    .set_buffer_entry(1, bindings.iteration.clone())
                    .set_buffer_entry(2, bindings.rays.clone())
                    .set_buffer_entry(3, bindings.accumulation.clone())
                    .set_buffer_entry(4, bindings.camera.clone())
                    .set_texture_entry(5, bindings.display_surface.clone());
            }
        }

        builder.make_bind_group(device)
    }
}
