use crate::gpu::context::Context;
use crate::gpu::resources::Resources;
use crate::gpu::stage::PipelineStage;
use crate::settings::ShadingMode;

const GENERATE_RAYS_CODE: &str = include_str!("../../assets/shaders/generate_rays.wgsl");
const COMPUTE_INTERSECTIONS_CODE: &str = include_str!("../../assets/shaders/compute_intersections.wgsl");
const SHADE_CODE: &str = include_str!("../../assets/shaders/shade.wgsl");
const FINAL_GATHER_CODE: &str = include_str!("../../assets/shaders/final_gather.wgsl");

/// One compute pipeline per stage, built once at startup. Construction
/// failure of any of them is unrecoverable by design: a missing stage means
/// no visible frame, so the wgpu validation error is left to abort startup.
/// Each stage compiles from its own module because the stages reuse the same
/// low slot indices with different resource types.
pub(crate) struct StagePrograms {
    generate_rays: wgpu::ComputePipeline,
    compute_intersections: wgpu::ComputePipeline,
    shade: wgpu::ComputePipeline,
    final_gather: wgpu::ComputePipeline,
}

impl StagePrograms {
    #[must_use]
    pub(crate) fn new(context: &Context, resources: &Resources, shading_mode: ShadingMode) -> Self {
        let shade_entry_point = format!("shade_{}", shading_mode.entry_point_suffix());

        Self {
            generate_rays: Self::create_pipeline(
                context, resources, "generate rays", GENERATE_RAYS_CODE, "generate_rays"),
            compute_intersections: Self::create_pipeline(
                context, resources, "compute intersections", COMPUTE_INTERSECTIONS_CODE, "compute_intersections"),
            shade: Self::create_pipeline(
                context, resources, "shade", SHADE_CODE, shade_entry_point.as_str()),
            final_gather: Self::create_pipeline(
                context, resources, "final gather", FINAL_GATHER_CODE, "final_gather"),
        }
    }

    #[must_use]
    fn create_pipeline(
        context: &Context,
        resources: &Resources,
        label: &str,
        code: &str,
        entry_point: &str,
    ) -> wgpu::ComputePipeline {
        let module = resources.create_shader_module(label, code);
        context.device().create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: None,
            module: &module,
            entry_point: Some(entry_point),
            compilation_options: Default::default(),
            cache: None,
        })
    }

    #[must_use]
    pub(crate) fn pipeline(&self, stage: PipelineStage) -> &wgpu::ComputePipeline {
        match stage {
            PipelineStage::GenerateRays => &self.generate_rays,
            PipelineStage::ComputeIntersections => &self.compute_intersections,
            PipelineStage::Shade => &self.shade,
            PipelineStage::FinalGather => &self.final_gather,
        }
    }
}
