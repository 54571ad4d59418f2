use crate::gpu::viewport::Viewport;
use strum_macros::{Display, EnumIter};

/// The four units of compute work issued, in order, on every frame's command
/// stream. Closed set; the schedule in the renderer is the only consumer.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter)]
pub(crate) enum PipelineStage {
    GenerateRays,
    ComputeIntersections,
    Shade,
    FinalGather,
}

/// Execution-shape parameters of a compute program. WGSL fixes the workgroup
/// shape at pipeline compile time, so at runtime these are crate constants
/// mirrored by the `@workgroup_size` declarations in assets/shaders; the
/// policy below stays parameterized so other shapes remain testable.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct StageExecutionLimits {
    pub(crate) native_execution_width: u32,
    pub(crate) max_threads_per_group: u32,
}

impl StageExecutionLimits {
    // keep in sync with @workgroup_size in assets/shaders/*.wgsl
    #[must_use]
    pub(crate) const fn runtime() -> Self {
        Self { native_execution_width: 32, max_threads_per_group: 256 }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct GroupGeometry {
    pub(crate) group: (u32, u32, u32),
    pub(crate) grid: (u32, u32, u32),
}

/// Ray generation walks the viewport as a 2-D grid; the remaining stages walk
/// the ray list as a 1-D grid. The 1-D grid width rounds up, so a ray count
/// that is not a multiple of the execution width still gets its tail group;
/// kernels bounds-check against the ray-count slot.
#[must_use]
pub(crate) fn thread_group_geometry(
    stage: PipelineStage,
    limits: StageExecutionLimits,
    viewport: Viewport,
    ray_count: u32,
) -> GroupGeometry {
    match stage {
        PipelineStage::GenerateRays => {
            let width = limits.native_execution_width;
            let height = limits.max_threads_per_group / width;
            GroupGeometry {
                group: (width, height, 1),
                grid: (viewport.width().div_ceil(width), viewport.height().div_ceil(height), 1),
            }
        }
        PipelineStage::ComputeIntersections | PipelineStage::Shade | PipelineStage::FinalGather => {
            let group_width = ray_count.clamp(1, limits.native_execution_width);
            GroupGeometry {
                group: (group_width, 1, 1),
                grid: (ray_count.div_ceil(group_width).max(1), 1, 1),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    const REFERENCE_LIMITS: StageExecutionLimits =
        StageExecutionLimits { native_execution_width: 32, max_threads_per_group: 1024 };

    #[test]
    fn test_ray_generation_geometry() {
        let viewport = Viewport::new(800, 600);

        let actual = thread_group_geometry(PipelineStage::GenerateRays, REFERENCE_LIMITS, viewport, viewport.area());

        assert_eq!(actual.group, (32, 32, 1));
        assert_eq!(actual.grid, (25, 19, 1));
    }

    #[test]
    fn test_ray_generation_geometry_exact_multiple() {
        let viewport = Viewport::new(1024, 64);

        let actual = thread_group_geometry(PipelineStage::GenerateRays, REFERENCE_LIMITS, viewport, viewport.area());

        assert_eq!(actual.grid, (32, 2, 1));
    }

    // a 1000-ray dispatch covers the 8-ray tail with a 32nd group; the floor
    // division of the historical policy would have stopped at 31 and left
    // those rays untouched
    #[rstest]
    #[case(1000, 32, 32)]
    #[case(1024, 32, 32)]
    #[case(33, 32, 2)]
    #[case(4, 4, 1)]
    #[case(1, 1, 1)]
    fn test_one_dimensional_geometry(#[case] ray_count: u32, #[case] expected_group_width: u32, #[case] expected_grid_width: u32) {
        let viewport = Viewport::new(100, 10);

        let actual = thread_group_geometry(PipelineStage::ComputeIntersections, REFERENCE_LIMITS, viewport, ray_count);

        assert_eq!(actual.group, (expected_group_width, 1, 1));
        assert_eq!(actual.grid, (expected_grid_width, 1, 1));
    }

    #[test]
    fn test_one_dimensional_stages_share_geometry() {
        let viewport = Viewport::new(64, 64);
        let ray_count = viewport.area();

        let expected = thread_group_geometry(PipelineStage::ComputeIntersections, REFERENCE_LIMITS, viewport, ray_count);

        for stage in PipelineStage::iter().filter(|stage| *stage != PipelineStage::GenerateRays) {
            let actual = thread_group_geometry(stage, REFERENCE_LIMITS, viewport, ray_count);
            assert_eq!(actual, expected, "stage {stage}");
        }
    }

    #[test]
    fn test_runtime_limits_fit_default_device() {
        let limits = StageExecutionLimits::runtime();
        let invocations = limits.native_execution_width
            * (limits.max_threads_per_group / limits.native_execution_width);

        assert!(invocations <= wgpu::Limits::default().max_compute_invocations_per_workgroup);
    }
}
