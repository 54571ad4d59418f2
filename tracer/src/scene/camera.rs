use crate::gpu::viewport::Viewport;
use bytemuck::{Pod, Zeroable};
use cgmath::{InnerSpace, Point3, Vector2, Vector3};

/// Optical state of the viewer. The basis vectors are built orthonormal at
/// construction and only ever displaced as a rigid set by the gesture
/// operations, so nothing here renormalizes. Viewport dimensions deliberately
/// live outside this type; they join the optics only in the serialized
/// uniform, whose layout the ray-generation kernel fixes.
#[derive(Copy, Clone, Debug)]
pub struct Camera {
    position: Point3<f32>,
    look_at: Point3<f32>,
    view: Vector3<f32>,
    up: Vector3<f32>,
    right: Vector3<f32>,
    fov_degrees: f32,
    lens: Vector2<f32>,
}

impl Camera {
    #[must_use]
    pub fn new(position: Point3<f32>, look_at: Point3<f32>, up_hint: Vector3<f32>, fov_degrees: f32) -> Self {
        let view = (look_at - position).normalize();
        let right = view.cross(up_hint).normalize();
        let up = right.cross(view);

        Self {
            position,
            look_at,
            view,
            up,
            right,
            fov_degrees,
            lens: Vector2::new(0.0, 0.0),
        }
    }

    /// Thin-lens parameters (aperture radius, focal distance) for
    /// depth-of-field ray generation.
    #[must_use]
    pub fn with_lens(mut self, radius: f32, focal_distance: f32) -> Self {
        self.lens = Vector2::new(radius, focal_distance);
        self
    }

    /// Slides the viewer and its target along the camera's own right and up
    /// axes; vertical screen motion maps to the negative up axis.
    pub(crate) fn pan(&mut self, dx: f32, dy: f32, damping: f32) {
        let shift = self.right * (dx / damping) - self.up * (dy / damping);
        self.position += shift;
        self.look_at += shift;
    }

    /// Slides the viewer and its target along the view axis.
    pub(crate) fn zoom(&mut self, dz: f32) {
        let shift = self.view * dz;
        self.position += shift;
        self.look_at += shift;
    }

    #[must_use]
    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    #[must_use]
    pub fn look_at(&self) -> Point3<f32> {
        self.look_at
    }

    #[must_use]
    pub(crate) fn serialize(&self, viewport: Viewport, max_depth: u32) -> CameraUniform {
        CameraUniform {
            data: [viewport.width() as f32, viewport.height() as f32, self.fov_degrees, max_depth as f32],
            position: [self.position.x, self.position.y, self.position.z, 1.0],
            look_at: [self.look_at.x, self.look_at.y, self.look_at.z, 1.0],
            view: [self.view.x, self.view.y, self.view.z, 0.0],
            right: [self.right.x, self.right.y, self.right.z, 0.0],
            up: [self.up.x, self.up.y, self.up.z, 0.0],
            lens: [self.lens.x, self.lens.y, 0.0, 0.0],
        }
    }
}

/// Fixed wire layout of the per-frame camera slot. The first quartet packs
/// viewport size, field of view and trace depth; changing lane order breaks
/// the kernel protocol.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct CameraUniform {
    pub data: [f32; 4],
    pub position: [f32; 4],
    pub look_at: [f32; 4],
    pub view: [f32; 4],
    pub right: [f32; 4],
    pub up: [f32; 4],
    pub lens: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 1e-6;

    #[must_use]
    fn make_system_under_test() -> Camera {
        Camera::new(
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            45.0,
        )
    }

    fn assert_vectors_close(actual: Vector3<f32>, expected: Vector3<f32>) {
        assert!((actual - expected).magnitude() < TOLERANCE, "{actual:?} vs {expected:?}");
    }

    #[test]
    fn test_basis_is_orthonormal_after_construction() {
        let system_under_test = make_system_under_test();

        assert_vectors_close(system_under_test.view, Vector3::new(0.0, 0.0, -1.0));
        assert_vectors_close(system_under_test.right, Vector3::new(1.0, 0.0, 0.0));
        assert_vectors_close(system_under_test.up, Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_pan_displaces_position_and_target_together() {
        let damping = 100.0;
        let mut system_under_test = make_system_under_test();

        system_under_test.pan(10.0, 20.0, damping);

        let expected_shift = Vector3::new(0.1, -0.2, 0.0);
        assert_vectors_close(system_under_test.position() - Point3::new(0.0, 0.0, 5.0), expected_shift);
        assert_vectors_close(system_under_test.look_at() - Point3::new(0.0, 0.0, 0.0), expected_shift);
    }

    #[test]
    fn test_zoom_displaces_along_view_axis() {
        let mut system_under_test = make_system_under_test();

        system_under_test.zoom(2.0);

        assert_vectors_close(system_under_test.position() - Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -2.0));
        assert_vectors_close(system_under_test.look_at() - Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, -2.0));
    }

    #[test]
    fn test_serialize_packs_viewport_and_depth_into_first_quartet() {
        let system_under_test = make_system_under_test().with_lens(0.25, 4.0);

        let uniform = system_under_test.serialize(Viewport::new(800, 600), 8);

        assert_eq!(uniform.data, [800.0, 600.0, 45.0, 8.0]);
        assert_eq!(uniform.position, [0.0, 0.0, 5.0, 1.0]);
        assert_eq!(uniform.lens, [0.25, 4.0, 0.0, 0.0]);
        assert_eq!(size_of::<CameraUniform>(), 112);
    }
}
