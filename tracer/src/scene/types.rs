use bytemuck::{Pod, Zeroable};
use cgmath::{Deg, Matrix, Matrix4, SquareMatrix, Vector3};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Primitive kind discriminant stored in the first lane of a `Geom` record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum GeomKind {
    Sphere,
    Cube,
    Plane,
    Triangle,
}

/// Scene primitive. The orchestrator treats the contents as opaque; only the
/// record size and the per-scene count matter for buffer sizing. The layout
/// is quartet-padded to match the kernels' storage declarations.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Geom {
    pub kind: u32,
    pub material_id: i32,
    _padding: [u32; 2],
    pub translation: [f32; 4],
    pub rotation: [f32; 4],
    pub scale: [f32; 4],
    pub transform: [[f32; 4]; 4],
    pub inverse_transform: [[f32; 4]; 4],
    pub inverse_transpose: [[f32; 4]; 4],
}

impl Geom {
    #[must_use]
    pub fn new(
        kind: GeomKind,
        material_id: i32,
        translation: Vector3<f32>,
        rotation_degrees: Vector3<f32>,
        scale: Vector3<f32>,
    ) -> Self {
        let transform = Matrix4::from_translation(translation)
            * Matrix4::from_angle_z(Deg(rotation_degrees.z))
            * Matrix4::from_angle_y(Deg(rotation_degrees.y))
            * Matrix4::from_angle_x(Deg(rotation_degrees.x))
            * Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z);
        let inverse_transform = transform
            .invert()
            .expect("primitive transform must be invertible; zero scale is not a valid primitive");
        let inverse_transpose = inverse_transform.transpose();

        Self {
            kind: kind.into(),
            material_id,
            _padding: [0; 2],
            translation: [translation.x, translation.y, translation.z, 0.0],
            rotation: [rotation_degrees.x, rotation_degrees.y, rotation_degrees.z, 0.0],
            scale: [scale.x, scale.y, scale.z, 0.0],
            transform: transform.into(),
            inverse_transform: inverse_transform.into(),
            inverse_transpose: inverse_transpose.into(),
        }
    }
}

/// Surface description, one record per scene material.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Material {
    /// rgb albedo + specular exponent
    pub color: [f32; 4],
    /// rgb specular color + reflectivity flag
    pub specular: [f32; 4],
    /// rgb emitted radiance + refractivity flag
    pub emittance: [f32; 4],
    /// index of refraction, bsdf id, subsurface flag, scattering distance
    pub optics: [f32; 4],
}

impl Material {
    #[must_use]
    pub fn diffuse(red: f32, green: f32, blue: f32) -> Self {
        Self {
            color: [red, green, blue, 0.0],
            specular: [0.0; 4],
            emittance: [0.0; 4],
            optics: [1.0, 0.0, 0.0, 0.0],
        }
    }

    #[must_use]
    pub fn with_emittance(mut self, red: f32, green: f32, blue: f32) -> Self {
        self.emittance[0] = red;
        self.emittance[1] = green;
        self.emittance[2] = blue;
        self
    }

    #[must_use]
    pub fn with_specular(mut self, red: f32, green: f32, blue: f32, exponent: f32) -> Self {
        self.specular[0] = red;
        self.specular[1] = green;
        self.specular[2] = blue;
        self.color[3] = exponent;
        self
    }

    #[must_use]
    pub fn is_emissive(&self) -> bool {
        self.emittance[0] > 0.0 || self.emittance[1] > 0.0 || self.emittance[2] > 0.0
    }
}

/// Per-pixel path state, written by ray generation and consumed by every
/// later stage. CPU code never touches the contents after allocation.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub(crate) struct Ray {
    pub origin: [f32; 4],
    pub direction: [f32; 4],
    pub color: [f32; 4],
    pub throughput: [f32; 4],
    /// pixel x, pixel y, remaining bounces, specular-bounce flag
    pub pixel_and_bounces: [u32; 4],
    /// participating-medium id in the first lane
    pub medium: [i32; 4],
}

/// Nearest-hit record paired with the ray of the same index.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub(crate) struct Intersection {
    /// surface normal + parametric distance (negative on miss)
    pub normal_and_t: [f32; 4],
    pub point: [f32; 4],
    /// material id, outside flag
    pub surface: [i32; 4],
}
