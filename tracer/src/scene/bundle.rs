use crate::scene::camera::Camera;
use crate::scene::types::{Geom, Material};
use cgmath::Vector3;
use std::path::PathBuf;

/// Emissive background asset: a texture on disk plus a constant radiance
/// floor added on top of every environment sample.
pub struct EnvironmentDescriptor {
    pub path: PathBuf,
    pub base_emittance: Vector3<f32>,
}

/// Everything the host hands over at construction. Geometry, materials and
/// the flattened spatial-tree payload are fixed for the scene's lifetime;
/// only the camera mutates afterwards, through the gesture operations.
pub struct SceneBundle {
    pub camera: Camera,
    pub geoms: Vec<Geom>,
    pub light_count: u32,
    pub materials: Vec<Material>,
    /// flattened spatial-index nodes consumed by the intersection kernel
    pub accel: Vec<f32>,
    pub environment: Option<EnvironmentDescriptor>,
    /// bounce limit per path; the shade/intersect pair runs this many times
    pub max_depth: u32,
}

impl SceneBundle {
    /// Convenience for hosts that do not precompute the light count.
    #[must_use]
    pub fn count_lights(geoms: &[Geom], materials: &[Material]) -> u32 {
        geoms
            .iter()
            .filter(|geom| {
                materials
                    .get(geom.material_id as usize)
                    .is_some_and(|material| material.is_emissive())
            })
            .count() as u32
    }
}
