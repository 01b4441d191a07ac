//! Scene registry: cameras, lights, and opaque mesh nodes.
//!
//! Subpasses never hold references into the scene; they store the ids handed
//! out here and resolve them against the registry each frame.

mod camera;
mod light;
mod transform;

pub use camera::{Camera, OrthoBounds, Projection};
pub use light::{
    DirectionalLight, GpuLight, LightsUniform, PointLight, LIGHT_DIRECTIONAL, LIGHT_POINT,
    MAX_LIGHTS,
};
pub use transform::Transform;

use ash::vk;
use glam::{Mat4, Quat, Vec3, Vec4};
use rand::Rng;

/// Identifier of a camera in the scene registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CameraId(usize);

/// Identifier of a directional light in the scene registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightId(usize);

/// An opaque mesh-bearing node.
///
/// Vertex and index buffers are owned by the host's asset subsystem; the
/// scene carries only the handles and per-node draw data.
#[derive(Debug, Clone)]
pub struct MeshNode {
    pub vertex_buffer: vk::Buffer,
    pub index_buffer: vk::Buffer,
    pub index_count: u32,
    pub transform: Mat4,
    pub base_color: Vec4,
}

/// The scene registry.
#[derive(Debug, Default)]
pub struct Scene {
    cameras: Vec<Camera>,
    directional_lights: Vec<DirectionalLight>,
    point_lights: Vec<PointLight>,
    mesh_nodes: Vec<MeshNode>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a camera, returning its id.
    pub fn add_camera(&mut self, camera: Camera) -> CameraId {
        self.cameras.push(camera);
        CameraId(self.cameras.len() - 1)
    }

    /// Get a camera by id.
    pub fn camera(&self, id: CameraId) -> &Camera {
        &self.cameras[id.0]
    }

    /// Get a mutable camera by id.
    pub fn camera_mut(&mut self, id: CameraId) -> &mut Camera {
        &mut self.cameras[id.0]
    }

    /// Add a directional light, returning its id.
    pub fn add_directional_light(&mut self, light: DirectionalLight) -> LightId {
        self.directional_lights.push(light);
        LightId(self.directional_lights.len() - 1)
    }

    /// Get a directional light by id.
    pub fn directional_light(&self, id: LightId) -> &DirectionalLight {
        &self.directional_lights[id.0]
    }

    /// Get a mutable directional light by id.
    pub fn directional_light_mut(&mut self, id: LightId) -> &mut DirectionalLight {
        &mut self.directional_lights[id.0]
    }

    /// Add a point light.
    pub fn add_point_light(&mut self, light: PointLight) {
        self.point_lights.push(light);
    }

    /// Get all point lights.
    pub fn point_lights(&self) -> &[PointLight] {
        &self.point_lights
    }

    /// Remove every light from the scene.
    pub fn clear_lights(&mut self) {
        self.directional_lights.clear();
        self.point_lights.clear();
    }

    /// Add an opaque mesh node.
    pub fn add_mesh_node(&mut self, node: MeshNode) {
        self.mesh_nodes.push(node);
    }

    /// Get all opaque mesh nodes.
    pub fn mesh_nodes(&self) -> &[MeshNode] {
        &self.mesh_nodes
    }

    /// Copy a light's transform onto a camera so the camera renders from the
    /// light's point of view. Call once per frame before recording.
    pub fn sync_shadow_camera(&mut self, camera: CameraId, light: LightId) {
        let transform = self.directional_lights[light.0].transform;
        self.cameras[camera.0].transform = transform;
    }

    /// Build the per-frame light table for the lighting subpass.
    ///
    /// Directional lights come first, then point lights, truncated to
    /// [`MAX_LIGHTS`].
    pub fn lights_uniform(&self) -> LightsUniform {
        let mut uniform = LightsUniform::default();
        let mut count = 0usize;

        for light in &self.directional_lights {
            if count == MAX_LIGHTS {
                break;
            }
            uniform.lights[count] = light.to_gpu();
            count += 1;
        }
        for light in &self.point_lights {
            if count == MAX_LIGHTS {
                log::warn!(
                    "scene has more than {MAX_LIGHTS} lights; extra lights are skipped"
                );
                break;
            }
            uniform.lights[count] = light.to_gpu();
            count += 1;
        }

        uniform.count[0] = count as u32;
        uniform
    }
}

/// Ids of the entities [`populate_sample_scene`] creates.
#[derive(Debug, Clone, Copy)]
pub struct SampleScene {
    pub main_camera: CameraId,
    pub shadow_camera: CameraId,
    pub sun: LightId,
}

/// Default orthographic bounds of the sample scene's shadow camera.
pub const SAMPLE_SHADOW_BOUNDS: OrthoBounds = OrthoBounds {
    left: -850.0,
    right: 850.0,
    bottom: -800.0,
    top: 800.0,
    near: -1000.0,
    far: 1500.0,
};

/// Populate the scene the demo renders: one sun with an attached shadow
/// camera, a grid of colored point lights, and a free main camera.
///
/// Point light colors are drawn from the caller's generator so scene
/// generation is reproducible under a fixed seed.
pub fn populate_sample_scene(
    scene: &mut Scene,
    aspect: f32,
    rng: &mut impl Rng,
) -> SampleScene {
    scene.clear_lights();

    let mut sun_transform = Transform::from_rotation(Quat::from_euler(
        glam::EulerRot::XYZ,
        (-30.0f32).to_radians(),
        (-85.0f32).to_radians(),
        0.0,
    ));
    sun_transform.translation = Vec3::new(0.0, 0.0, -400.0);
    let sun = scene.add_directional_light(DirectionalLight::new(sun_transform));

    // The shadow camera shares the sun's transform and renders an
    // orthographic slice around the scene.
    let mut shadow_camera = Camera::new(Projection::orthographic(SAMPLE_SHADOW_BOUNDS));
    shadow_camera.transform = sun_transform;
    let shadow_camera = scene.add_camera(shadow_camera);

    let base = Vec3::new(0.0, 128.0, -225.0);
    for i in -1i32..4 {
        for j in 0i32..2 {
            let mut pos = base;
            pos.x += i as f32 * 400.0;
            pos.z += j as f32 * (225.0 + 140.0);
            pos.y = 8.0;

            for k in 0i32..3 {
                pos.y += k as f32 * 100.0;

                scene.add_point_light(PointLight {
                    position: pos,
                    color: Vec3::new(rng.gen::<f32>(), rng.gen::<f32>(), rng.gen::<f32>()),
                    intensity: 0.2,
                    radius: 400.0,
                });
            }
        }
    }

    let mut main_camera = Camera::new(Projection::perspective(60.0, aspect, 0.1, 5000.0));
    main_camera.look_at(Vec3::new(0.0, 150.0, 300.0), Vec3::new(0.0, 100.0, 0.0));
    let main_camera = scene.add_camera(main_camera);

    SampleScene {
        main_camera,
        shadow_camera,
        sun,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_scene_population() {
        let mut scene = Scene::new();
        let ids = populate_sample_scene(&mut scene, 16.0 / 9.0, &mut StdRng::seed_from_u64(7));

        // 5 x 2 x 3 grid of point lights plus the sun.
        assert_eq!(scene.point_lights().len(), 30);
        assert_eq!(scene.lights_uniform().count[0], 31);
        assert_eq!(
            scene.camera(ids.shadow_camera).projection.ortho_bounds(),
            Some(SAMPLE_SHADOW_BOUNDS)
        );
    }

    #[test]
    fn test_sample_scene_is_reproducible() {
        let mut a = Scene::new();
        let mut b = Scene::new();
        populate_sample_scene(&mut a, 1.0, &mut StdRng::seed_from_u64(42));
        populate_sample_scene(&mut b, 1.0, &mut StdRng::seed_from_u64(42));

        for (la, lb) in a.point_lights().iter().zip(b.point_lights()) {
            assert_eq!(la.color, lb.color);
            assert_eq!(la.position, lb.position);
        }
    }

    #[test]
    fn test_shadow_camera_follows_sun() {
        let mut scene = Scene::new();
        let ids = populate_sample_scene(&mut scene, 1.0, &mut StdRng::seed_from_u64(0));

        let rotated = Quat::from_rotation_x(-0.5);
        scene.directional_light_mut(ids.sun).transform.rotation = rotated;
        scene.sync_shadow_camera(ids.shadow_camera, ids.sun);

        assert_eq!(scene.camera(ids.shadow_camera).transform.rotation, rotated);
    }

    #[test]
    fn test_lights_uniform_truncates() {
        let mut scene = Scene::new();
        for _ in 0..MAX_LIGHTS + 8 {
            scene.add_point_light(PointLight::default());
        }
        assert_eq!(scene.lights_uniform().count[0], MAX_LIGHTS as u32);
    }
}
