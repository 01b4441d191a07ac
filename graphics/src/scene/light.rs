//! Light types and their GPU representation.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

use super::Transform;

/// Maximum number of lights the lighting subpass consumes per frame.
pub const MAX_LIGHTS: usize = 32;

/// GPU light type tag: point light.
pub const LIGHT_POINT: f32 = 0.0;
/// GPU light type tag: directional light.
pub const LIGHT_DIRECTIONAL: f32 = 1.0;

/// Directional light (like the sun).
///
/// The direction comes from the transform's orientation; the shadow camera
/// shares this transform so the shadow map is rendered along the same axis.
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    pub transform: Transform,
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

impl DirectionalLight {
    /// Create a directional light with the given orientation.
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            ..Default::default()
        }
    }

    /// Get the light direction.
    pub fn direction(&self) -> Vec3 {
        self.transform.forward()
    }

    /// Convert to GPU data.
    pub fn to_gpu(&self) -> GpuLight {
        let dir = self.direction();
        GpuLight {
            position: Vec4::ZERO,
            color: self.color.extend(self.intensity),
            direction: Vec4::new(dir.x, dir.y, dir.z, LIGHT_DIRECTIONAL),
        }
    }
}

/// Point light.
#[derive(Debug, Clone)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub radius: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: Vec3::ONE,
            intensity: 1.0,
            radius: 100.0,
        }
    }
}

impl PointLight {
    /// Convert to GPU data.
    pub fn to_gpu(&self) -> GpuLight {
        GpuLight {
            position: self.position.extend(self.radius),
            color: self.color.extend(self.intensity),
            direction: Vec4::new(0.0, 0.0, 0.0, LIGHT_POINT),
        }
    }
}

/// GPU-friendly light record, mirrored by the lighting shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuLight {
    /// xyz = position (point lights), w = radius.
    pub position: Vec4,
    /// xyz = color, w = intensity.
    pub color: Vec4,
    /// xyz = direction (directional lights), w = light type.
    pub direction: Vec4,
}

/// Per-frame light table bound by the lighting subpass.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightsUniform {
    /// x = number of valid entries; yzw unused (keeps 16-byte alignment).
    pub count: [u32; 4],
    /// Light records; entries past `count.x` are zeroed.
    pub lights: [GpuLight; MAX_LIGHTS],
}

impl Default for LightsUniform {
    fn default() -> Self {
        Self {
            count: [0; 4],
            lights: [GpuLight {
                position: Vec4::ZERO,
                color: Vec4::ZERO,
                direction: Vec4::ZERO,
            }; MAX_LIGHTS],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_directional_light_direction_follows_transform() {
        let mut light = DirectionalLight::default();
        assert_eq!(light.direction(), Vec3::NEG_Z);

        light.transform.rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let dir = light.direction();
        assert!((dir - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_gpu_light_tags() {
        let point = PointLight::default().to_gpu();
        assert_eq!(point.direction.w, LIGHT_POINT);

        let sun = DirectionalLight::default().to_gpu();
        assert_eq!(sun.direction.w, LIGHT_DIRECTIONAL);
    }

    #[test]
    fn test_lights_uniform_layout() {
        // One uvec4 plus MAX_LIGHTS records of three vec4s each.
        assert_eq!(
            std::mem::size_of::<LightsUniform>(),
            16 + MAX_LIGHTS * 48
        );
    }
}
