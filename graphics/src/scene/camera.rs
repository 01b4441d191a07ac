//! Camera and projection types.

use glam::{Mat4, Quat, Vec3};

use super::Transform;

/// Orthographic frustum bounds, adjustable at runtime through the options
/// panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoBounds {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

/// Camera projection type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic(OrthoBounds),
}

impl Projection {
    /// Create a perspective projection from a vertical FOV in degrees.
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::Perspective {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    /// Create an orthographic projection from explicit bounds.
    pub fn orthographic(bounds: OrthoBounds) -> Self {
        Self::Orthographic(bounds)
    }

    /// Get the projection matrix (right-handed, [0, 1] depth, before the
    /// Vulkan clip correction).
    pub fn matrix(&self) -> Mat4 {
        match self {
            Self::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(*fov_y, *aspect, *near, *far),
            Self::Orthographic(b) => {
                Mat4::orthographic_rh(b.left, b.right, b.bottom, b.top, b.near, b.far)
            }
        }
    }

    /// Get the orthographic bounds, if this is an orthographic projection.
    pub fn ortho_bounds(&self) -> Option<OrthoBounds> {
        match self {
            Self::Orthographic(b) => Some(*b),
            Self::Perspective { .. } => None,
        }
    }

    /// Replace the orthographic bounds. No-op on perspective projections.
    pub fn set_ortho_bounds(&mut self, bounds: OrthoBounds) {
        if let Self::Orthographic(b) = self {
            *b = bounds;
        }
    }

    /// Update the aspect ratio. No-op on orthographic projections.
    pub fn set_aspect(&mut self, aspect: f32) {
        if let Self::Perspective { aspect: a, .. } = self {
            *a = aspect;
        }
    }
}

/// A camera: a projection attached to a transform.
///
/// The view matrix is the inverse of the transform's world matrix, so a
/// camera that shares a light's transform renders from the light's point of
/// view.
#[derive(Debug, Clone)]
pub struct Camera {
    pub projection: Projection,
    pub transform: Transform,
}

impl Camera {
    /// Create a camera with an identity transform.
    pub fn new(projection: Projection) -> Self {
        Self {
            projection,
            transform: Transform::default(),
        }
    }

    /// Position the camera and aim it at a target.
    pub fn look_at(&mut self, position: Vec3, target: Vec3) {
        self.transform.translation = position;
        let dir = (target - position).normalize();
        self.transform.rotation = Quat::from_rotation_arc(Vec3::NEG_Z, dir);
    }

    /// Get the view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        self.transform.matrix().inverse()
    }

    /// Get the projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHADOW_BOUNDS: OrthoBounds = OrthoBounds {
        left: -850.0,
        right: 850.0,
        bottom: -800.0,
        top: 800.0,
        near: -1000.0,
        far: 1500.0,
    };

    #[test]
    fn test_ortho_bounds_roundtrip() {
        let mut projection = Projection::orthographic(SHADOW_BOUNDS);
        assert_eq!(projection.ortho_bounds(), Some(SHADOW_BOUNDS));

        let wider = OrthoBounds {
            left: -1000.0,
            right: 1000.0,
            ..SHADOW_BOUNDS
        };
        projection.set_ortho_bounds(wider);
        assert_eq!(projection.ortho_bounds(), Some(wider));
    }

    #[test]
    fn test_bounds_change_is_reflected_in_matrix() {
        let mut camera = Camera::new(Projection::orthographic(SHADOW_BOUNDS));
        let before = camera.projection_matrix();

        let mut bounds = SHADOW_BOUNDS;
        bounds.left = -400.0;
        bounds.right = 400.0;
        camera.projection.set_ortho_bounds(bounds);

        // The matrix is derived from the bounds on every query, never cached.
        let after = camera.projection_matrix();
        assert_ne!(before, after);
        assert_eq!(
            after,
            Mat4::orthographic_rh(-400.0, 400.0, -800.0, 800.0, -1000.0, 1500.0)
        );
    }

    #[test]
    fn test_perspective_ignores_ortho_setters() {
        let mut projection = Projection::perspective(60.0, 16.0 / 9.0, 0.1, 1000.0);
        assert_eq!(projection.ortho_bounds(), None);
        projection.set_ortho_bounds(SHADOW_BOUNDS);
        assert_eq!(projection.ortho_bounds(), None);
    }

    #[test]
    fn test_look_at_view() {
        let mut camera = Camera::new(Projection::perspective(60.0, 1.0, 0.1, 100.0));
        camera.look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);

        // Looking down -Z from (0, 0, 10): the origin lands 10 units ahead.
        let p = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!((p.z - -10.0).abs() < 1e-5);
    }
}
