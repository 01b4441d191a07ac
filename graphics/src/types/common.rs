//! Extent and clear value types.

use ash::vk;

/// A 2D extent in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    /// Create a new 2D extent.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Convert to a Vulkan extent.
    pub fn to_vk(self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }
}

/// A 3D extent in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Default for Extent3d {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            depth: 1,
        }
    }
}

impl Extent3d {
    /// Create a 2D extent (depth = 1).
    pub fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
        }
    }

    /// Drop the depth component.
    pub fn as_2d(self) -> Extent2d {
        Extent2d {
            width: self.width,
            height: self.height,
        }
    }

    /// Convert to a Vulkan extent.
    pub fn to_vk(self) -> vk::Extent3D {
        vk::Extent3D {
            width: self.width,
            height: self.height,
            depth: self.depth,
        }
    }
}

/// Clear value for a render pass attachment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Clear a color attachment.
    Color([f32; 4]),
    /// Clear a depth/stencil attachment.
    DepthStencil { depth: f32, stencil: u32 },
}

impl ClearValue {
    /// Create a color clear value.
    pub fn color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Color([r, g, b, a])
    }

    /// Create a depth clear value (stencil = 0).
    pub fn depth(depth: f32) -> Self {
        Self::DepthStencil { depth, stencil: 0 }
    }

    /// Convert to a Vulkan clear value.
    pub fn to_vk(self) -> vk::ClearValue {
        match self {
            Self::Color(float32) => vk::ClearValue {
                color: vk::ClearColorValue { float32 },
            },
            Self::DepthStencil { depth, stencil } => vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_conversion() {
        let e = Extent3d::new_2d(1920, 1080);
        assert_eq!(e.depth, 1);
        assert_eq!(e.as_2d(), Extent2d::new(1920, 1080));

        let vk_extent = e.to_vk();
        assert_eq!(vk_extent.width, 1920);
        assert_eq!(vk_extent.height, 1080);
    }

    #[test]
    fn test_clear_value_to_vk() {
        let c = ClearValue::color(0.0, 0.0, 0.0, 1.0).to_vk();
        assert_eq!(unsafe { c.color.float32 }, [0.0, 0.0, 0.0, 1.0]);

        let d = ClearValue::depth(0.0).to_vk();
        assert_eq!(unsafe { d.depth_stencil.depth }, 0.0);
    }
}
