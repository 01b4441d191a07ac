//! Texture format, usage, and descriptor types.

use ash::vk;
use bitflags::bitflags;

use super::Extent3d;

/// Texture format enumeration.
///
/// Only formats used by the deferred pipeline are listed. The G-buffer
/// formats are chosen so that color + depth + albedo + normal stay within a
/// 128-bit per-pixel budget, which lets drivers merge the geometry and
/// lighting subpasses and keep G-buffer data in on-chip memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureFormat {
    /// 8-bit RGBA channels, unsigned normalized (32 bits).
    #[default]
    Rgba8Unorm,
    /// 8-bit BGRA channels, unsigned normalized (32 bits). Common swapchain format.
    Bgra8Unorm,
    /// 10-10-10-2 packed RGBA, unsigned normalized (32 bits).
    Rgb10a2Unorm,
    /// 16-bit depth.
    Depth16Unorm,
    /// 24-bit depth with 8-bit stencil.
    Depth24PlusStencil8,
    /// 32-bit depth, float.
    Depth32Float,
}

impl TextureFormat {
    /// Returns true if this is a depth or stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(
            self,
            Self::Depth16Unorm | Self::Depth24PlusStencil8 | Self::Depth32Float
        )
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::Depth24PlusStencil8)
    }

    /// Returns the size in bytes per pixel.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::Depth16Unorm => 2,
            Self::Rgba8Unorm
            | Self::Bgra8Unorm
            | Self::Rgb10a2Unorm
            | Self::Depth24PlusStencil8
            | Self::Depth32Float => 4,
        }
    }

    /// Convert to a Vulkan format.
    pub fn to_vk(self) -> vk::Format {
        match self {
            Self::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
            Self::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
            Self::Rgb10a2Unorm => vk::Format::A2B10G10R10_UNORM_PACK32,
            Self::Depth16Unorm => vk::Format::D16_UNORM,
            Self::Depth24PlusStencil8 => vk::Format::D24_UNORM_S8_UINT,
            Self::Depth32Float => vk::Format::D32_SFLOAT,
        }
    }

    /// Image aspect covered by this format.
    pub fn aspect_mask(self) -> vk::ImageAspectFlags {
        if self.is_depth_stencil() {
            if self.has_stencil() {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            } else {
                vk::ImageAspectFlags::DEPTH
            }
        } else {
            vk::ImageAspectFlags::COLOR
        }
    }
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be copied from.
        const COPY_SRC = 1 << 0;
        /// Texture can be copied to.
        const COPY_DST = 1 << 1;
        /// Texture can be sampled in a shader.
        const TEXTURE_BINDING = 1 << 2;
        /// Texture can be used as a render attachment.
        const RENDER_ATTACHMENT = 1 << 3;
        /// Texture can be read as a same-pixel input attachment.
        const INPUT_ATTACHMENT = 1 << 4;
        /// Attachment contents never leave tile memory.
        const TRANSIENT = 1 << 5;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

impl TextureUsage {
    /// Convert to Vulkan image usage flags for the given format.
    ///
    /// `RENDER_ATTACHMENT` maps to either the color or the depth/stencil
    /// attachment bit depending on the format.
    pub fn to_vk(self, format: TextureFormat) -> vk::ImageUsageFlags {
        let mut flags = vk::ImageUsageFlags::empty();
        if self.contains(Self::COPY_SRC) {
            flags |= vk::ImageUsageFlags::TRANSFER_SRC;
        }
        if self.contains(Self::COPY_DST) {
            flags |= vk::ImageUsageFlags::TRANSFER_DST;
        }
        if self.contains(Self::TEXTURE_BINDING) {
            flags |= vk::ImageUsageFlags::SAMPLED;
        }
        if self.contains(Self::RENDER_ATTACHMENT) {
            flags |= if format.is_depth_stencil() {
                vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
            } else {
                vk::ImageUsageFlags::COLOR_ATTACHMENT
            };
        }
        if self.contains(Self::INPUT_ATTACHMENT) {
            flags |= vk::ImageUsageFlags::INPUT_ATTACHMENT;
        }
        if self.contains(Self::TRANSIENT) {
            flags |= vk::ImageUsageFlags::TRANSIENT_ATTACHMENT;
        }
        flags
    }
}

/// Descriptor for creating a texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Size of the texture.
    pub size: Extent3d,
    /// Mip level count.
    pub mip_level_count: u32,
    /// Sample count for multisampling.
    pub sample_count: u32,
    /// Texture format.
    pub format: TextureFormat,
    /// Usage flags.
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            size: Extent3d::new_2d(width, height),
            mip_level_count: 1,
            sample_count: 1,
            format,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            size: Extent3d::default(),
            mip_level_count: 1,
            sample_count: 1,
            format: TextureFormat::default(),
            usage: TextureUsage::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TextureFormat::Rgba8Unorm, vk::Format::R8G8B8A8_UNORM)]
    #[case(TextureFormat::Rgb10a2Unorm, vk::Format::A2B10G10R10_UNORM_PACK32)]
    #[case(TextureFormat::Depth32Float, vk::Format::D32_SFLOAT)]
    #[case(TextureFormat::Depth24PlusStencil8, vk::Format::D24_UNORM_S8_UINT)]
    fn test_format_to_vk(#[case] format: TextureFormat, #[case] expected: vk::Format) {
        assert_eq!(format.to_vk(), expected);
    }

    #[test]
    fn test_depth_formats() {
        assert!(TextureFormat::Depth32Float.is_depth_stencil());
        assert!(!TextureFormat::Depth32Float.has_stencil());
        assert!(TextureFormat::Depth24PlusStencil8.has_stencil());
        assert!(!TextureFormat::Rgba8Unorm.is_depth_stencil());
    }

    #[test]
    fn test_aspect_mask() {
        assert_eq!(
            TextureFormat::Rgba8Unorm.aspect_mask(),
            vk::ImageAspectFlags::COLOR
        );
        assert_eq!(
            TextureFormat::Depth32Float.aspect_mask(),
            vk::ImageAspectFlags::DEPTH
        );
        assert_eq!(
            TextureFormat::Depth24PlusStencil8.aspect_mask(),
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        );
    }

    #[test]
    fn test_usage_to_vk_respects_format() {
        let usage = TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING;

        let depth = usage.to_vk(TextureFormat::Depth32Float);
        assert!(depth.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT));
        assert!(depth.contains(vk::ImageUsageFlags::SAMPLED));
        assert!(!depth.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));

        let color = usage.to_vk(TextureFormat::Rgba8Unorm);
        assert!(color.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));
        assert!(!color.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT));
    }

    #[test]
    fn test_gbuffer_formats_fit_128_bit_budget() {
        // Swapchain color + albedo + normal, 32 bits each, plus depth.
        let total = TextureFormat::Bgra8Unorm.block_size()
            + TextureFormat::Rgba8Unorm.block_size()
            + TextureFormat::Rgb10a2Unorm.block_size()
            + TextureFormat::Depth32Float.block_size();
        assert!(total * 8 <= 128);
    }
}
