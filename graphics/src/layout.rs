//! Image layout states and identifiers for barrier scheduling.
//!
//! The deferred pipeline moves every attachment through a small, fixed set
//! of layouts. Each layout knows the Vulkan layout it maps to and the access
//! and stage masks a transition into or out of it requires, so a barrier can
//! be derived from an (old, new) layout pair alone.

use ash::vk;
use ash::vk::Handle;

/// Image layout states attachments can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageLayout {
    /// Initial state, contents undefined. Can transition to any layout.
    #[default]
    Undefined,
    /// Optimal for color attachment writes.
    ColorAttachment,
    /// Optimal for depth/stencil attachment writes.
    DepthStencilAttachment,
    /// Optimal for shader sampling (texture reads).
    ShaderReadOnly,
    /// Optimal for presentation to the swapchain.
    PresentSrc,
}

impl ImageLayout {
    /// Convert to the Vulkan image layout.
    pub fn to_vk(self) -> vk::ImageLayout {
        match self {
            Self::Undefined => vk::ImageLayout::UNDEFINED,
            Self::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            Self::DepthStencilAttachment => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            Self::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            Self::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
        }
    }

    /// Get the access mask for this layout (as source of a transition).
    pub fn src_access_mask(self) -> vk::AccessFlags {
        match self {
            Self::Undefined => vk::AccessFlags::empty(),
            Self::ColorAttachment => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            Self::DepthStencilAttachment => vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            Self::ShaderReadOnly => vk::AccessFlags::SHADER_READ,
            Self::PresentSrc => vk::AccessFlags::empty(),
        }
    }

    /// Get the access mask for this layout (as destination of a transition).
    pub fn dst_access_mask(self) -> vk::AccessFlags {
        match self {
            Self::Undefined => vk::AccessFlags::empty(),
            Self::ColorAttachment => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            Self::DepthStencilAttachment => {
                vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
            }
            Self::ShaderReadOnly => vk::AccessFlags::SHADER_READ,
            Self::PresentSrc => vk::AccessFlags::empty(),
        }
    }

    /// Get the pipeline stage for this layout (as source of a transition).
    pub fn src_stage(self) -> vk::PipelineStageFlags {
        match self {
            Self::Undefined => vk::PipelineStageFlags::TOP_OF_PIPE,
            Self::ColorAttachment => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            Self::DepthStencilAttachment => {
                vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                    | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS
            }
            Self::ShaderReadOnly => vk::PipelineStageFlags::FRAGMENT_SHADER,
            Self::PresentSrc => vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        }
    }

    /// Get the pipeline stage for this layout (as destination of a transition).
    pub fn dst_stage(self) -> vk::PipelineStageFlags {
        match self {
            Self::Undefined => vk::PipelineStageFlags::TOP_OF_PIPE,
            Self::ColorAttachment => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            Self::DepthStencilAttachment => {
                vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                    | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS
            }
            Self::ShaderReadOnly => vk::PipelineStageFlags::FRAGMENT_SHADER,
            Self::PresentSrc => vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        }
    }

    /// Check if this is a depth/stencil layout.
    pub fn is_depth_stencil(self) -> bool {
        matches!(self, Self::DepthStencilAttachment)
    }
}

/// Unique identifier for a Vulkan image within the barrier scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(u64);

impl From<vk::Image> for ImageId {
    fn from(image: vk::Image) -> Self {
        Self(image.as_raw())
    }
}

impl ImageId {
    /// Create an image ID from a raw Vulkan image handle.
    pub fn from_raw(handle: u64) -> Self {
        Self(handle)
    }

    /// Get the raw handle value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ImageLayout::Undefined, vk::ImageLayout::UNDEFINED)]
    #[case(ImageLayout::ColorAttachment, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)]
    #[case(
        ImageLayout::DepthStencilAttachment,
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    )]
    #[case(ImageLayout::ShaderReadOnly, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)]
    #[case(ImageLayout::PresentSrc, vk::ImageLayout::PRESENT_SRC_KHR)]
    fn test_layout_to_vk(#[case] layout: ImageLayout, #[case] expected: vk::ImageLayout) {
        assert_eq!(layout.to_vk(), expected);
    }

    #[test]
    fn test_undefined_has_no_source_access() {
        assert_eq!(ImageLayout::Undefined.src_access_mask(), vk::AccessFlags::empty());
        assert_eq!(ImageLayout::Undefined.src_stage(), vk::PipelineStageFlags::TOP_OF_PIPE);
    }

    #[test]
    fn test_depth_attachment_covers_both_fragment_test_stages() {
        let stages = ImageLayout::DepthStencilAttachment.dst_stage();
        assert!(stages.contains(vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS));
        assert!(stages.contains(vk::PipelineStageFlags::LATE_FRAGMENT_TESTS));
    }

    #[test]
    fn test_present_is_bottom_of_pipe() {
        assert_eq!(
            ImageLayout::PresentSrc.dst_stage(),
            vk::PipelineStageFlags::BOTTOM_OF_PIPE
        );
        assert_eq!(ImageLayout::PresentSrc.dst_access_mask(), vk::AccessFlags::empty());
    }

    #[test]
    fn test_image_id_from_raw() {
        let id = ImageId::from_raw(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id, ImageId::from(vk::Image::from_raw(42)));
    }
}
