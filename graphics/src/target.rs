//! Render targets and the target factory.
//!
//! A render target is an ordered sequence of images sharing one extent.
//! Attachment order is fixed at pipeline-construction time and must match
//! the order images are pushed into the target; the index constants below
//! are the single source of truth for that order.

use crate::device::RenderDevice;
use crate::error::RendererError;
use crate::resources::Image;
use crate::types::{Extent2d, TextureDescriptor, TextureFormat, TextureUsage};

/// Swapchain color attachment index in the main target.
pub const SWAPCHAIN_ATTACHMENT: usize = 0;
/// Depth attachment index in the main target.
pub const DEPTH_ATTACHMENT: usize = 1;
/// Albedo G-buffer attachment index in the main target.
pub const ALBEDO_ATTACHMENT: usize = 2;
/// Normal G-buffer attachment index in the main target.
pub const NORMAL_ATTACHMENT: usize = 3;
/// Depth attachment index in a shadow target.
pub const SHADOW_MAP_ATTACHMENT: usize = 0;

/// An ordered set of attachment images sharing one extent.
///
/// The target owns its images exclusively. One instance exists per
/// frame-in-flight slot for the shadow target and one per swapchain image
/// for the main target.
#[derive(Debug)]
pub struct RenderTarget {
    attachments: Vec<Image>,
    extent: Extent2d,
}

impl RenderTarget {
    /// Create a render target from an ordered list of images.
    ///
    /// Panics if the list is empty or the images disagree on extent; both
    /// are construction-time programming errors.
    pub fn new(attachments: Vec<Image>) -> Self {
        assert!(!attachments.is_empty(), "render target needs at least one attachment");
        let extent = attachments[0].extent();
        for image in &attachments {
            assert_eq!(image.extent(), extent, "attachment extents must match");
        }
        Self { attachments, extent }
    }

    /// Get all attachments in order.
    pub fn attachments(&self) -> &[Image] {
        &self.attachments
    }

    /// Get the attachment at the given index.
    ///
    /// Panics if the index is out of range.
    pub fn attachment(&self, index: usize) -> &Image {
        assert!(index < self.attachments.len(), "attachment index out of range");
        &self.attachments[index]
    }

    /// Get the number of attachments.
    pub fn attachment_count(&self) -> usize {
        self.attachments.len()
    }

    /// Get the shared extent.
    pub fn extent(&self) -> Extent2d {
        self.extent
    }
}

/// Describe the single attachment of a shadow target.
///
/// Pure half of [`create_shadow_target`]; the depth format comes from the
/// device's suitable-depth-format query.
pub fn shadow_target_attachments(size: u32, depth_format: TextureFormat) -> Vec<TextureDescriptor> {
    vec![TextureDescriptor::new_2d(
        size,
        size,
        depth_format,
        TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
    )
    .with_label("shadow_depth")]
}

/// Describe the attachments a main target adds around an existing color
/// image: depth, albedo, and normal, in that order.
///
/// Albedo and normal are 32 bits per pixel each so the whole G-buffer stays
/// inside a 128-bit budget, which lets the driver merge the geometry and
/// lighting subpasses instead of round-tripping through device memory.
pub fn main_target_attachments(
    extent: Extent2d,
    depth_format: TextureFormat,
) -> Vec<TextureDescriptor> {
    let gbuffer_usage =
        TextureUsage::RENDER_ATTACHMENT | TextureUsage::INPUT_ATTACHMENT | TextureUsage::TRANSIENT;

    vec![
        TextureDescriptor::new_2d(extent.width, extent.height, depth_format, gbuffer_usage)
            .with_label("gbuffer_depth"),
        TextureDescriptor::new_2d(
            extent.width,
            extent.height,
            TextureFormat::Rgba8Unorm,
            gbuffer_usage,
        )
        .with_label("gbuffer_albedo"),
        TextureDescriptor::new_2d(
            extent.width,
            extent.height,
            TextureFormat::Rgb10a2Unorm,
            gbuffer_usage,
        )
        .with_label("gbuffer_normal"),
    ]
}

/// Create a shadow render target: one depth-capable, sampled-capable image
/// of `size x size`, device-local only.
pub fn create_shadow_target(device: &RenderDevice, size: u32) -> Result<RenderTarget, RendererError> {
    let depth_format = device.suitable_depth_format()?;
    let images = shadow_target_attachments(size, depth_format)
        .iter()
        .map(|desc| device.create_image(desc))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RenderTarget::new(images))
}

/// Create the main deferred target around an externally supplied presentable
/// color image (ownership transferred in).
///
/// Returns a 4-attachment target in fixed order {color, depth, albedo,
/// normal}, all sized to the color image's extent.
pub fn create_main_target(
    device: &RenderDevice,
    color_image: Image,
) -> Result<RenderTarget, RendererError> {
    let extent = color_image.extent();
    let depth_format = device.suitable_depth_format()?;

    let mut images = vec![color_image];
    for desc in main_target_attachments(extent, depth_format) {
        images.push(device.create_image(&desc)?);
    }
    Ok(RenderTarget::new(images))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk;
    use ash::vk::Handle;

    fn synthetic_image(id: u64, desc: TextureDescriptor) -> Image {
        Image::from_external(vk::Image::from_raw(id), vk::ImageView::from_raw(id), desc)
    }

    #[test]
    fn test_shadow_target_has_one_sampled_depth_attachment() {
        let descs = shadow_target_attachments(1024, TextureFormat::Depth32Float);

        assert_eq!(descs.len(), 1);
        let depth = &descs[0];
        assert_eq!(depth.size.width, 1024);
        assert_eq!(depth.size.height, 1024);
        assert!(depth.format.is_depth_stencil());
        assert!(depth.usage.contains(TextureUsage::RENDER_ATTACHMENT));
        assert!(depth.usage.contains(TextureUsage::TEXTURE_BINDING));

        let vk_usage = depth.usage.to_vk(depth.format);
        assert!(vk_usage.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT));
        assert!(vk_usage.contains(vk::ImageUsageFlags::SAMPLED));
    }

    #[test]
    fn test_main_target_layout() {
        let descs = main_target_attachments(Extent2d::new(1920, 1080), TextureFormat::Depth32Float);

        // Color comes from outside; depth, albedo, normal are created here.
        assert_eq!(descs.len(), 3);
        for desc in &descs {
            assert_eq!(desc.size.width, 1920);
            assert_eq!(desc.size.height, 1080);
        }

        // 8-bit x 4 channel albedo, 10-10-10-2 normal.
        assert_eq!(descs[1].format, TextureFormat::Rgba8Unorm);
        assert_eq!(descs[1].format.block_size(), 4);
        assert_eq!(descs[2].format, TextureFormat::Rgb10a2Unorm);
        assert_eq!(descs[2].format.block_size() * 8, 32);
    }

    #[test]
    fn test_main_target_fixed_attachment_order() {
        let extent = Extent2d::new(1920, 1080);
        let color = synthetic_image(
            1,
            TextureDescriptor::new_2d(
                extent.width,
                extent.height,
                TextureFormat::Bgra8Unorm,
                TextureUsage::RENDER_ATTACHMENT | TextureUsage::INPUT_ATTACHMENT,
            ),
        );

        let mut images = vec![color];
        for (i, desc) in main_target_attachments(extent, TextureFormat::Depth32Float)
            .into_iter()
            .enumerate()
        {
            images.push(synthetic_image(2 + i as u64, desc));
        }
        let target = RenderTarget::new(images);

        assert_eq!(target.attachment_count(), 4);
        assert!(!target.attachment(SWAPCHAIN_ATTACHMENT).format().is_depth_stencil());
        assert!(target.attachment(DEPTH_ATTACHMENT).format().is_depth_stencil());
        assert_eq!(target.attachment(ALBEDO_ATTACHMENT).format(), TextureFormat::Rgba8Unorm);
        assert_eq!(target.attachment(NORMAL_ATTACHMENT).format(), TextureFormat::Rgb10a2Unorm);
        assert_eq!(target.extent(), extent);
    }

    #[test]
    #[should_panic(expected = "at least one attachment")]
    fn test_empty_target_panics() {
        let _ = RenderTarget::new(Vec::new());
    }

    #[test]
    #[should_panic(expected = "extents must match")]
    fn test_mismatched_extents_panic() {
        let a = synthetic_image(
            1,
            TextureDescriptor::new_2d(64, 64, TextureFormat::Rgba8Unorm, TextureUsage::empty()),
        );
        let b = synthetic_image(
            2,
            TextureDescriptor::new_2d(32, 32, TextureFormat::Rgba8Unorm, TextureUsage::empty()),
        );
        let _ = RenderTarget::new(vec![a, b]);
    }

    #[test]
    #[should_panic(expected = "index out of range")]
    fn test_attachment_index_out_of_range_panics() {
        let target = RenderTarget::new(vec![synthetic_image(
            1,
            TextureDescriptor::new_2d(64, 64, TextureFormat::Rgba8Unorm, TextureUsage::empty()),
        )]);
        let _ = target.attachment(1);
    }
}
