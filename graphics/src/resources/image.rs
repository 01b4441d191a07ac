//! GPU image resource.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::{Allocation, Allocator};
use parking_lot::Mutex;

use crate::layout::ImageId;
use crate::types::{Extent2d, TextureDescriptor, TextureFormat, TextureUsage};

/// A GPU image with its default view.
///
/// Images are created by [`RenderDevice::create_image`] or wrapped from an
/// externally owned handle (swapchain images) with [`Image::from_external`].
/// Device-created images destroy their Vulkan objects and free their memory
/// on drop; the caller must guarantee the GPU no longer uses them, which
/// holds at the teardown and resize points where render targets die.
///
/// [`RenderDevice::create_image`]: crate::device::RenderDevice::create_image
pub struct Image {
    raw: vk::Image,
    view: vk::ImageView,
    descriptor: TextureDescriptor,
    allocation: Option<Allocation>,
    device: Option<ash::Device>,
    allocator: Option<Arc<Mutex<Allocator>>>,
}

impl Image {
    /// Create an image owning its Vulkan objects (called by RenderDevice).
    pub(crate) fn new(
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        raw: vk::Image,
        view: vk::ImageView,
        allocation: Allocation,
        descriptor: TextureDescriptor,
    ) -> Self {
        Self {
            raw,
            view,
            descriptor,
            allocation: Some(allocation),
            device: Some(device),
            allocator: Some(allocator),
        }
    }

    /// Wrap an externally owned image (e.g. a swapchain image).
    ///
    /// The wrapped handles are not destroyed on drop.
    pub fn from_external(raw: vk::Image, view: vk::ImageView, descriptor: TextureDescriptor) -> Self {
        Self {
            raw,
            view,
            descriptor,
            allocation: None,
            device: None,
            allocator: None,
        }
    }

    /// Get the raw Vulkan image handle.
    pub fn raw(&self) -> vk::Image {
        self.raw
    }

    /// Get the default image view.
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Get the identifier used by the barrier scheduler.
    pub fn id(&self) -> ImageId {
        ImageId::from(self.raw)
    }

    /// Get the image descriptor.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    /// Get the image format.
    pub fn format(&self) -> TextureFormat {
        self.descriptor.format
    }

    /// Get the usage flags.
    pub fn usage(&self) -> TextureUsage {
        self.descriptor.usage
    }

    /// Get the 2D extent of the image.
    pub fn extent(&self) -> Extent2d {
        self.descriptor.size.as_2d()
    }

    /// Get the image aspect covered by the format.
    pub fn aspect_mask(&self) -> vk::ImageAspectFlags {
        self.descriptor.format.aspect_mask()
    }

    /// Get the image label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        let Some(device) = self.device.take() else {
            return;
        };
        unsafe {
            device.destroy_image_view(self.view, None);
            device.destroy_image(self.raw, None);
        }
        if let (Some(allocation), Some(allocator)) = (self.allocation.take(), self.allocator.take())
        {
            if let Err(e) = allocator.lock().free(allocation) {
                log::error!("Failed to free image allocation: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("size", &self.descriptor.size)
            .field("format", &self.descriptor.format)
            .field("usage", &self.descriptor.usage)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// SAFETY: Vulkan handles are thread-safe and ash::Device is a wrapper around
// raw pointers that may move between threads.
unsafe impl Send for Image {}
unsafe impl Sync for Image {}

static_assertions::assert_impl_all!(Image: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn test_external_image_accessors() {
        let desc = TextureDescriptor::new_2d(
            1024,
            1024,
            TextureFormat::Depth32Float,
            TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
        )
        .with_label("shadow");
        let image = Image::from_external(
            vk::Image::from_raw(7),
            vk::ImageView::from_raw(8),
            desc,
        );

        assert_eq!(image.id(), ImageId::from_raw(7));
        assert_eq!(image.extent(), Extent2d::new(1024, 1024));
        assert_eq!(image.format(), TextureFormat::Depth32Float);
        assert_eq!(image.aspect_mask(), vk::ImageAspectFlags::DEPTH);
        assert_eq!(image.label(), Some("shadow"));
    }

    #[test]
    fn test_external_image_drop_is_noop() {
        let image = Image::from_external(
            vk::Image::from_raw(1),
            vk::ImageView::from_raw(2),
            TextureDescriptor::default(),
        );
        drop(image);
    }
}
