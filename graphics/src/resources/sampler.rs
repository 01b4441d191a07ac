//! GPU sampler resource.

use ash::vk;

use crate::types::SamplerDescriptor;

/// A GPU texture sampler.
///
/// Samplers are created by [`RenderDevice::create_sampler`] and destroyed on
/// drop.
///
/// [`RenderDevice::create_sampler`]: crate::device::RenderDevice::create_sampler
pub struct Sampler {
    raw: vk::Sampler,
    descriptor: SamplerDescriptor,
    device: Option<ash::Device>,
}

impl Sampler {
    /// Create a sampler owning its Vulkan object (called by RenderDevice).
    pub(crate) fn new(device: ash::Device, raw: vk::Sampler, descriptor: SamplerDescriptor) -> Self {
        Self {
            raw,
            descriptor,
            device: Some(device),
        }
    }

    /// Get the raw Vulkan sampler handle.
    pub fn raw(&self) -> vk::Sampler {
        self.raw
    }

    /// Get the sampler descriptor.
    pub fn descriptor(&self) -> &SamplerDescriptor {
        &self.descriptor
    }

    /// Get the sampler label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        if let Some(device) = self.device.take() {
            unsafe { device.destroy_sampler(self.raw, None) };
        }
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("mag_filter", &self.descriptor.mag_filter)
            .field("min_filter", &self.descriptor.min_filter)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// SAFETY: Vulkan handles are thread-safe and ash::Device is a wrapper around
// raw pointers that may move between threads.
unsafe impl Send for Sampler {}
unsafe impl Sync for Sampler {}

static_assertions::assert_impl_all!(Sampler: Send, Sync);
