//! GPU buffer resource.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::{Allocation, Allocator};
use parking_lot::Mutex;

use crate::error::RendererError;
use crate::types::{BufferDescriptor, BufferUsage};

/// A GPU buffer resource.
///
/// Buffers are created by [`RenderDevice::create_buffer`]. Buffers requested
/// with `mapped_at_creation` live in CPU-visible memory and accept direct
/// writes through [`Buffer::write`].
///
/// [`RenderDevice::create_buffer`]: crate::device::RenderDevice::create_buffer
pub struct Buffer {
    raw: vk::Buffer,
    descriptor: BufferDescriptor,
    allocation: Option<Allocation>,
    device: Option<ash::Device>,
    allocator: Option<Arc<Mutex<Allocator>>>,
}

impl Buffer {
    /// Create a buffer owning its Vulkan objects (called by RenderDevice).
    pub(crate) fn new(
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        raw: vk::Buffer,
        allocation: Allocation,
        descriptor: BufferDescriptor,
    ) -> Self {
        Self {
            raw,
            descriptor,
            allocation: Some(allocation),
            device: Some(device),
            allocator: Some(allocator),
        }
    }

    /// Wrap an externally owned buffer handle.
    ///
    /// The wrapped handle is not destroyed on drop and cannot be written
    /// through [`Buffer::write`].
    pub fn from_external(raw: vk::Buffer, descriptor: BufferDescriptor) -> Self {
        Self {
            raw,
            descriptor,
            allocation: None,
            device: None,
            allocator: None,
        }
    }

    /// Get the raw Vulkan buffer handle.
    pub fn raw(&self) -> vk::Buffer {
        self.raw
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    /// Get the usage flags.
    pub fn usage(&self) -> BufferUsage {
        self.descriptor.usage
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Write bytes at the given offset through the persistent mapping.
    ///
    /// Fails if the buffer was not created `mapped_at_creation` or the write
    /// would run past the end of the buffer.
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<(), RendererError> {
        if offset + data.len() as u64 > self.descriptor.size {
            return Err(RendererError::InvalidParameter(format!(
                "write of {} bytes at offset {} exceeds buffer size {}",
                data.len(),
                offset,
                self.descriptor.size
            )));
        }

        let mapped = self
            .allocation
            .as_ref()
            .and_then(|a| a.mapped_ptr())
            .ok_or_else(|| {
                RendererError::InvalidParameter("buffer is not CPU-mapped".to_string())
            })?;

        unsafe {
            let dst = mapped.as_ptr().cast::<u8>().add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }
        Ok(())
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        let Some(device) = self.device.take() else {
            return;
        };
        unsafe {
            device.destroy_buffer(self.raw, None);
        }
        if let (Some(allocation), Some(allocator)) = (self.allocation.take(), self.allocator.take())
        {
            if let Err(e) = allocator.lock().free(allocation) {
                log::error!("Failed to free buffer allocation: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("size", &self.descriptor.size)
            .field("usage", &self.descriptor.usage)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// SAFETY: Vulkan handles are thread-safe and ash::Device is a wrapper around
// raw pointers that may move between threads.
unsafe impl Send for Buffer {}
unsafe impl Sync for Buffer {}

static_assertions::assert_impl_all!(Buffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn test_external_buffer_accessors() {
        let buffer = Buffer::from_external(
            vk::Buffer::from_raw(5),
            BufferDescriptor::new(4096, BufferUsage::UNIFORM).with_label("transients"),
        );
        assert_eq!(buffer.size(), 4096);
        assert_eq!(buffer.usage(), BufferUsage::UNIFORM);
        assert_eq!(buffer.label(), Some("transients"));
    }

    #[test]
    fn test_write_to_unmapped_buffer_fails() {
        let buffer = Buffer::from_external(
            vk::Buffer::from_raw(5),
            BufferDescriptor::new(64, BufferUsage::UNIFORM),
        );
        assert!(buffer.write(0, &[0u8; 16]).is_err());
    }

    #[test]
    fn test_out_of_bounds_write_fails() {
        let buffer = Buffer::from_external(
            vk::Buffer::from_raw(5),
            BufferDescriptor::new(64, BufferUsage::UNIFORM),
        );
        let err = buffer.write(60, &[0u8; 16]).unwrap_err();
        assert!(matches!(err, RendererError::InvalidParameter(_)));
    }
}
