//! Frames in flight: per-frame command recording and transient resources.
//!
//! Each frame-in-flight slot owns a command pool, one primary command
//! buffer, and a transient uniform pool. A slot is reset when it is
//! re-acquired; the host's frame fencing guarantees the GPU finished the
//! slot's previous frame by then.

use std::sync::Arc;

use ash::vk;

use crate::device::RenderDevice;
use crate::error::RendererError;
use crate::resources::TransientPool;
use crate::types::{BufferDescriptor, BufferUsage};

/// Map a monotonically increasing frame number to its frame-in-flight slot.
///
/// Frame N and frame N + `frames_in_flight` share a slot, so frame N's
/// resources are reused exactly when the host's fence says they retired.
pub fn active_slot(frame: u64, frames_in_flight: usize) -> usize {
    debug_assert!(frames_in_flight > 0);
    (frame % frames_in_flight as u64) as usize
}

/// Per-frame recording state.
pub struct RenderFrame {
    device: ash::Device,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    transients: TransientPool,
}

impl RenderFrame {
    /// Capacity of the per-frame transient uniform pool.
    pub const TRANSIENT_CAPACITY: u64 = 64 * 1024;

    /// Create a frame slot with its command pool and transient pool.
    pub fn new(device: &Arc<RenderDevice>) -> Result<Self, RendererError> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(device.queue_family_index())
            .flags(vk::CommandPoolCreateFlags::TRANSIENT);
        let command_pool = unsafe { device.handle().create_command_pool(&pool_info, None) }
            .map_err(|e| RendererError::from_vk(e, "create_command_pool"))?;

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffer = match unsafe { device.handle().allocate_command_buffers(&alloc_info) }
        {
            Ok(buffers) => buffers[0],
            Err(e) => {
                unsafe { device.handle().destroy_command_pool(command_pool, None) };
                return Err(RendererError::from_vk(e, "allocate_command_buffers"));
            }
        };

        let buffer = device
            .create_buffer(
                &BufferDescriptor::new(Self::TRANSIENT_CAPACITY, BufferUsage::UNIFORM)
                    .with_label("frame_transients")
                    .mapped(),
            )
            .inspect_err(|_| unsafe {
                device.handle().destroy_command_pool(command_pool, None);
            })?;

        Ok(Self {
            device: device.handle().clone(),
            command_pool,
            command_buffer,
            transients: TransientPool::new(buffer),
        })
    }

    /// Reset the slot for a new frame: recycle the command pool and reclaim
    /// the transient pool.
    pub fn reset(&mut self) -> Result<(), RendererError> {
        unsafe {
            self.device
                .reset_command_pool(self.command_pool, vk::CommandPoolResetFlags::empty())
        }
        .map_err(|e| RendererError::from_vk(e, "reset_command_pool"))?;
        self.transients.reset();
        Ok(())
    }

    /// Get the frame's primary command buffer.
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// Get the frame's transient pool.
    pub fn transients(&mut self) -> &mut TransientPool {
        &mut self.transients
    }
}

impl Drop for RenderFrame {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

impl std::fmt::Debug for RenderFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderFrame")
            .field("transients", &self.transients)
            .finish()
    }
}

/// Owns the frame-in-flight slots and cycles through them.
pub struct FrameContext {
    frames: Vec<RenderFrame>,
    frame_counter: u64,
}

impl FrameContext {
    /// Create the frame slots.
    pub fn new(device: &Arc<RenderDevice>, frames_in_flight: usize) -> Result<Self, RendererError> {
        assert!(frames_in_flight > 0, "need at least one frame in flight");
        let frames = (0..frames_in_flight)
            .map(|_| RenderFrame::new(device))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            frames,
            frame_counter: 0,
        })
    }

    /// Get the number of frames in flight.
    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    /// Get the total number of frames acquired so far.
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Acquire the next frame slot, resetting its pools.
    ///
    /// Returns the frame-in-flight index; the same index selects the shadow
    /// target the shadow pass writes and the lighting subpass reads.
    pub fn acquire(&mut self) -> Result<usize, RendererError> {
        let index = active_slot(self.frame_counter, self.frames.len());
        self.frames[index].reset()?;
        self.frame_counter += 1;
        Ok(index)
    }

    /// Get a frame slot mutably.
    pub fn frame_mut(&mut self, index: usize) -> &mut RenderFrame {
        &mut self.frames[index]
    }
}

impl std::fmt::Debug for FrameContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameContext")
            .field("frames_in_flight", &self.frames.len())
            .field("frame_counter", &self.frame_counter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_slot_cycles() {
        assert_eq!(active_slot(0, 2), 0);
        assert_eq!(active_slot(1, 2), 1);
        assert_eq!(active_slot(2, 2), 0);
        assert_eq!(active_slot(3, 2), 1);
    }

    #[test]
    fn test_frame_two_reuses_frame_zero_slot() {
        // With two frames in flight, the third frame reuses the first
        // frame's shadow target and transient pool.
        let slots: Vec<usize> = (0..3).map(|f| active_slot(f, 2)).collect();
        assert_eq!(slots[2], slots[0]);
        assert_ne!(slots[1], slots[0]);
    }

    #[test]
    fn test_active_slot_single_frame() {
        for frame in 0..4 {
            assert_eq!(active_slot(frame, 1), 0);
        }
    }
}
