//! Per-frame transient buffer pool.
//!
//! Each frame in flight owns one pool backed by a single CPU-mapped uniform
//! buffer. Allocations are linear and aligned; the pool is reset when the
//! frame is re-acquired, after the host's frame fence guarantees the GPU has
//! finished reading. Allocations are therefore frame-scoped and must be
//! rewritten every frame.

use bytemuck::Pod;

use crate::error::RendererError;
use crate::resources::Buffer;

/// A sub-allocation from a transient pool.
///
/// Carries the byte range inside the pool's backing buffer; bind it as a
/// uniform range for the current frame only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransientAllocation {
    /// Byte offset into the backing buffer.
    pub offset: u64,
    /// Size of the allocation in bytes.
    pub size: u64,
}

impl TransientAllocation {
    /// Get the end offset (offset + size).
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// A frame-scoped linear allocator over one mapped GPU buffer.
pub struct TransientPool {
    buffer: Buffer,
    capacity: u64,
    write_offset: u64,
    alignment: u64,
}

impl TransientPool {
    /// Alignment for allocations, matching the common minimum uniform buffer
    /// offset alignment.
    pub const ALIGNMENT: u64 = 256;

    /// Create a pool over a CPU-mapped buffer.
    pub fn new(buffer: Buffer) -> Self {
        let capacity = buffer.size();
        Self {
            buffer,
            capacity,
            write_offset: 0,
            alignment: Self::ALIGNMENT,
        }
    }

    /// Get the backing buffer.
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Get the total capacity in bytes.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Get the amount of space used since the last reset.
    pub fn used(&self) -> u64 {
        self.write_offset
    }

    /// Allocate a range without writing data.
    ///
    /// Returns `None` when the pool is exhausted for this frame.
    pub fn allocate(&mut self, size: u64) -> Option<TransientAllocation> {
        let offset = align_up(self.write_offset, self.alignment);
        if offset + size > self.capacity {
            return None;
        }
        self.write_offset = offset + size;
        Some(TransientAllocation { offset, size })
    }

    /// Allocate a range and write one Pod value into it.
    ///
    /// This is the path per-frame uniforms take: allocate, write, bind.
    pub fn allocate_uniform<T: Pod>(&mut self, value: &T) -> Result<TransientAllocation, RendererError> {
        let bytes = bytemuck::bytes_of(value);
        let allocation = self.allocate(bytes.len() as u64).ok_or_else(|| {
            RendererError::ResourceCreationFailed(format!(
                "transient pool exhausted ({} of {} bytes used)",
                self.write_offset, self.capacity
            ))
        })?;
        self.buffer.write(allocation.offset, bytes)?;
        Ok(allocation)
    }

    /// Reset the pool to the beginning.
    ///
    /// Called at frame acquire, after the frame fence has signaled.
    pub fn reset(&mut self) {
        self.write_offset = 0;
    }
}

impl std::fmt::Debug for TransientPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransientPool")
            .field("capacity", &self.capacity)
            .field("write_offset", &self.write_offset)
            .field("buffer", &self.buffer.label())
            .finish()
    }
}

/// Align a value up to the given alignment.
#[inline]
fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferDescriptor, BufferUsage};
    use ash::vk;
    use ash::vk::Handle;

    fn test_pool(capacity: u64) -> TransientPool {
        TransientPool::new(Buffer::from_external(
            vk::Buffer::from_raw(1),
            BufferDescriptor::new(capacity, BufferUsage::UNIFORM),
        ))
    }

    #[test]
    fn test_allocations_are_aligned() {
        let mut pool = test_pool(4096);

        let a = pool.allocate(100).unwrap();
        assert_eq!(a.offset, 0);

        let b = pool.allocate(64).unwrap();
        assert_eq!(b.offset, 256);
        assert_eq!(b.end(), 320);
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let mut pool = test_pool(512);
        assert!(pool.allocate(512).is_some());
        assert!(pool.allocate(1).is_none());
    }

    #[test]
    fn test_reset_reclaims_space() {
        let mut pool = test_pool(512);
        pool.allocate(512).unwrap();
        assert_eq!(pool.used(), 512);

        pool.reset();
        assert_eq!(pool.used(), 0);
        assert_eq!(pool.allocate(512).unwrap().offset, 0);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
    }
}
