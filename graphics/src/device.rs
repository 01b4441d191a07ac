//! Device wrapper over externally created Vulkan handles.
//!
//! Instance, physical device, logical device, and queue all come from the
//! host; this wrapper owns only the memory allocator it creates on top of
//! them and never destroys the handles it was given.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::{
    AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::MemoryLocation;
use parking_lot::Mutex;

use crate::error::RendererError;
use crate::resources::{Buffer, Image, Sampler};
use crate::types::{BufferDescriptor, SamplerDescriptor, TextureDescriptor, TextureFormat};

/// Depth format candidates, in order of preference.
const DEPTH_FORMAT_CANDIDATES: [TextureFormat; 3] = [
    TextureFormat::Depth32Float,
    TextureFormat::Depth24PlusStencil8,
    TextureFormat::Depth16Unorm,
];

/// Renderer-side view of the host's Vulkan device.
pub struct RenderDevice {
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    queue: vk::Queue,
    queue_family_index: u32,
    push_descriptor: ash::khr::push_descriptor::Device,
    allocator: Arc<Mutex<Allocator>>,
}

impl RenderDevice {
    /// Wrap externally created Vulkan handles.
    ///
    /// The device must have been created with the push-descriptor extension
    /// enabled; resource bindings are recorded directly into command
    /// buffers.
    pub fn new(
        instance: ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        queue_family_index: u32,
        queue: vk::Queue,
    ) -> Result<Arc<Self>, RendererError> {
        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| {
            RendererError::InitializationFailed(format!("failed to create allocator: {e}"))
        })?;
        let allocator = Arc::new(Mutex::new(allocator));

        let push_descriptor = ash::khr::push_descriptor::Device::new(&instance, &device);

        log::info!(
            "Render device ready (queue family {queue_family_index})"
        );

        Ok(Arc::new(Self {
            instance,
            physical_device,
            device,
            queue,
            queue_family_index,
            push_descriptor,
            allocator,
        }))
    }

    /// Get the logical device handle.
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    /// Get the graphics queue.
    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    /// Get the graphics queue family index.
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    pub(crate) fn push_descriptor(&self) -> &ash::khr::push_descriptor::Device {
        &self.push_descriptor
    }

    /// Find a depth format the device supports for optimal-tiling depth
    /// attachments.
    ///
    /// Never hard-codes a format: walks the candidate list and returns the
    /// first one the physical device accepts.
    pub fn suitable_depth_format(&self) -> Result<TextureFormat, RendererError> {
        for format in DEPTH_FORMAT_CANDIDATES {
            let props = unsafe {
                self.instance
                    .get_physical_device_format_properties(self.physical_device, format.to_vk())
            };
            if props
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
            {
                return Ok(format);
            }
        }
        Err(RendererError::FeatureNotSupported(
            "no depth format supports optimal-tiling depth attachments".to_string(),
        ))
    }

    /// Create a device-local image with its default view.
    pub fn create_image(&self, descriptor: &TextureDescriptor) -> Result<Image, RendererError> {
        let create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(descriptor.format.to_vk())
            .extent(descriptor.size.to_vk())
            .mip_levels(descriptor.mip_level_count)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(descriptor.usage.to_vk(descriptor.format))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { self.device.create_image(&create_info, None) }
            .map_err(|e| RendererError::from_vk(e, "create_image"))?;

        let requirements = unsafe { self.device.get_image_memory_requirements(image) };
        let allocation = self
            .allocator
            .lock()
            .allocate(&AllocationCreateDesc {
                name: descriptor.label.as_deref().unwrap_or("image"),
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                unsafe { self.device.destroy_image(image, None) };
                RendererError::ResourceCreationFailed(format!("image allocation failed: {e}"))
            })?;

        if let Err(e) = unsafe {
            self.device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
        } {
            unsafe { self.device.destroy_image(image, None) };
            let _ = self.allocator.lock().free(allocation);
            return Err(RendererError::from_vk(e, "bind_image_memory"));
        }

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(descriptor.format.to_vk())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: descriptor.format.aspect_mask(),
                base_mip_level: 0,
                level_count: descriptor.mip_level_count,
                base_array_layer: 0,
                layer_count: 1,
            });

        let view = match unsafe { self.device.create_image_view(&view_info, None) } {
            Ok(view) => view,
            Err(e) => {
                unsafe { self.device.destroy_image(image, None) };
                let _ = self.allocator.lock().free(allocation);
                return Err(RendererError::from_vk(e, "create_image_view"));
            }
        };

        Ok(Image::new(
            self.device.clone(),
            Arc::clone(&self.allocator),
            image,
            view,
            allocation,
            descriptor.clone(),
        ))
    }

    /// Create a buffer.
    ///
    /// Buffers requested `mapped_at_creation` are placed in CPU-to-GPU
    /// memory and stay persistently mapped; everything else is device-local.
    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<Buffer, RendererError> {
        let create_info = vk::BufferCreateInfo::default()
            .size(descriptor.size)
            .usage(descriptor.usage.to_vk())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { self.device.create_buffer(&create_info, None) }
            .map_err(|e| RendererError::from_vk(e, "create_buffer"))?;

        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };
        let location = if descriptor.mapped_at_creation {
            MemoryLocation::CpuToGpu
        } else {
            MemoryLocation::GpuOnly
        };

        let allocation = self
            .allocator
            .lock()
            .allocate(&AllocationCreateDesc {
                name: descriptor.label.as_deref().unwrap_or("buffer"),
                requirements,
                location,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                unsafe { self.device.destroy_buffer(buffer, None) };
                RendererError::ResourceCreationFailed(format!("buffer allocation failed: {e}"))
            })?;

        if let Err(e) = unsafe {
            self.device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        } {
            unsafe { self.device.destroy_buffer(buffer, None) };
            let _ = self.allocator.lock().free(allocation);
            return Err(RendererError::from_vk(e, "bind_buffer_memory"));
        }

        Ok(Buffer::new(
            self.device.clone(),
            Arc::clone(&self.allocator),
            buffer,
            allocation,
            descriptor.clone(),
        ))
    }

    /// Create a sampler.
    pub fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<Sampler, RendererError> {
        let create_info = descriptor.to_vk();
        let sampler = unsafe { self.device.create_sampler(&create_info, None) }
            .map_err(|e| RendererError::from_vk(e, "create_sampler"))?;
        Ok(Sampler::new(self.device.clone(), sampler, descriptor.clone()))
    }
}

impl std::fmt::Debug for RenderDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderDevice")
            .field("queue_family_index", &self.queue_family_index)
            .finish()
    }
}
