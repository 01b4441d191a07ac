//! Command stream recording.
//!
//! [`CommandStream`] wraps the per-frame command buffer the host hands out
//! and exposes the recording operations the passes need. Resource bindings
//! are recorded with push descriptors, so no descriptor sets are allocated
//! per frame.

use ash::vk;

use crate::barrier::BarrierBatch;
use crate::device::RenderDevice;
use crate::error::RendererError;
use crate::resources::Sampler;
use crate::shader::CompiledPipeline;
use crate::types::Extent2d;

/// Recording level of a command stream.
///
/// Secondary streams carry a thread index so multiple CPU threads could
/// record them in parallel; the capability is reserved by the recording
/// strategy and not exercised by the direct path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamLevel {
    /// A primary command buffer, submitted directly.
    #[default]
    Primary,
    /// A secondary command buffer tagged for a recording thread.
    Secondary {
        /// Index of the CPU thread this stream belongs to.
        thread_index: u32,
    },
}

impl StreamLevel {
    /// Check if this is the primary level.
    pub fn is_primary(self) -> bool {
        matches!(self, Self::Primary)
    }
}

/// A command stream recording into one Vulkan command buffer.
pub struct CommandStream {
    device: ash::Device,
    push_descriptor: ash::khr::push_descriptor::Device,
    cmd: vk::CommandBuffer,
    level: StreamLevel,
    bound_layout: Option<vk::PipelineLayout>,
}

impl CommandStream {
    /// Wrap a command buffer for recording.
    pub fn new(device: &RenderDevice, cmd: vk::CommandBuffer, level: StreamLevel) -> Self {
        Self {
            device: device.handle().clone(),
            push_descriptor: device.push_descriptor().clone(),
            cmd,
            level,
            bound_layout: None,
        }
    }

    /// Get the underlying command buffer handle.
    pub fn handle(&self) -> vk::CommandBuffer {
        self.cmd
    }

    /// Get the recording level.
    pub fn level(&self) -> StreamLevel {
        self.level
    }

    /// Begin one-time-submit recording.
    ///
    /// Only primary streams begin themselves; secondary streams are begun by
    /// whatever assembles them, which also owns barrier emission.
    pub fn begin_one_time(&self) -> Result<(), RendererError> {
        assert!(self.level.is_primary(), "secondary streams are begun by their assembler");
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { self.device.begin_command_buffer(self.cmd, &begin_info) }
            .map_err(|e| RendererError::from_vk(e, "begin_command_buffer"))
    }

    /// Finish recording.
    pub fn end(&self) -> Result<(), RendererError> {
        unsafe { self.device.end_command_buffer(self.cmd) }
            .map_err(|e| RendererError::from_vk(e, "end_command_buffer"))
    }

    /// Set viewport and scissor to cover the given extent.
    pub fn set_viewport_scissor(&self, extent: Extent2d) {
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: extent.to_vk(),
        };
        unsafe {
            self.device.cmd_set_viewport(self.cmd, 0, &[viewport]);
            self.device.cmd_set_scissor(self.cmd, 0, &[scissor]);
        }
    }

    /// Submit a barrier batch into this stream.
    pub fn pipeline_barrier(&self, batch: &BarrierBatch) {
        batch.submit(&self.device, self.cmd);
    }

    /// Begin a render pass over the given framebuffer.
    pub fn begin_render_pass(
        &self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: Extent2d,
        clear_values: &[vk::ClearValue],
    ) {
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: extent.to_vk(),
            })
            .clear_values(clear_values);
        unsafe {
            self.device
                .cmd_begin_render_pass(self.cmd, &begin_info, vk::SubpassContents::INLINE);
        }
    }

    /// Advance to the next subpass of the current render pass.
    pub fn next_subpass(&self) {
        unsafe {
            self.device
                .cmd_next_subpass(self.cmd, vk::SubpassContents::INLINE);
        }
    }

    /// End the current render pass.
    pub fn end_render_pass(&self) {
        unsafe { self.device.cmd_end_render_pass(self.cmd) };
    }

    /// Bind a graphics pipeline and remember its layout for descriptor
    /// pushes.
    pub fn bind_pipeline(&mut self, pipeline: &CompiledPipeline) {
        unsafe {
            self.device.cmd_bind_pipeline(
                self.cmd,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.pipeline,
            );
        }
        self.bound_layout = Some(pipeline.layout);
    }

    fn layout(&self) -> vk::PipelineLayout {
        self.bound_layout
            .expect("a pipeline must be bound before binding resources")
    }

    /// Bind a combined image sampler at (set 0, `binding`).
    pub fn bind_image(&self, view: vk::ImageView, sampler: &Sampler, binding: u32) {
        let image_info = [vk::DescriptorImageInfo {
            sampler: sampler.raw(),
            image_view: view,
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_binding(binding)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&image_info);
        unsafe {
            self.push_descriptor.cmd_push_descriptor_set(
                self.cmd,
                vk::PipelineBindPoint::GRAPHICS,
                self.layout(),
                0,
                &[write],
            );
        }
    }

    /// Bind a same-pixel input attachment at (set 0, `binding`).
    pub fn bind_input_attachment(&self, view: vk::ImageView, binding: u32) {
        let image_info = [vk::DescriptorImageInfo {
            sampler: vk::Sampler::null(),
            image_view: view,
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_binding(binding)
            .descriptor_type(vk::DescriptorType::INPUT_ATTACHMENT)
            .image_info(&image_info);
        unsafe {
            self.push_descriptor.cmd_push_descriptor_set(
                self.cmd,
                vk::PipelineBindPoint::GRAPHICS,
                self.layout(),
                0,
                &[write],
            );
        }
    }

    /// Bind a uniform buffer range at (set 0, `binding`).
    pub fn bind_uniform(&self, buffer: vk::Buffer, offset: u64, range: u64, binding: u32) {
        let buffer_info = [vk::DescriptorBufferInfo {
            buffer,
            offset,
            range,
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_binding(binding)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(&buffer_info);
        unsafe {
            self.push_descriptor.cmd_push_descriptor_set(
                self.cmd,
                vk::PipelineBindPoint::GRAPHICS,
                self.layout(),
                0,
                &[write],
            );
        }
    }

    /// Push constant bytes visible to the vertex stage.
    pub fn push_constants(&self, data: &[u8]) {
        unsafe {
            self.device.cmd_push_constants(
                self.cmd,
                self.layout(),
                vk::ShaderStageFlags::VERTEX,
                0,
                data,
            );
        }
    }

    /// Bind a vertex buffer at binding 0.
    pub fn bind_vertex_buffer(&self, buffer: vk::Buffer) {
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(self.cmd, 0, &[buffer], &[0]);
        }
    }

    /// Bind a 32-bit index buffer.
    pub fn bind_index_buffer(&self, buffer: vk::Buffer) {
        unsafe {
            self.device
                .cmd_bind_index_buffer(self.cmd, buffer, 0, vk::IndexType::UINT32);
        }
    }

    /// Draw indexed geometry.
    pub fn draw_indexed(&self, index_count: u32) {
        unsafe {
            self.device.cmd_draw_indexed(self.cmd, index_count, 1, 0, 0, 0);
        }
    }

    /// Draw unindexed vertices (e.g. a screen-filling triangle).
    pub fn draw(&self, vertex_count: u32) {
        unsafe {
            self.device.cmd_draw(self.cmd, vertex_count, 1, 0, 0);
        }
    }
}

impl std::fmt::Debug for CommandStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandStream")
            .field("level", &self.level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_level() {
        assert!(StreamLevel::Primary.is_primary());
        assert!(!StreamLevel::Secondary { thread_index: 1 }.is_primary());
    }
}
