//! Render pipelines: ordered subpasses over one render pass.
//!
//! A pipeline owns its subpasses and the Vulkan render pass expressing their
//! attachment topology. G-buffer attachments written by one subpass and read
//! by the next stay within the render pass as same-pixel input attachments,
//! so the driver can merge the subpasses and keep the data in tile memory.

use std::collections::HashMap;
use std::sync::Arc;

use ash::vk;

use crate::command::CommandStream;
use crate::device::RenderDevice;
use crate::error::RendererError;
use crate::layout::ImageId;
use crate::resources::TransientPool;
use crate::scene::Scene;
use crate::shader::PipelineCompiler;
use crate::subpass::{DrawContext, PrepareContext, Subpass};
use crate::target::RenderTarget;
use crate::types::{ClearValue, TextureUsage};

/// An ordered sequence of subpasses rendering into one target layout.
///
/// Immutable once prepared, except for per-frame parameter updates flowing
/// through the scene registry.
pub struct RenderPipeline {
    subpasses: Vec<Box<dyn Subpass>>,
    render_pass: Option<vk::RenderPass>,
    framebuffers: HashMap<ImageId, vk::Framebuffer>,
    device: Option<ash::Device>,
}

impl RenderPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self {
            subpasses: Vec::new(),
            render_pass: None,
            framebuffers: HashMap::new(),
            device: None,
        }
    }

    /// Append a subpass. Order of addition is execution order.
    pub fn add_subpass(&mut self, subpass: Box<dyn Subpass>) {
        self.subpasses.push(subpass);
    }

    /// Get the subpasses in execution order.
    pub fn subpasses(&self) -> &[Box<dyn Subpass>] {
        &self.subpasses
    }

    /// Get a subpass mutably, e.g. to tag its recording thread.
    pub fn subpass_mut(&mut self, index: usize) -> &mut dyn Subpass {
        self.subpasses[index].as_mut()
    }

    /// Get the render pass, once prepared.
    pub fn render_pass(&self) -> Option<vk::RenderPass> {
        self.render_pass
    }

    /// Build the render pass for the target's attachment layout and prepare
    /// every subpass.
    pub fn prepare(
        &mut self,
        device: &Arc<RenderDevice>,
        compiler: &dyn PipelineCompiler,
        target: &RenderTarget,
    ) -> Result<(), RendererError> {
        assert!(!self.subpasses.is_empty(), "pipeline has no subpasses");

        let render_pass = build_render_pass(device.handle(), target, &self.subpasses)?;
        self.render_pass = Some(render_pass);
        self.device = Some(device.handle().clone());

        for (index, subpass) in self.subpasses.iter_mut().enumerate() {
            let mut ctx = PrepareContext {
                device,
                compiler,
                render_pass,
                subpass_index: index as u32,
            };
            subpass.prepare(&mut ctx)?;
            log::debug!("prepared subpass '{}' at index {index}", subpass.name());
        }
        Ok(())
    }

    /// Record all subpasses into the stream, rendering into `target`.
    ///
    /// Begins the render pass but leaves it open; the caller ends it after
    /// recording any overlay draws.
    pub fn draw(
        &mut self,
        stream: &mut CommandStream,
        target: &RenderTarget,
        scene: &Scene,
        transients: &mut TransientPool,
        frame_index: usize,
        shadow_targets: &[RenderTarget],
    ) -> Result<(), RendererError> {
        let render_pass = self
            .render_pass
            .expect("pipeline drawn before prepare()");

        let framebuffer = self.framebuffer_for(target)?;
        let clear_values: Vec<vk::ClearValue> = clear_values_for(target)
            .into_iter()
            .map(ClearValue::to_vk)
            .collect();

        stream.begin_render_pass(render_pass, framebuffer, target.extent(), &clear_values);

        for (index, subpass) in self.subpasses.iter_mut().enumerate() {
            if index > 0 {
                stream.next_subpass();
            }
            let mut ctx = DrawContext {
                scene,
                transients: &mut *transients,
                frame_index,
                shadow_targets,
                target,
            };
            subpass.draw(stream, &mut ctx)?;
        }
        Ok(())
    }

    fn framebuffer_for(&mut self, target: &RenderTarget) -> Result<vk::Framebuffer, RendererError> {
        let key = target.attachment(0).id();
        if let Some(&framebuffer) = self.framebuffers.get(&key) {
            return Ok(framebuffer);
        }

        let device = self.device.as_ref().expect("pipeline drawn before prepare()");
        let render_pass = self.render_pass.expect("pipeline drawn before prepare()");

        let views: Vec<vk::ImageView> = target
            .attachments()
            .iter()
            .map(|image| image.view())
            .collect();
        let extent = target.extent();
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&views)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe { device.create_framebuffer(&create_info, None) }
            .map_err(|e| RendererError::from_vk(e, "create_framebuffer"))?;
        self.framebuffers.insert(key, framebuffer);
        Ok(framebuffer)
    }
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RenderPipeline {
    fn drop(&mut self) {
        let Some(device) = self.device.take() else {
            return;
        };
        unsafe {
            for (_, framebuffer) in self.framebuffers.drain() {
                device.destroy_framebuffer(framebuffer, None);
            }
            if let Some(render_pass) = self.render_pass.take() {
                device.destroy_render_pass(render_pass, None);
            }
        }
    }
}

impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("subpass_count", &self.subpasses.len())
            .field("prepared", &self.render_pass.is_some())
            .finish()
    }
}

/// Clear values for a target: depth clears to 0 (reverse-z), color clears to
/// opaque black. The swapchain attachment is stored; transient G-buffer
/// attachments are discarded after the pass.
pub fn clear_values_for(target: &RenderTarget) -> Vec<ClearValue> {
    target
        .attachments()
        .iter()
        .map(|image| {
            if image.format().is_depth_stencil() {
                ClearValue::depth(0.0)
            } else {
                ClearValue::color(0.0, 0.0, 0.0, 1.0)
            }
        })
        .collect()
}

struct SubpassRefs {
    colors: Vec<vk::AttachmentReference>,
    inputs: Vec<vk::AttachmentReference>,
    depth: Option<vk::AttachmentReference>,
}

/// Build a render pass matching the target's attachments and the subpasses'
/// declared inputs and outputs.
///
/// Initial layouts match what the barrier scheduler establishes before the
/// pass; final layouts stay at the working layout unless a later subpass
/// reads the attachment as an input, in which case the render pass itself
/// moves it to shader-read-only.
fn build_render_pass(
    device: &ash::Device,
    target: &RenderTarget,
    subpasses: &[Box<dyn Subpass>],
) -> Result<vk::RenderPass, RendererError> {
    let count = target.attachment_count();

    let mut read_as_input = vec![false; count];
    for subpass in subpasses {
        for &index in subpass.input_attachments() {
            assert!(index < count, "input attachment index out of range");
            read_as_input[index] = true;
        }
        for &index in subpass.output_attachments() {
            assert!(index < count, "output attachment index out of range");
        }
    }

    let attachments: Vec<vk::AttachmentDescription> = target
        .attachments()
        .iter()
        .enumerate()
        .map(|(index, image)| {
            let is_depth = image.format().is_depth_stencil();
            let working_layout = if is_depth {
                vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
            } else {
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
            };
            let final_layout = if read_as_input[index] {
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
            } else {
                working_layout
            };
            let store_op = if image.usage().contains(TextureUsage::TRANSIENT) {
                vk::AttachmentStoreOp::DONT_CARE
            } else {
                vk::AttachmentStoreOp::STORE
            };

            vk::AttachmentDescription::default()
                .format(image.format().to_vk())
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(store_op)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(working_layout)
                .final_layout(final_layout)
        })
        .collect();

    let refs: Vec<SubpassRefs> = subpasses
        .iter()
        .map(|subpass| {
            let mut colors = Vec::new();
            let mut depth = None;
            for &index in subpass.output_attachments() {
                if target.attachment(index).format().is_depth_stencil() {
                    assert!(depth.is_none(), "subpass writes more than one depth attachment");
                    depth = Some(vk::AttachmentReference {
                        attachment: index as u32,
                        layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
                    });
                } else {
                    colors.push(vk::AttachmentReference {
                        attachment: index as u32,
                        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                    });
                }
            }
            let inputs = subpass
                .input_attachments()
                .iter()
                .map(|&index| vk::AttachmentReference {
                    attachment: index as u32,
                    layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                })
                .collect();
            SubpassRefs {
                colors,
                inputs,
                depth,
            }
        })
        .collect();

    let descriptions: Vec<vk::SubpassDescription> = refs
        .iter()
        .map(|r| {
            let mut description = vk::SubpassDescription::default()
                .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
                .color_attachments(&r.colors)
                .input_attachments(&r.inputs);
            if let Some(depth) = &r.depth {
                description = description.depth_stencil_attachment(depth);
            }
            description
        })
        .collect();

    // Each subpass reads the previous one's attachment writes as same-pixel
    // inputs, so the dependency can stay per-region.
    let dependencies: Vec<vk::SubpassDependency> = (1..subpasses.len())
        .map(|index| {
            vk::SubpassDependency::default()
                .src_subpass(index as u32 - 1)
                .dst_subpass(index as u32)
                .src_stage_mask(
                    vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                        | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
                )
                .src_access_mask(
                    vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                        | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                )
                .dst_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
                .dst_access_mask(vk::AccessFlags::INPUT_ATTACHMENT_READ)
                .dependency_flags(vk::DependencyFlags::BY_REGION)
        })
        .collect();

    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&descriptions)
        .dependencies(&dependencies);

    unsafe { device.create_render_pass(&create_info, None) }
        .map_err(|e| RendererError::from_vk(e, "create_render_pass"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Image;
    use crate::types::{TextureDescriptor, TextureFormat};
    use ash::vk::Handle;

    fn synthetic_target() -> RenderTarget {
        let make = |id: u64, format: TextureFormat, usage: TextureUsage| {
            Image::from_external(
                vk::Image::from_raw(id),
                vk::ImageView::from_raw(id),
                TextureDescriptor::new_2d(64, 64, format, usage),
            )
        };
        RenderTarget::new(vec![
            make(1, TextureFormat::Bgra8Unorm, TextureUsage::RENDER_ATTACHMENT),
            make(
                2,
                TextureFormat::Depth32Float,
                TextureUsage::RENDER_ATTACHMENT | TextureUsage::TRANSIENT,
            ),
            make(
                3,
                TextureFormat::Rgba8Unorm,
                TextureUsage::RENDER_ATTACHMENT | TextureUsage::TRANSIENT,
            ),
            make(
                4,
                TextureFormat::Rgb10a2Unorm,
                TextureUsage::RENDER_ATTACHMENT | TextureUsage::TRANSIENT,
            ),
        ])
    }

    #[test]
    fn test_clear_values_reverse_z() {
        let values = clear_values_for(&synthetic_target());
        assert_eq!(values.len(), 4);
        assert_eq!(values[0], ClearValue::color(0.0, 0.0, 0.0, 1.0));
        assert_eq!(values[1], ClearValue::depth(0.0));
    }

    #[test]
    fn test_pipeline_subpass_order() {
        use crate::scene::{Camera, Projection, Scene};
        use crate::shader::ShaderSource;
        use crate::subpass::{GeometrySubpass, LightingSubpass};

        let mut scene = Scene::new();
        let camera = scene.add_camera(Camera::new(Projection::perspective(60.0, 1.0, 0.1, 100.0)));
        let shadow_camera =
            scene.add_camera(Camera::new(Projection::perspective(60.0, 1.0, 0.1, 100.0)));

        let mut pipeline = RenderPipeline::new();
        pipeline.add_subpass(Box::new(GeometrySubpass::new(
            ShaderSource::new("deferred/geometry.vert"),
            ShaderSource::new("deferred/geometry.frag"),
            camera,
        )));
        pipeline.add_subpass(Box::new(LightingSubpass::new(
            ShaderSource::new("deferred/lighting.vert"),
            ShaderSource::new("deferred/lighting.frag"),
            camera,
            shadow_camera,
        )));

        assert_eq!(pipeline.subpasses().len(), 2);
        assert_eq!(pipeline.subpasses()[0].name(), "geometry");
        assert_eq!(pipeline.subpasses()[1].name(), "lighting");
        assert!(pipeline.render_pass().is_none());

        pipeline.subpass_mut(0).set_thread_index(1);
        assert_eq!(pipeline.subpasses()[0].thread_index(), 1);
    }
}
