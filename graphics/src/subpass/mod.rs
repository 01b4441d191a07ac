//! Subpass capability interface and shared per-draw data.
//!
//! A subpass declares which attachments it writes and reads, obtains its
//! pipeline during prepare, and records draws into a command stream. The
//! three concrete variants are selected at pipeline-construction time;
//! there is no shared base behavior beyond this trait.

mod geometry;
mod lighting;
mod shadow;

pub use geometry::GeometrySubpass;
pub use lighting::{
    LightingSubpass, GLOBAL_BINDING, LIGHTS_BINDING, SHADOW_PROJECTION_BINDING,
    SHADOW_SAMPLER_BINDING,
};
pub use shadow::ShadowSubpass;

use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

use crate::command::CommandStream;
use crate::device::RenderDevice;
use crate::error::RendererError;
use crate::resources::TransientPool;
use crate::scene::Scene;
use crate::shader::PipelineCompiler;
use crate::target::RenderTarget;

/// Context for one-time subpass preparation.
pub struct PrepareContext<'a> {
    /// The render device.
    pub device: &'a Arc<RenderDevice>,
    /// The host's pipeline compiler.
    pub compiler: &'a dyn PipelineCompiler,
    /// The render pass this subpass belongs to.
    pub render_pass: vk::RenderPass,
    /// The subpass index within the render pass.
    pub subpass_index: u32,
}

/// Context for recording one subpass's draws.
pub struct DrawContext<'a> {
    /// The scene being rendered.
    pub scene: &'a Scene,
    /// The current frame's transient buffer pool.
    pub transients: &'a mut TransientPool,
    /// The current frame-in-flight index.
    pub frame_index: usize,
    /// Shadow targets, one per frame-in-flight slot.
    pub shadow_targets: &'a [RenderTarget],
    /// The target the enclosing render pass renders into.
    pub target: &'a RenderTarget,
}

/// A single subpass of a render pipeline.
pub trait Subpass {
    /// Name for logging and debugging.
    fn name(&self) -> &str;

    /// Attachment indices this subpass writes, in shader output order.
    /// Depth attachments are recognized by format.
    fn output_attachments(&self) -> &[usize];

    /// Attachment indices this subpass reads as same-pixel inputs.
    fn input_attachments(&self) -> &[usize] {
        &[]
    }

    /// Recording-thread tag for secondary-stream recording.
    fn thread_index(&self) -> u32;

    /// Tag this subpass for a recording thread.
    fn set_thread_index(&mut self, index: u32);

    /// One-time setup: samplers, pipeline compilation.
    fn prepare(&mut self, ctx: &mut PrepareContext) -> Result<(), RendererError>;

    /// Record this subpass's draws.
    fn draw(
        &mut self,
        stream: &mut CommandStream,
        ctx: &mut DrawContext,
    ) -> Result<(), RendererError>;
}

/// Per-pass camera matrix bound at (set 0, binding 0) by the scene
/// subpasses.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    /// Clip-corrected projection times view.
    pub view_proj: Mat4,
}

/// Per-draw push constant block shared by the depth and geometry subpasses.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ObjectPush {
    pub model: Mat4,
    pub base_color: Vec4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_push_fits_push_constant_budget() {
        // Vulkan guarantees at least 128 bytes of push constants.
        assert!(std::mem::size_of::<ObjectPush>() <= 128);
    }

    #[test]
    fn test_camera_uniform_is_one_matrix() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 64);
    }
}
