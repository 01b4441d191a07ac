//! Deferred lighting subpass.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use umbra_core::math::{shadow_space_matrix, vulkan_projection};
use umbra_core::sampler::CompareFunction;

use super::{DrawContext, PrepareContext, Subpass};
use crate::command::CommandStream;
use crate::error::RendererError;
use crate::resources::Sampler;
use crate::scene::CameraId;
use crate::shader::{CompiledPipeline, PipelineState, ShaderSource};
use crate::target::{
    ALBEDO_ATTACHMENT, DEPTH_ATTACHMENT, NORMAL_ATTACHMENT, SHADOW_MAP_ATTACHMENT,
    SWAPCHAIN_ATTACHMENT,
};
use crate::types::SamplerDescriptor;

/// Binding slot of the global camera uniform.
pub const GLOBAL_BINDING: u32 = 0;
/// Binding slot of the per-frame light table.
pub const LIGHTS_BINDING: u32 = 4;
/// Binding slot of the shadow map sampler.
pub const SHADOW_SAMPLER_BINDING: u32 = 5;
/// Binding slot of the shadow projection uniform.
pub const SHADOW_PROJECTION_BINDING: u32 = 6;

/// Camera data the lighting shader uses to reconstruct world positions.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GlobalUniform {
    pub inv_view_proj: Mat4,
    pub camera_position: Vec4,
}

/// Shadow-space projection matrix, recomputed from the shadow camera every
/// frame and never persisted.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ShadowUniform {
    pub projection: Mat4,
}

/// Full-pass lighting computation: reads the G-buffer as same-pixel inputs
/// plus the active frame's shadow map through a depth-compare sampler, and
/// writes final lit color into the swapchain attachment.
pub struct LightingSubpass {
    vertex_shader: ShaderSource,
    fragment_shader: ShaderSource,
    camera: CameraId,
    shadow_camera: CameraId,
    inputs: [usize; 3],
    outputs: [usize; 1],
    thread_index: u32,
    shadow_sampler: Option<Sampler>,
    pipeline: Option<CompiledPipeline>,
}

impl LightingSubpass {
    /// Create the lighting subpass.
    ///
    /// `camera` reconstructs world positions; `shadow_camera` supplies the
    /// shadow-space projection.
    pub fn new(
        vertex_shader: ShaderSource,
        fragment_shader: ShaderSource,
        camera: CameraId,
        shadow_camera: CameraId,
    ) -> Self {
        Self {
            vertex_shader,
            fragment_shader,
            camera,
            shadow_camera,
            inputs: [DEPTH_ATTACHMENT, ALBEDO_ATTACHMENT, NORMAL_ATTACHMENT],
            outputs: [SWAPCHAIN_ATTACHMENT],
            thread_index: 0,
            shadow_sampler: None,
            pipeline: None,
        }
    }
}

impl Subpass for LightingSubpass {
    fn name(&self) -> &str {
        "lighting"
    }

    fn output_attachments(&self) -> &[usize] {
        &self.outputs
    }

    fn input_attachments(&self) -> &[usize] {
        &self.inputs
    }

    fn thread_index(&self) -> u32 {
        self.thread_index
    }

    fn set_thread_index(&mut self, index: u32) {
        self.thread_index = index;
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) -> Result<(), RendererError> {
        self.shadow_sampler = Some(ctx.device.create_sampler(&SamplerDescriptor::shadow_map())?);

        let state = PipelineState {
            subpass_index: ctx.subpass_index,
            color_attachment_count: 1,
            depth_write: false,
            depth_compare: CompareFunction::Always,
            vertex_input: false,
        };
        self.pipeline = Some(ctx.compiler.compile(
            ctx.device,
            &self.vertex_shader,
            &self.fragment_shader,
            ctx.render_pass,
            &state,
        )?);
        Ok(())
    }

    fn draw(
        &mut self,
        stream: &mut CommandStream,
        ctx: &mut DrawContext,
    ) -> Result<(), RendererError> {
        let pipeline = self
            .pipeline
            .as_ref()
            .expect("lighting subpass drawn before prepare()");
        let sampler = self
            .shadow_sampler
            .as_ref()
            .expect("lighting subpass drawn before prepare()");
        stream.bind_pipeline(pipeline);

        // The shadow map written by this frame slot's shadow pass.
        let shadow_target = &ctx.shadow_targets[ctx.frame_index];
        assert!(
            !shadow_target.attachments().is_empty(),
            "shadow target has no attachments"
        );
        stream.bind_image(
            shadow_target.attachment(SHADOW_MAP_ATTACHMENT).view(),
            sampler,
            SHADOW_SAMPLER_BINDING,
        );

        // Shadow-space projection, recomputed from the shadow camera's
        // current state so runtime bound changes apply next frame.
        let shadow_camera = ctx.scene.camera(self.shadow_camera);
        let shadow_uniform = ShadowUniform {
            projection: shadow_space_matrix(
                shadow_camera.projection_matrix(),
                shadow_camera.view_matrix(),
            ),
        };
        let allocation = ctx.transients.allocate_uniform(&shadow_uniform)?;
        stream.bind_uniform(
            ctx.transients.buffer().raw(),
            allocation.offset,
            allocation.size,
            SHADOW_PROJECTION_BINDING,
        );

        let camera = ctx.scene.camera(self.camera);
        let view_proj = vulkan_projection(camera.projection_matrix()) * camera.view_matrix();
        let global = GlobalUniform {
            inv_view_proj: view_proj.inverse(),
            camera_position: camera.transform.translation.extend(1.0),
        };
        let allocation = ctx.transients.allocate_uniform(&global)?;
        stream.bind_uniform(
            ctx.transients.buffer().raw(),
            allocation.offset,
            allocation.size,
            GLOBAL_BINDING,
        );

        let lights = ctx.scene.lights_uniform();
        let allocation = ctx.transients.allocate_uniform(&lights)?;
        stream.bind_uniform(
            ctx.transients.buffer().raw(),
            allocation.offset,
            allocation.size,
            LIGHTS_BINDING,
        );

        // G-buffer inputs are bound at the slot matching their attachment
        // index.
        for &index in &self.inputs {
            stream.bind_input_attachment(ctx.target.attachment(index).view(), index as u32);
        }

        // Screen-filling triangle.
        stream.draw(3);
        Ok(())
    }
}
