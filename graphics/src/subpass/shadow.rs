//! Depth-only shadow subpass.

use umbra_core::math::vulkan_projection;
use umbra_core::sampler::CompareFunction;

use super::{CameraUniform, DrawContext, ObjectPush, PrepareContext, Subpass};
use crate::command::CommandStream;
use crate::error::RendererError;
use crate::scene::CameraId;
use crate::shader::{CompiledPipeline, PipelineState, ShaderSource};
use crate::target::SHADOW_MAP_ATTACHMENT;

/// Renders all opaque scene geometry from the shadow camera into the active
/// shadow target's depth attachment. No color output.
pub struct ShadowSubpass {
    vertex_shader: ShaderSource,
    fragment_shader: ShaderSource,
    camera: CameraId,
    outputs: [usize; 1],
    thread_index: u32,
    pipeline: Option<CompiledPipeline>,
}

impl ShadowSubpass {
    /// Create the shadow subpass rendering from the given camera.
    pub fn new(
        vertex_shader: ShaderSource,
        fragment_shader: ShaderSource,
        camera: CameraId,
    ) -> Self {
        Self {
            vertex_shader,
            fragment_shader,
            camera,
            outputs: [SHADOW_MAP_ATTACHMENT],
            thread_index: 0,
            pipeline: None,
        }
    }
}

impl Subpass for ShadowSubpass {
    fn name(&self) -> &str {
        "shadow"
    }

    fn output_attachments(&self) -> &[usize] {
        &self.outputs
    }

    fn thread_index(&self) -> u32 {
        self.thread_index
    }

    fn set_thread_index(&mut self, index: u32) {
        self.thread_index = index;
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) -> Result<(), RendererError> {
        let state = PipelineState {
            subpass_index: ctx.subpass_index,
            color_attachment_count: 0,
            depth_write: true,
            depth_compare: CompareFunction::Greater,
            vertex_input: true,
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
            .expect("shadow subpass drawn before prepare()");
        stream.bind_pipeline(pipeline);

        let camera = ctx.scene.camera(self.camera);
        let uniform = CameraUniform {
            view_proj: vulkan_projection(camera.projection_matrix()) * camera.view_matrix(),
        };
        let allocation = ctx.transients.allocate_uniform(&uniform)?;
        stream.bind_uniform(
            ctx.transients.buffer().raw(),
            allocation.offset,
            allocation.size,
            0,
        );

        for node in ctx.scene.mesh_nodes() {
            let push = ObjectPush {
                model: node.transform,
                base_color: node.base_color,
            };
            stream.push_constants(bytemuck::bytes_of(&push));
            stream.bind_vertex_buffer(node.vertex_buffer);
            stream.bind_index_buffer(node.index_buffer);
            stream.draw_indexed(node.index_count);
        }
        Ok(())
    }
}
