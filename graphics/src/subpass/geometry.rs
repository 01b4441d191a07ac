//! G-buffer geometry subpass.

use umbra_core::math::vulkan_projection;
use umbra_core::sampler::CompareFunction;

use super::{CameraUniform, DrawContext, ObjectPush, PrepareContext, Subpass};
use crate::command::CommandStream;
use crate::error::RendererError;
use crate::scene::CameraId;
use crate::shader::{CompiledPipeline, PipelineState, ShaderSource};
use crate::target::{ALBEDO_ATTACHMENT, DEPTH_ATTACHMENT, NORMAL_ATTACHMENT};

/// Renders all opaque scene geometry from the main camera into the depth,
/// albedo, and normal attachments of the main target. Never writes the
/// swapchain attachment.
pub struct GeometrySubpass {
    vertex_shader: ShaderSource,
    fragment_shader: ShaderSource,
    camera: CameraId,
    outputs: [usize; 3],
    thread_index: u32,
    pipeline: Option<CompiledPipeline>,
}

impl GeometrySubpass {
    /// Create the geometry subpass rendering from the given camera.
    pub fn new(
        vertex_shader: ShaderSource,
        fragment_shader: ShaderSource,
        camera: CameraId,
    ) -> Self {
        Self {
            vertex_shader,
            fragment_shader,
            camera,
            outputs: [DEPTH_ATTACHMENT, ALBEDO_ATTACHMENT, NORMAL_ATTACHMENT],
            thread_index: 0,
            pipeline: None,
        }
    }
}

impl Subpass for GeometrySubpass {
    fn name(&self) -> &str {
        "geometry"
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
            color_attachment_count: 2,
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
            .expect("geometry subpass drawn before prepare()");
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_outputs_skip_swapchain() {
        let subpass = GeometrySubpass::new(
            ShaderSource::new("deferred/geometry.vert"),
            ShaderSource::new("deferred/geometry.frag"),
            crate::scene::Scene::new().add_camera(crate::scene::Camera::new(
                crate::scene::Projection::perspective(60.0, 1.0, 0.1, 100.0),
            )),
        );
        assert_eq!(subpass.output_attachments(), &[1, 2, 3]);
        assert!(!subpass
            .output_attachments()
            .contains(&crate::target::SWAPCHAIN_ATTACHMENT));
        assert!(subpass.input_attachments().is_empty());
    }
}
