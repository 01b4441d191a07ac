//! Shader sources and the pipeline compilation seam.
//!
//! Shaders are referenced by logical path and resolved from the sources
//! embedded in `shaders/`. Compiling GLSL to pipelines (including
//! reflection) belongs to the host framework; the renderer only describes
//! what it needs through [`PipelineState`] and receives opaque handles back.

use ash::vk;
use umbra_core::sampler::CompareFunction;

use crate::device::RenderDevice;
use crate::error::RendererError;

/// A shader referenced by logical path, e.g. `deferred/lighting.frag`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderSource {
    path: String,
}

impl ShaderSource {
    /// Reference a shader by logical path.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Get the logical path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Resolve the GLSL source text for this shader.
    pub fn resolve(&self) -> Result<&'static str, RendererError> {
        shader_source(&self.path).ok_or_else(|| {
            RendererError::InvalidParameter(format!("unknown shader path: {}", self.path))
        })
    }
}

/// Look up an embedded shader source by logical path.
pub fn shader_source(path: &str) -> Option<&'static str> {
    match path {
        "shadows/shadowmap.vert" => Some(include_str!("../shaders/shadows/shadowmap.vert")),
        "shadows/shadowmap.frag" => Some(include_str!("../shaders/shadows/shadowmap.frag")),
        "deferred/geometry.vert" => Some(include_str!("../shaders/deferred/geometry.vert")),
        "deferred/geometry.frag" => Some(include_str!("../shaders/deferred/geometry.frag")),
        "deferred/lighting.vert" => Some(include_str!("../shaders/deferred/lighting.vert")),
        "deferred/lighting.frag" => Some(include_str!("../shaders/deferred/lighting.frag")),
        _ => None,
    }
}

/// Fixed-function state a subpass needs from its pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineState {
    /// Index of the subpass within the render pass.
    pub subpass_index: u32,
    /// Number of color attachments written by the subpass.
    pub color_attachment_count: u32,
    /// Whether depth writes are enabled.
    pub depth_write: bool,
    /// Depth comparison. The pipeline clears depth to 0 and renders
    /// reverse-z, so geometry passes use `Greater`.
    pub depth_compare: CompareFunction,
    /// Whether the subpass consumes vertex buffers (false for screen-filling
    /// passes driven by the vertex index).
    pub vertex_input: bool,
}

/// Opaque handles produced by the host's pipeline compiler.
#[derive(Debug, Clone, Copy)]
pub struct CompiledPipeline {
    /// The graphics pipeline.
    pub pipeline: vk::Pipeline,
    /// The pipeline layout used for descriptor pushes and push constants.
    pub layout: vk::PipelineLayout,
}

/// Host-provided shader and pipeline compiler.
///
/// Shader compilation and reflection live outside the renderer; this trait
/// is the seam through which subpasses obtain their pipelines during
/// prepare.
pub trait PipelineCompiler {
    /// Compile a vertex/fragment shader pair into a pipeline for the given
    /// render pass and state.
    fn compile(
        &self,
        device: &RenderDevice,
        vertex_shader: &ShaderSource,
        fragment_shader: &ShaderSource,
        render_pass: vk::RenderPass,
        state: &PipelineState,
    ) -> Result<CompiledPipeline, RendererError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("shadows/shadowmap.vert")]
    #[case("shadows/shadowmap.frag")]
    #[case("deferred/geometry.vert")]
    #[case("deferred/geometry.frag")]
    #[case("deferred/lighting.vert")]
    #[case("deferred/lighting.frag")]
    fn test_all_pipeline_shaders_resolve(#[case] path: &str) {
        let source = ShaderSource::new(path).resolve().unwrap();
        assert!(source.contains("void main"));
    }

    #[test]
    fn test_unknown_shader_path_fails() {
        let err = ShaderSource::new("deferred/missing.frag").resolve().unwrap_err();
        assert!(matches!(err, RendererError::InvalidParameter(_)));
    }

    #[test]
    fn test_lighting_shader_binding_contract() {
        // The lighting subpass binds the shadow sampler at binding 5 and the
        // shadow projection matrix at binding 6.
        let source = shader_source("deferred/lighting.frag").unwrap();
        assert!(source.contains("binding = 5"));
        assert!(source.contains("binding = 6"));
    }
}
