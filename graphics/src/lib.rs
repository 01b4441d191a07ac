//! # Umbra Graphics
//!
//! Deferred renderer with shadow mapping, built as explicit multi-pass
//! pipeline orchestration over Vulkan.
//!
//! ## Overview
//!
//! Each frame records a shadow pass and a two-subpass deferred pass
//! (geometry, then lighting) into one command stream, with the
//! [`BarrierScheduler`] issuing the exact image-layout transitions between
//! passes. Shadow targets exist once per frame-in-flight slot; the lighting
//! subpass always reads the slot its own frame's shadow pass wrote.
//!
//! The host framework supplies the device, swapchain images, shader
//! compilation, frame pacing, and submission; see [`DeferredDemo`] for the
//! surface exposed to the application loop.

pub mod barrier;
pub mod command;
pub mod demo;
pub mod device;
pub mod error;
pub mod frame;
pub mod layout;
pub mod orchestrator;
pub mod panel;
pub mod pipeline;
pub mod resources;
pub mod scene;
pub mod shader;
pub mod stats;
pub mod subpass;
pub mod target;
pub mod types;

pub use barrier::{BarrierBatch, BarrierScheduler};
pub use command::{CommandStream, StreamLevel};
pub use demo::DeferredDemo;
pub use device::RenderDevice;
pub use error::RendererError;
pub use layout::{ImageId, ImageLayout};
pub use orchestrator::{FrameOrchestrator, FramePhase, RecordingStrategy};
pub use panel::PitchClampAxis;
pub use pipeline::RenderPipeline;
pub use resources::{Buffer, Image, Sampler, TransientPool};
pub use shader::{CompiledPipeline, PipelineCompiler, PipelineState, ShaderSource};
pub use target::{create_main_target, create_shadow_target, RenderTarget};
pub use types::{
    BufferDescriptor, BufferUsage, ClearValue, Extent2d, Extent3d, SamplerDescriptor,
    TextureDescriptor, TextureFormat, TextureUsage,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("Umbra Graphics v{} initialized", VERSION);
}

/// Configuration for the deferred shadow demo.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Number of frames in flight (and shadow target slots).
    pub frames_in_flight: usize,
    /// Shadow map resolution (square).
    pub shadow_resolution: u32,
    /// Command recording strategy.
    pub recording: RecordingStrategy,
    /// Euler axis the options panel clamps to the pitch limit.
    pub pitch_clamp_axis: PitchClampAxis,
    /// Seed for the sample scene's light colors.
    pub light_seed: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            shadow_resolution: 1024,
            recording: RecordingStrategy::default(),
            pitch_clamp_axis: PitchClampAxis::default(),
            light_seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = RendererConfig::default();
        assert_eq!(config.frames_in_flight, 2);
        assert_eq!(config.shadow_resolution, 1024);
        assert_eq!(config.recording, RecordingStrategy::Direct);
    }
}
