//! The deferred shadow demo exposed to the host application loop.

use std::sync::Arc;

use ash::vk;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::command::CommandStream;
use crate::device::RenderDevice;
use crate::error::RendererError;
use crate::orchestrator::FrameOrchestrator;
use crate::panel;
use crate::pipeline::RenderPipeline;
use crate::resources::Image;
use crate::scene::{populate_sample_scene, SampleScene, Scene};
use crate::shader::{PipelineCompiler, ShaderSource};
use crate::stats::FrameStats;
use crate::subpass::{GeometrySubpass, LightingSubpass, ShadowSubpass, Subpass};
use crate::target::{create_main_target, create_shadow_target};
use crate::RendererConfig;

/// Deferred rendering demo with shadow mapping.
///
/// The host owns the window, device, swapchain, and frame pacing; this type
/// owns the scene, the render targets, and the per-frame command recording.
pub struct DeferredDemo {
    orchestrator: FrameOrchestrator,
    scene: Scene,
    handles: SampleScene,
    config: RendererConfig,
    stats: FrameStats,
}

impl DeferredDemo {
    /// One-time setup. Fails fatally on any device or resource error; the
    /// host aborts startup on `Err`.
    ///
    /// `swapchain_images` transfers ownership of one presentable color image
    /// per swapchain slot; a main target is built around each.
    pub fn prepare(
        device: Arc<RenderDevice>,
        config: RendererConfig,
        compiler: &dyn PipelineCompiler,
        swapchain_images: Vec<Image>,
    ) -> Result<Self, RendererError> {
        if swapchain_images.is_empty() {
            return Err(RendererError::InitializationFailed(
                "no swapchain images provided".to_string(),
            ));
        }

        let extent = swapchain_images[0].extent();
        let aspect = extent.width as f32 / extent.height as f32;

        let shadow_targets = (0..config.frames_in_flight)
            .map(|_| create_shadow_target(&device, config.shadow_resolution))
            .collect::<Result<Vec<_>, _>>()?;
        let main_targets = swapchain_images
            .into_iter()
            .map(|image| create_main_target(&device, image))
            .collect::<Result<Vec<_>, _>>()?;

        let mut scene = Scene::new();
        let mut rng = StdRng::seed_from_u64(config.light_seed);
        let handles = populate_sample_scene(&mut scene, aspect, &mut rng);

        let mut shadow_pipeline = RenderPipeline::new();
        let mut shadow_subpass = ShadowSubpass::new(
            ShaderSource::new("shadows/shadowmap.vert"),
            ShaderSource::new("shadows/shadowmap.frag"),
            handles.shadow_camera,
        );
        // Reserved recording-thread tag for the split strategy.
        shadow_subpass.set_thread_index(1);
        shadow_pipeline.add_subpass(Box::new(shadow_subpass));

        let mut main_pipeline = RenderPipeline::new();
        main_pipeline.add_subpass(Box::new(GeometrySubpass::new(
            ShaderSource::new("deferred/geometry.vert"),
            ShaderSource::new("deferred/geometry.frag"),
            handles.main_camera,
        )));
        main_pipeline.add_subpass(Box::new(LightingSubpass::new(
            ShaderSource::new("deferred/lighting.vert"),
            ShaderSource::new("deferred/lighting.frag"),
            handles.main_camera,
            handles.shadow_camera,
        )));

        let mut orchestrator = FrameOrchestrator::new(
            device,
            config.recording,
            shadow_pipeline,
            main_pipeline,
            shadow_targets,
            main_targets,
        )?;
        orchestrator.prepare(compiler)?;

        log::info!(
            "deferred demo ready: {} frames in flight, {}x{} shadow map",
            config.frames_in_flight,
            config.shadow_resolution,
            config.shadow_resolution
        );

        Ok(Self {
            orchestrator,
            scene,
            handles,
            config,
            stats: FrameStats::default(),
        })
    }

    /// Drive one frame: update stats, follow the sun with the shadow
    /// camera, and record the frame's command stream.
    ///
    /// Returns the recorded command buffer; submission and presentation are
    /// the host's responsibility.
    pub fn update(
        &mut self,
        delta_time: f32,
        swapchain_index: usize,
        overlay: Option<&mut dyn FnMut(&mut CommandStream)>,
    ) -> Result<vk::CommandBuffer, RendererError> {
        self.stats.record(delta_time);
        self.scene
            .sync_shadow_camera(self.handles.shadow_camera, self.handles.sun);
        self.orchestrator
            .record_frame(swapchain_index, &self.scene, overlay)
    }

    /// Draw the on-screen options panel.
    pub fn draw_options(&mut self, ui: &mut egui::Ui) {
        panel::draw_options(
            ui,
            &mut self.scene,
            self.handles.sun,
            self.handles.shadow_camera,
            self.config.pitch_clamp_axis,
            &self.stats,
        );
    }

    /// Get the scene registry.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Get the scene registry mutably, e.g. to add mesh nodes after asset
    /// load.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Get the ids of the sample scene entities.
    pub fn handles(&self) -> SampleScene {
        self.handles
    }

    /// Get the frame orchestrator.
    pub fn orchestrator(&self) -> &FrameOrchestrator {
        &self.orchestrator
    }

    /// Get the frame statistics.
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }
}

impl std::fmt::Debug for DeferredDemo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredDemo")
            .field("orchestrator", &self.orchestrator)
            .field("stats", &self.stats)
            .finish()
    }
}
