//! Per-frame driver: shadow pass, main pass, present.
//!
//! The orchestrator owns the render targets, the frame slots, and the
//! barrier scheduler, and sequences one frame into a single one-time-submit
//! command stream. Submission and presentation stay with the host.

use std::sync::Arc;

use ash::vk;

use crate::barrier::BarrierScheduler;
use crate::command::{CommandStream, StreamLevel};
use crate::device::RenderDevice;
use crate::error::RendererError;
use crate::frame::FrameContext;
use crate::pipeline::RenderPipeline;
use crate::scene::Scene;
use crate::target::RenderTarget;

/// How command streams are recorded.
///
/// Chosen once at configuration time. With `Direct`, passes record straight
/// into the primary stream and the orchestrator emits all barriers. With
/// `Split`, passes would record into secondary streams and whatever
/// assembles them into a primary stream owns barrier emission; no assembler
/// exists in this renderer, so the variant is a reserved capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingStrategy {
    /// Record everything into the primary command stream.
    #[default]
    Direct,
    /// Record passes into secondary streams for parallel assembly.
    Split,
}

/// Recording phase within one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    /// Recording the shadow pass.
    RecordingShadow,
    /// Recording the main deferred pass.
    RecordingMain,
}

/// Sequences shadow pass, main pass, and present barriers for one frame.
pub struct FrameOrchestrator {
    device: Arc<RenderDevice>,
    frames: FrameContext,
    barriers: BarrierScheduler,
    shadow_pipeline: RenderPipeline,
    main_pipeline: RenderPipeline,
    /// One shadow target per frame-in-flight slot, allocated once and
    /// reused every cycle.
    shadow_targets: Vec<RenderTarget>,
    /// One main target per swapchain image.
    main_targets: Vec<RenderTarget>,
    strategy: RecordingStrategy,
    phase: Option<FramePhase>,
}

impl FrameOrchestrator {
    /// Create the orchestrator.
    ///
    /// The number of shadow targets defines the number of frames in flight.
    pub fn new(
        device: Arc<RenderDevice>,
        strategy: RecordingStrategy,
        shadow_pipeline: RenderPipeline,
        main_pipeline: RenderPipeline,
        shadow_targets: Vec<RenderTarget>,
        main_targets: Vec<RenderTarget>,
    ) -> Result<Self, RendererError> {
        assert!(!shadow_targets.is_empty(), "need at least one shadow target");
        assert!(!main_targets.is_empty(), "need at least one main target");

        let frames_in_flight = shadow_targets.len();
        let frames = FrameContext::new(&device, frames_in_flight)?;

        Ok(Self {
            device,
            frames,
            barriers: BarrierScheduler::new(frames_in_flight),
            shadow_pipeline,
            main_pipeline,
            shadow_targets,
            main_targets,
            strategy,
            phase: None,
        })
    }

    /// Get the number of frames in flight.
    pub fn frames_in_flight(&self) -> usize {
        self.frames.frames_in_flight()
    }

    /// Get the shadow target of a frame-in-flight slot.
    pub fn shadow_target(&self, slot: usize) -> &RenderTarget {
        &self.shadow_targets[slot]
    }

    /// Get the main target of a swapchain image.
    pub fn main_target(&self, swapchain_index: usize) -> &RenderTarget {
        &self.main_targets[swapchain_index]
    }

    /// Get the configured recording strategy.
    pub fn strategy(&self) -> RecordingStrategy {
        self.strategy
    }

    /// Get the current recording phase, if a frame is being recorded.
    pub fn phase(&self) -> Option<FramePhase> {
        self.phase
    }

    /// Prepare both pipelines against their target layouts.
    pub fn prepare(
        &mut self,
        compiler: &dyn crate::shader::PipelineCompiler,
    ) -> Result<(), RendererError> {
        self.shadow_pipeline
            .prepare(&self.device, compiler, &self.shadow_targets[0])?;
        self.main_pipeline
            .prepare(&self.device, compiler, &self.main_targets[0])?;
        Ok(())
    }

    /// Record one frame: shadow pass, main pass, optional overlay, present
    /// barrier. Returns the finished command buffer for the host to submit.
    pub fn record_frame(
        &mut self,
        swapchain_index: usize,
        scene: &Scene,
        overlay: Option<&mut dyn FnMut(&mut CommandStream)>,
    ) -> Result<vk::CommandBuffer, RendererError> {
        if self.strategy == RecordingStrategy::Split {
            // Secondary-stream assembly (and its barrier placement) belongs
            // to a multi-threaded recorder this renderer does not ship.
            return Err(RendererError::FeatureNotSupported(
                "split recording requires an external stream assembler".to_string(),
            ));
        }
        assert!(
            swapchain_index < self.main_targets.len(),
            "swapchain index out of range"
        );

        let frame_index = self.frames.acquire()?;
        self.barriers.begin_frame(frame_index);

        let cmd = self.frames.frame_mut(frame_index).command_buffer();
        let mut stream = CommandStream::new(&self.device, cmd, StreamLevel::Primary);
        stream.begin_one_time()?;

        self.phase = Some(FramePhase::RecordingShadow);
        let shadow_target = &self.shadow_targets[frame_index];
        stream.set_viewport_scissor(shadow_target.extent());
        stream.pipeline_barrier(&self.barriers.shadow_pass_barriers(shadow_target));
        self.shadow_pipeline.draw(
            &mut stream,
            &self.shadow_targets[frame_index],
            scene,
            self.frames.frame_mut(frame_index).transients(),
            frame_index,
            &self.shadow_targets,
        )?;
        stream.end_render_pass();

        self.phase = Some(FramePhase::RecordingMain);
        let main_target = &self.main_targets[swapchain_index];
        stream.set_viewport_scissor(main_target.extent());
        stream.pipeline_barrier(
            &self
                .barriers
                .main_pass_barriers(main_target, &self.shadow_targets[frame_index]),
        );
        self.main_pipeline.draw(
            &mut stream,
            &self.main_targets[swapchain_index],
            scene,
            self.frames.frame_mut(frame_index).transients(),
            frame_index,
            &self.shadow_targets,
        )?;
        if let Some(overlay) = overlay {
            overlay(&mut stream);
        }
        stream.end_render_pass();
        stream.pipeline_barrier(&self.barriers.present_barriers(&self.main_targets[swapchain_index]));

        stream.end()?;
        self.phase = None;

        Ok(cmd)
    }
}

impl std::fmt::Debug for FrameOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameOrchestrator")
            .field("frames_in_flight", &self.frames_in_flight())
            .field("main_targets", &self.main_targets.len())
            .field("strategy", &self.strategy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::frame::active_slot;
    use crate::layout::ImageId;

    #[test]
    fn test_shadow_slot_identity_across_frames() {
        // Shadow targets are indexed by frame mod frames-in-flight; with two
        // frames in flight, frame 2 writes the same underlying image frame 0
        // wrote.
        let target_ids = [ImageId::from_raw(100), ImageId::from_raw(101)];

        let id_for_frame = |frame: u64| target_ids[active_slot(frame, target_ids.len())];
        assert_eq!(id_for_frame(0), id_for_frame(2));
        assert_ne!(id_for_frame(0), id_for_frame(1));
    }
}
