//! Barrier batching and per-pass barrier scheduling.
//!
//! Barriers for a pass are collected into a [`BarrierBatch`] and submitted
//! as a single `vkCmdPipelineBarrier` call. The [`BarrierScheduler`] tracks
//! the current layout of every attachment per frame-in-flight slot and
//! derives the exact transitions each pass needs, so issuing the same set
//! twice in a frame is an effective no-op.

use std::collections::HashMap;

use ash::vk;

use crate::layout::{ImageId, ImageLayout};
use crate::resources::Image;
use crate::target::{RenderTarget, DEPTH_ATTACHMENT, SHADOW_MAP_ATTACHMENT, SWAPCHAIN_ATTACHMENT};

/// A batch of image memory barriers to submit together.
#[derive(Debug, Default)]
pub struct BarrierBatch {
    /// Image barriers keyed by image handle (to avoid duplicates).
    image_barriers: HashMap<ImageId, ImageBarrierInfo>,
    /// Source pipeline stage mask (union of all barriers).
    src_stage_mask: vk::PipelineStageFlags,
    /// Destination pipeline stage mask (union of all barriers).
    dst_stage_mask: vk::PipelineStageFlags,
}

/// Information for a single image barrier.
#[derive(Debug, Clone)]
struct ImageBarrierInfo {
    image: vk::Image,
    old_layout: ImageLayout,
    new_layout: ImageLayout,
    aspect_mask: vk::ImageAspectFlags,
}

impl BarrierBatch {
    /// Create a new empty barrier batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image layout transition barrier.
    ///
    /// If a barrier for the same image already exists, it is replaced.
    /// Barriers where `old_layout == new_layout` are skipped.
    pub fn add_transition(
        &mut self,
        id: ImageId,
        image: vk::Image,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
        aspect_mask: vk::ImageAspectFlags,
    ) {
        if old_layout == new_layout {
            return;
        }

        self.image_barriers.insert(
            id,
            ImageBarrierInfo {
                image,
                old_layout,
                new_layout,
                aspect_mask,
            },
        );
        self.src_stage_mask |= old_layout.src_stage();
        self.dst_stage_mask |= new_layout.dst_stage();
    }

    /// Check if the batch has any barriers.
    pub fn is_empty(&self) -> bool {
        self.image_barriers.is_empty()
    }

    /// Get the number of barriers in the batch.
    pub fn len(&self) -> usize {
        self.image_barriers.len()
    }

    /// Get the (old, new) layout pair recorded for an image, if present.
    pub fn transition_for(&self, id: ImageId) -> Option<(ImageLayout, ImageLayout)> {
        self.image_barriers
            .get(&id)
            .map(|info| (info.old_layout, info.new_layout))
    }

    /// Get the unioned source stage mask.
    pub fn src_stage_mask(&self) -> vk::PipelineStageFlags {
        self.src_stage_mask
    }

    /// Get the unioned destination stage mask.
    pub fn dst_stage_mask(&self) -> vk::PipelineStageFlags {
        self.dst_stage_mask
    }

    /// Submit all barriers in a single pipeline barrier command.
    ///
    /// Does nothing if the batch is empty.
    pub fn submit(&self, device: &ash::Device, cmd: vk::CommandBuffer) {
        if self.is_empty() {
            return;
        }

        let barriers: Vec<vk::ImageMemoryBarrier> = self
            .image_barriers
            .values()
            .map(|info| {
                vk::ImageMemoryBarrier::default()
                    .old_layout(info.old_layout.to_vk())
                    .new_layout(info.new_layout.to_vk())
                    .src_access_mask(info.old_layout.src_access_mask())
                    .dst_access_mask(info.new_layout.dst_access_mask())
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(info.image)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: info.aspect_mask,
                        base_mip_level: 0,
                        level_count: vk::REMAINING_MIP_LEVELS,
                        base_array_layer: 0,
                        layer_count: vk::REMAINING_ARRAY_LAYERS,
                    })
            })
            .collect();

        unsafe {
            device.cmd_pipeline_barrier(
                cmd,
                self.src_stage_mask,
                self.dst_stage_mask,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &barriers,
            );
        }
    }

    /// Clear all barriers from the batch.
    pub fn clear(&mut self) {
        self.image_barriers.clear();
        self.src_stage_mask = vk::PipelineStageFlags::empty();
        self.dst_stage_mask = vk::PipelineStageFlags::empty();
    }
}

/// Computes the image-layout transitions each pass of the deferred pipeline
/// requires, as a function of the current frame-in-flight index.
///
/// One layout map exists per frame-in-flight slot because the same image can
/// be in different layouts in different frames. A slot is reset to
/// `Undefined` when its frame is re-acquired; the host's frame fencing
/// guarantees the GPU retired the slot's previous commands by then.
#[derive(Debug)]
pub struct BarrierScheduler {
    /// Layout state per frame-in-flight slot.
    frame_states: Vec<HashMap<ImageId, ImageLayout>>,
    /// Currently recording slot.
    active_frame: usize,
}

impl BarrierScheduler {
    /// Create a scheduler for the given number of frames in flight.
    pub fn new(frames_in_flight: usize) -> Self {
        assert!(frames_in_flight > 0, "need at least one frame in flight");
        Self {
            frame_states: (0..frames_in_flight).map(|_| HashMap::new()).collect(),
            active_frame: 0,
        }
    }

    /// Get the number of frame slots.
    pub fn frames_in_flight(&self) -> usize {
        self.frame_states.len()
    }

    /// Get the active frame-in-flight index.
    pub fn active_frame(&self) -> usize {
        self.active_frame
    }

    /// Start recording barriers for a frame slot.
    ///
    /// Resets the slot's layout state: every attachment starts the frame in
    /// `Undefined` layout and is re-established by the pass barriers.
    pub fn begin_frame(&mut self, frame_index: usize) {
        assert!(frame_index < self.frame_states.len(), "frame index out of range");
        self.active_frame = frame_index;
        self.frame_states[frame_index].clear();
    }

    /// Get the tracked layout of an image in the active frame.
    pub fn layout_of(&self, id: ImageId) -> ImageLayout {
        self.frame_states[self.active_frame]
            .get(&id)
            .copied()
            .unwrap_or(ImageLayout::Undefined)
    }

    /// Transition one image to a new layout, recording the barrier and
    /// updating tracked state.
    fn transition(&mut self, image: &Image, new_layout: ImageLayout, batch: &mut BarrierBatch) {
        let id = image.id();
        let old_layout = self.layout_of(id);
        batch.add_transition(id, image.raw(), old_layout, new_layout, image.aspect_mask());
        self.frame_states[self.active_frame].insert(id, new_layout);
    }

    /// Barriers to issue before the shadow pass.
    ///
    /// Transitions the active shadow target's depth attachment from
    /// undefined to depth-attachment-writable; the destination stage covers
    /// both early and late fragment tests and there is no prior source
    /// access.
    pub fn shadow_pass_barriers(&mut self, shadow_target: &RenderTarget) -> BarrierBatch {
        let mut batch = BarrierBatch::new();
        self.transition(
            shadow_target.attachment(SHADOW_MAP_ATTACHMENT),
            ImageLayout::DepthStencilAttachment,
            &mut batch,
        );
        batch
    }

    /// Barriers to issue before the main pass.
    ///
    /// (a) color attachment and every attachment past the depth index become
    /// color-attachment-writable, (b) the depth attachment becomes
    /// depth-attachment-writable, and (c) the *active* shadow target's depth
    /// attachment moves from depth-attachment-writable to shader-read-only.
    /// (c) runs every frame, not just the first, because the shadow pass
    /// rewrites that image each frame.
    pub fn main_pass_barriers(
        &mut self,
        main_target: &RenderTarget,
        shadow_target: &RenderTarget,
    ) -> BarrierBatch {
        let mut batch = BarrierBatch::new();

        self.transition(
            main_target.attachment(SWAPCHAIN_ATTACHMENT),
            ImageLayout::ColorAttachment,
            &mut batch,
        );
        for index in (DEPTH_ATTACHMENT + 1)..main_target.attachment_count() {
            self.transition(
                main_target.attachment(index),
                ImageLayout::ColorAttachment,
                &mut batch,
            );
        }

        self.transition(
            main_target.attachment(DEPTH_ATTACHMENT),
            ImageLayout::DepthStencilAttachment,
            &mut batch,
        );

        let shadow_map = shadow_target.attachment(SHADOW_MAP_ATTACHMENT);
        debug_assert_eq!(
            self.layout_of(shadow_map.id()),
            ImageLayout::DepthStencilAttachment,
            "shadow map must be written by this frame's shadow pass before the main pass reads it"
        );
        self.transition(shadow_map, ImageLayout::ShaderReadOnly, &mut batch);

        batch
    }

    /// Barrier to issue after the main pass, before presentation.
    ///
    /// Transitions the swapchain color attachment from
    /// color-attachment-writable to presentable.
    pub fn present_barriers(&mut self, main_target: &RenderTarget) -> BarrierBatch {
        let mut batch = BarrierBatch::new();
        self.transition(
            main_target.attachment(SWAPCHAIN_ATTACHMENT),
            ImageLayout::PresentSrc,
            &mut batch,
        );
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};
    use ash::vk::Handle;

    fn synthetic_image(id: u64, format: TextureFormat) -> Image {
        Image::from_external(
            vk::Image::from_raw(id),
            vk::ImageView::from_raw(id),
            TextureDescriptor::new_2d(64, 64, format, TextureUsage::RENDER_ATTACHMENT),
        )
    }

    fn shadow_target(id: u64) -> RenderTarget {
        RenderTarget::new(vec![synthetic_image(id, TextureFormat::Depth32Float)])
    }

    fn main_target(base_id: u64) -> RenderTarget {
        RenderTarget::new(vec![
            synthetic_image(base_id, TextureFormat::Bgra8Unorm),
            synthetic_image(base_id + 1, TextureFormat::Depth32Float),
            synthetic_image(base_id + 2, TextureFormat::Rgba8Unorm),
            synthetic_image(base_id + 3, TextureFormat::Rgb10a2Unorm),
        ])
    }

    #[test]
    fn test_batch_skips_same_layout() {
        let mut batch = BarrierBatch::new();
        batch.add_transition(
            ImageId::from_raw(1),
            vk::Image::from_raw(1),
            ImageLayout::ColorAttachment,
            ImageLayout::ColorAttachment,
            vk::ImageAspectFlags::COLOR,
        );
        assert!(batch.is_empty());
    }

    #[test]
    fn test_batch_deduplicates_per_image() {
        let mut batch = BarrierBatch::new();
        let id = ImageId::from_raw(1);
        let image = vk::Image::from_raw(1);

        batch.add_transition(
            id,
            image,
            ImageLayout::Undefined,
            ImageLayout::ColorAttachment,
            vk::ImageAspectFlags::COLOR,
        );
        batch.add_transition(
            id,
            image,
            ImageLayout::ColorAttachment,
            ImageLayout::ShaderReadOnly,
            vk::ImageAspectFlags::COLOR,
        );
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_shadow_pass_barriers() {
        let mut scheduler = BarrierScheduler::new(2);
        scheduler.begin_frame(0);

        let target = shadow_target(10);
        let batch = scheduler.shadow_pass_barriers(&target);

        assert_eq!(batch.len(), 1);
        assert_eq!(
            batch.transition_for(ImageId::from_raw(10)),
            Some((ImageLayout::Undefined, ImageLayout::DepthStencilAttachment))
        );
        assert_eq!(batch.src_stage_mask(), vk::PipelineStageFlags::TOP_OF_PIPE);
        assert!(batch
            .dst_stage_mask()
            .contains(vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS));
        assert!(batch
            .dst_stage_mask()
            .contains(vk::PipelineStageFlags::LATE_FRAGMENT_TESTS));
    }

    #[test]
    fn test_main_pass_barriers_cover_all_attachments() {
        let mut scheduler = BarrierScheduler::new(2);
        scheduler.begin_frame(0);

        let shadow = shadow_target(10);
        let main = main_target(20);

        scheduler.shadow_pass_barriers(&shadow);
        let batch = scheduler.main_pass_barriers(&main, &shadow);

        // Color, albedo, normal, depth, plus the shadow-map read transition.
        assert_eq!(batch.len(), 5);
        assert_eq!(
            batch.transition_for(ImageId::from_raw(20)),
            Some((ImageLayout::Undefined, ImageLayout::ColorAttachment))
        );
        assert_eq!(
            batch.transition_for(ImageId::from_raw(21)),
            Some((ImageLayout::Undefined, ImageLayout::DepthStencilAttachment))
        );
        assert_eq!(
            batch.transition_for(ImageId::from_raw(22)),
            Some((ImageLayout::Undefined, ImageLayout::ColorAttachment))
        );
        assert_eq!(
            batch.transition_for(ImageId::from_raw(23)),
            Some((ImageLayout::Undefined, ImageLayout::ColorAttachment))
        );
        assert_eq!(
            batch.transition_for(ImageId::from_raw(10)),
            Some((ImageLayout::DepthStencilAttachment, ImageLayout::ShaderReadOnly))
        );
        assert!(batch
            .dst_stage_mask()
            .contains(vk::PipelineStageFlags::FRAGMENT_SHADER));
    }

    #[test]
    fn test_main_pass_barriers_are_idempotent_in_effect() {
        let mut scheduler = BarrierScheduler::new(2);
        scheduler.begin_frame(0);

        let shadow = shadow_target(10);
        let main = main_target(20);

        scheduler.shadow_pass_barriers(&shadow);
        scheduler.main_pass_barriers(&main, &shadow);
        let replay = scheduler.main_pass_barriers(&main, &shadow);

        // Layouts already match, so the replay carries no transitions.
        assert!(replay.is_empty());
        assert_eq!(
            scheduler.layout_of(ImageId::from_raw(10)),
            ImageLayout::ShaderReadOnly
        );
    }

    #[test]
    fn test_omitting_shadow_read_transition_leaves_stale_layout() {
        let mut scheduler = BarrierScheduler::new(2);
        scheduler.begin_frame(0);

        let shadow = shadow_target(10);
        scheduler.shadow_pass_barriers(&shadow);

        // Without the main-pass barrier set, the shadow map never reaches a
        // shader-readable layout; sampling it now would be a correctness bug.
        assert_eq!(
            scheduler.layout_of(ImageId::from_raw(10)),
            ImageLayout::DepthStencilAttachment
        );
        assert_ne!(
            scheduler.layout_of(ImageId::from_raw(10)),
            ImageLayout::ShaderReadOnly
        );
    }

    #[test]
    fn test_shadow_read_uses_current_frame_slot() {
        let mut scheduler = BarrierScheduler::new(2);
        let slots = [shadow_target(10), shadow_target(11)];
        let main = main_target(20);

        for frame in 0..3usize {
            let slot = frame % 2;
            scheduler.begin_frame(slot);

            let shadow = &slots[slot];
            scheduler.shadow_pass_barriers(shadow);
            let batch = scheduler.main_pass_barriers(&main, shadow);

            // The read transition must target the slot the shadow pass just
            // wrote, and never the other slot.
            let written = ImageId::from_raw(10 + slot as u64);
            let other = ImageId::from_raw(10 + (1 - slot) as u64);
            assert!(batch.transition_for(written).is_some());
            assert!(batch.transition_for(other).is_none());
        }
    }

    #[test]
    fn test_present_barrier() {
        let mut scheduler = BarrierScheduler::new(2);
        scheduler.begin_frame(0);

        let shadow = shadow_target(10);
        let main = main_target(20);
        scheduler.shadow_pass_barriers(&shadow);
        scheduler.main_pass_barriers(&main, &shadow);

        let batch = scheduler.present_barriers(&main);
        assert_eq!(batch.len(), 1);
        assert_eq!(
            batch.transition_for(ImageId::from_raw(20)),
            Some((ImageLayout::ColorAttachment, ImageLayout::PresentSrc))
        );
        assert_eq!(
            batch.src_stage_mask(),
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        );
        assert_eq!(batch.dst_stage_mask(), vk::PipelineStageFlags::BOTTOM_OF_PIPE);
    }
}
