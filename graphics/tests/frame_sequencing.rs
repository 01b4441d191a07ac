//! Frame sequencing tests over synthetic image handles.
//!
//! These exercise the cross-module contract between frame-in-flight
//! indexing, render targets, and the barrier scheduler without a GPU.

use ash::vk;
use ash::vk::Handle;

use umbra_graphics::barrier::BarrierScheduler;
use umbra_graphics::frame::active_slot;
use umbra_graphics::layout::{ImageId, ImageLayout};
use umbra_graphics::target::{RenderTarget, SHADOW_MAP_ATTACHMENT};
use umbra_graphics::types::{TextureDescriptor, TextureFormat, TextureUsage};
use umbra_graphics::Image;

fn synthetic_image(id: u64, format: TextureFormat) -> Image {
    Image::from_external(
        vk::Image::from_raw(id),
        vk::ImageView::from_raw(id),
        TextureDescriptor::new_2d(
            256,
            256,
            format,
            TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
        ),
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
fn shadow_write_and_read_use_the_same_slot_every_frame() {
    let _ = env_logger::builder().is_test(true).try_init();
    const FRAMES_IN_FLIGHT: usize = 2;

    let shadow_targets: Vec<RenderTarget> = (0..FRAMES_IN_FLIGHT)
        .map(|slot| shadow_target(100 + slot as u64))
        .collect();
    let main = main_target(200);
    let mut scheduler = BarrierScheduler::new(FRAMES_IN_FLIGHT);

    for frame in 0..6u64 {
        let slot = active_slot(frame, FRAMES_IN_FLIGHT);
        scheduler.begin_frame(slot);

        let shadow = &shadow_targets[slot];
        let written_id = shadow.attachment(SHADOW_MAP_ATTACHMENT).id();

        let pre_shadow = scheduler.shadow_pass_barriers(shadow);
        assert_eq!(
            pre_shadow.transition_for(written_id),
            Some((ImageLayout::Undefined, ImageLayout::DepthStencilAttachment)),
            "frame {frame}: shadow target must start the frame undefined"
        );

        let pre_main = scheduler.main_pass_barriers(&main, shadow);
        assert_eq!(
            pre_main.transition_for(written_id),
            Some((ImageLayout::DepthStencilAttachment, ImageLayout::ShaderReadOnly)),
            "frame {frame}: the lighting read must cover the image the shadow pass wrote"
        );

        scheduler.present_barriers(&main);
    }
}

#[test]
fn frame_two_rebinds_frame_zero_shadow_image() {
    let shadow_targets = [shadow_target(100), shadow_target(101)];

    let bound_for_frame =
        |frame: u64| shadow_targets[active_slot(frame, 2)].attachment(SHADOW_MAP_ATTACHMENT).id();

    assert_eq!(bound_for_frame(0), ImageId::from_raw(100));
    assert_eq!(bound_for_frame(1), ImageId::from_raw(101));
    assert_eq!(bound_for_frame(2), bound_for_frame(0));
}

#[test]
fn present_happens_after_color_writes() {
    let mut scheduler = BarrierScheduler::new(2);
    scheduler.begin_frame(0);

    let shadow = shadow_target(100);
    let main = main_target(200);
    scheduler.shadow_pass_barriers(&shadow);
    scheduler.main_pass_barriers(&main, &shadow);

    let present = scheduler.present_barriers(&main);
    assert_eq!(
        present.transition_for(ImageId::from_raw(200)),
        Some((ImageLayout::ColorAttachment, ImageLayout::PresentSrc))
    );
    assert_eq!(
        present.src_stage_mask(),
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
    );
}
