//! Math helpers for Vulkan-convention projections.
//!
//! All projection helpers produce right-handed matrices with depth range
//! [0, 1]. [`vulkan_projection`] applies the clip-space Y flip required to
//! present glam's GL-style framebuffer orientation correctly under Vulkan.

use glam::Mat4;

/// Clip-space correction matrix for Vulkan.
///
/// Vulkan's clip space has Y pointing down, while glam's `*_rh` projection
/// builders assume Y up. Multiplying a projection by this matrix flips the
/// Y axis; depth is left untouched because glam already emits [0, 1] depth.
pub const VULKAN_CLIP_CORRECTION: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0, //
    0.0, -1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
]);

/// Apply the Vulkan clip-space correction to a projection matrix.
pub fn vulkan_projection(projection: Mat4) -> Mat4 {
    VULKAN_CLIP_CORRECTION * projection
}

/// Build the shadow-space matrix used to project world positions into a
/// shadow map: corrected light projection times light view.
pub fn shadow_space_matrix(light_projection: Mat4, light_view: Mat4) -> Mat4 {
    vulkan_projection(light_projection) * light_view
}
