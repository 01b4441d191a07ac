//! Common descriptor and value types for the renderer.

mod buffer;
mod common;
mod sampler;
mod texture;

pub use buffer::{BufferDescriptor, BufferUsage};
pub use common::{ClearValue, Extent2d, Extent3d};
pub use sampler::SamplerDescriptor;
pub use texture::{TextureDescriptor, TextureFormat, TextureUsage};
