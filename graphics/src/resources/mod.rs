//! GPU resource types: images, buffers, samplers, and the per-frame
//! transient pool.

mod buffer;
mod image;
mod sampler;
mod transient;

pub use buffer::Buffer;
pub use image::Image;
pub use sampler::Sampler;
pub use transient::{TransientAllocation, TransientPool};
