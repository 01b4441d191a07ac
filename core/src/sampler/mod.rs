//! CPU-side sampler vocabulary.
//!
//! Provides the [`FilterMode`], [`AddressMode`], [`BorderColor`], and
//! [`CompareFunction`] enums shared between CPU and GPU code.

mod types;

pub use types::{AddressMode, BorderColor, CompareFunction, FilterMode};
