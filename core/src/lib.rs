//! # Umbra Core
//!
//! Core crate for Umbra renderer shared CPU-side types: math helpers and
//! sampler descriptions used by both application and GPU code.

pub mod math;
pub mod sampler;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn init() {
    log::info!("Umbra Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
