//! Sampler descriptor and Vulkan conversion.

use ash::vk;
use umbra_core::sampler::{AddressMode, BorderColor, CompareFunction, FilterMode};

/// Descriptor for creating a sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDescriptor {
    /// Debug label for the sampler.
    pub label: Option<String>,
    /// Address mode for U coordinate.
    pub address_mode_u: AddressMode,
    /// Address mode for V coordinate.
    pub address_mode_v: AddressMode,
    /// Address mode for W coordinate.
    pub address_mode_w: AddressMode,
    /// Border color used with clamp-to-border addressing.
    pub border_color: BorderColor,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Mipmap filter.
    pub mipmap_filter: FilterMode,
    /// Minimum LOD clamp.
    pub lod_min_clamp: f32,
    /// Maximum LOD clamp.
    pub lod_max_clamp: f32,
    /// Comparison function for depth sampling.
    pub compare: Option<CompareFunction>,
}

impl SamplerDescriptor {
    /// Create a linear filtering sampler.
    pub fn linear() -> Self {
        Self {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Linear,
            ..Default::default()
        }
    }

    /// Sampler contract for shadow-map lookups.
    ///
    /// Linear filtering with hardware depth comparison turns each fetch into
    /// a percentage-style shadow test. Addressing clamps to an opaque-white
    /// border on all axes so that coordinates outside [0, 1]^2 resolve as
    /// fully lit rather than shadowed. The comparison is greater-or-equal
    /// against the stored depth, matching the reverse-depth convention used
    /// by the shadow pass.
    pub fn shadow_map() -> Self {
        Self {
            label: Some("shadowmap_sampler".to_string()),
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            address_mode_u: AddressMode::ClampToBorder,
            address_mode_v: AddressMode::ClampToBorder,
            address_mode_w: AddressMode::ClampToBorder,
            border_color: BorderColor::OpaqueWhite,
            compare: Some(CompareFunction::GreaterEqual),
            ..Default::default()
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set address mode for all coordinates.
    pub fn with_address_mode(mut self, mode: AddressMode) -> Self {
        self.address_mode_u = mode;
        self.address_mode_v = mode;
        self.address_mode_w = mode;
        self
    }

    /// Set comparison function for depth sampling.
    pub fn with_compare(mut self, compare: CompareFunction) -> Self {
        self.compare = Some(compare);
        self
    }

    /// Build the Vulkan sampler create info.
    pub fn to_vk(&self) -> vk::SamplerCreateInfo<'_> {
        vk::SamplerCreateInfo::default()
            .mag_filter(filter_to_vk(self.mag_filter))
            .min_filter(filter_to_vk(self.min_filter))
            .mipmap_mode(mipmap_to_vk(self.mipmap_filter))
            .address_mode_u(address_to_vk(self.address_mode_u))
            .address_mode_v(address_to_vk(self.address_mode_v))
            .address_mode_w(address_to_vk(self.address_mode_w))
            .border_color(border_to_vk(self.border_color))
            .min_lod(self.lod_min_clamp)
            .max_lod(self.lod_max_clamp)
            .compare_enable(self.compare.is_some())
            .compare_op(
                self.compare
                    .map(compare_to_vk)
                    .unwrap_or(vk::CompareOp::NEVER),
            )
    }
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
            border_color: BorderColor::TransparentBlack,
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            mipmap_filter: FilterMode::Nearest,
            lod_min_clamp: 0.0,
            lod_max_clamp: 32.0,
            compare: None,
        }
    }
}

fn filter_to_vk(filter: FilterMode) -> vk::Filter {
    match filter {
        FilterMode::Nearest => vk::Filter::NEAREST,
        FilterMode::Linear => vk::Filter::LINEAR,
    }
}

fn mipmap_to_vk(filter: FilterMode) -> vk::SamplerMipmapMode {
    match filter {
        FilterMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        FilterMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

fn address_to_vk(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::MirrorRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
    }
}

fn border_to_vk(color: BorderColor) -> vk::BorderColor {
    match color {
        BorderColor::TransparentBlack => vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
        BorderColor::OpaqueBlack => vk::BorderColor::FLOAT_OPAQUE_BLACK,
        BorderColor::OpaqueWhite => vk::BorderColor::FLOAT_OPAQUE_WHITE,
    }
}

fn compare_to_vk(compare: CompareFunction) -> vk::CompareOp {
    match compare {
        CompareFunction::Never => vk::CompareOp::NEVER,
        CompareFunction::Less => vk::CompareOp::LESS,
        CompareFunction::Equal => vk::CompareOp::EQUAL,
        CompareFunction::LessEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareFunction::Greater => vk::CompareOp::GREATER,
        CompareFunction::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareFunction::GreaterEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareFunction::Always => vk::CompareOp::ALWAYS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_map_sampler_contract() {
        let desc = SamplerDescriptor::shadow_map();

        // Out-of-frustum lookups must resolve as fully lit: border clamp on
        // every axis with an opaque white border.
        assert_eq!(desc.address_mode_u, AddressMode::ClampToBorder);
        assert_eq!(desc.address_mode_v, AddressMode::ClampToBorder);
        assert_eq!(desc.address_mode_w, AddressMode::ClampToBorder);
        assert_eq!(desc.border_color, BorderColor::OpaqueWhite);

        assert_eq!(desc.mag_filter, FilterMode::Linear);
        assert_eq!(desc.min_filter, FilterMode::Linear);
        assert_eq!(desc.compare, Some(CompareFunction::GreaterEqual));
    }

    #[test]
    fn test_shadow_map_sampler_to_vk() {
        let desc = SamplerDescriptor::shadow_map();
        let info = desc.to_vk();

        assert_eq!(info.min_filter, vk::Filter::LINEAR);
        assert_eq!(info.mag_filter, vk::Filter::LINEAR);
        assert_eq!(info.address_mode_u, vk::SamplerAddressMode::CLAMP_TO_BORDER);
        assert_eq!(info.border_color, vk::BorderColor::FLOAT_OPAQUE_WHITE);
        assert_eq!(info.compare_enable, vk::TRUE);
        assert_eq!(info.compare_op, vk::CompareOp::GREATER_OR_EQUAL);
    }

    #[test]
    fn test_default_sampler_has_no_compare() {
        let desc = SamplerDescriptor::linear();
        let info = desc.to_vk();
        assert_eq!(info.compare_enable, vk::FALSE);
    }
}
