use crate::render::host::GpuTextureId;
use crate::render::sampler::SamplerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    Srgb,
    Linear,
}

/// The material slot a texture is referenced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRole {
    BaseColor,
    MetallicRoughness,
    Normal,
    Occlusion,
    Emissive,
}

impl TextureRole {
    pub fn color_space(self) -> ColorSpace {
        match self {
            Self::BaseColor | Self::Emissive => ColorSpace::Srgb,
            Self::MetallicRoughness | Self::Normal | Self::Occlusion => ColorSpace::Linear,
        }
    }

    /// Occlusion and emissive images are decoded but never given a GPU texture.
    pub fn is_uploaded(self) -> bool {
        !matches!(self, Self::Occlusion | Self::Emissive)
    }
}

#[derive(Debug, Clone)]
pub struct TextureSlot {
    pub source_texture: usize,
    pub source_image: usize,
    pub name: Option<String>,
    pub color_space: ColorSpace,
    pub sampler: SamplerConfig,
    pub dimensions: Option<(u32, u32)>,
    pub gpu_texture: Option<GpuTextureId>,
}
