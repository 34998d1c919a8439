use crate::resource::glb::document::{MagFilter, MinFilter, Sampler, WrapMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerConfig {
    pub address_mode_u: wgpu::AddressMode,
    pub address_mode_v: wgpu::AddressMode,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    pub mipmap_filter: wgpu::FilterMode,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
        }
    }
}

impl SamplerConfig {
    pub fn from_gltf(sampler: &Sampler) -> Self {
        let mag_filter = match sampler.mag_filter {
            Some(MagFilter::Nearest) => wgpu::FilterMode::Nearest,
            Some(MagFilter::Linear) | None => wgpu::FilterMode::Linear,
        };

        let min_filter = match sampler.min_filter {
            Some(
                MinFilter::Nearest
                | MinFilter::NearestMipmapNearest
                | MinFilter::NearestMipmapLinear,
            ) => wgpu::FilterMode::Nearest,
            _ => wgpu::FilterMode::Linear,
        };

        let mipmap_filter = match sampler.min_filter {
            Some(MinFilter::NearestMipmapNearest | MinFilter::LinearMipmapNearest) => {
                wgpu::FilterMode::Nearest
            }
            _ => wgpu::FilterMode::Linear,
        };

        Self {
            address_mode_u: address_mode(sampler.wrap_s),
            address_mode_v: address_mode(sampler.wrap_t),
            mag_filter,
            min_filter,
            mipmap_filter,
        }
    }
}

fn address_mode(wrap_mode: WrapMode) -> wgpu::AddressMode {
    match wrap_mode {
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_gltf_sampler_codes() {
        let sampler = Sampler {
            name: None,
            mag_filter: Some(MagFilter::Nearest),
            min_filter: Some(MinFilter::LinearMipmapNearest),
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::MirroredRepeat,
        };

        let config = SamplerConfig::from_gltf(&sampler);

        assert_eq!(config.address_mode_u, wgpu::AddressMode::ClampToEdge);
        assert_eq!(config.address_mode_v, wgpu::AddressMode::MirrorRepeat);
        assert_eq!(config.mag_filter, wgpu::FilterMode::Nearest);
        assert_eq!(config.min_filter, wgpu::FilterMode::Linear);
        assert_eq!(config.mipmap_filter, wgpu::FilterMode::Nearest);
    }

    #[test]
    fn missing_values_repeat_linearly() {
        assert_eq!(
            SamplerConfig::from_gltf(&Sampler::default()),
            SamplerConfig::default()
        );
    }
}
