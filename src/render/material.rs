use crate::render::texture::TextureId;
use crate::resource::glb::document::{AlphaMode, Material};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

/// PBR factors of a material plus the textures that get uploaded for it.
#[derive(Debug, Clone)]
pub struct MaterialData {
    pub source_material: Option<usize>,
    pub name: Option<String>,
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub emissive_factor: [f32; 3],
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
    pub normal_scale: f32,
    pub occlusion_strength: f32,
    pub base_color_texture: Option<TextureId>,
    pub metallic_roughness_texture: Option<TextureId>,
    pub normal_texture: Option<TextureId>,
}

impl MaterialData {
    /// Copies the factors of `material`; texture slots are filled in by the scene builder.
    pub fn from_gltf(source_material: Option<usize>, material: &Material) -> Self {
        let pbr = &material.pbr_metallic_roughness;

        Self {
            source_material,
            name: material.name.clone(),
            base_color_factor: pbr.base_color_factor,
            metallic_factor: pbr.metallic_factor,
            roughness_factor: pbr.roughness_factor,
            emissive_factor: material.emissive_factor,
            alpha_mode: material.alpha_mode,
            alpha_cutoff: material.alpha_cutoff,
            double_sided: material.double_sided,
            normal_scale: material
                .normal_texture
                .as_ref()
                .map_or(1.0, |texture| texture.scale),
            occlusion_strength: material
                .occlusion_texture
                .as_ref()
                .map_or(1.0, |texture| texture.strength),
            base_color_texture: None,
            metallic_roughness_texture: None,
            normal_texture: None,
        }
    }
}
