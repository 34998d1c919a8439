use crate::error::LoadResult;
use crate::render::node::SceneNodeId;
use crate::render::sampler::SamplerConfig;
use crate::render::texture::ColorSpace;
use crate::resource::glb::image::DecodedImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuMeshId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuTextureId(pub u64);

/// Vertex and index data of one primitive, as raw bytes of the vertex type.
pub struct MeshUpload<'a> {
    pub label: &'a str,
    pub vertex_bytes: &'a [u8],
    pub vertex_stride: usize,
    pub vertex_count: usize,
    pub indices: &'a [u32],
}

pub struct TextureUpload<'a> {
    pub label: &'a str,
    pub image: &'a DecodedImage,
    pub color_space: ColorSpace,
    pub sampler: &'a SamplerConfig,
}

pub struct NodeAttachment<'a> {
    pub node: SceneNodeId,
    pub parent: Option<SceneNodeId>,
    pub name: Option<&'a str>,
    pub local_transform: [[f32; 4]; 4],
}

/// The GPU-owning side of the engine.
///
/// Every method is only ever called from inside a frame checkpoint on the render thread.
pub trait RenderHost {
    fn upload_mesh(&mut self, mesh: &MeshUpload<'_>) -> LoadResult<GpuMeshId>;
    fn upload_texture(&mut self, texture: &TextureUpload<'_>) -> LoadResult<GpuTextureId>;
    fn attach_node(&mut self, attachment: &NodeAttachment<'_>) -> LoadResult<()>;
}
