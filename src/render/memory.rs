use crate::error::LoadResult;
use crate::render::host::{
    GpuMeshId, GpuTextureId, MeshUpload, NodeAttachment, RenderHost, TextureUpload,
};
use crate::render::node::SceneNodeId;
use crate::render::sampler::SamplerConfig;
use crate::render::texture::ColorSpace;

#[derive(Debug, Clone)]
pub struct StoredMesh {
    pub label: String,
    pub vertex_bytes: Vec<u8>,
    pub vertex_stride: usize,
    pub vertex_count: usize,
    pub indices: Vec<u32>,
}

impl StoredMesh {
    /// The vertex data reinterpreted as native-endian floats.
    pub fn vertex_floats(&self) -> Vec<f32> {
        self.vertex_bytes
            .chunks_exact(4)
            .map(|bytes| f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct StoredTexture {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub sampler: SamplerConfig,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct StoredAttachment {
    pub node: SceneNodeId,
    pub parent: Option<SceneNodeId>,
    pub name: Option<String>,
    pub local_transform: [[f32; 4]; 4],
}

/// A render host that keeps every upload in memory.
///
/// Used when no GPU is wanted and by tests that inspect what a load produced.
#[derive(Debug, Default)]
pub struct MemoryRenderHost {
    pub meshes: Vec<StoredMesh>,
    pub textures: Vec<StoredTexture>,
    pub attachments: Vec<StoredAttachment>,
}

impl MemoryRenderHost {
    pub fn mesh(&self, id: GpuMeshId) -> Option<&StoredMesh> {
        self.meshes.get(id.0 as usize)
    }

    pub fn texture(&self, id: GpuTextureId) -> Option<&StoredTexture> {
        self.textures.get(id.0 as usize)
    }

    pub fn uploaded_bytes(&self) -> usize {
        let mesh_bytes: usize = self
            .meshes
            .iter()
            .map(|mesh| mesh.vertex_bytes.len() + mesh.indices.len() * 4)
            .sum();
        let texture_bytes: usize = self.textures.iter().map(|texture| texture.rgba.len()).sum();

        mesh_bytes + texture_bytes
    }
}

impl RenderHost for MemoryRenderHost {
    fn upload_mesh(&mut self, mesh: &MeshUpload<'_>) -> LoadResult<GpuMeshId> {
        log::trace!(
            "Storing mesh {} with {} vertices and {} indices",
            mesh.label,
            mesh.vertex_count,
            mesh.indices.len()
        );

        self.meshes.push(StoredMesh {
            label: mesh.label.to_string(),
            vertex_bytes: mesh.vertex_bytes.to_vec(),
            vertex_stride: mesh.vertex_stride,
            vertex_count: mesh.vertex_count,
            indices: mesh.indices.to_vec(),
        });

        Ok(GpuMeshId(self.meshes.len() as u64 - 1))
    }

    fn upload_texture(&mut self, texture: &TextureUpload<'_>) -> LoadResult<GpuTextureId> {
        log::trace!(
            "Storing texture {} ({}x{})",
            texture.label,
            texture.image.width,
            texture.image.height
        );

        self.textures.push(StoredTexture {
            label: texture.label.to_string(),
            width: texture.image.width,
            height: texture.image.height,
            color_space: texture.color_space,
            sampler: *texture.sampler,
            rgba: texture.image.rgba.clone(),
        });

        Ok(GpuTextureId(self.textures.len() as u64 - 1))
    }

    fn attach_node(&mut self, attachment: &NodeAttachment<'_>) -> LoadResult<()> {
        self.attachments.push(StoredAttachment {
            node: attachment.node,
            parent: attachment.parent,
            name: attachment.name.map(str::to_string),
            local_transform: attachment.local_transform,
        });

        Ok(())
    }
}
