use crate::render::host::GpuMeshId;
use crate::render::material::MaterialId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub usize);

#[derive(Debug, Clone)]
pub struct SceneMesh {
    pub source_mesh: usize,
    pub name: Option<String>,
    pub primitives: Vec<ScenePrimitive>,
}

impl SceneMesh {
    pub fn is_uploaded(&self) -> bool {
        self.primitives
            .iter()
            .all(|primitive| primitive.gpu_mesh.is_some())
    }
}

#[derive(Debug, Clone)]
pub struct ScenePrimitive {
    pub material: MaterialId,
    pub vertex_count: usize,
    pub index_count: usize,
    pub tangents_generated: bool,
    pub gpu_mesh: Option<GpuMeshId>,
}
