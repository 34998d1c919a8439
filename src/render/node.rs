use crate::data::transform::Transform;
use crate::render::material::{MaterialData, MaterialId};
use crate::render::mesh::{MeshId, SceneMesh, ScenePrimitive};
use crate::render::texture::{TextureId, TextureSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneNodeId(pub usize);

/// The engine-side object created for one glTF node.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub source_node: usize,
    pub name: Option<String>,
    pub local_transform: Transform,
    pub children: Vec<SceneNodeId>,
    pub mesh: Option<MeshId>,
    /// Set once the object has been attached to the live scene by the render host.
    pub live: bool,
}

impl SceneObject {
    pub fn new(source_node: usize, name: Option<String>, local_transform: Transform) -> Self {
        Self {
            source_node,
            name,
            local_transform,
            children: Vec::new(),
            mesh: None,
            live: false,
        }
    }
}

/// Arena of everything a load creates.
///
/// Nodes, meshes, materials and textures refer to each other by id, never by pointer.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneObject>,
    roots: Vec<SceneNodeId>,
    meshes: Vec<SceneMesh>,
    materials: Vec<MaterialData>,
    textures: Vec<TextureSlot>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `object` below `parent`, or as a root when there is none.
    pub fn add_node(&mut self, parent: Option<SceneNodeId>, object: SceneObject) -> SceneNodeId {
        let id = SceneNodeId(self.nodes.len());
        self.nodes.push(object);

        match parent.and_then(|parent| self.nodes.get_mut(parent.0)) {
            Some(parent) => parent.children.push(id),
            None => self.roots.push(id),
        }

        id
    }

    pub fn add_mesh(&mut self, mesh: SceneMesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_material(&mut self, material: MaterialData) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn add_texture(&mut self, texture: TextureSlot) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() - 1)
    }

    pub fn node(&self, id: SceneNodeId) -> Option<&SceneObject> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: SceneNodeId) -> Option<&mut SceneObject> {
        self.nodes.get_mut(id.0)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&SceneMesh> {
        self.meshes.get(id.0)
    }

    pub fn primitive_mut(&mut self, id: MeshId, primitive: usize) -> Option<&mut ScenePrimitive> {
        self.meshes.get_mut(id.0)?.primitives.get_mut(primitive)
    }

    pub fn texture(&self, id: TextureId) -> Option<&TextureSlot> {
        self.textures.get(id.0)
    }

    pub fn texture_mut(&mut self, id: TextureId) -> Option<&mut TextureSlot> {
        self.textures.get_mut(id.0)
    }

    pub fn roots(&self) -> &[SceneNodeId] {
        &self.roots
    }

    pub fn nodes(&self) -> impl Iterator<Item = (SceneNodeId, &SceneObject)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, object)| (SceneNodeId(index), object))
    }

    pub fn meshes(&self) -> &[SceneMesh] {
        &self.meshes
    }

    pub fn materials(&self) -> &[MaterialData] {
        &self.materials
    }

    pub fn textures(&self) -> &[TextureSlot] {
        &self.textures
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_fully_live(&self) -> bool {
        self.nodes.iter().all(|object| object.live)
    }

    /// The object-to-world matrix of every node reachable from a root, parents first.
    pub fn world_transforms(&self) -> Vec<(SceneNodeId, cgmath::Matrix4<f32>)> {
        let mut transforms = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(SceneNodeId, Option<cgmath::Matrix4<f32>>)> =
            self.roots.iter().rev().map(|root| (*root, None)).collect();

        while let Some((id, parent_transform_matrix)) = stack.pop() {
            let Some(object) = self.node(id) else {
                continue;
            };

            let local_transform_matrix = cgmath::Matrix4::from(object.local_transform);
            let global_transform_matrix = match parent_transform_matrix {
                Some(parent_transform_matrix) => parent_transform_matrix * local_transform_matrix,
                None => local_transform_matrix,
            };

            transforms.push((id, global_transform_matrix));
            stack.extend(
                object
                    .children
                    .iter()
                    .rev()
                    .map(|child| (*child, Some(global_transform_matrix))),
            );
        }

        transforms
    }
}
