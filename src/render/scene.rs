use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::data::transform::Transform;
use crate::error::{LoadError, LoadResult};
use crate::render::host::{GpuMeshId, GpuTextureId, MeshUpload, NodeAttachment, TextureUpload};
use crate::render::loader::LoadOptions;
use crate::render::material::{MaterialData, MaterialId};
use crate::render::mesh::{MeshId, SceneMesh, ScenePrimitive};
use crate::render::node::{SceneGraph, SceneNodeId, SceneObject};
use crate::render::sampler::SamplerConfig;
use crate::render::texture::{ColorSpace, TextureId, TextureRole, TextureSlot};
use crate::resource::glb::container::GlbDocument;
use crate::resource::glb::document::{Material, Scene};
use crate::resource::glb::image::{decode_image, read_encoded_image, DecodedImage};
use crate::resource::glb::primitive::{read_primitive, MeshData};
use crate::resource::glb::vertex::VertexLayout;
use crate::task::frame::FrameScheduler;
use crate::task::tracker::TaskTracker;

const SUPPORTED_VERSION: &str = "2.0";

/// Walks the active scene of a parsed document and turns it into a `SceneGraph`.
///
/// CPU work for meshes happens during the walk. Every GPU upload and node attachment is handed to the
/// frame scheduler and tracked by `tracker`, which the caller awaits afterwards.
pub(crate) struct SceneBuilder<V: VertexLayout> {
    document: Arc<GlbDocument>,
    graph: Arc<Mutex<SceneGraph>>,
    tracker: TaskTracker,
    frames: FrameScheduler,
    options: LoadOptions,
    node_registry: HashSet<usize>,
    mesh_registry: HashMap<usize, MeshId>,
    material_registry: HashMap<Option<usize>, MaterialId>,
    texture_registry: HashMap<(usize, ColorSpace), TextureId>,
    decoded_images: HashSet<usize>,
    _vertex: PhantomData<fn() -> V>,
}

impl<V: VertexLayout> SceneBuilder<V> {
    pub fn build(
        document: Arc<GlbDocument>,
        graph: Arc<Mutex<SceneGraph>>,
        tracker: TaskTracker,
        frames: FrameScheduler,
        options: LoadOptions,
    ) -> LoadResult<()> {
        let mut scene_builder = Self {
            document,
            graph,
            tracker,
            frames,
            options,
            node_registry: HashSet::new(),
            mesh_registry: HashMap::new(),
            material_registry: HashMap::new(),
            texture_registry: HashMap::new(),
            decoded_images: HashSet::new(),
            _vertex: PhantomData,
        };
        scene_builder.load_document()
    }

    fn load_document(&mut self) -> LoadResult<()> {
        let document = self.document.clone();
        let gltf = &document.gltf;

        if gltf.asset.version != SUPPORTED_VERSION {
            return Err(LoadError::NotSupported(format!(
                "The given glTF version is not supported: {}",
                gltf.asset.version
            )));
        }

        let scene_index = match self.options.scene.or(gltf.scene) {
            Some(scene_index) => scene_index,
            None if gltf.scenes.is_empty() => {
                log::info!("The given glTF asset has no scenes; nothing to load.");
                return Ok(());
            }
            None => 0,
        };

        self.load_scene(gltf.scene(scene_index)?, scene_index)
    }

    fn load_scene(&mut self, scene: &Scene, scene_index: usize) -> LoadResult<()> {
        log::debug!(
            "Loading glTF scene: {} - [{}]",
            scene.name.as_deref().unwrap_or("<UNNAMED>"),
            scene_index,
        );

        for node_index in &scene.nodes {
            self.load_node(*node_index, None)?;
        }

        Ok(())
    }

    fn load_node(
        &mut self,
        node_index: usize,
        parent: Option<SceneNodeId>,
    ) -> LoadResult<SceneNodeId> {
        self.tracker.cancellation().check()?;

        if !self.node_registry.insert(node_index) {
            return Err(LoadError::InvalidGlb(format!(
                "A node with the given ID has already been registered: {node_index}"
            )));
        }

        let document = self.document.clone();
        let node = document.gltf.node(node_index)?;
        let node_name = node.name.as_deref().unwrap_or("<UNNAMED>");

        log::debug!("Loading glTF node: {node_name} - [{node_index}]");

        let local_transform = Transform::from_node(node);
        let id = self.graph.lock().add_node(
            parent,
            SceneObject::new(node_index, node.name.clone(), local_transform),
        );

        self.enqueue_attach(id, parent, node.name.clone(), local_transform);

        if let Some(camera) = node.camera {
            log::debug!("Skipping camera {camera} of glTF node: {node_name} - [{node_index}]");
        }
        if let Some(skin) = node.skin {
            log::debug!("Skipping skin {skin} of glTF node: {node_name} - [{node_index}]");
        }

        if let Some(mesh_index) = node.mesh {
            let mesh_id = self.load_mesh(mesh_index)?;
            if let Some(object) = self.graph.lock().node_mut(id) {
                object.mesh = Some(mesh_id);
            }
        }

        for child in &node.children {
            self.load_node(*child, Some(id))?;
        }

        Ok(id)
    }

    fn enqueue_attach(
        &self,
        node: SceneNodeId,
        parent: Option<SceneNodeId>,
        name: Option<String>,
        local_transform: Transform,
    ) {
        let cancel = self.tracker.cancellation().clone();
        let attached = self.frames.schedule(move |host| -> LoadResult<()> {
            cancel.check()?;
            host.attach_node(&NodeAttachment {
                node,
                parent,
                name: name.as_deref(),
                local_transform: local_transform.to_matrix_array(),
            })
        });

        let graph = self.graph.clone();
        self.tracker.spawn(async move {
            attached.await??;
            if let Some(object) = graph.lock().node_mut(node) {
                object.live = true;
            }
            Ok::<_, LoadError>(())
        });
    }

    fn load_mesh(&mut self, mesh_index: usize) -> LoadResult<MeshId> {
        let document = self.document.clone();
        let mesh = document.gltf.mesh(mesh_index)?;
        let mesh_name = mesh.name.as_deref().unwrap_or("<UNNAMED>");
        let mesh_log_name = format!("{mesh_name} - [{mesh_index}]");

        if let Some(mesh_id) = self.mesh_registry.get(&mesh_index) {
            log::debug!("Skipping duplicate load of glTF mesh: {mesh_log_name}");
            return Ok(*mesh_id);
        }

        log::debug!("Loading glTF mesh: {mesh_log_name}");

        let label_prefix = format!("MESH_{mesh_name}_{mesh_index}");
        let mut primitives = Vec::with_capacity(mesh.primitives.len());
        let mut uploads = Vec::with_capacity(mesh.primitives.len());

        for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
            log::debug!("Loading glTF primitive {primitive_index} for glTF mesh: {mesh_log_name}");

            let material = self.load_material(primitive.material)?;
            let mesh_data =
                read_primitive::<V>(&document, primitive, self.options.generate_tangents)?;

            if mesh_data.tangents_generated {
                log::debug!(
                    "Generated tangents for glTF primitive {primitive_index} of glTF mesh: {mesh_log_name}"
                );
            }

            primitives.push(ScenePrimitive {
                material,
                vertex_count: mesh_data.vertices.len(),
                index_count: mesh_data.indices.len(),
                tangents_generated: mesh_data.tangents_generated,
                gpu_mesh: None,
            });
            uploads.push((
                format!("{label_prefix}_PRIMITIVE_{primitive_index}"),
                mesh_data,
            ));
        }

        let mesh_id = self.graph.lock().add_mesh(SceneMesh {
            source_mesh: mesh_index,
            name: mesh.name.clone(),
            primitives,
        });
        self.mesh_registry.insert(mesh_index, mesh_id);

        for (primitive_index, (label, mesh_data)) in uploads.into_iter().enumerate() {
            self.enqueue_mesh_upload(mesh_id, primitive_index, label, mesh_data);
        }

        Ok(mesh_id)
    }

    fn enqueue_mesh_upload(
        &self,
        mesh_id: MeshId,
        primitive_index: usize,
        label: String,
        mesh_data: MeshData<V>,
    ) {
        let cancel = self.tracker.cancellation().clone();
        let uploaded = self.frames.schedule(move |host| -> LoadResult<GpuMeshId> {
            cancel.check()?;
            host.upload_mesh(&MeshUpload {
                label: &label,
                vertex_bytes: bytemuck::cast_slice(&mesh_data.vertices),
                vertex_stride: std::mem::size_of::<V>(),
                vertex_count: mesh_data.vertices.len(),
                indices: &mesh_data.indices,
            })
        });

        let graph = self.graph.clone();
        self.tracker.spawn(async move {
            let gpu_mesh = uploaded.await??;
            if let Some(primitive) = graph.lock().primitive_mut(mesh_id, primitive_index) {
                primitive.gpu_mesh = Some(gpu_mesh);
            }
            Ok::<_, LoadError>(())
        });
    }

    fn load_material(&mut self, material_index: Option<usize>) -> LoadResult<MaterialId> {
        let material_log_name = match material_index {
            Some(index) => index.to_string(),
            None => String::from("<DEFAULT>"),
        };

        if let Some(material_id) = self.material_registry.get(&material_index) {
            log::debug!("Skipping duplicate load of glTF material: [{material_log_name}]");
            return Ok(*material_id);
        }

        let document = self.document.clone();
        let default_material;
        let material = match material_index {
            Some(index) => document.gltf.material(index)?,
            None => {
                default_material = Material::default();
                &default_material
            }
        };

        log::debug!(
            "Loading glTF material: {} - [{material_log_name}]",
            material.name.as_deref().unwrap_or("<UNNAMED>"),
        );

        let mut material_data = MaterialData::from_gltf(material_index, material);
        let pbr = &material.pbr_metallic_roughness;

        if let Some(texture_info) = &pbr.base_color_texture {
            material_data.base_color_texture =
                self.load_texture(texture_info.index, TextureRole::BaseColor)?;
        }
        if let Some(texture_info) = &pbr.metallic_roughness_texture {
            material_data.metallic_roughness_texture =
                self.load_texture(texture_info.index, TextureRole::MetallicRoughness)?;
        }
        if let Some(texture_info) = &material.normal_texture {
            material_data.normal_texture =
                self.load_texture(texture_info.index, TextureRole::Normal)?;
        }
        if let Some(texture_info) = &material.occlusion_texture {
            self.load_texture(texture_info.index, TextureRole::Occlusion)?;
        }
        if let Some(texture_info) = &material.emissive_texture {
            self.load_texture(texture_info.index, TextureRole::Emissive)?;
        }

        let material_id = self.graph.lock().add_material(material_data);
        self.material_registry.insert(material_index, material_id);

        Ok(material_id)
    }

    fn load_texture(
        &mut self,
        texture_index: usize,
        role: TextureRole,
    ) -> LoadResult<Option<TextureId>> {
        let color_space = role.color_space();

        let document = self.document.clone();
        let texture = document.gltf.texture(texture_index)?;
        let texture_name = texture.name.as_deref().unwrap_or("<UNNAMED>");
        let texture_log_name = format!("{texture_name} - [{texture_index}]");

        if role.is_uploaded() {
            if let Some(texture_id) = self.texture_registry.get(&(texture_index, color_space)) {
                log::debug!("Skipping duplicate load of glTF texture: {texture_log_name}");
                return Ok(Some(*texture_id));
            }
        }

        let image_index = texture.source.ok_or_else(|| {
            LoadError::NotSupported(format!(
                "The given texture has no image source: {texture_log_name}"
            ))
        })?;

        if !role.is_uploaded() {
            if self.decoded_images.insert(image_index) {
                log::debug!("Decoding {role:?} glTF texture without upload: {texture_log_name}");
                self.enqueue_decode_only(image_index, &document)?;
            }
            return Ok(None);
        }

        log::debug!("Loading glTF texture: {texture_log_name}");

        let sampler = match texture.sampler {
            Some(sampler_index) => SamplerConfig::from_gltf(document.gltf.sampler(sampler_index)?),
            None => SamplerConfig::default(),
        };

        let (encoded, format) = read_encoded_image(&document, image_index)?;

        let texture_id = self.graph.lock().add_texture(TextureSlot {
            source_texture: texture_index,
            source_image: image_index,
            name: texture.name.clone(),
            color_space,
            sampler,
            dimensions: None,
            gpu_texture: None,
        });
        self.texture_registry
            .insert((texture_index, color_space), texture_id);
        self.decoded_images.insert(image_index);

        let label = format!("TEXTURE_{texture_name}_{texture_index}_{color_space:?}");
        let cancel = self.tracker.cancellation().clone();
        let tracker = self.tracker.clone();
        let frames = self.frames.clone();
        let graph = self.graph.clone();

        self.tracker.spawn(async move {
            let image = decode_on_pool(encoded, format).await?;
            cancel.check()?;

            let dimensions = (image.width, image.height);
            let upload_cancel = cancel.clone();
            let uploaded = frames.schedule(move |host| -> LoadResult<GpuTextureId> {
                upload_cancel.check()?;
                host.upload_texture(&TextureUpload {
                    label: &label,
                    image: &image,
                    color_space,
                    sampler: &sampler,
                })
            });

            tracker.spawn(async move {
                let gpu_texture = uploaded.await??;
                if let Some(slot) = graph.lock().texture_mut(texture_id) {
                    slot.gpu_texture = Some(gpu_texture);
                    slot.dimensions = Some(dimensions);
                }
                Ok::<_, LoadError>(())
            });

            Ok::<_, LoadError>(())
        });

        Ok(Some(texture_id))
    }

    fn enqueue_decode_only(&self, image_index: usize, document: &GlbDocument) -> LoadResult<()> {
        let (encoded, format) = read_encoded_image(document, image_index)?;
        let cancel = self.tracker.cancellation().clone();

        self.tracker.spawn(async move {
            let image = decode_on_pool(encoded, format).await?;
            cancel.check()?;
            log::debug!(
                "Decoded glTF image [{image_index}]: {}x{}",
                image.width,
                image.height
            );
            Ok::<_, LoadError>(())
        });

        Ok(())
    }
}

async fn decode_on_pool(encoded: Vec<u8>, format: image::ImageFormat) -> LoadResult<DecodedImage> {
    tokio::task::spawn_blocking(move || decode_image(&encoded, format))
        .await
        .map_err(|error| LoadError::TaskFailed(error.to_string()))?
}
