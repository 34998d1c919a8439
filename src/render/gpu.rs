use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::error::{LoadError, LoadResult};
use crate::render::host::{
    GpuMeshId, GpuTextureId, MeshUpload, NodeAttachment, RenderHost, TextureUpload,
};
use crate::render::node::SceneNodeId;
use crate::render::texture::ColorSpace;

pub struct GpuMesh {
    #[allow(dead_code)]
    pub vertex_buffer: wgpu::Buffer,
    #[allow(dead_code)]
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub vertex_stride: u64,
}

pub struct Texture2DPackage {
    #[allow(dead_code)]
    pub gpu_texture: wgpu::Texture,
    #[allow(dead_code)]
    pub gpu_texture_view: wgpu::TextureView,
    #[allow(dead_code)]
    pub gpu_sampler: wgpu::Sampler,
}

pub struct NodeInstance {
    pub parent: Option<SceneNodeId>,
    #[allow(dead_code)]
    pub gpu_transform_uniform_buffer: wgpu::Buffer,
    pub gpu_transform_bind_group: wgpu::BindGroup,
}

/// A render host backed by a headless wgpu device.
pub struct WgpuRenderHost {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    #[allow(dead_code)]
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    node_bind_group_layout: wgpu::BindGroupLayout,
    meshes: HashMap<GpuMeshId, GpuMesh>,
    textures: HashMap<GpuTextureId, Texture2DPackage>,
    nodes: HashMap<SceneNodeId, NodeInstance>,
    next_id: u64,
}

impl WgpuRenderHost {
    pub async fn new_headless() -> LoadResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = match instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
        {
            Some(adapter) => adapter,
            None => return Err(LoadError::Host(String::from("Failed to retrieve adapter."))),
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    label: None,
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|error| LoadError::Host(error.to_string()))?;

        let node_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("NODE_BIND_GROUP_LAYOUT"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        log::info!("Using GPU adapter: {}", adapter.get_info().name);

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            node_bind_group_layout,
            meshes: HashMap::new(),
            textures: HashMap::new(),
            nodes: HashMap::new(),
            next_id: 0,
        })
    }

    /// Number of meshes, textures and nodes resident on the device.
    pub fn resident_counts(&self) -> (usize, usize, usize) {
        (self.meshes.len(), self.textures.len(), self.nodes.len())
    }

    /// Flushes every queued write to the device.
    pub fn submit(&self) {
        self.queue.submit([]);
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl RenderHost for WgpuRenderHost {
    fn upload_mesh(&mut self, mesh: &MeshUpload<'_>) -> LoadResult<GpuMeshId> {
        if mesh.vertex_bytes.len() != mesh.vertex_stride * mesh.vertex_count {
            return Err(LoadError::Host(format!(
                "Vertex data of {} does not match its stride",
                mesh.label
            )));
        }

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{}_VERTEX_BUFFER", mesh.label)),
                contents: mesh.vertex_bytes,
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{}_INDEX_BUFFER", mesh.label)),
                contents: bytemuck::cast_slice(mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        let id = GpuMeshId(self.next_id());
        self.meshes.insert(
            id,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: mesh.indices.len() as u32,
                vertex_stride: mesh.vertex_stride as u64,
            },
        );

        Ok(id)
    }

    fn upload_texture(&mut self, texture: &TextureUpload<'_>) -> LoadResult<GpuTextureId> {
        let image = texture.image;

        if image.width == 0 || image.height == 0 {
            return Err(LoadError::Host(format!(
                "Texture {} has no pixels",
                texture.label
            )));
        }

        let image_size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };

        let format = match texture.color_space {
            ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
        };

        let gpu_texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(texture.label),
            size: image_size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &gpu_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            image_size,
        );

        let gpu_texture_view = gpu_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = texture.sampler;
        let gpu_sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{}_SAMPLER", texture.label)),
            address_mode_u: sampler.address_mode_u,
            address_mode_v: sampler.address_mode_v,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: sampler.mag_filter,
            min_filter: sampler.min_filter,
            mipmap_filter: sampler.mipmap_filter,
            ..Default::default()
        });

        let id = GpuTextureId(self.next_id());
        self.textures.insert(
            id,
            Texture2DPackage {
                gpu_texture,
                gpu_texture_view,
                gpu_sampler,
            },
        );

        Ok(id)
    }

    fn attach_node(&mut self, attachment: &NodeAttachment<'_>) -> LoadResult<()> {
        let name = attachment.name.unwrap_or("<UNNAMED>");
        let label = format!("NODE_{name}_{}", attachment.node.0);

        let gpu_transform_uniform_buffer =
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{label}_TRANSFORM_UNIFORM_BUFFER")),
                    contents: bytemuck::cast_slice(&[attachment.local_transform]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });

        let gpu_transform_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label}_TRANSFORM_BIND_GROUP")),
            layout: &self.node_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: gpu_transform_uniform_buffer.as_entire_binding(),
            }],
        });

        self.nodes.insert(
            attachment.node,
            NodeInstance {
                parent: attachment.parent,
                gpu_transform_uniform_buffer,
                gpu_transform_bind_group,
            },
        );

        Ok(())
    }
}
