#![allow(dead_code)]

use std::io::Cursor;
use std::time::Duration;

use glb_loader::error::{LoadError, LoadResult};
use glb_loader::render::host::{
    GpuMeshId, GpuTextureId, MeshUpload, NodeAttachment, RenderHost, TextureUpload,
};
use glb_loader::render::loader::{GlbModelLoader, LoadedModel};
use glb_loader::render::memory::MemoryRenderHost;
use glb_loader::resource::glb::vertex::VertexLayout;
use glb_loader::task::cancel::CancellationToken;
use glb_loader::task::frame::FrameScheduler;
use serde_json::{json, Value};

pub const CHUNK_TYPE_JSON: u32 = 0x4E4F534A;
pub const CHUNK_TYPE_BIN: u32 = 0x004E4942;

pub fn chunk(chunk_type: u32, data: &[u8], padding: u8) -> Vec<u8> {
    let padded_length = data.len().div_ceil(4) * 4;
    let mut bytes = Vec::with_capacity(8 + padded_length);
    bytes.extend_from_slice(&(padded_length as u32).to_le_bytes());
    bytes.extend_from_slice(&chunk_type.to_le_bytes());
    bytes.extend_from_slice(data);
    bytes.resize(8 + padded_length, padding);
    bytes
}

/// Header plus the given, already framed, chunks.
pub fn glb_from_chunks(chunks: &[Vec<u8>]) -> Vec<u8> {
    let body = chunks.concat();
    let mut bytes = b"glTF".to_vec();
    bytes.extend_from_slice(&2u32.to_le_bytes());
    bytes.extend_from_slice(&((12 + body.len()) as u32).to_le_bytes());
    bytes.extend_from_slice(&body);
    bytes
}

pub fn glb(json: &Value, bin: &[u8]) -> Vec<u8> {
    let json = serde_json::to_vec(json).unwrap();
    let mut chunks = vec![chunk(CHUNK_TYPE_JSON, &json, b' ')];
    if !bin.is_empty() {
        chunks.push(chunk(CHUNK_TYPE_BIN, bin, 0));
    }
    glb_from_chunks(&chunks)
}

/// A 2x2 RGBA image encoded as PNG.
pub fn png_bytes() -> Vec<u8> {
    let image = image::RgbaImage::from_fn(2, 2, |x, y| image::Rgba([x as u8 * 255, y as u8 * 255, 0, 255]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// Builds the BIN chunk and the buffer-related JSON arrays of a test asset.
#[derive(Default)]
pub struct GlbFixture {
    bin: Vec<u8>,
    buffer_views: Vec<Value>,
    accessors: Vec<Value>,
    images: Vec<Value>,
}

impl GlbFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_view(&mut self, bytes: &[u8]) -> usize {
        self.bin.resize(self.bin.len().div_ceil(4) * 4, 0);
        self.buffer_views.push(json!({
            "buffer": 0,
            "byteOffset": self.bin.len(),
            "byteLength": bytes.len(),
        }));
        self.bin.extend_from_slice(bytes);
        self.buffer_views.len() - 1
    }

    pub fn push_accessor(&mut self, accessor: Value) -> usize {
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    pub fn push_floats<const N: usize>(&mut self, values: &[[f32; N]]) -> usize {
        let bytes: Vec<u8> = values
            .iter()
            .flatten()
            .flat_map(|value| value.to_le_bytes())
            .collect();
        let view = self.push_view(&bytes);
        let type_ = match N {
            1 => "SCALAR",
            2 => "VEC2",
            3 => "VEC3",
            _ => "VEC4",
        };

        self.push_accessor(json!({
            "bufferView": view,
            "componentType": 5126,
            "count": values.len(),
            "type": type_,
        }))
    }

    pub fn push_u16_indices(&mut self, indices: &[u16]) -> usize {
        let bytes: Vec<u8> = indices.iter().flat_map(|index| index.to_le_bytes()).collect();
        let view = self.push_view(&bytes);

        self.push_accessor(json!({
            "bufferView": view,
            "componentType": 5123,
            "count": indices.len(),
            "type": "SCALAR",
        }))
    }

    pub fn push_u8_indices(&mut self, indices: &[u8]) -> usize {
        let view = self.push_view(indices);

        self.push_accessor(json!({
            "bufferView": view,
            "componentType": 5121,
            "count": indices.len(),
            "type": "SCALAR",
        }))
    }

    pub fn push_image(&mut self, bytes: &[u8], mime_type: &str) -> usize {
        let view = self.push_view(bytes);
        self.images.push(json!({ "bufferView": view, "mimeType": mime_type }));
        self.images.len() - 1
    }

    /// Merges the collected buffer data into `root` and frames everything as GLB.
    pub fn build(mut self, mut root: Value) -> Vec<u8> {
        self.bin.resize(self.bin.len().div_ceil(4) * 4, 0);

        let object = root.as_object_mut().unwrap();
        object
            .entry("asset")
            .or_insert_with(|| json!({ "version": "2.0" }));
        if !self.bin.is_empty() {
            object.insert("buffers".into(), json!([{ "byteLength": self.bin.len() }]));
        }
        if !self.buffer_views.is_empty() {
            object.insert("bufferViews".into(), Value::Array(self.buffer_views));
        }
        if !self.accessors.is_empty() {
            object.insert("accessors".into(), Value::Array(self.accessors));
        }
        if !self.images.is_empty() {
            object.insert("images".into(), Value::Array(self.images));
        }

        glb(&root, &self.bin)
    }
}

pub const QUAD_POSITIONS: [[f32; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
];
pub const QUAD_NORMALS: [[f32; 3]; 4] = [[0.0, 0.0, 1.0]; 4];
pub const QUAD_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Accessor indices of a unit quad: (position, normal, uv, indices).
pub fn push_quad(fixture: &mut GlbFixture) -> (usize, usize, usize, usize) {
    (
        fixture.push_floats(&QUAD_POSITIONS),
        fixture.push_floats(&QUAD_NORMALS),
        fixture.push_floats(&QUAD_UVS),
        fixture.push_u16_indices(&QUAD_INDICES),
    )
}

/// Forwards to a `MemoryRenderHost` but fails mesh uploads once `mesh_limit` meshes are stored.
struct LimitedHost<'a> {
    inner: &'a mut MemoryRenderHost,
    mesh_limit: Option<usize>,
}

impl RenderHost for LimitedHost<'_> {
    fn upload_mesh(&mut self, mesh: &MeshUpload<'_>) -> LoadResult<GpuMeshId> {
        if self
            .mesh_limit
            .is_some_and(|limit| self.inner.meshes.len() >= limit)
        {
            return Err(LoadError::Host(format!(
                "Out of mesh memory while uploading {}",
                mesh.label
            )));
        }

        self.inner.upload_mesh(mesh)
    }

    fn upload_texture(&mut self, texture: &TextureUpload<'_>) -> LoadResult<GpuTextureId> {
        self.inner.upload_texture(texture)
    }

    fn attach_node(&mut self, attachment: &NodeAttachment<'_>) -> LoadResult<()> {
        self.inner.attach_node(attachment)
    }
}

pub struct LoadHarness {
    pub frames: FrameScheduler,
    pub loader: GlbModelLoader,
    pub host: MemoryRenderHost,
    /// Fail every mesh upload once this many meshes have been accepted.
    pub mesh_limit: Option<usize>,
    runtime: tokio::runtime::Runtime,
}

impl LoadHarness {
    pub fn new() -> Self {
        let frames = FrameScheduler::new();

        Self {
            loader: GlbModelLoader::new(frames.clone()),
            frames,
            host: MemoryRenderHost::default(),
            mesh_limit: None,
            runtime: tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap(),
        }
    }

    pub fn live_buffers(&self) -> usize {
        self.loader.buffer_store().live_buffers()
    }

    pub fn load<V: VertexLayout>(&mut self, data: Vec<u8>) -> LoadResult<LoadedModel> {
        self.load_with::<V>(data, CancellationToken::new(), |_| {})
    }

    /// Plays the render thread until the load finishes, calling `before_frame` ahead of every frame.
    pub fn load_with<V: VertexLayout>(
        &mut self,
        data: Vec<u8>,
        cancel: CancellationToken,
        mut before_frame: impl FnMut(&FrameScheduler),
    ) -> LoadResult<LoadedModel> {
        let loader = self.loader.clone();
        let load = self
            .runtime
            .spawn(async move { loader.load::<V>(data, cancel).await });

        while !load.is_finished() {
            before_frame(&self.frames);
            self.frames.run_frame(&mut LimitedHost {
                inner: &mut self.host,
                mesh_limit: self.mesh_limit,
            });
            std::thread::sleep(Duration::from_millis(1));
        }

        self.runtime.block_on(load).unwrap()
    }
}
