use crate::error::{LoadError, LoadResult};
use crate::resource::glb::buffer::{NativeBuffer, NativeBufferStore};
use crate::resource::glb::document::GltfDocument;

pub const GLB_MAGIC: [u8; 4] = *b"glTF";
pub const GLB_VERSION: u32 = 2;
pub const GLB_HEADER_LENGTH: usize = 12;
pub const GLB_CHUNK_HEADER_LENGTH: usize = 8;
pub const CHUNK_TYPE_JSON: u32 = 0x4E4F_534A;
pub const CHUNK_TYPE_BIN: u32 = 0x004E_4942;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlbHeader {
    pub version: u32,
    pub declared_length: u32,
}

/// A parsed GLB file: the JSON document plus one buffer per BIN chunk.
///
/// Dropping the document releases every buffer it owns.
#[derive(Debug)]
pub struct GlbDocument {
    pub header: GlbHeader,
    pub gltf: GltfDocument,
    buffers: Vec<NativeBuffer>,
}

impl GlbDocument {
    pub fn binary_chunks(&self) -> &[NativeBuffer] {
        &self.buffers
    }

    /// Resolves a buffer index to the backing BIN chunk.
    pub fn buffer_data(&self, buffer_index: usize) -> LoadResult<&NativeBuffer> {
        let buffer = self.gltf.buffer(buffer_index)?;

        if let Some(uri) = &buffer.uri {
            return Err(LoadError::NotSupported(format!(
                "External buffer URIs are not supported: {uri}"
            )));
        }

        let data = self
            .buffers
            .get(buffer_index)
            .ok_or(LoadError::missing("binary chunk", buffer_index))?;

        if buffer.byte_length > data.len() {
            return Err(LoadError::InvalidGlb(format!(
                "Buffer {buffer_index} declares {} bytes but its chunk holds {}",
                buffer.byte_length,
                data.len()
            )));
        }

        Ok(data)
    }

    /// Returns the byte range covered by a buffer view.
    ///
    /// The range must lie inside the buffer's declared `byteLength`, not just inside the padded chunk.
    pub fn buffer_view_data(&self, view_index: usize) -> LoadResult<&[u8]> {
        let view = self.gltf.buffer_view(view_index)?;
        let declared_length = self.gltf.buffer(view.buffer)?.byte_length;
        let buffer = self.buffer_data(view.buffer)?.slice(0, declared_length)?;

        view.byte_offset
            .checked_add(view.byte_length)
            .and_then(|end| buffer.get(view.byte_offset..end))
            .ok_or_else(|| {
                LoadError::InvalidGlb(format!(
                    "Buffer view {view_index} ({} bytes at offset {}) exceeds the {declared_length} bytes of buffer {}",
                    view.byte_length, view.byte_offset, view.buffer
                ))
            })
    }
}

/// Parses a GLB container using a private buffer ledger.
pub fn parse_glb(data: &[u8]) -> LoadResult<GlbDocument> {
    parse_glb_with_store(data, &NativeBufferStore::new())
}

/// Parses a GLB container, allocating binary chunks through `store`.
///
/// On error every buffer allocated so far has already been released when this returns.
pub fn parse_glb_with_store(data: &[u8], store: &NativeBufferStore) -> LoadResult<GlbDocument> {
    let header = read_header(data)?;

    let mut gltf: Option<GltfDocument> = None;
    let mut buffers: Vec<NativeBuffer> = vec![];
    let mut position = GLB_HEADER_LENGTH;

    while position < data.len() {
        let chunk_header = data
            .get(position..position + GLB_CHUNK_HEADER_LENGTH)
            .ok_or_else(|| {
                LoadError::InvalidContainer(format!("Truncated chunk header at byte {position}"))
            })?;
        let chunk_length = read_u32(chunk_header, 0) as usize;
        let chunk_type = read_u32(chunk_header, 4);

        let chunk_start = position + GLB_CHUNK_HEADER_LENGTH;
        let chunk_data = chunk_start
            .checked_add(chunk_length)
            .and_then(|chunk_end| data.get(chunk_start..chunk_end))
            .ok_or_else(|| {
                LoadError::InvalidContainer(format!(
                    "Chunk at byte {position} declares {chunk_length} bytes past the end of the input"
                ))
            })?;

        match (gltf.is_some(), chunk_type) {
            (false, CHUNK_TYPE_JSON) => {
                gltf = Some(GltfDocument::from_slice(chunk_data)?);
            }
            (false, _) => {
                return Err(LoadError::InvalidContainer(format!(
                    "The first chunk must be JSON, found chunk type {chunk_type:#010x}"
                )));
            }
            (true, CHUNK_TYPE_BIN) => {
                log::debug!("Reading GLB binary chunk: {chunk_length} bytes");
                buffers.push(store.allocate(chunk_data));
            }
            (true, _) => {
                log::warn!("Skipping GLB chunk of unknown type {chunk_type:#010x}");
            }
        }

        position = align4(chunk_start + chunk_length);
    }

    let gltf = gltf.ok_or_else(|| {
        LoadError::InvalidContainer(String::from("The container has no JSON chunk"))
    })?;

    if !gltf.extensions_required.is_empty() {
        return Err(LoadError::NotSupported(format!(
            "Required glTF extensions are not supported: {}",
            gltf.extensions_required.join(", ")
        )));
    }

    Ok(GlbDocument {
        header,
        gltf,
        buffers,
    })
}

fn read_header(data: &[u8]) -> LoadResult<GlbHeader> {
    let header = data.get(..GLB_HEADER_LENGTH).ok_or_else(|| {
        LoadError::InvalidContainer(format!(
            "The input is {} bytes, shorter than a GLB header",
            data.len()
        ))
    })?;

    if header[..4] != GLB_MAGIC {
        return Err(LoadError::InvalidContainer(String::from(
            "The input does not start with the glTF magic",
        )));
    }

    let version = read_u32(header, 4);
    if version != GLB_VERSION {
        return Err(LoadError::NotSupported(format!(
            "GLB container version {version}"
        )));
    }

    let declared_length = read_u32(header, 8);
    if declared_length as usize != data.len() {
        log::warn!(
            "GLB header declares {declared_length} bytes but the input has {}",
            data.len()
        );
    }

    Ok(GlbHeader {
        version,
        declared_length,
    })
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn align4(position: usize) -> usize {
    (position + 3) & !3
}
