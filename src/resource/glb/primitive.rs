use crate::error::{LoadError, LoadResult};
use crate::resource::glb::accessor::{filled_vec, AccessorView};
use crate::resource::glb::container::GlbDocument;
use crate::resource::glb::document::{Primitive, PrimitiveMode};
use crate::resource::glb::tangent::{check_indices, generate_tangents};
use crate::resource::glb::vertex::{write_color, write_field, Semantic, VertexLayout};

/// CPU-side geometry of one primitive, ready for upload.
#[derive(Debug, Clone)]
pub struct MeshData<V> {
    pub vertices: Vec<V>,
    pub indices: Vec<u32>,
    pub tangents_generated: bool,
}

/// Decodes the attributes and indices of a triangle primitive into `V` vertices.
///
/// Primitives without indices get the sequence `0..vertex_count`.
pub fn read_primitive<V: VertexLayout>(
    document: &GlbDocument,
    primitive: &Primitive,
    allow_tangent_generation: bool,
) -> LoadResult<MeshData<V>> {
    if primitive.mode != PrimitiveMode::Triangles {
        return Err(LoadError::NotSupported(format!(
            "The given primitive uses an unsupported topology: {:?}",
            primitive.mode
        )));
    }

    let position_accessor = primitive
        .attributes
        .get(Semantic::Position.attribute_name())
        .ok_or_else(|| {
            LoadError::InvalidGlb(String::from(
                "The given primitive has no position attribute.",
            ))
        })?;

    let positions = AccessorView::new(document, *position_accessor)?;
    let mut vertices = filled_vec(positions.count(), V::default())?;
    write_field(&positions, V::POSITION, &mut vertices)?;

    for (name, accessor_index) in primitive.attributes.iter() {
        let semantic = match Semantic::from_attribute(name) {
            Some(Semantic::Position) => continue,
            Some(semantic) => semantic,
            None => {
                log::debug!("Ignoring unsupported vertex attribute: {name}");
                continue;
            }
        };

        if !V::has_field(semantic) {
            continue;
        }

        let view = AccessorView::new(document, *accessor_index)?;
        match semantic {
            Semantic::Position => {}
            Semantic::Normal => {
                if let Some(field) = V::NORMAL {
                    write_field(&view, field, &mut vertices)?;
                }
            }
            Semantic::TexCoord0 => {
                if let Some(field) = V::TEX_COORD_0 {
                    write_field(&view, field, &mut vertices)?;
                }
            }
            Semantic::Tangent => {
                if let Some(field) = V::TANGENT {
                    write_field(&view, field, &mut vertices)?;
                }
            }
            Semantic::Color0 => {
                if let Some(field) = V::COLOR_0 {
                    write_color(&view, field, &mut vertices)?;
                }
            }
        }
    }

    if !primitive.targets.is_empty() {
        log::debug!(
            "Ignoring {} morph targets of the given primitive",
            primitive.targets.len()
        );
    }

    let indices = match primitive.indices {
        Some(accessor_index) => Some(AccessorView::new(document, accessor_index)?.read_indices()?),
        None => None,
    };

    let has_attribute = |semantic: Semantic| primitive.attributes.contains_key(semantic.attribute_name());
    let tangents_generated = allow_tangent_generation
        && has_attribute(Semantic::Normal)
        && has_attribute(Semantic::TexCoord0)
        && !has_attribute(Semantic::Tangent)
        && generate_tangents(&mut vertices, indices.as_deref())?;

    let indices = match indices {
        Some(indices) => {
            check_indices(&indices, vertices.len())?;
            indices
        }
        None => (0..vertices.len() as u32).collect(),
    };

    Ok(MeshData {
        vertices,
        indices,
        tangents_generated,
    })
}
