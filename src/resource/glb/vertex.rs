use crate::error::{LoadError, LoadResult};
use crate::resource::glb::accessor::AccessorView;
use crate::resource::glb::document::AccessorType;

/// Vertex attribute semantics the loader knows how to place into a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantic {
    Position,
    Normal,
    TexCoord0,
    Tangent,
    Color0,
}

impl Semantic {
    pub fn from_attribute(name: &str) -> Option<Self> {
        match name {
            "POSITION" => Some(Self::Position),
            "NORMAL" => Some(Self::Normal),
            "TEXCOORD_0" => Some(Self::TexCoord0),
            "TANGENT" => Some(Self::Tangent),
            "COLOR_0" => Some(Self::Color0),
            _ => None,
        }
    }

    pub fn attribute_name(self) -> &'static str {
        match self {
            Self::Position => "POSITION",
            Self::Normal => "NORMAL",
            Self::TexCoord0 => "TEXCOORD_0",
            Self::Tangent => "TANGENT",
            Self::Color0 => "COLOR_0",
        }
    }
}

/// Read/write access to one field of a vertex type.
pub struct Field<V, T> {
    pub get: fn(&V) -> T,
    pub set: fn(&mut V, T),
}

impl<V, T> Clone for Field<V, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V, T> Copy for Field<V, T> {}

/// A vertex type the loader can fill.
///
/// Each semantic is resolved at compile time per implementing type; a `None` field means the layout does
/// not carry that attribute and the writer skips it.
pub trait VertexLayout: bytemuck::Pod + Default + Send + Sync + 'static {
    const POSITION: Field<Self, [f32; 3]>;
    const NORMAL: Option<Field<Self, [f32; 3]>> = None;
    const TEX_COORD_0: Option<Field<Self, [f32; 2]>> = None;
    const TANGENT: Option<Field<Self, [f32; 4]>> = None;
    const COLOR_0: Option<Field<Self, [f32; 4]>> = None;

    fn has_field(semantic: Semantic) -> bool {
        match semantic {
            Semantic::Position => true,
            Semantic::Normal => Self::NORMAL.is_some(),
            Semantic::TexCoord0 => Self::TEX_COORD_0.is_some(),
            Semantic::Tangent => Self::TANGENT.is_some(),
            Semantic::Color0 => Self::COLOR_0.is_some(),
        }
    }
}

/// Copies every element of `view` into `field` of the matching vertex.
pub fn write_field<V, const N: usize>(
    view: &AccessorView<'_>,
    field: Field<V, [f32; N]>,
    vertices: &mut [V],
) -> LoadResult<()> {
    check_count(view, vertices.len())?;
    view.for_each_f32::<N>(|index, value| (field.set)(&mut vertices[index], value))
}

/// Copies a VEC3 or VEC4 color accessor, giving VEC3 colors an alpha of 1.
pub fn write_color<V>(
    view: &AccessorView<'_>,
    field: Field<V, [f32; 4]>,
    vertices: &mut [V],
) -> LoadResult<()> {
    check_count(view, vertices.len())?;

    match view.accessor_type() {
        AccessorType::Vec3 => view.for_each_f32::<3>(|index, [r, g, b]| {
            (field.set)(&mut vertices[index], [r, g, b, 1.0])
        }),
        _ => view.for_each_f32::<4>(|index, value| (field.set)(&mut vertices[index], value)),
    }
}

fn check_count(view: &AccessorView<'_>, vertex_count: usize) -> LoadResult<()> {
    if view.count() != vertex_count {
        return Err(LoadError::InvalidGlb(format!(
            "attribute has {} elements but the primitive has {vertex_count} vertices",
            view.count()
        )));
    }

    Ok(())
}

/// The default vertex: every supported semantic, tightly packed for upload.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
    pub tangent: [f32; 4],
    pub color: [f32; 4],
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0; 3],
            tex_coord: [0.0; 2],
            tangent: [0.0; 4],
            color: [1.0; 4],
        }
    }
}

impl VertexLayout for Vertex {
    const POSITION: Field<Self, [f32; 3]> = Field {
        get: |vertex| vertex.position,
        set: |vertex, value| vertex.position = value,
    };
    const NORMAL: Option<Field<Self, [f32; 3]>> = Some(Field {
        get: |vertex| vertex.normal,
        set: |vertex, value| vertex.normal = value,
    });
    const TEX_COORD_0: Option<Field<Self, [f32; 2]>> = Some(Field {
        get: |vertex| vertex.tex_coord,
        set: |vertex, value| vertex.tex_coord = value,
    });
    const TANGENT: Option<Field<Self, [f32; 4]>> = Some(Field {
        get: |vertex| vertex.tangent,
        set: |vertex, value| vertex.tangent = value,
    });
    const COLOR_0: Option<Field<Self, [f32; 4]>> = Some(Field {
        get: |vertex| vertex.color,
        set: |vertex, value| vertex.color = value,
    });
}

/// Position, normal and texture coordinate only.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BasicVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl VertexLayout for BasicVertex {
    const POSITION: Field<Self, [f32; 3]> = Field {
        get: |vertex| vertex.position,
        set: |vertex, value| vertex.position = value,
    };
    const NORMAL: Option<Field<Self, [f32; 3]>> = Some(Field {
        get: |vertex| vertex.normal,
        set: |vertex, value| vertex.normal = value,
    });
    const TEX_COORD_0: Option<Field<Self, [f32; 2]>> = Some(Field {
        get: |vertex| vertex.tex_coord,
        set: |vertex, value| vertex.tex_coord = value,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::glb::document::{Accessor, ComponentType};

    fn float_accessor(type_: AccessorType, count: usize) -> Accessor {
        Accessor {
            name: None,
            buffer_view: Some(0),
            byte_offset: 0,
            component_type: ComponentType::Float,
            normalized: false,
            count,
            type_,
            max: None,
            min: None,
            sparse: None,
        }
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|value| value.to_le_bytes()).collect()
    }

    #[test]
    fn layouts_report_their_fields() {
        assert!(Vertex::has_field(Semantic::Tangent));
        assert!(Vertex::has_field(Semantic::Color0));
        assert!(BasicVertex::has_field(Semantic::TexCoord0));
        assert!(!BasicVertex::has_field(Semantic::Tangent));
        assert!(!BasicVertex::has_field(Semantic::Color0));
    }

    #[test]
    fn writes_into_the_selected_field() {
        let data = f32_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let accessor = float_accessor(AccessorType::Vec3, 2);
        let view = AccessorView::from_bytes(&data, 0, None, &accessor).unwrap();

        let mut vertices = vec![BasicVertex::default(); 2];
        write_field(&view, BasicVertex::POSITION, &mut vertices).unwrap();

        assert_eq!(vertices[0].position, [1.0, 2.0, 3.0]);
        assert_eq!(vertices[1].position, [4.0, 5.0, 6.0]);
        assert_eq!(vertices[1].normal, [0.0; 3]);
    }

    #[test]
    fn pads_rgb_colors_with_opaque_alpha() {
        let data = f32_bytes(&[0.5, 0.25, 1.0]);
        let accessor = float_accessor(AccessorType::Vec3, 1);
        let view = AccessorView::from_bytes(&data, 0, None, &accessor).unwrap();

        let mut vertices = vec![Vertex::default(); 1];
        if let Some(field) = Vertex::COLOR_0 {
            write_color(&view, field, &mut vertices).unwrap();
        }

        assert_eq!(vertices[0].color, [0.5, 0.25, 1.0, 1.0]);
    }

    #[test]
    fn rejects_count_mismatch() {
        let data = f32_bytes(&[0.0; 6]);
        let accessor = float_accessor(AccessorType::Vec3, 2);
        let view = AccessorView::from_bytes(&data, 0, None, &accessor).unwrap();

        let mut vertices = vec![Vertex::default(); 3];
        assert!(matches!(
            write_field(&view, Vertex::POSITION, &mut vertices),
            Err(LoadError::InvalidGlb(_))
        ));
    }

    #[test]
    fn semantics_round_trip_through_attribute_names() {
        for semantic in [
            Semantic::Position,
            Semantic::Normal,
            Semantic::TexCoord0,
            Semantic::Tangent,
            Semantic::Color0,
        ] {
            assert_eq!(Semantic::from_attribute(semantic.attribute_name()), Some(semantic));
        }
        assert_eq!(Semantic::from_attribute("JOINTS_0"), None);
    }
}
