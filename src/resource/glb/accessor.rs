use crate::error::{LoadError, LoadResult};
use crate::resource::glb::container::GlbDocument;
use crate::resource::glb::document::{Accessor, AccessorType, ComponentType};
use crate::resource::glb::widen;

// Largest element of any accessor type (MAT4 of f32), used as the backing for view-less accessors.
static ZEROED_ELEMENT: [u8; 64] = [0; 64];

/// Upper bound on the element count of an accessor without a buffer view.
///
/// Such accessors have no bytes to check `count` against.
pub const MAX_VIEW_LESS_COUNT: usize = 1 << 24;

/// Allocates `count` copies of `value`, reporting allocation failure instead of aborting.
pub(crate) fn filled_vec<T: Clone>(count: usize, value: T) -> LoadResult<Vec<T>> {
    let mut values = Vec::new();
    values.try_reserve_exact(count).map_err(|error| {
        LoadError::InvalidGlb(format!("Cannot allocate {count} elements: {error}"))
    })?;
    values.resize(count, value);
    Ok(values)
}

/// A bounds-checked, strided window onto the elements of one accessor.
#[derive(Debug, Clone, Copy)]
pub struct AccessorView<'a> {
    data: &'a [u8],
    stride: usize,
    count: usize,
    component_type: ComponentType,
    type_: AccessorType,
    normalized: bool,
}

impl<'a> AccessorView<'a> {
    /// Resolves accessor `index` against the document's buffer views and binary chunks.
    pub fn new(document: &'a GlbDocument, index: usize) -> LoadResult<Self> {
        let accessor = document.gltf.accessor(index)?;

        if accessor.sparse.is_some() {
            return Err(LoadError::NotSupported(format!(
                "Sparse accessors are not supported: accessor {index}"
            )));
        }

        let view_index = match accessor.buffer_view {
            Some(view_index) => view_index,
            None => {
                return Self::zeroed(accessor).map_err(|message| {
                    LoadError::InvalidGlb(format!("Accessor {index}: {message}"))
                })
            }
        };

        let view = document.gltf.buffer_view(view_index)?;
        let view_data = document.buffer_view_data(view_index)?;

        Self::from_bytes(
            view_data,
            accessor.byte_offset,
            view.byte_stride,
            accessor,
        )
        .map_err(|error| match error {
            LoadError::InvalidGlb(message) => {
                LoadError::InvalidGlb(format!("Accessor {index}: {message}"))
            }
            error => error,
        })
    }

    /// Builds a view over raw buffer-view bytes, validating that every element lies inside them.
    pub fn from_bytes(
        view_data: &'a [u8],
        byte_offset: usize,
        byte_stride: Option<usize>,
        accessor: &Accessor,
    ) -> LoadResult<Self> {
        let element_size = accessor.component_type.size() * accessor.type_.component_count();
        let stride = byte_stride.unwrap_or(element_size);

        if stride < element_size {
            return Err(LoadError::InvalidGlb(format!(
                "byte stride {stride} is smaller than the element size {element_size}"
            )));
        }

        let data = view_data.get(byte_offset..).ok_or_else(|| {
            LoadError::InvalidGlb(format!(
                "byte offset {byte_offset} lies outside its {} byte buffer view",
                view_data.len()
            ))
        })?;

        if accessor.count > 0 {
            let required = (accessor.count - 1)
                .checked_mul(stride)
                .and_then(|length| length.checked_add(element_size));

            match required {
                Some(required) if required <= data.len() => {}
                _ => {
                    return Err(LoadError::InvalidGlb(format!(
                        "{} elements of {element_size} bytes with stride {stride} do not fit in {} bytes",
                        accessor.count,
                        data.len()
                    )))
                }
            }
        }

        Ok(Self {
            data,
            stride,
            count: accessor.count,
            component_type: accessor.component_type,
            type_: accessor.type_,
            normalized: accessor.normalized,
        })
    }

    fn zeroed(accessor: &Accessor) -> Result<Self, String> {
        if accessor.count > MAX_VIEW_LESS_COUNT {
            return Err(format!(
                "{} elements without a buffer view exceed the limit of {MAX_VIEW_LESS_COUNT}",
                accessor.count
            ));
        }

        Ok(Self {
            data: &ZEROED_ELEMENT,
            stride: 0,
            count: accessor.count,
            component_type: accessor.component_type,
            type_: accessor.type_,
            normalized: accessor.normalized,
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    pub fn accessor_type(&self) -> AccessorType {
        self.type_
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    fn element_size(&self) -> usize {
        self.component_type.size() * self.type_.component_count()
    }

    fn element(&self, index: usize) -> &'a [u8] {
        let start = index * self.stride;
        &self.data[start..start + self.element_size()]
    }

    /// Calls `write` with every element converted to `N` floats.
    ///
    /// The component type is matched once, outside the element loop.
    pub fn for_each_f32<const N: usize>(
        &self,
        mut write: impl FnMut(usize, [f32; N]),
    ) -> LoadResult<()> {
        if self.type_.component_count() != N {
            return Err(LoadError::InvalidGlb(format!(
                "expected an accessor with {N} components, found {:?}",
                self.type_
            )));
        }

        match self.component_type {
            ComponentType::Byte => self.visit::<i8, N>(&mut write),
            ComponentType::UnsignedByte => self.visit::<u8, N>(&mut write),
            ComponentType::Short => self.visit::<i16, N>(&mut write),
            ComponentType::UnsignedShort => self.visit::<u16, N>(&mut write),
            ComponentType::UnsignedInt => self.visit::<u32, N>(&mut write),
            ComponentType::Float => self.visit::<f32, N>(&mut write),
        }

        Ok(())
    }

    fn visit<C: Component, const N: usize>(&self, write: &mut impl FnMut(usize, [f32; N])) {
        for index in 0..self.count {
            let element = self.element(index);
            let mut value = [0.0f32; N];

            for (component, bytes) in value.iter_mut().zip(element.chunks_exact(C::SIZE)) {
                *component = C::read_le(bytes).to_f32(self.normalized);
            }

            write(index, value);
        }
    }

    /// Collects the elements as `N`-float arrays.
    pub fn read_f32<const N: usize>(&self) -> LoadResult<Vec<[f32; N]>> {
        let mut values = filled_vec(self.count, [0.0; N])?;
        self.for_each_f32::<N>(|index, value| values[index] = value)?;
        Ok(values)
    }

    /// Reads a scalar index accessor, widening u8 and u16 indices to u32.
    pub fn read_indices(&self) -> LoadResult<Vec<u32>> {
        if self.type_ != AccessorType::Scalar {
            return Err(LoadError::InvalidGlb(format!(
                "index accessors must be SCALAR, found {:?}",
                self.type_
            )));
        }

        let mut indices = filled_vec(self.count, 0u32)?;
        let element_size = self.element_size();

        if self.stride == element_size {
            let packed = &self.data[..self.count * element_size];
            match self.component_type {
                ComponentType::UnsignedByte => widen::widen_u8(packed, &mut indices),
                ComponentType::UnsignedShort => widen::widen_u16(packed, &mut indices),
                ComponentType::UnsignedInt => widen::copy_u32(packed, &mut indices),
                component_type => return Err(unsupported_index_type(component_type)),
            }
        } else {
            match self.component_type {
                ComponentType::UnsignedByte => self.read_strided_indices::<u8>(&mut indices),
                ComponentType::UnsignedShort => self.read_strided_indices::<u16>(&mut indices),
                ComponentType::UnsignedInt => self.read_strided_indices::<u32>(&mut indices),
                component_type => return Err(unsupported_index_type(component_type)),
            }
        }

        Ok(indices)
    }

    fn read_strided_indices<C: Component + Into<u32>>(&self, indices: &mut [u32]) {
        for (index, value) in indices.iter_mut().enumerate() {
            *value = C::read_le(self.element(index)).into();
        }
    }
}

fn unsupported_index_type(component_type: ComponentType) -> LoadError {
    LoadError::NotSupported(format!(
        "Index accessors with {component_type:?} components are not supported"
    ))
}

/// A little-endian accessor component.
trait Component: Copy {
    const SIZE: usize;

    fn read_le(bytes: &[u8]) -> Self;
    fn to_f32(self, normalized: bool) -> f32;
}

impl Component for i8 {
    const SIZE: usize = 1;

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }

    fn to_f32(self, normalized: bool) -> f32 {
        if normalized {
            (self as f32 / 127.0).max(-1.0)
        } else {
            self as f32
        }
    }
}

impl Component for u8 {
    const SIZE: usize = 1;

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn to_f32(self, normalized: bool) -> f32 {
        if normalized {
            self as f32 / 255.0
        } else {
            self as f32
        }
    }
}

impl Component for i16 {
    const SIZE: usize = 2;

    fn read_le(bytes: &[u8]) -> Self {
        i16::from_le_bytes([bytes[0], bytes[1]])
    }

    fn to_f32(self, normalized: bool) -> f32 {
        if normalized {
            (self as f32 / 32767.0).max(-1.0)
        } else {
            self as f32
        }
    }
}

impl Component for u16 {
    const SIZE: usize = 2;

    fn read_le(bytes: &[u8]) -> Self {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }

    fn to_f32(self, normalized: bool) -> f32 {
        if normalized {
            self as f32 / 65535.0
        } else {
            self as f32
        }
    }
}

impl Component for u32 {
    const SIZE: usize = 4;

    fn read_le(bytes: &[u8]) -> Self {
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn to_f32(self, normalized: bool) -> f32 {
        if normalized {
            (self as f64 / u32::MAX as f64) as f32
        } else {
            self as f32
        }
    }
}

impl Component for f32 {
    const SIZE: usize = 4;

    fn read_le(bytes: &[u8]) -> Self {
        f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn to_f32(self, _normalized: bool) -> f32 {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accessor(component_type: ComponentType, type_: AccessorType, count: usize) -> Accessor {
        Accessor {
            name: None,
            buffer_view: Some(0),
            byte_offset: 0,
            component_type,
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
    fn reads_tightly_packed_floats() {
        let data = f32_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let accessor = accessor(ComponentType::Float, AccessorType::Vec3, 2);

        let view = AccessorView::from_bytes(&data, 0, None, &accessor).unwrap();

        assert_eq!(view.stride(), 12);
        assert_eq!(
            view.read_f32::<3>().unwrap(),
            vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]
        );
    }

    #[test]
    fn reads_interleaved_floats_with_offset() {
        // Interleaved position (vec3) + uv (vec2), reading the uv.
        let data = f32_bytes(&[0.0, 0.0, 0.0, 0.25, 0.5, 1.0, 1.0, 1.0, 0.75, 1.0]);
        let accessor = accessor(ComponentType::Float, AccessorType::Vec2, 2);

        let view = AccessorView::from_bytes(&data, 12, Some(20), &accessor).unwrap();

        assert_eq!(
            view.read_f32::<2>().unwrap(),
            vec![[0.25, 0.5], [0.75, 1.0]]
        );
    }

    #[test]
    fn normalizes_integer_components() {
        let data = [255u8, 0, 128, 0];
        let mut colors = accessor(ComponentType::UnsignedByte, AccessorType::Vec4, 1);
        colors.normalized = true;

        let view = AccessorView::from_bytes(&data, 0, None, &colors).unwrap();
        let value = view.read_f32::<4>().unwrap()[0];

        assert_eq!(value[0], 1.0);
        assert_eq!(value[1], 0.0);
        assert!((value[2] - 128.0 / 255.0).abs() < 1e-6);

        let data = (-32768i16).to_le_bytes();
        let mut weights = accessor(ComponentType::Short, AccessorType::Scalar, 1);
        weights.normalized = true;

        let view = AccessorView::from_bytes(&data, 0, None, &weights).unwrap();
        assert_eq!(view.read_f32::<1>().unwrap()[0], [-1.0]);
    }

    #[test]
    fn rejects_out_of_bounds_elements() {
        let data = f32_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let accessor = accessor(ComponentType::Float, AccessorType::Vec3, 2);

        assert!(matches!(
            AccessorView::from_bytes(&data, 0, None, &accessor),
            Err(LoadError::InvalidGlb(_))
        ));
        assert!(matches!(
            AccessorView::from_bytes(&data, 64, None, &accessor),
            Err(LoadError::InvalidGlb(_))
        ));
    }

    #[test]
    fn rejects_stride_smaller_than_element() {
        let data = f32_bytes(&[0.0; 12]);
        let accessor = accessor(ComponentType::Float, AccessorType::Vec3, 2);

        assert!(matches!(
            AccessorView::from_bytes(&data, 0, Some(8), &accessor),
            Err(LoadError::InvalidGlb(_))
        ));
    }

    #[test]
    fn rejects_mismatched_component_count() {
        let data = f32_bytes(&[0.0; 6]);
        let accessor = accessor(ComponentType::Float, AccessorType::Vec2, 3);

        let view = AccessorView::from_bytes(&data, 0, None, &accessor).unwrap();
        assert!(matches!(view.read_f32::<3>(), Err(LoadError::InvalidGlb(_))));
    }

    #[test]
    fn widens_packed_indices() {
        let data: Vec<u8> = (0..20u16).flat_map(|value| value.to_le_bytes()).collect();
        let accessor = accessor(ComponentType::UnsignedShort, AccessorType::Scalar, 20);

        let view = AccessorView::from_bytes(&data, 0, None, &accessor).unwrap();

        assert_eq!(view.read_indices().unwrap(), (0..20).collect::<Vec<u32>>());
    }

    #[test]
    fn reads_strided_indices() {
        let data = [1u8, 0xAA, 2, 0xAA, 3, 0xAA];
        let accessor = accessor(ComponentType::UnsignedByte, AccessorType::Scalar, 3);

        let view = AccessorView::from_bytes(&data, 0, Some(2), &accessor).unwrap();

        assert_eq!(view.read_indices().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn rejects_float_indices() {
        let data = f32_bytes(&[0.0, 1.0, 2.0]);
        let accessor = accessor(ComponentType::Float, AccessorType::Scalar, 3);

        let view = AccessorView::from_bytes(&data, 0, None, &accessor).unwrap();
        assert!(matches!(view.read_indices(), Err(LoadError::NotSupported(_))));
    }

    #[test]
    fn view_less_accessors_read_as_zero() {
        let mut accessor = accessor(ComponentType::Float, AccessorType::Vec3, 3);
        accessor.buffer_view = None;

        let view = AccessorView::zeroed(&accessor).unwrap();
        assert_eq!(view.read_f32::<3>().unwrap(), vec![[0.0; 3]; 3]);
    }

    #[test]
    fn view_less_counts_are_bounded() {
        let mut accessor = accessor(
            ComponentType::Float,
            AccessorType::Vec3,
            MAX_VIEW_LESS_COUNT + 1,
        );
        accessor.buffer_view = None;
        assert!(AccessorView::zeroed(&accessor).is_err());

        accessor.count = usize::MAX;
        assert!(AccessorView::zeroed(&accessor).is_err());
    }

    #[test]
    fn impossible_allocations_are_reported() {
        assert!(matches!(
            filled_vec(usize::MAX, 0u32),
            Err(LoadError::InvalidGlb(_))
        ));
    }
}
