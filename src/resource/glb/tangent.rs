use cgmath::{InnerSpace, Vector2, Vector3, Zero};

use crate::error::{LoadError, LoadResult};
use crate::resource::glb::vertex::{Field, VertexLayout};

const DEGENERATE_EPSILON: f32 = 1e-12;

/// Fills the tangent field of `vertices` from positions and texture coordinates.
///
/// Without indices every three consecutive vertices form a triangle and share its tangent. With indices,
/// per-triangle tangents are summed into each referenced vertex and normalized once at the end. Returns
/// `false` when the layout has no tangent or texture coordinate field.
pub fn generate_tangents<V: VertexLayout>(
    vertices: &mut [V],
    indices: Option<&[u32]>,
) -> LoadResult<bool> {
    let (tangent_field, tex_coord_field) = match (V::TANGENT, V::TEX_COORD_0) {
        (Some(tangent_field), Some(tex_coord_field)) => (tangent_field, tex_coord_field),
        _ => return Ok(false),
    };

    match indices {
        Some(indices) => {
            generate_indexed(vertices, indices, tangent_field, tex_coord_field)?;
        }
        None => generate_non_indexed(vertices, tangent_field, tex_coord_field),
    }

    Ok(true)
}

fn generate_non_indexed<V: VertexLayout>(
    vertices: &mut [V],
    tangent_field: Field<V, [f32; 4]>,
    tex_coord_field: Field<V, [f32; 2]>,
) {
    if vertices.len() % 3 != 0 {
        log::warn!(
            "Ignoring {} trailing vertices that do not form a triangle",
            vertices.len() % 3
        );
    }

    for triangle in vertices.chunks_exact_mut(3) {
        let tangent = triangle_tangent(
            [&triangle[0], &triangle[1], &triangle[2]],
            tex_coord_field,
        );

        for vertex in triangle.iter_mut() {
            let tangent = finish_tangent(tangent, vertex);
            (tangent_field.set)(vertex, tangent);
        }
    }
}

fn generate_indexed<V: VertexLayout>(
    vertices: &mut [V],
    indices: &[u32],
    tangent_field: Field<V, [f32; 4]>,
    tex_coord_field: Field<V, [f32; 2]>,
) -> LoadResult<()> {
    check_indices(indices, vertices.len())?;

    if indices.len() % 3 != 0 {
        log::warn!(
            "Ignoring {} trailing indices that do not form a triangle",
            indices.len() % 3
        );
    }

    let mut accumulated = vec![Vector3::<f32>::zero(); vertices.len()];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        let tangent = triangle_tangent([&vertices[a], &vertices[b], &vertices[c]], tex_coord_field);

        accumulated[a] += tangent;
        accumulated[b] += tangent;
        accumulated[c] += tangent;
    }

    for (vertex, tangent) in vertices.iter_mut().zip(accumulated) {
        let tangent = finish_tangent(tangent, vertex);
        (tangent_field.set)(vertex, tangent);
    }

    Ok(())
}

/// Fails with `IndexOutOfRange` on the first index that does not name a vertex.
pub fn check_indices(indices: &[u32], vertex_count: usize) -> LoadResult<()> {
    match indices
        .iter()
        .find(|index| **index as usize >= vertex_count)
    {
        Some(index) => Err(LoadError::IndexOutOfRange {
            index: *index,
            vertex_count,
        }),
        None => Ok(()),
    }
}

fn triangle_tangent<V: VertexLayout>(
    triangle: [&V; 3],
    tex_coord_field: Field<V, [f32; 2]>,
) -> Vector3<f32> {
    let position = |vertex: &V| Vector3::from((V::POSITION.get)(vertex));
    let tex_coord = |vertex: &V| Vector2::from((tex_coord_field.get)(vertex));

    let delta_pos1 = position(triangle[1]) - position(triangle[0]);
    let delta_pos2 = position(triangle[2]) - position(triangle[0]);
    let delta_uv1 = tex_coord(triangle[1]) - tex_coord(triangle[0]);
    let delta_uv2 = tex_coord(triangle[2]) - tex_coord(triangle[0]);

    let determinant = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
    if determinant.abs() < DEGENERATE_EPSILON {
        return Vector3::zero();
    }

    let d = 1.0 / determinant;
    (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * d
}

fn finish_tangent<V: VertexLayout>(tangent: Vector3<f32>, vertex: &V) -> [f32; 4] {
    let tangent = if tangent.magnitude2() > DEGENERATE_EPSILON {
        tangent.normalize()
    } else {
        let normal = V::NORMAL
            .map(|field| Vector3::from((field.get)(vertex)))
            .unwrap_or_else(Vector3::zero);
        perpendicular_to(normal)
    };

    [tangent.x, tangent.y, tangent.z, 1.0]
}

// Any unit vector orthogonal to `normal`; +X when the normal is unusable.
fn perpendicular_to(normal: Vector3<f32>) -> Vector3<f32> {
    if normal.magnitude2() <= DEGENERATE_EPSILON {
        return Vector3::unit_x();
    }

    let normal = normal.normalize();
    let axis = if normal.x.abs() < 0.9 {
        Vector3::unit_x()
    } else {
        Vector3::unit_y()
    };

    (axis - normal * normal.dot(axis)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::glb::vertex::{BasicVertex, Vertex};

    fn vertex(position: [f32; 3], tex_coord: [f32; 2]) -> Vertex {
        Vertex {
            position,
            normal: [0.0, 0.0, 1.0],
            tex_coord,
            ..Default::default()
        }
    }

    fn unit_quad() -> Vec<Vertex> {
        vec![
            vertex([0.0, 0.0, 0.0], [0.0, 0.0]),
            vertex([1.0, 0.0, 0.0], [1.0, 0.0]),
            vertex([1.0, 1.0, 0.0], [1.0, 1.0]),
            vertex([0.0, 1.0, 0.0], [0.0, 1.0]),
        ]
    }

    fn assert_tangent(vertex: &Vertex, expected: [f32; 3]) {
        for axis in 0..3 {
            assert!(
                (vertex.tangent[axis] - expected[axis]).abs() < 1e-5,
                "tangent {:?} differs from {:?}",
                vertex.tangent,
                expected
            );
        }
        assert_eq!(vertex.tangent[3], 1.0);
    }

    #[test]
    fn indexed_unit_quad_points_along_x() {
        let mut vertices = unit_quad();

        let generated = generate_tangents(&mut vertices, Some(&[0u32, 1, 2, 0, 2, 3][..])).unwrap();

        assert!(generated);
        for vertex in &vertices {
            assert_tangent(vertex, [1.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn non_indexed_triangles_share_their_tangent() {
        let quad = unit_quad();
        let mut vertices = vec![quad[0], quad[1], quad[2], quad[0], quad[2], quad[3]];

        generate_tangents(&mut vertices, None).unwrap();

        for vertex in &vertices {
            assert_tangent(vertex, [1.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn rotated_uvs_rotate_the_tangent() {
        // U runs along +Y in object space.
        let mut vertices = vec![
            vertex([0.0, 0.0, 0.0], [0.0, 0.0]),
            vertex([0.0, 2.0, 0.0], [1.0, 0.0]),
            vertex([-2.0, 0.0, 0.0], [0.0, 1.0]),
        ];

        generate_tangents(&mut vertices, None).unwrap();

        for vertex in &vertices {
            assert_tangent(vertex, [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn out_of_range_indices_fail() {
        let mut vertices = unit_quad();

        let result = generate_tangents(&mut vertices, Some(&[0u32, 1, 4][..]));

        assert!(matches!(
            result,
            Err(LoadError::IndexOutOfRange {
                index: 4,
                vertex_count: 4
            })
        ));
    }

    #[test]
    fn degenerate_uvs_fall_back_to_a_perpendicular() {
        let mut vertices = vec![
            vertex([0.0, 0.0, 0.0], [0.5, 0.5]),
            vertex([1.0, 0.0, 0.0], [0.5, 0.5]),
            vertex([0.0, 1.0, 0.0], [0.5, 0.5]),
        ];

        generate_tangents(&mut vertices, Some(&[0u32, 1, 2][..])).unwrap();

        for vertex in &vertices {
            let tangent = Vector3::new(vertex.tangent[0], vertex.tangent[1], vertex.tangent[2]);
            assert!((tangent.magnitude() - 1.0).abs() < 1e-5);
            assert!(tangent.dot(Vector3::unit_z()).abs() < 1e-5);
        }
    }

    #[test]
    fn layouts_without_tangents_are_skipped() {
        let mut vertices = vec![BasicVertex::default(); 3];

        assert!(!generate_tangents(&mut vertices, None).unwrap());
    }
}
