use cgmath::{InnerSpace, One, Zero};

use crate::resource::glb::document::Node;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub translation: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: cgmath::Vector3::zero(),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3 {
                x: 1.0,
                y: 1.0,
                z: 1.0,
            },
        }
    }
}

impl Transform {
    /// The local transform of a glTF node, from its matrix or its TRS properties.
    pub fn from_node(node: &Node) -> Self {
        if let Some(matrix) = node.matrix {
            return Self::from(column_major_matrix(&matrix));
        }

        let defaults = Self::default();

        Self {
            translation: node
                .translation
                .map_or(defaults.translation, cgmath::Vector3::from),
            // glTF stores rotations as [x, y, z, w].
            rotation: node.rotation.map_or(defaults.rotation, |[x, y, z, w]| {
                cgmath::Quaternion::new(w, x, y, z)
            }),
            scale: node.scale.map_or(defaults.scale, cgmath::Vector3::from),
        }
    }

    pub fn to_matrix_array(&self) -> [[f32; 4]; 4] {
        cgmath::Matrix4::from(*self).into()
    }
}

fn column_major_matrix(values: &[f32; 16]) -> cgmath::Matrix4<f32> {
    cgmath::Matrix4::new(
        values[0], values[1], values[2], values[3], values[4], values[5], values[6], values[7],
        values[8], values[9], values[10], values[11], values[12], values[13], values[14],
        values[15],
    )
}

impl From<Transform> for cgmath::Matrix4<f32> {
    fn from(value: Transform) -> Self {
        cgmath::Matrix4::from_translation(value.translation)
            * cgmath::Matrix4::from(value.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(value.scale.x, value.scale.y, value.scale.z)
    }
}

impl From<cgmath::Matrix4<f32>> for Transform {
    fn from(value: cgmath::Matrix4<f32>) -> Self {
        let translation = cgmath::Vector3::<f32>::new(value.w.x, value.w.y, value.w.z);

        let mut rotation_matrix = cgmath::Matrix3::<f32>::new(
            value.x.x, value.x.y, value.x.z, value.y.x, value.y.y, value.y.z, value.z.x, value.z.y,
            value.z.z,
        );

        let scale_x = rotation_matrix.x.magnitude();
        let scale_y = rotation_matrix.y.magnitude();
        let scale_z = rotation_matrix.z.magnitude();
        let scale = cgmath::Vector3::<f32>::new(scale_x, scale_y, scale_z);

        // A zero scale axis leaves no rotation to recover.
        if scale_x == 0.0 || scale_y == 0.0 || scale_z == 0.0 {
            return Self {
                translation,
                rotation: cgmath::Quaternion::one(),
                scale,
            };
        }

        rotation_matrix.x *= 1.0 / scale_x;
        rotation_matrix.y *= 1.0 / scale_y;
        rotation_matrix.z *= 1.0 / scale_z;

        let rotation = cgmath::Quaternion::from(rotation_matrix);

        Self {
            translation,
            rotation,
            scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Rotation3, SquareMatrix};

    fn node() -> Node {
        Node {
            name: None,
            children: vec![],
            mesh: None,
            camera: None,
            skin: None,
            matrix: None,
            translation: None,
            rotation: None,
            scale: None,
            weights: vec![],
        }
    }

    #[test]
    fn default_is_identity() {
        let matrix = cgmath::Matrix4::from(Transform::default());
        assert_eq!(matrix, cgmath::Matrix4::identity());
    }

    #[test]
    fn reads_trs_with_xyzw_rotation() {
        let half = std::f32::consts::FRAC_1_SQRT_2;
        let transform = Transform::from_node(&Node {
            translation: Some([1.0, 2.0, 3.0]),
            rotation: Some([0.0, half, 0.0, half]),
            scale: Some([2.0, 2.0, 2.0]),
            ..node()
        });

        let expected = cgmath::Quaternion::from_angle_y(cgmath::Deg(90.0));
        assert_eq!(transform.translation, cgmath::Vector3::new(1.0, 2.0, 3.0));
        assert!((transform.rotation.s - expected.s).abs() < 1e-6);
        assert!((transform.rotation.v.y - expected.v.y).abs() < 1e-6);
        assert_eq!(transform.scale, cgmath::Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn decomposes_column_major_matrices() {
        let transform = Transform::from_node(&Node {
            matrix: Some([
                2.0, 0.0, 0.0, 0.0, //
                0.0, 3.0, 0.0, 0.0, //
                0.0, 0.0, 4.0, 0.0, //
                5.0, 6.0, 7.0, 1.0,
            ]),
            ..node()
        });

        assert_eq!(transform.translation, cgmath::Vector3::new(5.0, 6.0, 7.0));
        assert_eq!(transform.scale, cgmath::Vector3::new(2.0, 3.0, 4.0));
        assert!((transform.rotation.s.abs() - 1.0).abs() < 1e-6);
    }
}
