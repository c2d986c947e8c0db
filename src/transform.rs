use nalgebra::{
    Isometry3, Matrix3, Matrix4, Quaternion, Rotation3, Translation3, UnitQuaternion, Vector3,
    Vector6,
};
use ndarray::{Array2, Axis};

use std::ops;

/// Rigid transform: a proper rotation followed by a translation.
///
/// Stored as an isometry so that reflections, scaling and shear cannot be represented.
/// Its homogeneous form is given by [`Transform::matrix`].
#[derive(Clone, Debug, PartialEq)]
pub struct Transform(Isometry3<f32>);

impl Transform {
    /// Creates a new transform from a translation and a rotation quaternion.
    ///
    /// # Arguments
    ///
    /// * `xyz` - Translation.
    /// * `rotation` - Rotation quaternion, normalized on construction.
    pub fn new(xyz: &Vector3<f32>, rotation: &Quaternion<f32>) -> Self {
        Self(Isometry3::from_parts(
            Translation3::from(*xyz),
            UnitQuaternion::from_quaternion(*rotation),
        ))
    }

    pub fn eye() -> Self {
        Self(Isometry3::identity())
    }

    /// Creates a transform from a rotation matrix and a translation.
    ///
    /// The rotation matrix is assumed to be orthonormal with determinant +1.
    pub fn from_rotation_translation(rotation: &Matrix3<f32>, translation: &Vector3<f32>) -> Self {
        Self(Isometry3::from_parts(
            Translation3::from(*translation),
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*rotation)),
        ))
    }

    /// Creates a transform from a linearized update vector.
    ///
    /// # Arguments
    ///
    /// * `translation_so3` - The first three components are the translation,
    ///   the last three are the rotation as an angle-axis (scaled axis) vector.
    pub fn from_se3_exp(translation_so3: &Vector6<f32>) -> Self {
        let translation =
            Translation3::new(translation_so3[0], translation_so3[1], translation_so3[2]);
        let so3 = Vector3::new(translation_so3[3], translation_so3[4], translation_so3[5]);

        Self(Isometry3::<f32>::from_parts(
            translation,
            UnitQuaternion::from_scaled_axis(so3),
        ))
    }

    /// Creates a transform from a homogeneous matrix.
    ///
    /// The top-left block is projected onto the closest rotation, so small numerical
    /// drift in the input does not leak into the transform.
    pub fn from_matrix4(matrix: &Matrix4<f32>) -> Self {
        let translation = Translation3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);
        let so3 = UnitQuaternion::from_matrix(&matrix.fixed_slice::<3, 3>(0, 0).into_owned());
        Self(Isometry3::<f32>::from_parts(translation, so3))
    }

    /// Homogeneous 4x4 matrix. The bottom row is always `(0, 0, 0, 1)`.
    pub fn matrix(&self) -> Matrix4<f32> {
        self.0.to_homogeneous()
    }

    pub fn rotation_matrix(&self) -> Matrix3<f32> {
        self.0.rotation.to_rotation_matrix().into_inner()
    }

    pub fn translation(&self) -> Vector3<f32> {
        self.0.translation.vector
    }

    pub fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }

    /// Rotation angle in radians.
    pub fn angle(&self) -> f32 {
        self.0.rotation.angle()
    }

    pub fn transform_vector(&self, vector: &Vector3<f32>) -> Vector3<f32> {
        self.0.transform_point(&(*vector).into()).coords
    }

    /// Transforms every row of a `(N, 3)` array in place.
    pub fn transform(&self, mut rhs: Array2<f32>) -> Array2<f32> {
        for mut point in rhs.axis_iter_mut(Axis(0)) {
            let v = self.0 * nalgebra::Point3::new(point[0], point[1], point[2]);
            point[0] = v[0];
            point[1] = v[1];
            point[2] = v[2];
        }

        rhs
    }

    /// Rotates every row of a `(N, 3)` array, ignoring translation.
    pub fn rotate(&self, rhs: &Array2<f32>) -> Array2<f32> {
        let mut result = rhs.clone();
        for mut row in result.axis_iter_mut(Axis(0)) {
            let v = self.0.rotation * Vector3::new(row[0], row[1], row[2]);
            row[0] = v[0];
            row[1] = v[1];
            row[2] = v[2];
        }
        result
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::eye()
    }
}

impl ops::Mul<&Array2<f32>> for &Transform {
    type Output = Array2<f32>;

    fn mul(self, rhs: &Array2<f32>) -> Self::Output {
        self.transform(rhs.clone())
    }
}

impl ops::Mul<&Vector3<f32>> for &Transform {
    type Output = Vector3<f32>;

    fn mul(self, rhs: &Vector3<f32>) -> Self::Output {
        self.transform_vector(rhs)
    }
}

impl ops::Mul<&Transform> for &Transform {
    type Output = Transform;

    fn mul(self, rhs: &Transform) -> Self::Output {
        Transform(self.0 * rhs.0)
    }
}

impl From<Transform> for Matrix4<f32> {
    fn from(transform: Transform) -> Self {
        transform.0.into()
    }
}
