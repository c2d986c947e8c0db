use nalgebra::{Scalar, Vector3};
use ndarray::{ArrayBase, Data, Ix1};

/// Reads a row of a `(N, 3)` array as a 3D vector.
pub trait ToVector3<T> {
    fn to_vector3(&self) -> Vector3<T>;
}

impl<S, T> ToVector3<T> for ArrayBase<S, Ix1>
where
    S: Data<Elem = T>,
    T: Scalar,
{
    fn to_vector3(&self) -> Vector3<T> {
        Vector3::new(self[0].clone(), self[1].clone(), self[2].clone())
    }
}
