use nalgebra::Vector3;
use ndarray::prelude::*;
use ndarray::Array2;

use crate::error::Error;
use crate::transform::Transform;
use crate::utils::ToVector3;

/// Point cloud consumed by the estimators.
///
/// Every array has shape `(N, 3)`. Auxiliary arrays, when present, are parallel to `points`.
#[derive(Debug, Clone)]
pub struct PointCloud {
    /// 3D positions.
    pub points: Array2<f32>,
    /// Unit normals.
    pub normals: Option<Array2<f32>>,
    /// RGB colors in the `[0, 1]` range.
    pub colors: Option<Array2<f32>>,
    /// Tangential gradient of the color intensity, used by colored ICP.
    pub color_gradients: Option<Array2<f32>>,
}

impl PointCloud {
    pub fn new(points: Array2<f32>) -> Self {
        Self {
            points,
            normals: None,
            colors: None,
            color_gradients: None,
        }
    }

    /// Creates a point cloud from a list of positions, without attributes.
    pub fn from_points(points: &[[f32; 3]]) -> Self {
        Self::new(Array2::from_shape_fn((points.len(), 3), |(i, j)| points[i][j]))
    }

    pub fn with_normals(mut self, normals: Array2<f32>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_colors(mut self, colors: Array2<f32>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn with_color_gradients(mut self, color_gradients: Array2<f32>) -> Self {
        self.color_gradients = Some(color_gradients);
        self
    }

    pub fn len(&self) -> usize {
        self.points.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, index: usize) -> Vector3<f32> {
        self.points.row(index).to_vector3()
    }

    /// Checks the shape invariants: 3 columns everywhere and attribute lengths matching the positions.
    pub fn validate(&self) -> Result<(), Error> {
        if self.points.ncols() != 3 {
            return Err(Error::invalid_input(format!(
                "points must have 3 columns, got {}",
                self.points.ncols()
            )));
        }

        let len = self.len();
        let attributes = [
            ("normals", &self.normals),
            ("colors", &self.colors),
            ("color gradients", &self.color_gradients),
        ];
        for (name, attribute) in attributes {
            if let Some(array) = attribute {
                if array.dim() != (len, 3) {
                    return Err(Error::invalid_input(format!(
                        "{name} have shape {:?}, expected ({len}, 3)",
                        array.dim()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Luma of a color, computed as the mean of its RGB channels.
    pub fn intensity(colors: &Array2<f32>, index: usize) -> f32 {
        let rgb = colors.row(index);
        (rgb[0] + rgb[1] + rgb[2]) / 3.0
    }
}

impl std::ops::Mul<&PointCloud> for &Transform {
    type Output = PointCloud;
    fn mul(self, rhs: &PointCloud) -> PointCloud {
        PointCloud {
            points: self * &rhs.points,
            normals: rhs.normals.as_ref().map(|normals| self.rotate(normals)),
            colors: rhs.colors.clone(),
            color_gradients: rhs
                .color_gradients
                .as_ref()
                .map(|gradients| self.rotate(gradients)),
        }
    }
}
