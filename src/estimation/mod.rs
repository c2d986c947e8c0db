//! Rigid transformation estimation from a correspondence set.
//!
//! Three residual models are available: [`PointToPoint`], [`PointToPlane`] and
//! [`ColoredIcp`]. They share the [`TransformationEstimation`] interface, which
//! cannot be implemented outside this crate.

use nalgebra::Vector3;
use ndarray::Array2;
use serde_derive::{Deserialize, Serialize};

use crate::{
    correspondence::CorrespondenceSet,
    error::Error,
    linalg::CentroidSum,
    pointcloud::PointCloud,
    reduction::reduce_correspondences,
    transform::Transform,
    utils::ToVector3,
};

mod colored_icp;
mod cost_function;
mod params;
mod point_to_plane;
mod point_to_point;

pub use colored_icp::ColoredIcp;
pub use params::EstimationParams;
pub use point_to_plane::PointToPlane;
pub use point_to_point::PointToPoint;

/// Residual model of an estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformationEstimationType {
    PointToPoint,
    PointToPlane,
    ColoredIcp,
}

mod private {
    pub trait Sealed {}
}

/// Estimates the rigid transform that aligns a source cloud onto a target cloud.
pub trait TransformationEstimation: private::Sealed {
    fn estimation_type(&self) -> TransformationEstimationType;

    /// Root-mean-square of the residuals with the points at their current positions.
    ///
    /// # Arguments
    ///
    /// * source - Source point cloud.
    /// * target - Target point cloud.
    /// * correspondences - Pairs of `(source_index, target_index)`.
    fn compute_rmse(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        correspondences: &CorrespondenceSet,
    ) -> Result<f32, Error>;

    /// The transform that, applied to `source`, minimizes the residuals against `target`.
    fn compute_transformation(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        correspondences: &CorrespondenceSet,
    ) -> Result<Transform, Error>;
}

impl private::Sealed for PointToPoint {}
impl private::Sealed for PointToPlane {}
impl private::Sealed for ColoredIcp {}

/// Serializable estimator choice.
///
/// ```json
/// {"type": "ColoredIcp", "lambda_geometric": 0.968, "params": {"degeneracy_tolerance": 1e-6}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EstimationConfig {
    PointToPoint {
        #[serde(default)]
        params: EstimationParams,
    },
    PointToPlane {
        #[serde(default)]
        params: EstimationParams,
    },
    ColoredIcp {
        lambda_geometric: f32,
        #[serde(default)]
        params: EstimationParams,
    },
}

impl EstimationConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn estimation_type(&self) -> TransformationEstimationType {
        match self {
            EstimationConfig::PointToPoint { .. } => TransformationEstimationType::PointToPoint,
            EstimationConfig::PointToPlane { .. } => TransformationEstimationType::PointToPlane,
            EstimationConfig::ColoredIcp { .. } => TransformationEstimationType::ColoredIcp,
        }
    }

    /// Creates the estimator, validating its parameters.
    pub fn build(&self) -> Result<Box<dyn TransformationEstimation + Send + Sync>, Error> {
        Ok(match *self {
            EstimationConfig::PointToPoint { params } => Box::new(PointToPoint::new(params)?),
            EstimationConfig::PointToPlane { params } => Box::new(PointToPlane::new(params)?),
            EstimationConfig::ColoredIcp {
                lambda_geometric,
                params,
            } => Box::new(ColoredIcp::new(lambda_geometric, params)?),
        })
    }
}

/// Validates the parameters, both clouds and the correspondence set before any reduction.
fn validate_inputs(
    params: &EstimationParams,
    source: &PointCloud,
    target: &PointCloud,
    correspondences: &CorrespondenceSet,
) -> Result<(), Error> {
    params.validate()?;
    if correspondences.is_empty() {
        return Err(Error::EmptyCorrespondenceSet);
    }
    source.validate()?;
    target.validate()?;
    correspondences.validate(source.len(), target.len())
}

/// Centroid of the matched source points.
///
/// The linearized estimators rotate about it, so the conditioning of their normal
/// equations does not depend on where the clouds sit in space.
fn source_pivot(
    source: &PointCloud,
    target: &PointCloud,
    correspondences: &CorrespondenceSet,
    min_chunk_len: usize,
) -> Result<Vector3<f64>, Error> {
    reduce_correspondences::<CentroidSum, _>(correspondences, min_chunk_len, |acc, i, j| {
        acc.add(&row_f64(&source.points, i), &row_f64(&target.points, j));
    })
    .centroids()
    .map(|(source_centroid, _)| source_centroid)
    .ok_or(Error::EmptyCorrespondenceSet)
}

fn require<'a>(
    attribute: &'a Option<Array2<f32>>,
    cloud: &'static str,
    name: &'static str,
) -> Result<&'a Array2<f32>, Error> {
    attribute
        .as_ref()
        .ok_or_else(|| Error::missing(cloud, name))
}

fn row_f64(array: &Array2<f32>, index: usize) -> Vector3<f64> {
    array.row(index).to_vector3().cast::<f64>()
}
