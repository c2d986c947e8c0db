//! Rigid transformation estimation for Iterative Closest Point (ICP) registration.
//!
//! Given a source cloud, a target cloud and a set of matched index pairs, the
//! estimators in [`estimation`] compute the rigid [`transform::Transform`] that best
//! aligns the source onto the target, and the RMSE of the current alignment.

pub mod correspondence;
pub mod error;
pub mod estimation;
pub mod linalg;
pub mod metrics;
pub mod optim;
pub mod pointcloud;
pub mod reduction;
pub mod transform;

mod utils;

#[cfg(test)]
mod unit_test;

pub use correspondence::CorrespondenceSet;
pub use error::Error;
pub use estimation::{
    ColoredIcp, EstimationConfig, EstimationParams, PointToPlane, PointToPoint,
    TransformationEstimation, TransformationEstimationType,
};
pub use pointcloud::PointCloud;
pub use transform::Transform;
