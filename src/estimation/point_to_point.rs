use crate::{
    correspondence::CorrespondenceSet,
    error::Error,
    linalg::{kabsch_rotation, to_transform, CentroidSum, CrossCovariance},
    pointcloud::PointCloud,
    reduction::{reduce_correspondences, SquaredResidualSum},
    transform::Transform,
};

use super::{
    row_f64, validate_inputs, EstimationParams, TransformationEstimation,
    TransformationEstimationType,
};

/// Closed-form point-to-point estimation (Kabsch/Umeyama).
///
/// Minimizes `Σ ‖R s_i + t - t_j‖²`. The rotation about an axis along which the
/// cross-covariance has no spread is not determined; sets that are coplanar still give
/// a unique answer, collinear or coincident sets fail with `DegenerateGeometry`.
#[derive(Debug, Clone, Default)]
pub struct PointToPoint {
    pub params: EstimationParams,
}

impl PointToPoint {
    pub fn new(params: EstimationParams) -> Result<Self, Error> {
        params.validate()?;
        Ok(Self { params })
    }
}

impl TransformationEstimation for PointToPoint {
    fn estimation_type(&self) -> TransformationEstimationType {
        TransformationEstimationType::PointToPoint
    }

    fn compute_rmse(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        correspondences: &CorrespondenceSet,
    ) -> Result<f32, Error> {
        validate_inputs(&self.params, source, target, correspondences)?;

        let residuals = reduce_correspondences::<SquaredResidualSum, _>(
            correspondences,
            self.params.min_chunk_len,
            |acc, i, j| {
                let diff = row_f64(&source.points, i) - row_f64(&target.points, j);
                acc.add(diff.norm_squared());
            },
        );

        residuals
            .rmse()
            .map(|rmse| rmse as f32)
            .ok_or(Error::EmptyCorrespondenceSet)
    }

    fn compute_transformation(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        correspondences: &CorrespondenceSet,
    ) -> Result<Transform, Error> {
        validate_inputs(&self.params, source, target, correspondences)?;

        let sums = reduce_correspondences::<CentroidSum, _>(
            correspondences,
            self.params.min_chunk_len,
            |acc, i, j| {
                acc.add(&row_f64(&source.points, i), &row_f64(&target.points, j));
            },
        );
        let (source_centroid, target_centroid) =
            sums.centroids().ok_or(Error::EmptyCorrespondenceSet)?;

        let covariance = reduce_correspondences::<CrossCovariance, _>(
            correspondences,
            self.params.min_chunk_len,
            |acc, i, j| {
                acc.add(
                    &(row_f64(&source.points, i) - source_centroid),
                    &(row_f64(&target.points, j) - target_centroid),
                );
            },
        );

        let fit = kabsch_rotation(&covariance.0, self.params.degeneracy_tolerance)?;
        if fit.reflection_corrected {
            log::debug!("point-to-point: corrected a reflection in the SVD solution");
        }
        let translation = target_centroid - fit.rotation * source_centroid;
        log::debug!(
            "point-to-point: {} correspondences, translation {:?}",
            sums.count,
            translation.as_slice()
        );

        Ok(to_transform(&fit.rotation, &translation))
    }
}
