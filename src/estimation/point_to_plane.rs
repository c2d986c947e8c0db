use crate::{
    correspondence::CorrespondenceSet,
    error::Error,
    linalg::linearized_to_transform,
    optim::{GaussNewton, RobustEstimator},
    pointcloud::PointCloud,
    reduction::{reduce_correspondences, SquaredResidualSum},
    transform::Transform,
};

use super::{
    cost_function::PointPlaneDistance, require, row_f64, source_pivot, validate_inputs,
    EstimationParams, TransformationEstimation, TransformationEstimationType,
};

/// Linearized point-to-plane estimation.
///
/// Each correspondence adds one row to a 6x6 system over `(translation, rotation)`,
/// solved once. The rotation is linearized about the centroid of the matched source
/// points. The target cloud must have normals.
#[derive(Debug, Clone, Default)]
pub struct PointToPlane {
    pub params: EstimationParams,
}

impl PointToPlane {
    pub fn new(params: EstimationParams) -> Result<Self, Error> {
        params.validate()?;
        Ok(Self { params })
    }
}

impl TransformationEstimation for PointToPlane {
    fn estimation_type(&self) -> TransformationEstimationType {
        TransformationEstimationType::PointToPlane
    }

    fn compute_rmse(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        correspondences: &CorrespondenceSet,
    ) -> Result<f32, Error> {
        validate_inputs(&self.params, source, target, correspondences)?;
        let target_normals = require(&target.normals, "target", "normals")?;

        let residuals = reduce_correspondences::<SquaredResidualSum, _>(
            correspondences,
            self.params.min_chunk_len,
            |acc, i, j| {
                let residual = (row_f64(&source.points, i) - row_f64(&target.points, j))
                    .dot(&row_f64(target_normals, j));
                acc.add(residual * residual);
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
        let target_normals = require(&target.normals, "target", "normals")?;
        let pivot = source_pivot(source, target, correspondences, self.params.min_chunk_len)?;
        let geom_cost = PointPlaneDistance {};
        let kernel = self.params.kernel;

        let optimizer = reduce_correspondences::<GaussNewton<6>, _>(
            correspondences,
            self.params.min_chunk_len,
            |acc, i, j| {
                let (residual, jacobian) = geom_cost.jacobian(
                    &row_f64(&source.points, i),
                    &row_f64(&target.points, j),
                    &row_f64(target_normals, j),
                    &pivot,
                );
                acc.step(residual, &jacobian, kernel.weight(residual));
                acc.count_sample();
            },
        );

        log::debug!(
            "point-to-plane: {} correspondences, mean squared residual {:e}",
            optimizer.count(),
            optimizer.mean_squared_residual()
        );
        let update = optimizer.solve(self.params.degeneracy_tolerance)?;
        Ok(linearized_to_transform(&update, &pivot))
    }
}
