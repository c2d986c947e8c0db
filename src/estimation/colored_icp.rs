use nalgebra::Vector3;

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
    cost_function::{ColorDistance, PointPlaneDistance},
    require, row_f64, source_pivot, validate_inputs, EstimationParams, TransformationEstimation,
    TransformationEstimationType,
};

/// Point-to-plane estimation with a photometric term.
///
/// The geometric rows are weighted by `sqrt(lambda_geometric)` and the color rows by
/// `sqrt(1 - lambda_geometric)`. The rotation is linearized about the centroid of the
/// matched source points. Requires target normals, colors and color gradients, and
/// source colors.
#[derive(Debug, Clone)]
pub struct ColoredIcp {
    lambda_geometric: f32,
    pub params: EstimationParams,
}

/// Attributes read by the colored estimator.
struct ColoredInputs<'a> {
    target_normals: &'a ndarray::Array2<f32>,
    target_colors: &'a ndarray::Array2<f32>,
    target_gradients: &'a ndarray::Array2<f32>,
    source_colors: &'a ndarray::Array2<f32>,
}

impl<'a> ColoredInputs<'a> {
    fn gather(source: &'a PointCloud, target: &'a PointCloud) -> Result<Self, Error> {
        Ok(Self {
            target_normals: require(&target.normals, "target", "normals")?,
            target_colors: require(&target.colors, "target", "colors")?,
            target_gradients: require(&target.color_gradients, "target", "color gradients")?,
            source_colors: require(&source.colors, "source", "colors")?,
        })
    }
}

impl ColoredIcp {
    /// Creates the estimator.
    ///
    /// # Arguments
    ///
    /// * lambda_geometric - Blending between the geometric (1.0) and the photometric (0.0) terms.
    /// * params - Shared estimation parameters.
    pub fn new(lambda_geometric: f32, params: EstimationParams) -> Result<Self, Error> {
        if !(0.0..=1.0).contains(&lambda_geometric) {
            return Err(Error::invalid_input(format!(
                "lambda_geometric must be in [0, 1], got {lambda_geometric}"
            )));
        }
        params.validate()?;
        Ok(Self {
            lambda_geometric,
            params,
        })
    }

    pub fn lambda_geometric(&self) -> f32 {
        self.lambda_geometric
    }

    /// Geometric and photometric residuals with their Jacobians for the pair `(i, j)`.
    fn residuals(
        &self,
        inputs: &ColoredInputs,
        source: &PointCloud,
        target: &PointCloud,
        (i, j): (usize, usize),
        pivot: &Vector3<f64>,
    ) -> ((f64, [f64; 6]), (f64, [f64; 6])) {
        let source_point = row_f64(&source.points, i);
        let target_point = row_f64(&target.points, j);
        let target_normal = row_f64(inputs.target_normals, j);

        let geometric =
            PointPlaneDistance {}.jacobian(&source_point, &target_point, &target_normal, pivot);
        let photometric = ColorDistance {}.jacobian(
            &source_point,
            &target_point,
            &target_normal,
            PointCloud::intensity(inputs.source_colors, i) as f64,
            PointCloud::intensity(inputs.target_colors, j) as f64,
            &row_f64(inputs.target_gradients, j),
            pivot,
        );
        (geometric, photometric)
    }
}

impl TransformationEstimation for ColoredIcp {
    fn estimation_type(&self) -> TransformationEstimationType {
        TransformationEstimationType::ColoredIcp
    }

    fn compute_rmse(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        correspondences: &CorrespondenceSet,
    ) -> Result<f32, Error> {
        validate_inputs(&self.params, source, target, correspondences)?;
        let inputs = ColoredInputs::gather(source, target)?;
        let lambda = self.lambda_geometric as f64;
        // The pivot only enters the Jacobians.
        let origin = Vector3::zeros();

        let residuals = reduce_correspondences::<SquaredResidualSum, _>(
            correspondences,
            self.params.min_chunk_len,
            |acc, i, j| {
                let ((geometric, _), (photometric, _)) =
                    self.residuals(&inputs, source, target, (i, j), &origin);
                acc.add(lambda * geometric * geometric + (1.0 - lambda) * photometric * photometric);
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
        let inputs = ColoredInputs::gather(source, target)?;
        let sqrt_lambda_geometric = (self.lambda_geometric as f64).sqrt();
        let sqrt_lambda_photometric = (1.0 - self.lambda_geometric as f64).sqrt();
        let kernel = self.params.kernel;
        let pivot = source_pivot(source, target, correspondences, self.params.min_chunk_len)?;

        let optimizer = reduce_correspondences::<GaussNewton<6>, _>(
            correspondences,
            self.params.min_chunk_len,
            |acc, i, j| {
                let ((geometric, geometric_jacobian), (photometric, photometric_jacobian)) =
                    self.residuals(&inputs, source, target, (i, j), &pivot);

                for (residual, jacobian, scale) in [
                    (geometric, geometric_jacobian, sqrt_lambda_geometric),
                    (photometric, photometric_jacobian, sqrt_lambda_photometric),
                ] {
                    let residual = residual * scale;
                    let jacobian = jacobian.map(|value| value * scale);
                    acc.step(residual, &jacobian, kernel.weight(residual));
                }
                acc.count_sample();
            },
        );

        log::debug!(
            "colored icp: {} correspondences, lambda {}, mean squared residual {:e}",
            optimizer.count(),
            self.lambda_geometric,
            optimizer.mean_squared_residual()
        );
        let update = optimizer.solve(self.params.degeneracy_tolerance)?;
        Ok(linearized_to_transform(&update, &pivot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit_test::{
        random_transform, sample_ellipsoid_pointcloud, sample_plane_pointcloud, translated,
    };
    use nalgebra::{Matrix3, Vector6};
    use ndarray::Array2;
    use rstest::*;

    fn without_colors(pcl: &PointCloud) -> PointCloud {
        let mut pcl = pcl.clone();
        pcl.colors = None;
        pcl
    }

    #[test]
    fn test_lambda_range() {
        let params = EstimationParams::default();
        assert!(ColoredIcp::new(0.968, params).is_ok());
        assert!(ColoredIcp::new(0.0, params).is_ok());
        assert!(ColoredIcp::new(1.0, params).is_ok());
        assert!(matches!(
            ColoredIcp::new(-0.1, params),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            ColoredIcp::new(f32::NAN, params),
            Err(Error::InvalidInput(_))
        ));
    }

    #[rstest]
    fn test_recovers_translation(sample_ellipsoid_pointcloud: PointCloud) {
        let target = sample_ellipsoid_pointcloud;
        let expected = Transform::from_se3_exp(&Vector6::new(0.03, 0.01, -0.02, 0.0, 0.0, 0.0));
        let source = &expected.inverse() * &target;
        let corres = CorrespondenceSet::identity(source.len());
        let estimation = ColoredIcp::new(0.9, EstimationParams::default()).unwrap();

        let actual = estimation
            .compute_transformation(&source, &target, &corres)
            .unwrap();

        assert!((actual.translation() - expected.translation()).norm() < 1e-5);
        assert!((actual.rotation_matrix() - Matrix3::identity()).norm() < 1e-5);
        assert!(
            estimation
                .compute_rmse(&(&actual * &source), &target, &corres)
                .unwrap()
                < 1e-5
        );
    }

    #[rstest]
    fn test_reduces_error_for_small_motion(sample_ellipsoid_pointcloud: PointCloud) {
        let target = sample_ellipsoid_pointcloud;
        let corres = CorrespondenceSet::identity(target.len());
        let estimation = ColoredIcp::new(0.968, EstimationParams::default()).unwrap();

        for seed in 0..5 {
            let motion = random_transform(seed, 0.05, 0.05);
            let source = &motion.inverse() * &target;

            let before = estimation.compute_rmse(&source, &target, &corres).unwrap();
            let transform = estimation
                .compute_transformation(&source, &target, &corres)
                .unwrap();
            let after = estimation
                .compute_rmse(&(&transform * &source), &target, &corres)
                .unwrap();

            assert!(after < before * 0.2, "{after} >= 0.2 * {before}");
        }
    }

    #[rstest]
    #[case(20.0)]
    #[case(100.0)]
    fn test_cloud_away_from_origin(#[case] offset: f32, sample_ellipsoid_pointcloud: PointCloud) {
        let shift = Vector3::new(offset, offset / 2.0, 0.0);
        let target = translated(&sample_ellipsoid_pointcloud, &shift);
        let corres = CorrespondenceSet::identity(target.len());
        let estimation = ColoredIcp::new(0.968, EstimationParams::default()).unwrap();

        for seed in 0..3 {
            let source = &random_transform(seed, 0.05, 0.05).inverse() * &sample_ellipsoid_pointcloud;
            let near = estimation
                .compute_transformation(&source, &sample_ellipsoid_pointcloud, &corres)
                .unwrap();

            let source = translated(&source, &shift);
            let before = estimation.compute_rmse(&source, &target, &corres).unwrap();
            let far = estimation
                .compute_transformation(&source, &target, &corres)
                .unwrap();
            let after = estimation
                .compute_rmse(&(&far * &source), &target, &corres)
                .unwrap();

            assert!(after < before * 0.2, "{after} >= 0.2 * {before}");
            assert!((far.rotation_matrix() - near.rotation_matrix()).norm() < 1e-4);
        }
    }

    #[rstest]
    fn test_flat_uniform_target_is_degenerate(sample_plane_pointcloud: PointCloud) {
        let len = sample_plane_pointcloud.len();
        let target = sample_plane_pointcloud
            .with_colors(Array2::from_elem((len, 3), 0.5))
            .with_color_gradients(Array2::zeros((len, 3)));
        let source = translated(&target, &Vector3::new(0.0, 0.0, 0.1));
        let estimation = ColoredIcp::new(0.5, EstimationParams::default()).unwrap();

        assert!(matches!(
            estimation.compute_transformation(&source, &target, &CorrespondenceSet::identity(len)),
            Err(Error::DegenerateGeometry(_))
        ));
    }

    #[rstest]
    fn test_pure_geometric_matches_point_to_plane(sample_ellipsoid_pointcloud: PointCloud) {
        use crate::estimation::PointToPlane;

        let target = sample_ellipsoid_pointcloud;
        let source = &random_transform(3, 0.05, 0.05).inverse() * &target;
        let corres = CorrespondenceSet::identity(target.len());

        let colored = ColoredIcp::new(1.0, EstimationParams::default())
            .unwrap()
            .compute_transformation(&source, &target, &corres)
            .unwrap();
        let plane = PointToPlane::default()
            .compute_transformation(&source, &target, &corres)
            .unwrap();

        assert!((colored.matrix() - plane.matrix()).norm() < 1e-5);
    }

    #[rstest]
    fn test_missing_attributes(sample_ellipsoid_pointcloud: PointCloud) {
        let estimation = ColoredIcp::new(0.968, EstimationParams::default()).unwrap();
        let corres = CorrespondenceSet::identity(sample_ellipsoid_pointcloud.len());

        let mut no_gradients = sample_ellipsoid_pointcloud.clone();
        no_gradients.color_gradients = None;
        assert!(matches!(
            estimation.compute_transformation(&sample_ellipsoid_pointcloud, &no_gradients, &corres),
            Err(Error::MissingAttribute {
                cloud: "target",
                attribute: "color gradients"
            })
        ));

        let no_colors = without_colors(&sample_ellipsoid_pointcloud);
        assert!(matches!(
            estimation.compute_rmse(&sample_ellipsoid_pointcloud, &no_colors, &corres),
            Err(Error::MissingAttribute {
                cloud: "target",
                attribute: "colors"
            })
        ));
        assert!(matches!(
            estimation.compute_transformation(&no_colors, &sample_ellipsoid_pointcloud, &corres),
            Err(Error::MissingAttribute {
                cloud: "source",
                attribute: "colors"
            })
        ));
    }

    #[rstest]
    fn test_empty_set(sample_ellipsoid_pointcloud: PointCloud) {
        let estimation = ColoredIcp::new(0.5, EstimationParams::default()).unwrap();
        let empty = CorrespondenceSet::default();
        let pcl = &sample_ellipsoid_pointcloud;

        assert!(matches!(
            estimation.compute_rmse(pcl, pcl, &empty),
            Err(Error::EmptyCorrespondenceSet)
        ));
        assert!(matches!(
            estimation.compute_transformation(pcl, pcl, &empty),
            Err(Error::EmptyCorrespondenceSet)
        ));
    }
}
