use nalgebra::{Matrix3, Vector3};

/// Jacobian row of `direction·(R (s - pivot) + pivot + t)` at the identity, where `lever = s - pivot`.
fn se3_jacobian(lever: &Vector3<f64>, direction: &Vector3<f64>) -> [f64; 6] {
    let twist = lever.cross(direction);
    [
        direction[0],
        direction[1],
        direction[2],
        twist[0],
        twist[1],
        twist[2],
    ]
}

pub struct PointPlaneDistance {}

impl PointPlaneDistance {
    /// Computes the residual and the Jacobian of the point-plane distance.
    ///
    /// # Arguments
    ///
    /// * source_point - 3D point in the source frame.
    /// * target_point - 3D point in the target frame.
    /// * target_normal - Normal of the plane in the target frame.
    /// * pivot - Center of the linearized rotation.
    ///
    /// # Returns
    ///
    /// * The residual `(target - source)·n` and the Jacobian row with respect
    ///   to `(translation, rotation about pivot)`.
    pub fn jacobian(
        &self,
        source_point: &Vector3<f64>,
        target_point: &Vector3<f64>,
        target_normal: &Vector3<f64>,
        pivot: &Vector3<f64>,
    ) -> (f64, [f64; 6]) {
        let residual = (target_point - source_point).dot(target_normal);
        (residual, se3_jacobian(&(source_point - pivot), target_normal))
    }
}

/// Photometric distance between a source intensity and the target intensity
/// predicted on the tangent plane.
pub struct ColorDistance {}

impl ColorDistance {
    /// Intensity of the target surface at the projection of `source_point` on the tangent plane.
    pub fn predicted_intensity(
        &self,
        source_point: &Vector3<f64>,
        target_point: &Vector3<f64>,
        target_normal: &Vector3<f64>,
        target_intensity: f64,
        target_gradient: &Vector3<f64>,
    ) -> f64 {
        let offset = source_point - target_point;
        let projected = source_point - target_normal * offset.dot(target_normal);
        target_intensity + target_gradient.dot(&(projected - target_point))
    }

    /// Computes the residual and the Jacobian of the color distance.
    ///
    /// # Returns
    ///
    /// * The residual `I_source - I_predicted` and the Jacobian row with respect
    ///   to `(translation, rotation about pivot)`.
    #[allow(clippy::too_many_arguments)]
    pub fn jacobian(
        &self,
        source_point: &Vector3<f64>,
        target_point: &Vector3<f64>,
        target_normal: &Vector3<f64>,
        source_intensity: f64,
        target_intensity: f64,
        target_gradient: &Vector3<f64>,
        pivot: &Vector3<f64>,
    ) -> (f64, [f64; 6]) {
        let residual = source_intensity
            - self.predicted_intensity(
                source_point,
                target_point,
                target_normal,
                target_intensity,
                target_gradient,
            );

        let tangent_projection = Matrix3::identity() - target_normal * target_normal.transpose();
        let gradient = tangent_projection * target_gradient;
        (residual, se3_jacobian(&(source_point - pivot), &gradient))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_point_plane_distance() {
        let (residual, jacobian) = PointPlaneDistance {}.jacobian(
            &Vector3::new(1.0, 0.0, 0.5),
            &Vector3::new(0.0, 0.0, 2.0),
            &Vector3::new(0.0, 0.0, 1.0),
            &Vector3::zeros(),
        );

        assert_abs_diff_eq!(residual, 1.5);
        assert_eq!(jacobian, [0.0, 0.0, 1.0, 0.0, -1.0, 0.0]);
    }

    #[test]
    fn test_point_plane_jacobian_about_pivot() {
        let normal = Vector3::new(0.0, 0.0, 1.0);
        let pivot = Vector3::new(50.0, 25.0, 0.0);
        let (residual, jacobian) = PointPlaneDistance {}.jacobian(
            &Vector3::new(51.0, 25.0, 0.5),
            &Vector3::new(50.0, 25.0, 2.0),
            &normal,
            &pivot,
        );

        // Same row as a point one unit along x from the origin.
        assert_abs_diff_eq!(residual, 1.5);
        assert_eq!(jacobian, [0.0, 0.0, 1.0, 0.0, -1.0, 0.0]);
    }

    #[test]
    fn test_color_distance_on_plane() {
        let gradient = Vector3::new(0.5, 0.0, 0.0);
        let normal = Vector3::new(0.0, 0.0, 1.0);
        let distance = ColorDistance {};

        // Off-plane displacement does not change the predicted intensity.
        let predicted = distance.predicted_intensity(
            &Vector3::new(0.2, 0.0, 3.0),
            &Vector3::zeros(),
            &normal,
            0.4,
            &gradient,
        );
        assert_abs_diff_eq!(predicted, 0.5, epsilon = 1e-12);

        let (residual, jacobian) = distance.jacobian(
            &Vector3::new(0.2, 0.0, 3.0),
            &Vector3::zeros(),
            &normal,
            0.5,
            0.4,
            &gradient,
            &Vector3::zeros(),
        );
        assert_abs_diff_eq!(residual, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(jacobian[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(jacobian[2], 0.0, epsilon = 1e-12);
    }
}
