//! Small dense linear algebra shared by the estimators.
//!
//! Reductions accumulate in `f64`; the results are converted to `f32` only when
//! the final [`Transform`] is built.

use nalgebra::{Matrix3, Rotation3, Vector3, Vector6, SVD};

use crate::{error::Error, reduction::Accumulator, transform::Transform};

/// Running sums of the matched source and target positions.
#[derive(Debug, Clone, Copy)]
pub struct CentroidSum {
    pub source: Vector3<f64>,
    pub target: Vector3<f64>,
    pub count: usize,
}

impl Default for CentroidSum {
    fn default() -> Self {
        Self {
            source: Vector3::zeros(),
            target: Vector3::zeros(),
            count: 0,
        }
    }
}

impl CentroidSum {
    pub fn add(&mut self, source: &Vector3<f64>, target: &Vector3<f64>) {
        self.source += source;
        self.target += target;
        self.count += 1;
    }

    /// Source and target centroids, or `None` if nothing was accumulated.
    pub fn centroids(&self) -> Option<(Vector3<f64>, Vector3<f64>)> {
        if self.count == 0 {
            return None;
        }
        let div = self.count as f64;
        Some((self.source / div, self.target / div))
    }
}

impl Accumulator for CentroidSum {
    fn merge(self, other: Self) -> Self {
        Self {
            source: self.source + other.source,
            target: self.target + other.target,
            count: self.count + other.count,
        }
    }
}

/// Cross-covariance `H = Σ (s - c_s)(t - c_t)ᵗ` of centered point pairs.
#[derive(Debug, Clone, Copy)]
pub struct CrossCovariance(pub Matrix3<f64>);

impl Default for CrossCovariance {
    fn default() -> Self {
        Self(Matrix3::zeros())
    }
}

impl CrossCovariance {
    pub fn add(&mut self, centered_source: &Vector3<f64>, centered_target: &Vector3<f64>) {
        self.0 += centered_source * centered_target.transpose();
    }
}

impl Accumulator for CrossCovariance {
    fn merge(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

/// Result of the Kabsch rotation fit.
#[derive(Debug, Clone)]
pub struct KabschRotation {
    /// Proper rotation minimizing `Σ ‖R s - t‖²` for the centered pairs.
    pub rotation: Matrix3<f64>,
    /// Singular values of the cross-covariance, in decreasing order.
    pub singular_values: Vector3<f64>,
    /// Whether `V Uᵗ` was a reflection that had to be corrected.
    pub reflection_corrected: bool,
}

const SVD_MAX_ITERATIONS: usize = 1000;

/// Computes the rotation that best aligns centered source points onto centered target points.
///
/// The rotation is unique while the covariance has rank 2 or more; rank 2 (coplanar
/// points) is resolved by the determinant correction. Below that the call fails.
///
/// # Arguments
///
/// * `covariance` - Cross-covariance `Σ (s - c_s)(t - c_t)ᵗ`.
/// * `tolerance` - Minimum ratio between the second and the first singular value.
pub fn kabsch_rotation(covariance: &Matrix3<f64>, tolerance: f64) -> Result<KabschRotation, Error> {
    let svd = SVD::try_new(*covariance, true, true, f64::EPSILON, SVD_MAX_ITERATIONS)
        .ok_or_else(|| Error::degenerate("SVD of the cross-covariance did not converge"))?;
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Err(Error::degenerate("SVD did not return its singular vectors")),
    };

    let mut order = [0, 1, 2];
    order.sort_by(|&a, &b| svd.singular_values[b].total_cmp(&svd.singular_values[a]));
    let singular_values = Vector3::new(
        svd.singular_values[order[0]],
        svd.singular_values[order[1]],
        svd.singular_values[order[2]],
    );
    log::debug!("cross-covariance singular values: {:?}", singular_values.as_slice());

    if singular_values[0] <= 0.0 || !singular_values[0].is_finite() {
        return Err(Error::degenerate("cross-covariance is zero"));
    }
    if singular_values[1] / singular_values[0] < tolerance {
        log::warn!(
            "rank-deficient cross-covariance, singular values {:?}",
            singular_values.as_slice()
        );
        return Err(Error::degenerate(format!(
            "cross-covariance has rank below 2 (singular values {:e}, {:e}, {:e})",
            singular_values[0], singular_values[1], singular_values[2]
        )));
    }

    let mut v = v_t.transpose();
    let mut rotation = v * u.transpose();
    let reflection_corrected = rotation.determinant() < 0.0;
    if reflection_corrected {
        let flipped = -v.column(order[2]);
        v.set_column(order[2], &flipped);
        rotation = v * u.transpose();
    }

    Ok(KabschRotation {
        rotation,
        singular_values,
        reflection_corrected,
    })
}

/// Builds a transform from a rotation and a translation computed in `f64`.
pub fn to_transform(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Transform {
    Transform::from_rotation_translation(&rotation.cast::<f32>(), &translation.cast::<f32>())
}

/// Converts a linearized update `(t, ω)` into an exact rigid transform.
///
/// The update rotates by `exp(ω)` about `pivot` and then translates by `t`, which is
/// `x ↦ R (x - pivot) + pivot + t` in the frame of the points. The angle-axis vector `ω`
/// goes through the exponential map, so the rotation stays orthonormal whatever its magnitude.
pub fn linearized_to_transform(update: &Vector6<f64>, pivot: &Vector3<f64>) -> Transform {
    let rotation = Rotation3::new(Vector3::new(update[3], update[4], update[5]));
    let translation = Vector3::new(update[0], update[1], update[2]) + pivot - rotation * pivot;
    to_transform(rotation.matrix(), &translation)
}
