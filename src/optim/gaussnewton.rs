use nalgebra::{Cholesky, SMatrix, SVector, SymmetricEigen, SVD};

use crate::{error::Error, reduction::Accumulator};

/// Accumulates the normal equations `JᵗJ x = Jᵗr` of a Gauss Newton step.
///
/// # Type parameters
///
/// * `DIM` - The dimension of the problem.
#[derive(Debug, Clone)]
pub struct GaussNewton<const DIM: usize> {
    hessian: SMatrix<f64, DIM, DIM>,
    gradient: SVector<f64, DIM>,
    squared_residual_sum: f64,
    count: usize,
}

impl<const DIM: usize> Default for GaussNewton<DIM> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const DIM: usize> GaussNewton<DIM> {
    /// Creates a new Gauss Newton optimizer.
    pub fn new() -> Self {
        Self {
            hessian: SMatrix::zeros(),
            gradient: SVector::zeros(),
            squared_residual_sum: 0.0,
            count: 0,
        }
    }

    /// Adds a new row to the system.
    ///
    /// # Arguments
    ///
    /// * `residual` - The residual of the row.
    /// * `jacobian` - The jacobian of the row.
    /// * `weight` - Weight of the row, 1.0 for plain least squares.
    pub fn step(&mut self, residual: f64, jacobian: &[f64; DIM], weight: f64) {
        for i in 0..DIM {
            let ival = jacobian[i] * weight;
            self.gradient[i] += ival * residual;

            self.hessian[(i, i)] += ival * jacobian[i];
            for j in i + 1..DIM {
                let mul = ival * jacobian[j];
                self.hessian[(i, j)] += mul;
                self.hessian[(j, i)] += mul;
            }
        }

        self.squared_residual_sum += residual * residual;
    }

    /// Counts one correspondence. A correspondence may add more than one row.
    pub fn count_sample(&mut self) {
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the mean squared residual.
    pub fn mean_squared_residual(&self) -> f64 {
        self.squared_residual_sum / self.count as f64
    }
}

impl GaussNewton<6> {
    /// Solve the current gauss newton system.
    ///
    /// # Arguments
    ///
    /// * `tolerance` - Minimum ratio between the smallest and the largest eigenvalue of `JᵗJ`.
    ///
    /// # Returns
    ///
    /// The update vector.
    pub fn solve(&self, tolerance: f64) -> Result<SVector<f64, 6>, Error> {
        if self.count == 0 {
            return Err(Error::EmptyCorrespondenceSet);
        }

        let eigenvalues = SymmetricEigen::new(self.hessian).eigenvalues;
        let max_eigenvalue = eigenvalues.max();
        let min_eigenvalue = eigenvalues.min();
        if max_eigenvalue <= 0.0 || !max_eigenvalue.is_finite() {
            return Err(Error::degenerate("normal equations are zero"));
        }
        let conditioning = min_eigenvalue / max_eigenvalue;
        log::debug!(
            "gauss newton: {} samples, eigenvalues [{:e}, {:e}]",
            self.count,
            min_eigenvalue,
            max_eigenvalue
        );
        if conditioning < tolerance {
            log::warn!(
                "rank-deficient normal equations: eigenvalue ratio {:e} below {:e}",
                conditioning,
                tolerance
            );
            return Err(Error::degenerate(format!(
                "eigenvalue ratio {conditioning:e} is below tolerance {tolerance:e}"
            )));
        }

        match Cholesky::new(self.hessian) {
            Some(cholesky) => Ok(cholesky.solve(&self.gradient)),
            None => {
                log::debug!("cholesky failed, solving with SVD");
                SVD::new(self.hessian, true, true)
                    .solve(&self.gradient, tolerance * max_eigenvalue)
                    .map_err(Error::degenerate)
            }
        }
    }
}

impl<const DIM: usize> Accumulator for GaussNewton<DIM> {
    /// Adds the values of another optimizer to this one.
    /// Use this to combine the state of sub optimizers.
    fn merge(mut self, other: Self) -> Self {
        self.hessian += other.hessian;
        self.gradient += other.gradient;
        self.squared_residual_sum += other.squared_residual_sum;
        self.count += other.count;
        self
    }
}
