use serde_derive::{Deserialize, Serialize};

use crate::{error::Error, optim::RobustKernel};

/// Parameters shared by the estimators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationParams {
    /// Relative threshold under which the covariance or the normal equations are
    /// considered rank-deficient.
    pub degeneracy_tolerance: f64,
    /// Robust kernel of the linearized estimators. Point-to-point ignores it.
    pub kernel: RobustKernel,
    /// Minimum number of correspondences handled by one parallel worker.
    pub min_chunk_len: usize,
}

impl Default for EstimationParams {
    fn default() -> Self {
        Self {
            degeneracy_tolerance: 1e-6,
            kernel: RobustKernel::L2,
            min_chunk_len: 1024,
        }
    }
}

impl EstimationParams {
    pub fn degeneracy_tolerance(&'_ mut self, value: f64) -> &'_ mut EstimationParams {
        self.degeneracy_tolerance = value;
        self
    }

    pub fn kernel(&'_ mut self, value: RobustKernel) -> &'_ mut EstimationParams {
        self.kernel = value;
        self
    }

    pub fn min_chunk_len(&'_ mut self, value: usize) -> &'_ mut EstimationParams {
        self.min_chunk_len = value;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.degeneracy_tolerance.is_finite() && self.degeneracy_tolerance >= 0.0) {
            return Err(Error::invalid_input(format!(
                "degeneracy tolerance must be a non-negative number, got {}",
                self.degeneracy_tolerance
            )));
        }
        if !self.kernel.is_valid() {
            return Err(Error::invalid_input(format!(
                "invalid robust kernel {:?}",
                self.kernel
            )));
        }
        Ok(())
    }
}
