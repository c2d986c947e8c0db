use serde_derive::{Deserialize, Serialize};

/// Loss functions that reduce the influence of large residuals.
pub trait RobustEstimator {
    /// Weight applied to a row of the normal equations with the given residual.
    fn weight(&self, residual: f64) -> f64;
}

pub struct HuberEstimator {
    pub delta: f64,
}

impl RobustEstimator for HuberEstimator {
    fn weight(&self, residual: f64) -> f64 {
        let abs = residual.abs();
        if abs <= self.delta {
            1.0
        } else {
            self.delta / abs
        }
    }
}

pub struct CauchyEstimator {
    pub k: f64,
}

impl RobustEstimator for CauchyEstimator {
    fn weight(&self, residual: f64) -> f64 {
        1.0 / (1.0 + (residual / self.k).powi(2))
    }
}

pub struct TukeyEstimator {
    pub k: f64,
}

impl RobustEstimator for TukeyEstimator {
    fn weight(&self, residual: f64) -> f64 {
        let abs = residual.abs();
        if abs > self.k {
            0.0
        } else {
            (1.0 - (abs / self.k).powi(2)).powi(2)
        }
    }
}

/// Smallest residual magnitude used by the L1 weight.
const L1_EPSILON: f64 = 1e-9;

/// Kernel selection for the linearized estimators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind")]
pub enum RobustKernel {
    /// Plain least squares.
    #[default]
    L2,
    L1,
    Huber { delta: f64 },
    Cauchy { k: f64 },
    Tukey { k: f64 },
}

impl RobustEstimator for RobustKernel {
    fn weight(&self, residual: f64) -> f64 {
        match *self {
            RobustKernel::L2 => 1.0,
            RobustKernel::L1 => 1.0 / residual.abs().max(L1_EPSILON),
            RobustKernel::Huber { delta } => HuberEstimator { delta }.weight(residual),
            RobustKernel::Cauchy { k } => CauchyEstimator { k }.weight(residual),
            RobustKernel::Tukey { k } => TukeyEstimator { k }.weight(residual),
        }
    }
}

impl RobustKernel {
    /// Rejects non-positive or non-finite scale parameters.
    pub fn is_valid(&self) -> bool {
        match *self {
            RobustKernel::L2 | RobustKernel::L1 => true,
            RobustKernel::Huber { delta: scale }
            | RobustKernel::Cauchy { k: scale }
            | RobustKernel::Tukey { k: scale } => scale.is_finite() && scale > 0.0,
        }
    }
}
