use serde::{Deserialize, Serialize};

/// Convergence settings of the constrained fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitSettings {
    pub max_iterations: usize,
    /// Largest accepted constraint violation, in MeV
    pub constraint_accuracy: f64,
    /// Largest accepted change of chi2 between iterations
    pub chi2_accuracy: f64,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            constraint_accuracy: 1.0e-3,
            chi2_accuracy: 1.0e-2,
        }
    }
}

impl FitSettings {
    pub fn with_max_iterations(&self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..*self
        }
    }
}

/// Treatment of the z position of the interaction vertex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ZVertex {
    /// Not a fit variable, stays at the target center
    Fixed,
    /// Fit variable with a Gaussian prior around the target center. A sigma of 0 leaves it
    /// unmeasured.
    Fitted { sigma: f64 },
}

impl Default for ZVertex {
    fn default() -> Self {
        Self::Fitted {
            sigma: crate::constants::Z_VERTEX_SIGMA,
        }
    }
}
