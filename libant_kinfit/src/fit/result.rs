use std::fmt::Display;

use crate::constants::MASS_PROTON;
use crate::lorentz::LorentzVec;

/// Reason for a failed fit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Beam energy or proton missing
    NotConfigured,
    NoPhotons,
    /// Photon count does not match the decay tree
    Multiplicity,
    /// Less constraints than unmeasured variables plus one
    Underconstrained,
    Singular,
    NotFinite,
    NotConverged,
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NotConfigured => "fitter not configured",
            Self::NoPhotons => "no photons",
            Self::Multiplicity => "photon multiplicity mismatch",
            Self::Underconstrained => "underconstrained",
            Self::Singular => "singular matrix",
            Self::NotFinite => "non-finite values",
            Self::NotConverged => "no convergence",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatus {
    Success,
    Failed(FailureKind),
}

/// Outcome of one kinematic fit.
///
/// Failed fits carry NaN for all numbers and no fitted momenta.
#[derive(Debug, Clone)]
pub struct FitResult {
    pub status: FitStatus,
    pub probability: f64,
    pub chi2: f64,
    pub ndf: i64,
    pub iterations: usize,
    pub z_vertex: f64,
    pub beam_energy: f64,
    pub proton: LorentzVec,
    pub photons: Vec<LorentzVec>,
}

impl FitResult {
    pub fn failed(kind: FailureKind) -> Self {
        Self {
            status: FitStatus::Failed(kind),
            probability: f64::NAN,
            chi2: f64::NAN,
            ndf: 0,
            iterations: 0,
            z_vertex: f64::NAN,
            beam_energy: f64::NAN,
            proton: LorentzVec::new(nalgebra::Vector3::repeat(f64::NAN), f64::NAN),
            photons: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FitStatus::Success
    }

    pub fn failure(&self) -> Option<FailureKind> {
        match self.status {
            FitStatus::Success => None,
            FitStatus::Failed(kind) => Some(kind),
        }
    }

    pub fn fitted_proton_ek(&self) -> f64 {
        self.proton.e - MASS_PROTON
    }
}
