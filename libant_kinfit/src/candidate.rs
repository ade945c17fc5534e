use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::ops::BitOr;

use super::lorentz::unit_vector;

/// Bitmask of the detectors contributing to a candidate or cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectorType(u8);

impl DetectorType {
    pub const NONE: DetectorType = DetectorType(0);
    pub const CB: DetectorType = DetectorType(1);
    pub const TAPS: DetectorType = DetectorType(1 << 1);
    pub const PID: DetectorType = DetectorType(1 << 2);
    pub const TAPS_VETO: DetectorType = DetectorType(1 << 3);

    pub fn bits(&self) -> u8 {
        self.0
    }

    /// True if any of the detectors in `other` is set
    pub fn contains(&self, other: DetectorType) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for DetectorType {
    type Output = DetectorType;
    fn bitor(self, rhs: DetectorType) -> DetectorType {
        DetectorType(self.0 | rhs.0)
    }
}

/// A reconstructed candidate: one calorimeter cluster with its matched veto information.
///
/// Angles are measured from the target center, energies in MeV, time in ns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub calo_energy: f64,
    #[serde(default)]
    pub veto_energy: f64,
    #[serde(default)]
    pub time: f64,
    pub theta: f64,
    pub phi: f64,
    pub detector: DetectorType,
    #[serde(default)]
    pub cluster_size: u32,
}

impl Candidate {
    pub fn new(calo_energy: f64, theta: f64, phi: f64, detector: DetectorType) -> Self {
        Self {
            calo_energy,
            veto_energy: 0.0,
            time: 0.0,
            theta,
            phi,
            detector,
            cluster_size: 1,
        }
    }

    pub fn direction(&self) -> Vector3<f64> {
        unit_vector(self.theta, self.phi)
    }

    /// Usable as input for the particle builder
    pub fn is_sane(&self) -> bool {
        self.calo_energy.is_finite()
            && self.calo_energy >= 0.0
            && self.theta.is_finite()
            && self.phi.is_finite()
    }
}

/// A bare cluster, needed for energy sums of detectors without candidates (PID).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub detector: DetectorType,
    pub energy: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_flags() {
        let cb_pid = DetectorType::CB | DetectorType::PID;
        assert!(cb_pid.contains(DetectorType::CB));
        assert!(cb_pid.contains(DetectorType::PID));
        assert!(!cb_pid.contains(DetectorType::TAPS));
        assert!(!DetectorType::NONE.contains(DetectorType::CB));
    }

    #[test]
    fn test_sanity() {
        let mut cand = Candidate::new(120.0, 1.0, 0.5, DetectorType::CB);
        assert!(cand.is_sane());
        cand.calo_energy = f64::NAN;
        assert!(!cand.is_sane());
    }
}
