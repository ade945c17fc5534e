use std::sync::Arc;

use super::candidate::Candidate;
use super::lorentz::LorentzVec;
use super::particle_type::ParticleType;

/// A candidate interpreted under a mass hypothesis.
///
/// The measured quantities (kinetic energy and angles) start out as the candidate's values,
/// but may be altered by MC smearing. The candidate is shared, so identity comparisons
/// tell whether two particles stem from the same detector signal.
#[derive(Debug, Clone)]
pub struct Particle {
    pub ptype: ParticleType,
    pub ek: f64,
    pub theta: f64,
    pub phi: f64,
    pub candidate: Arc<Candidate>,
}

impl Particle {
    pub fn new(ptype: ParticleType, candidate: Arc<Candidate>) -> Self {
        Self {
            ptype,
            ek: candidate.calo_energy,
            theta: candidate.theta,
            phi: candidate.phi,
            candidate,
        }
    }

    pub fn lorentz(&self) -> LorentzVec {
        LorentzVec::from_ek_theta_phi(self.ek, self.theta, self.phi, self.ptype.mass())
    }

    pub fn same_candidate(&self, other: &Particle) -> bool {
        Arc::ptr_eq(&self.candidate, &other.candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::DetectorType;

    #[test]
    fn test_same_candidate_is_identity() {
        let a = Arc::new(Candidate::new(100.0, 1.0, 0.0, DetectorType::CB));
        let b = Arc::new(Candidate::new(100.0, 1.0, 0.0, DetectorType::CB));
        let pa_photon = Particle::new(ParticleType::Photon, a.clone());
        let pa_proton = Particle::new(ParticleType::Proton, a);
        let pb_photon = Particle::new(ParticleType::Photon, b);
        assert!(pa_photon.same_candidate(&pa_proton));
        // equal content, but a different detector signal
        assert!(!pa_photon.same_candidate(&pb_photon));
    }
}
