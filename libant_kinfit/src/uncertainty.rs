use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

use super::candidate::DetectorType;
use super::particle::Particle;
use super::particle_type::ParticleType;

/// Absolute uncertainties of one particle. Energies in MeV, angles in rad.
///
/// A sigma of zero marks the quantity as unmeasured for the fitters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Uncertainties {
    pub sigma_ek: f64,
    pub sigma_theta: f64,
    pub sigma_phi: f64,
}

impl Uncertainties {
    pub fn new(sigma_ek: f64, sigma_theta: f64, sigma_phi: f64) -> Self {
        Self {
            sigma_ek,
            sigma_theta,
            sigma_phi,
        }
    }
}

/// Provides measurement uncertainties to the fitters and to MC smearing.
///
/// Models are shared read-only between fitter instances, so they must be `Send + Sync`.
pub trait UncertaintyModel: Send + Sync + Debug {
    fn sigmas(&self, particle: &Particle) -> Uncertainties;
    fn beam_sigma(&self, beam_energy: f64) -> f64;
}

/// The same uncertainties for every particle of a species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantModel {
    pub photon: Uncertainties,
    pub proton: Uncertainties,
    pub beam: f64,
}

impl Default for ConstantModel {
    fn default() -> Self {
        Self {
            photon: Uncertainties::new(20.0, 2.5_f64.to_radians(), 2.5_f64.to_radians()),
            proton: Uncertainties::new(0.0, 2.0_f64.to_radians(), 2.0_f64.to_radians()),
            beam: 1.0,
        }
    }
}

impl UncertaintyModel for ConstantModel {
    fn sigmas(&self, particle: &Particle) -> Uncertainties {
        match particle.ptype {
            ParticleType::Proton => self.proton,
            _ => self.photon,
        }
    }

    fn beam_sigma(&self, _beam_energy: f64) -> f64 {
        self.beam
    }
}

/// Energy and angle dependent resolutions of the CB and TAPS calorimeters.
///
/// Photons in CB: `sigma_E = 0.02 E (E/GeV)^-0.36`, 2.5 deg in theta.
/// Photons in TAPS: `sigma_E = 0.018 E + 8 MeV (E/GeV)^0.5`, 1 deg in theta.
/// The azimuthal photon resolution scales with `1/sin(theta)`. The proton kinetic energy
/// is left unmeasured, both of its angles get 2 deg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametrizedModel {
    pub beam: f64,
}

impl Default for ParametrizedModel {
    fn default() -> Self {
        Self { beam: 1.0 }
    }
}

// keeps tiny or negative (smeared) energies out of the power laws
const MIN_EK_FOR_RESOLUTION: f64 = 1.0;

impl UncertaintyModel for ParametrizedModel {
    fn sigmas(&self, particle: &Particle) -> Uncertainties {
        if particle.ptype == ParticleType::Proton {
            let sigma = 2.0_f64.to_radians();
            return Uncertainties::new(0.0, sigma, sigma);
        }

        let sin_theta = particle.theta.sin().abs().max(1.0e-3);

        let e_gev = particle.ek.max(MIN_EK_FOR_RESOLUTION) / 1000.0;
        if particle.candidate.detector.contains(DetectorType::TAPS) {
            let sigma_theta = 1.0_f64.to_radians();
            Uncertainties::new(
                0.018 * e_gev * 1000.0 + 8.0 * e_gev.sqrt(),
                sigma_theta,
                sigma_theta / sin_theta,
            )
        } else {
            let sigma_theta = 2.5_f64.to_radians();
            Uncertainties::new(
                0.02 * e_gev * 1000.0 * e_gev.powf(-0.36),
                sigma_theta,
                sigma_theta / sin_theta,
            )
        }
    }

    fn beam_sigma(&self, _beam_energy: f64) -> f64 {
        self.beam
    }
}

/// Selects one of the uncertainty models in the configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UncertaintyModelKind {
    Parametrized(ParametrizedModel),
    Constant(ConstantModel),
}

impl Default for UncertaintyModelKind {
    fn default() -> Self {
        Self::Parametrized(ParametrizedModel::default())
    }
}

impl UncertaintyModelKind {
    pub fn build(&self) -> Arc<dyn UncertaintyModel> {
        match self {
            Self::Parametrized(m) => Arc::new(m.clone()),
            Self::Constant(m) => Arc::new(m.clone()),
        }
    }

    /// The first configured sigma that is negative or NaN, with its name
    pub fn invalid_sigma(&self) -> Option<(String, f64)> {
        let sigmas = match self {
            Self::Parametrized(m) => vec![("beam", m.beam)],
            Self::Constant(m) => vec![
                ("photon.sigma_ek", m.photon.sigma_ek),
                ("photon.sigma_theta", m.photon.sigma_theta),
                ("photon.sigma_phi", m.photon.sigma_phi),
                ("proton.sigma_ek", m.proton.sigma_ek),
                ("proton.sigma_theta", m.proton.sigma_theta),
                ("proton.sigma_phi", m.proton.sigma_phi),
                ("beam", m.beam),
            ],
        };
        sigmas
            .into_iter()
            .find(|(_, sigma)| !(*sigma >= 0.0))
            .map(|(name, sigma)| (name.to_string(), sigma))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;
    use approx::assert_relative_eq;

    #[test]
    fn test_parametrized_photons() {
        let model = ParametrizedModel::default();
        let cb = Arc::new(Candidate::new(1000.0, 1.0, 0.0, DetectorType::CB));
        let taps = Arc::new(Candidate::new(1000.0, 0.2, 0.0, DetectorType::TAPS));
        let s_cb = model.sigmas(&Particle::new(ParticleType::Photon, cb));
        let s_taps = model.sigmas(&Particle::new(ParticleType::Photon, taps));
        assert_relative_eq!(s_cb.sigma_ek, 20.0, epsilon = 1e-9);
        assert_relative_eq!(s_taps.sigma_ek, 26.0, epsilon = 1e-9);
        assert_relative_eq!(s_cb.sigma_phi, 2.5_f64.to_radians() / 1.0_f64.sin(), epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_sigma() {
        assert!(UncertaintyModelKind::default().invalid_sigma().is_none());
        let mut model = ConstantModel::default();
        assert!(UncertaintyModelKind::Constant(model.clone())
            .invalid_sigma()
            .is_none());
        model.proton.sigma_theta = -0.1;
        assert_eq!(
            UncertaintyModelKind::Constant(model).invalid_sigma(),
            Some((String::from("proton.sigma_theta"), -0.1))
        );
        let kind = UncertaintyModelKind::Parametrized(ParametrizedModel { beam: f64::NAN });
        assert!(kind.invalid_sigma().is_some());
    }

    #[test]
    fn test_proton_energy_unmeasured() {
        let model = UncertaintyModelKind::default().build();
        let cand = Arc::new(Candidate::new(120.0, 0.3, 1.0, DetectorType::TAPS));
        let sigmas = model.sigmas(&Particle::new(ParticleType::Proton, cand));
        assert_eq!(sigmas.sigma_ek, 0.0);
        assert!(sigmas.sigma_theta > 0.0);
        assert_eq!(model.beam_sigma(1500.0), 1.0);
    }
}
