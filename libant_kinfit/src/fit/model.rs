use nalgebra::Vector3;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use super::engine::{Solution, Variable};
use super::result::{FitResult, FitStatus};
use super::settings::ZVertex;
use crate::candidate::DetectorType;
use crate::combinations::beam_target;
use crate::constants::{CB_RADIUS, MASS_PROTON, TAPS_DISTANCE};
use crate::lorentz::{unit_vector, LorentzVec};
use crate::particle::Particle;
use crate::uncertainty::UncertaintyModel;

/// Direction of a particle seen from a vertex shifted along the beam axis.
///
/// CB clusters sit on a sphere around the target center, TAPS clusters on a plane
/// downstream of it.
pub fn vertex_direction(
    detector: DetectorType,
    theta: f64,
    phi: f64,
    z_vertex: f64,
) -> Vector3<f64> {
    let position = if detector.contains(DetectorType::TAPS) {
        let r = TAPS_DISTANCE * theta.tan();
        Vector3::new(r * phi.cos(), r * phi.sin(), TAPS_DISTANCE)
    } else {
        unit_vector(theta, phi) * CB_RADIUS
    };
    (position - Vector3::new(0.0, 0.0, z_vertex)).normalize()
}

/// Invariant mass of a group of photons must equal `mass`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MassConstraint {
    pub photons: Vec<usize>,
    pub mass: f64,
}

/// The variables of a proton + photons fit.
///
/// Layout: beam energy, proton (Ek, theta, phi), each photon (Ek, theta, phi), z vertex.
#[derive(Debug, Clone)]
pub(crate) struct FitModel {
    proton_detector: DetectorType,
    photon_detectors: Vec<DetectorType>,
    pub variables: Vec<Variable>,
}

impl FitModel {
    pub fn new(
        model: &dyn UncertaintyModel,
        beam_energy: f64,
        proton: &Particle,
        photons: &[Particle],
        z_vertex: ZVertex,
    ) -> Self {
        let mut variables = Vec::with_capacity(5 + 3 * photons.len());
        variables.push(Variable::measured(beam_energy, model.beam_sigma(beam_energy)));
        for particle in std::iter::once(proton).chain(photons.iter()) {
            let sigmas = model.sigmas(particle);
            variables.push(Variable::measured(particle.ek, sigmas.sigma_ek));
            variables.push(Variable::measured(particle.theta, sigmas.sigma_theta));
            variables.push(Variable::measured(particle.phi, sigmas.sigma_phi));
        }
        variables.push(match z_vertex {
            ZVertex::Fixed => Variable::fixed(0.0),
            ZVertex::Fitted { sigma } => Variable::measured(0.0, sigma),
        });

        Self {
            proton_detector: proton.candidate.detector,
            photon_detectors: photons.iter().map(|p| p.candidate.detector).collect(),
            variables,
        }
    }

    pub fn n_photons(&self) -> usize {
        self.photon_detectors.len()
    }

    fn z_vertex(&self, x: &[f64]) -> f64 {
        x[x.len() - 1]
    }

    fn beam(&self, x: &[f64]) -> LorentzVec {
        LorentzVec::new(Vector3::new(0.0, 0.0, x[0]), x[0])
    }

    fn particle(&self, x: &[f64], offset: usize, detector: DetectorType, mass: f64) -> LorentzVec {
        let dir = vertex_direction(detector, x[offset + 1], x[offset + 2], self.z_vertex(x));
        LorentzVec::from_ek(x[offset], &dir, mass)
    }

    fn proton(&self, x: &[f64]) -> LorentzVec {
        self.particle(x, 1, self.proton_detector, MASS_PROTON)
    }

    fn fill_photons(&self, x: &[f64], photons: &mut Vec<LorentzVec>) {
        photons.clear();
        for (i, detector) in self.photon_detectors.iter().enumerate() {
            photons.push(self.particle(x, 4 + 3 * i, *detector, 0.0));
        }
    }

    /// Four-momentum conservation plus one constraint per mass constraint
    pub fn n_constraints(masses: &[MassConstraint]) -> usize {
        4 + masses.len()
    }

    /// Constraint function for the fit engine
    pub fn constraints<'a>(
        &'a self,
        masses: &'a [MassConstraint],
    ) -> impl FnMut(&[f64], &mut [f64]) + 'a {
        let mut photons = Vec::with_capacity(self.n_photons());
        move |x: &[f64], out: &mut [f64]| {
            self.fill_photons(x, &mut photons);
            let final_state = photons.iter().sum::<LorentzVec>() + self.proton(x);
            let balance = final_state - beam_target(&self.beam(x));
            out[0] = balance.p.x;
            out[1] = balance.p.y;
            out[2] = balance.p.z;
            out[3] = balance.e;
            for (k, constraint) in masses.iter().enumerate() {
                let sum: LorentzVec = constraint.photons.iter().map(|&i| photons[i]).sum();
                out[4 + k] = sum.m() - constraint.mass;
            }
        }
    }

    /// Convert the converged values into fitted momenta
    pub fn result(&self, solution: Solution) -> FitResult {
        let x = &solution.values;
        let mut photons = Vec::with_capacity(self.n_photons());
        self.fill_photons(x, &mut photons);
        FitResult {
            status: FitStatus::Success,
            probability: chi2_probability(solution.chi2, solution.ndf),
            chi2: solution.chi2,
            ndf: solution.ndf,
            iterations: solution.iterations,
            z_vertex: self.z_vertex(x),
            beam_energy: x[0],
            proton: self.proton(x),
            photons,
        }
    }
}

/// Upper tail probability of the chi2 distribution
pub fn chi2_probability(chi2: f64, ndf: i64) -> f64 {
    ChiSquared::new(ndf as f64)
        .map(|dist| dist.sf(chi2))
        .unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vertex_direction_at_center() {
        let (theta, phi) = (0.4, -1.1);
        for det in [DetectorType::CB, DetectorType::TAPS] {
            let dir = vertex_direction(det, theta, phi, 0.0);
            assert_relative_eq!(dir, unit_vector(theta, phi), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_vertex_direction_shifted() {
        // downstream vertex sees CB clusters at larger angles
        let dir = vertex_direction(DetectorType::CB, 1.0, 0.0, 3.0);
        assert!(dir.z.acos() > 1.0);
        let dir = vertex_direction(DetectorType::TAPS, 0.1, 0.0, 3.0);
        let expected = (TAPS_DISTANCE * 0.1_f64.tan()).atan2(TAPS_DISTANCE - 3.0);
        assert_relative_eq!(dir.x.atan2(dir.z), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_probability() {
        assert_relative_eq!(chi2_probability(0.0, 3), 1.0, epsilon = 1e-12);
        assert_relative_eq!(chi2_probability(3.841458820694124, 1), 0.05, epsilon = 1e-6);
        assert!(chi2_probability(1.0, 0).is_nan());
    }
}
