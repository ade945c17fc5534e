use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::sync::Arc;

use super::error::SmearError;
use super::particle::Particle;
use super::uncertainty::UncertaintyModel;

/// Additional Gaussian smearing of simulated particles.
///
/// The widths come from an uncertainty model. The generator is seeded, so a given
/// configuration always smears a given event sequence identically.
#[derive(Debug)]
pub struct MCSmear {
    model: Arc<dyn UncertaintyModel>,
    rng: StdRng,
}

impl MCSmear {
    pub fn new(model: Arc<dyn UncertaintyModel>, seed: u64) -> Self {
        Self {
            model,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Smear a copy of the particle. Unmeasured quantities (sigma 0) are left untouched.
    pub fn smear(&mut self, particle: &Particle) -> Result<Particle, SmearError> {
        let sigmas = self.model.sigmas(particle);
        let mut smeared = particle.clone();
        smeared.ek = (particle.ek + self.gauss(sigmas.sigma_ek)?).max(0.0);
        smeared.theta = particle.theta + self.gauss(sigmas.sigma_theta)?;
        smeared.phi = particle.phi + self.gauss(sigmas.sigma_phi)?;
        Ok(smeared)
    }

    fn gauss(&mut self, sigma: f64) -> Result<f64, SmearError> {
        if sigma == 0.0 {
            return Ok(0.0);
        }
        let dist = Normal::new(0.0, sigma).map_err(|_| SmearError::BadWidth(sigma))?;
        Ok(dist.sample(&mut self.rng))
    }
}
