use std::sync::Arc;

use super::engine::FitEngine;
use super::model::FitModel;
use super::result::{FailureKind, FitResult};
use super::settings::{FitSettings, ZVertex};
use crate::particle::Particle;
use crate::uncertainty::UncertaintyModel;

/// Kinematic fit of a proton and photons against the beam photon on a proton target.
///
/// The fitter is configured in place with the `set_*` methods and then fitted with
/// [`KinFitter::do_fit`]. Every fit starts from the configured values, so a fitter can be
/// reused for any number of hypotheses.
#[derive(Debug)]
pub struct KinFitter {
    model: Arc<dyn UncertaintyModel>,
    z_vertex: ZVertex,
    engine: FitEngine,
    beam_energy: Option<f64>,
    proton: Option<Particle>,
    photons: Vec<Particle>,
}

impl KinFitter {
    pub fn new(model: Arc<dyn UncertaintyModel>, settings: FitSettings, z_vertex: ZVertex) -> Self {
        Self {
            model,
            z_vertex,
            engine: FitEngine::new(settings),
            beam_energy: None,
            proton: None,
            photons: Vec::new(),
        }
    }

    pub fn set_beam_energy(&mut self, beam_energy: f64) {
        self.beam_energy = Some(beam_energy);
    }

    pub fn set_proton(&mut self, proton: &Particle) {
        self.proton = Some(proton.clone());
    }

    pub fn set_photons(&mut self, photons: &[Particle]) {
        self.photons = photons.to_vec();
    }

    pub fn do_fit(&mut self) -> FitResult {
        let (Some(beam_energy), Some(proton)) = (self.beam_energy, self.proton.as_ref()) else {
            return FitResult::failed(FailureKind::NotConfigured);
        };
        if self.photons.is_empty() {
            return FitResult::failed(FailureKind::NoPhotons);
        }

        let model = FitModel::new(
            self.model.as_ref(),
            beam_energy,
            proton,
            &self.photons,
            self.z_vertex,
        );
        match self.engine.solve(
            &model.variables,
            FitModel::n_constraints(&[]),
            model.constraints(&[]),
        ) {
            Ok(solution) => model.result(solution),
            Err(kind) => {
                spdlog::trace!("Kinematic fit failed: {kind}");
                FitResult::failed(kind)
            }
        }
    }
}
