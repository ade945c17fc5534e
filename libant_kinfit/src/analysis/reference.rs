use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::records::{FitSummary, ProtonPhotonRecord, ReferenceRecord};
use super::EventParams;
use crate::combinations::FilterParams;
use crate::constants::*;
use crate::cut_counter::CutCounter;
use crate::fit::kinfit::KinFitter;
use crate::fit::select::select_best;
use crate::fit::settings::{FitSettings, ZVertex};
use crate::interval::Interval;
use crate::particle_type::ParticleType;
use crate::uncertainty::UncertaintyModel;

/// Cuts and fit settings of the reference branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceConfig {
    pub filter: FilterParams,
    pub kinfit_iterations: usize,
    pub min_kinfit_prob: f64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            filter: FilterParams {
                n_photons: REF_N_PHOTONS,
                max_discarded_ek: MAX_DISCARDED_EK,
                missing_mass: ParticleType::Proton.window(MISSING_MASS_WINDOW),
                photon_sum_mass: Interval::above(REF_MIN_PHOTON_SUM),
            },
            kinfit_iterations: REF_KINFIT_ITERATIONS,
            min_kinfit_prob: REF_MIN_KINFIT_PROB,
        }
    }
}

/// The reference branch `eta' -> g g`, used for normalization
#[derive(Debug)]
pub struct Reference {
    config: ReferenceConfig,
    cuts: CutCounter,
    kinfitter: KinFitter,
}

impl Reference {
    pub fn new(
        config: &ReferenceConfig,
        model: Arc<dyn UncertaintyModel>,
        settings: FitSettings,
        z_vertex: ZVertex,
    ) -> Self {
        Self {
            config: config.clone(),
            cuts: CutCounter::new(),
            kinfitter: KinFitter::new(
                model,
                settings.with_max_iterations(config.kinfit_iterations),
                z_vertex,
            ),
        }
    }

    pub fn cuts(&self) -> &CutCounter {
        &self.cuts
    }

    pub fn process(&mut self, params: &EventParams) -> Option<ReferenceRecord> {
        let combs = params
            .combs
            .filter(&self.config.filter, &params.beam_target, &mut self.cuts);

        let mut best = None;
        for (idx, comb) in combs.iter().enumerate() {
            self.kinfitter.set_beam_energy(params.tagger_hit.photon_energy);
            self.kinfitter.set_proton(&comb.proton);
            self.kinfitter.set_photons(&comb.photons);
            let fit = self.kinfitter.do_fit();
            best = select_best(best.into_iter().chain(std::iter::once((fit, idx))));
        }
        let (fit, idx) = best?;
        if !(fit.probability > self.config.min_kinfit_prob) {
            return None;
        }
        self.cuts.fill("Fill");

        let im_2g = match (fit.photons.first(), fit.photons.last()) {
            (Some(first), Some(last)) => (*first + *last).m(),
            _ => f64::NAN,
        };
        Some(ReferenceRecord {
            common: params.common.clone(),
            kinfit: FitSummary::new(&fit),
            proton_photon: ProtonPhotonRecord::new(&combs[idx], fit.fitted_proton_ek()),
            im_2g,
        })
    }
}
