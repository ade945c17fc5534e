use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::records::{
    photon_combinatorics, FitSummary, ProtonPhotonRecord, SignalRecord, SignalTreeRecord,
};
use super::EventParams;
use crate::combinations::{FilterParams, ProtonPhotonComb};
use crate::constants::*;
use crate::cut_counter::CutCounter;
use crate::error::AnalysisError;
use crate::fit::kinfit::KinFitter;
use crate::fit::select::select_best;
use crate::fit::settings::{FitSettings, ZVertex};
use crate::fit::topology::Channel;
use crate::fit::treefit::{FittedLeaf, IterationFilter, NodeMasses, TreeFitResult, TreeFitter};
use crate::interval::Interval;
use crate::lorentz::LorentzVec;
use crate::particle_type::ParticleType;
use crate::uncertainty::UncertaintyModel;

/// Cuts and fit settings of the signal branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub filter: FilterParams,
    pub kinfit_iterations: usize,
    pub min_kinfit_prob: f64,
    pub anti_iterations: usize,
    pub anti_pi0_window: f64,
    pub anti_eta_window: f64,
    pub max_anti_prob: f64,
    pub treefit_iterations: usize,
    pub ranked_permutations: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            filter: FilterParams {
                n_photons: SIG_N_PHOTONS,
                max_discarded_ek: MAX_DISCARDED_EK,
                missing_mass: ParticleType::Proton.window(MISSING_MASS_WINDOW),
                photon_sum_mass: Interval::above(SIG_MIN_PHOTON_SUM),
            },
            kinfit_iterations: SIG_KINFIT_ITERATIONS,
            min_kinfit_prob: SIG_MIN_KINFIT_PROB,
            anti_iterations: SIG_KINFIT_ITERATIONS,
            anti_pi0_window: ANTI_PI0_WINDOW,
            anti_eta_window: ANTI_ETA_WINDOW,
            max_anti_prob: SIG_MAX_ANTI_PROB,
            treefit_iterations: SIG_TREEFIT_ITERATIONS,
            ranked_permutations: SIG_RANKED_PERMUTATIONS,
        }
    }
}

/// Which mass constraints of `EtaPrime(g Omega(g Pi0(g g)))` are used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubHypothesis {
    /// Only the pi0 is constrained
    Pi0,
    /// Omega and pi0 are constrained
    OmegaPi0,
}

/// Ranks permutations by how close the unfitted pi0 and omega are to their nominal masses
fn signal_rank(masses: &NodeMasses) -> f64 {
    [ParticleType::Pi0, ParticleType::Omega]
        .iter()
        .filter_map(|&ptype| masses.get(ptype).map(|m| 1.0 / (ptype.mass() - m).powi(2)))
        .sum()
}

/// The signal branch `eta' -> g omega -> g g pi0 -> 4g`.
#[derive(Debug)]
pub struct Signal {
    config: SignalConfig,
    cuts: CutCounter,
    kinfitter: KinFitter,
    anti_pi0pi0: TreeFitter,
    anti_pi0eta: TreeFitter,
    pi0: TreeFitter,
    omega_pi0: TreeFitter,
}

impl Signal {
    pub fn new(
        config: &SignalConfig,
        model: Arc<dyn UncertaintyModel>,
        settings: FitSettings,
        z_vertex: ZVertex,
    ) -> Result<Self, AnalysisError> {
        let kinfitter = KinFitter::new(
            model.clone(),
            settings.with_max_iterations(config.kinfit_iterations),
            z_vertex,
        );

        let anti_settings = settings.with_max_iterations(config.anti_iterations);
        let mut anti_pi0pi0 = TreeFitter::new(
            Channel::TwoPi0_4g.tree()?,
            model.clone(),
            anti_settings,
            z_vertex,
        )?;
        let pi0_window = ParticleType::Pi0.window(config.anti_pi0_window);
        anti_pi0pi0.set_iteration_filter(Some(IterationFilter::Accept(Box::new(
            move |masses: &NodeMasses| {
                masses.of(ParticleType::Pi0).all(|m| pi0_window.contains(m))
            },
        ))));

        let mut anti_pi0eta = TreeFitter::new(
            Channel::Pi0Eta_4g.tree()?,
            model.clone(),
            anti_settings,
            z_vertex,
        )?;
        let eta_window = ParticleType::Eta.window(config.anti_eta_window);
        anti_pi0eta.set_iteration_filter(Some(IterationFilter::Accept(Box::new(
            move |masses: &NodeMasses| {
                masses.of(ParticleType::Pi0).all(|m| pi0_window.contains(m))
                    && masses.of(ParticleType::Eta).all(|m| eta_window.contains(m))
            },
        ))));

        let sig_settings = settings.with_max_iterations(config.treefit_iterations);
        let make_signal_fitter = |excluded: &[ParticleType]| -> Result<TreeFitter, AnalysisError> {
            let mut fitter = TreeFitter::new(
                Channel::EtaPrime_gOmega_ggPi0_4g.tree()?,
                model.clone(),
                sig_settings,
                z_vertex,
            )?;
            fitter.set_excluded(excluded)?;
            fitter.set_iteration_filter(Some(IterationFilter::Rank {
                score: Box::new(signal_rank),
                max: config.ranked_permutations,
            }));
            Ok(fitter)
        };
        let pi0 = make_signal_fitter(&[ParticleType::EtaPrime, ParticleType::Omega])?;
        let omega_pi0 = make_signal_fitter(&[ParticleType::EtaPrime])?;

        Ok(Self {
            config: config.clone(),
            cuts: CutCounter::new(),
            kinfitter,
            anti_pi0pi0,
            anti_pi0eta,
            pi0,
            omega_pi0,
        })
    }

    pub fn cuts(&self) -> &CutCounter {
        &self.cuts
    }

    /// Run the signal selection for one tagger hit
    pub fn process(&mut self, params: &EventParams) -> Option<SignalRecord> {
        let combs = params
            .combs
            .filter(&self.config.filter, &params.beam_target, &mut self.cuts);
        if combs.is_empty() {
            return None;
        }

        let beam_energy = params.tagger_hit.photon_energy;
        let mut best = None;
        for comb in combs.iter() {
            self.kinfitter.set_beam_energy(beam_energy);
            self.kinfitter.set_proton(&comb.proton);
            self.kinfitter.set_photons(&comb.photons);
            let fit = self.kinfitter.do_fit();
            best = select_best(best.into_iter().chain(std::iter::once(fit)));
        }
        let kinfit = best.map(|fit| FitSummary::new(&fit))?;
        if !(kinfit.probability > self.config.min_kinfit_prob) {
            return None;
        }
        self.cuts.fill("KinFit ok");

        let anti_pi0pi0 = best_tree_fit(&mut self.anti_pi0pi0, beam_energy, &combs)
            .map(|(fit, _)| FitSummary::new(&fit.fit));
        let anti_pi0eta = best_tree_fit(&mut self.anti_pi0eta, beam_energy, &combs)
            .map(|(fit, _)| FitSummary::new(&fit.fit));
        let vetoed = |anti: &Option<FitSummary>| {
            anti.is_some_and(|fit| fit.probability > self.config.max_anti_prob)
        };
        if vetoed(&anti_pi0pi0) || vetoed(&anti_pi0eta) {
            return None;
        }
        self.cuts.fill("Anti ok");

        let pi0 = best_tree_fit(&mut self.pi0, beam_energy, &combs).and_then(|(fit, idx)| {
            signal_tree_record(SubHypothesis::Pi0, &fit, &combs[idx])
        });
        let omega_pi0 =
            best_tree_fit(&mut self.omega_pi0, beam_energy, &combs).and_then(|(fit, idx)| {
                signal_tree_record(SubHypothesis::OmegaPi0, &fit, &combs[idx])
            });

        if pi0.is_none() && omega_pi0.is_none() {
            return None;
        }
        self.cuts.fill("Sig ok");
        if pi0.is_some() && omega_pi0.is_some() {
            self.cuts.fill("Both ok");
        }
        self.cuts
            .fill_weighted("Pi0 ok", if pi0.is_some() { 1.0 } else { 0.0 });
        self.cuts
            .fill_weighted("OmegaPi0 ok", if omega_pi0.is_some() { 1.0 } else { 0.0 });

        Some(SignalRecord {
            common: params.common.clone(),
            kinfit,
            anti_pi0pi0,
            anti_pi0eta,
            pi0,
            omega_pi0,
        })
    }
}

/// Best permutation over all combinations, with the index of its combination
fn best_tree_fit(
    fitter: &mut TreeFitter,
    beam_energy: f64,
    combs: &[ProtonPhotonComb],
) -> Option<(TreeFitResult, usize)> {
    let mut best = None;
    for (idx, comb) in combs.iter().enumerate() {
        fitter.set_beam_energy(beam_energy);
        fitter.set_proton(&comb.proton);
        fitter.set_photons(&comb.photons);
        best = select_best(best.into_iter().chain(fitter.fits().map(|fit| (fit, idx))));
    }
    best
}

fn single_photon(fit: &TreeFitResult, ptype: ParticleType) -> Option<&FittedLeaf> {
    fit.photon_daughters(ptype).into_iter().next()
}

fn signal_tree_record(
    hypothesis: SubHypothesis,
    fit: &TreeFitResult,
    comb: &ProtonPhotonComb,
) -> Option<SignalTreeRecord> {
    let pi0 = fit.node(ParticleType::Pi0)?.fitted;
    let omega = fit.node(ParticleType::Omega)?.fitted;
    let etap = fit.node(ParticleType::EtaPrime)?.fitted;
    let g_omega = single_photon(fit, ParticleType::Omega)?;
    let g_etap = single_photon(fit, ParticleType::EtaPrime)?;
    let to_etap_frame = -etap.boost_vector();

    let (im_pi0g, bachelor_e, non_pi0) = match hypothesis {
        SubHypothesis::Pi0 => {
            // without the omega constraint, the photon with the lower pi0 g mass is taken as
            // the eta' bachelor
            let mut im_pi0g = [(pi0 + g_omega.fitted).m(), (pi0 + g_etap.fitted).m()];
            let (mut g1, mut g2) = (g_omega, g_etap);
            if im_pi0g[0] > im_pi0g[1] {
                im_pi0g.swap(0, 1);
                std::mem::swap(&mut g1, &mut g2);
            }
            let bachelor_e = vec![
                g1.fitted.boost(&to_etap_frame).e,
                g2.fitted.boost(&to_etap_frame).e,
            ];
            (im_pi0g.to_vec(), bachelor_e, [g1, g2])
        }
        SubHypothesis::OmegaPi0 => (
            vec![omega.m()],
            vec![g_etap.fitted.boost(&to_etap_frame).e],
            [g_etap, g_omega],
        ),
    };
    let cands = non_pi0.map(|leaf| comb.photons[leaf.photon_index].candidate.clone());

    let unfitted: Vec<LorentzVec> = comb.photons.iter().map(|p| p.lorentz()).collect();
    let (ggg, gg_gg1, gg_gg2) = photon_combinatorics(&unfitted);

    Some(SignalTreeRecord {
        fit: FitSummary::new(&fit.fit),
        im_pi0: pi0.m(),
        im_pi0gg: etap.m(),
        im_gg: (g_omega.fitted + g_etap.fitted).m(),
        im_pi0g,
        bachelor_e,
        g_non_pi0_theta: [cands[0].theta.to_degrees(), cands[1].theta.to_degrees()],
        g_non_pi0_calo_e: [cands[0].calo_energy, cands[1].calo_energy],
        ggg,
        gg_gg1,
        gg_gg2,
        proton_photon: ProtonPhotonRecord::new(comb, fit.fit.fitted_proton_ek()),
    })
}
