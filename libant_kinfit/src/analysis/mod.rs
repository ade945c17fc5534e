//! The `eta' -> omega g` analysis.
//!
//! Events pass a preselection, then for every tagger hit in the prompt or random window the
//! signal and reference branches select their best hypothesis.
pub mod records;
pub mod reference;
pub mod signal;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use self::records::{CommonRecord, ReferenceRecord, SignalRecord};
use self::reference::Reference;
use self::signal::Signal;
use crate::candidate::Candidate;
use crate::combinations::{beam_target, ProtonPhotonCombs};
use crate::config::Config;
use crate::constants::{MC_MIN_CB_ENERGY_SUM, MIN_CANDIDATES};
use crate::cut_counter::CutCounter;
use crate::error::AnalysisError;
use crate::event::{Event, TaggerHit};
use crate::lorentz::LorentzVec;
use crate::prompt_random::PromptRandomWindow;
use crate::smear::MCSmear;

/// Event level cuts applied before any combinatorics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreselectionConfig {
    /// Simple trigger emulation for simulated events
    pub mc_min_cb_energy_sum: f64,
    pub min_candidates: usize,
    pub require_taps: bool,
}

impl Default for PreselectionConfig {
    fn default() -> Self {
        Self {
            mc_min_cb_energy_sum: MC_MIN_CB_ENERGY_SUM,
            min_candidates: MIN_CANDIDATES,
            require_taps: true,
        }
    }
}

/// Everything the branches need to know about the current tagger hit
#[derive(Debug, Clone)]
pub struct EventParams<'a> {
    pub combs: &'a ProtonPhotonCombs,
    pub tagger_hit: TaggerHit,
    pub beam_target: LorentzVec,
    pub common: CommonRecord,
}

/// Records produced by one event, at most one per branch and tagger hit
#[derive(Debug, Clone, Default)]
pub struct EventOutput {
    pub signal: Vec<SignalRecord>,
    pub reference: Vec<ReferenceRecord>,
}

#[derive(Debug)]
pub struct EtapOmegaG {
    preselection: PreselectionConfig,
    prompt_random: PromptRandomWindow,
    correct_tagger_time: bool,
    mc_smear: Option<MCSmear>,
    cuts: CutCounter,
    signal: Signal,
    reference: Reference,
}

impl EtapOmegaG {
    pub fn new(config: &Config) -> Result<Self, AnalysisError> {
        config.validate()?;
        let model = config.uncertainty_model.build();
        let settings = config.fit.settings;
        let z_vertex = config.fit.z_vertex;
        Ok(Self {
            preselection: config.preselection.clone(),
            prompt_random: PromptRandomWindow::from_config(&config.prompt_random)?,
            correct_tagger_time: config.prompt_random.correct_tagger_time,
            mc_smear: config
                .mc_smear
                .as_ref()
                .map(|smear| MCSmear::new(smear.model.build(), smear.seed)),
            cuts: CutCounter::new(),
            signal: Signal::new(&config.signal, model.clone(), settings, z_vertex)?,
            reference: Reference::new(&config.reference, model, settings, z_vertex),
        })
    }

    pub fn cuts(&self) -> &CutCounter {
        &self.cuts
    }

    pub fn signal_cuts(&self) -> &CutCounter {
        self.signal.cuts()
    }

    pub fn reference_cuts(&self) -> &CutCounter {
        self.reference.cuts()
    }

    fn preselect(&mut self, event: &Event) -> bool {
        self.cuts.fill("Seen");
        if !event.candidates.iter().all(|c| c.is_sane()) {
            spdlog::debug!("Event {} has malformed candidates, skipping", event.id);
            return false;
        }
        self.cuts.fill("Candidates sane");

        if event.is_mc {
            if event.trigger.cb_energy_sum <= self.preselection.mc_min_cb_energy_sum {
                return false;
            }
            self.cuts.fill("MC CBEnergySum ok");
        }

        if !event.trigger.cb_avg_time.is_finite() {
            return false;
        }
        self.cuts.fill("CBAvgTime ok");

        if event.candidates.len() < self.preselection.min_candidates {
            return false;
        }
        self.cuts.fill("nCands ok");

        if self.preselection.require_taps && !event.has_taps_candidate() {
            return false;
        }
        self.cuts.fill("1 in TAPS");
        true
    }

    /// Analyse one event. Errors only arise from a broken smearing configuration.
    pub fn process_event(&mut self, event: &Event) -> Result<EventOutput, AnalysisError> {
        let mut output = EventOutput::default();
        if !self.preselect(event) {
            return Ok(output);
        }

        let mut candidates: Vec<Arc<Candidate>> =
            event.candidates.iter().cloned().map(Arc::new).collect();
        candidates.sort_by(|a, b| b.calo_energy.total_cmp(&a.calo_energy));
        let combs = match (self.mc_smear.as_mut(), event.is_mc) {
            (Some(smear), true) => ProtonPhotonCombs::new_smeared(&candidates, smear)?,
            _ => ProtonPhotonCombs::new(&candidates),
        };

        for hit in event.tagger_hits.iter() {
            let time = if self.correct_tagger_time {
                hit.time - event.trigger.cb_avg_time
            } else {
                hit.time
            };
            self.prompt_random.set_time(time);
            let Some(weight) = self.prompt_random.fill_weight() else {
                continue;
            };

            let params = EventParams {
                combs: &combs,
                tagger_hit: *hit,
                beam_target: beam_target(&hit.photon_beam()),
                common: CommonRecord::new(event, hit, weight),
            };
            if let Some(record) = self.signal.process(&params) {
                output.signal.push(record);
            }
            if let Some(record) = self.reference.process(&params) {
                output.reference.push(record);
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MASS_ETAPRIME, MASS_OMEGA, MASS_PI0, SIG_MAX_ANTI_PROB};
    use crate::synthetic::{etap_2g_event, etap_omega_event, two_pi0_event, two_pi0_taps_event};
    use approx::assert_relative_eq;

    fn analysis() -> EtapOmegaG {
        EtapOmegaG::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_preselection() {
        let mut analysis = analysis();
        // all candidates of this event are in the Crystal Ball
        let output = analysis.process_event(&two_pi0_event()).unwrap();
        assert!(output.signal.is_empty() && output.reference.is_empty());
        assert_eq!(analysis.cuts().get("nCands ok"), 1.0);
        assert_eq!(analysis.cuts().get("1 in TAPS"), 0.0);

        let mut event = etap_omega_event();
        event.trigger.cb_avg_time = f64::NAN;
        analysis.process_event(&event).unwrap();
        event.trigger.cb_avg_time = 0.0;
        event.candidates[0].calo_energy = f64::INFINITY;
        analysis.process_event(&event).unwrap();
        assert_eq!(analysis.cuts().get("Seen"), 3.0);
        assert_eq!(analysis.cuts().get("Candidates sane"), 2.0);
        assert_eq!(analysis.cuts().get("CBAvgTime ok"), 1.0);
    }

    #[test]
    fn test_signal_event() {
        let mut analysis = analysis();
        let output = analysis.process_event(&etap_omega_event()).unwrap();
        assert!(output.reference.is_empty());
        assert_eq!(output.signal.len(), 1);

        let record = &output.signal[0];
        assert_eq!(record.common.tagg_w, 1.0);
        assert!(record.kinfit.probability > 0.99);
        // no permutation resembles pi0 pi0 or pi0 eta
        assert!(record.anti_pi0pi0.is_none());
        assert!(record.anti_pi0eta.is_none());

        let pi0 = record.pi0.as_ref().unwrap();
        assert!(pi0.fit.probability > 0.99);
        assert_relative_eq!(pi0.im_pi0, MASS_PI0, epsilon = 1e-2);
        assert_eq!(pi0.im_pi0g.len(), 2);
        assert!(pi0.im_pi0g[0] <= pi0.im_pi0g[1]);
        assert_eq!(pi0.ggg.len(), 4);

        let omega_pi0 = record.omega_pi0.as_ref().unwrap();
        assert!(omega_pi0.fit.probability > 0.99);
        assert_relative_eq!(omega_pi0.im_pi0g[0], MASS_OMEGA, epsilon = 1e-2);
        assert_relative_eq!(omega_pi0.im_pi0gg, MASS_ETAPRIME, epsilon = 0.5);
        // two body decay eta' -> g omega in the eta' rest frame
        assert_relative_eq!(omega_pi0.bachelor_e[0], 159.12, epsilon = 0.5);

        for label in ["KinFit ok", "Anti ok", "Sig ok", "Both ok", "Pi0 ok", "OmegaPi0 ok"] {
            assert_eq!(analysis.signal_cuts().get(label), 1.0, "{label}");
        }
    }

    #[test]
    fn test_anti_hypothesis_veto() {
        let mut analysis = analysis();
        let output = analysis.process_event(&two_pi0_taps_event()).unwrap();
        assert!(output.signal.is_empty());
        assert_eq!(analysis.cuts().get("1 in TAPS"), 1.0);
        assert_eq!(analysis.signal_cuts().get("KinFit ok"), 1.0);
        assert_eq!(analysis.signal_cuts().get("Anti ok"), 0.0);
        assert_eq!(analysis.signal_cuts().get("Sig ok"), 0.0);
    }

    #[test]
    fn test_anti_hypothesis_veto_disabled() {
        let mut config = Config::default();
        // a probability never exceeds one
        config.signal.max_anti_prob = 1.0;
        let mut analysis = EtapOmegaG::new(&config).unwrap();
        let output = analysis.process_event(&two_pi0_taps_event()).unwrap();
        assert_eq!(output.signal.len(), 1);
        assert_eq!(analysis.signal_cuts().get("Anti ok"), 1.0);

        let record = &output.signal[0];
        let anti = record.anti_pi0pi0.unwrap();
        assert!(anti.probability > SIG_MAX_ANTI_PROB);
        let pi0 = record.pi0.as_ref().unwrap();
        assert_relative_eq!(pi0.im_pi0, MASS_PI0, epsilon = 1e-2);
    }

    #[test]
    fn test_reference_event() {
        let mut analysis = analysis();
        let output = analysis.process_event(&etap_2g_event()).unwrap();
        assert!(output.signal.is_empty());
        assert_eq!(output.reference.len(), 1);
        let record = &output.reference[0];
        assert!(record.kinfit.probability > 0.99);
        assert_relative_eq!(record.im_2g, MASS_ETAPRIME, epsilon = 0.5);
        assert_relative_eq!(record.proton_photon.fitted_proton_e, 233.75, epsilon = 0.5);
        assert_eq!(analysis.reference_cuts().get("Fill"), 1.0);
    }

    #[test]
    fn test_tagger_hits() {
        let mut analysis = analysis();
        let mut event = etap_2g_event();
        let beam = event.tagger_hits[0].photon_energy;
        event.tagger_hits = vec![
            TaggerHit::new(1, beam, 30.0),
            TaggerHit::new(2, beam, 8.0),
            TaggerHit::new(3, beam, -2.0),
        ];
        let output = analysis.process_event(&event).unwrap();
        let weights: Vec<f64> = output.reference.iter().map(|r| r.common.tagg_w).collect();
        assert_eq!(weights.len(), 2);
        // prompt 14 ns wide, random 110 ns wide
        assert_relative_eq!(weights[0], -14.0 / 110.0);
        assert_eq!(weights[1], 1.0);
        assert_eq!(output.reference[1].common.tagg_ch, 3);
    }
}
