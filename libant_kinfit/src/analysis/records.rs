use serde::{Deserialize, Serialize};

use crate::candidate::DetectorType;
use crate::combinations::ProtonPhotonComb;
use crate::cut_counter::CutCount;
use crate::event::{Event, TaggerHit};
use crate::fit::result::FitResult;
use crate::lorentz::{phi_mpi_pi, LorentzVec};

/// Per tagger hit information shared by the signal and the reference records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonRecord {
    pub event_id: u64,
    pub tagg_w: f64,
    pub tagg_e: f64,
    pub tagg_t: f64,
    pub tagg_ch: u32,
    pub cb_sum_e: f64,
    pub cb_avg_time: f64,
    pub pid_sum_e: f64,
    pub is_mc: bool,
    pub true_z_vertex: Option<f64>,
}

impl CommonRecord {
    pub fn new(event: &Event, hit: &TaggerHit, weight: f64) -> Self {
        Self {
            event_id: event.id,
            tagg_w: weight,
            tagg_e: hit.photon_energy,
            tagg_t: hit.time,
            tagg_ch: hit.channel,
            cb_sum_e: event.trigger.cb_energy_sum,
            cb_avg_time: event.trigger.cb_avg_time,
            pid_sum_e: event.pid_energy_sum(),
            is_mc: event.is_mc,
            true_z_vertex: event.true_z_vertex,
        }
    }
}

/// Probability, iterations and vertex of the best fit of one hypothesis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub probability: f64,
    pub iterations: usize,
    pub z_vertex: f64,
}

impl FitSummary {
    pub fn new(fit: &FitResult) -> Self {
        Self {
            probability: fit.probability,
            iterations: fit.iterations,
            z_vertex: fit.z_vertex,
        }
    }
}

/// The proton/photon combination that was chosen by a fit. Angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtonPhotonRecord {
    pub photons_ek: f64,
    pub n_photons_cb: usize,
    pub n_photons_taps: usize,
    pub cb_sum_veto_e: f64,
    pub photon_thetas: Vec<f64>,
    pub discarded_ek: f64,
    pub photon_sum: f64,
    pub missing_mass: f64,
    /// Deviation from coplanarity of proton and photon sum
    pub proton_copl: f64,
    pub proton_time: f64,
    pub proton_e: f64,
    pub proton_theta: f64,
    pub proton_veto_e: f64,
    pub fitted_proton_e: f64,
}

impl ProtonPhotonRecord {
    pub fn new(comb: &ProtonPhotonComb, fitted_proton_e: f64) -> Self {
        let mut record = Self {
            photons_ek: 0.0,
            n_photons_cb: 0,
            n_photons_taps: 0,
            cb_sum_veto_e: 0.0,
            photon_thetas: Vec::with_capacity(comb.photons.len()),
            discarded_ek: comb.discarded_ek,
            photon_sum: comb.photon_sum.m(),
            missing_mass: comb.missing_mass,
            proton_copl: phi_mpi_pi(
                comb.proton.phi - comb.photon_sum.phi() - std::f64::consts::PI,
            )
            .to_degrees(),
            proton_time: comb.proton.candidate.time,
            proton_e: comb.proton.ek,
            proton_theta: comb.proton.theta.to_degrees(),
            proton_veto_e: comb.proton.candidate.veto_energy,
            fitted_proton_e,
        };
        for photon in comb.photons.iter() {
            let cand = &photon.candidate;
            record.photons_ek += cand.calo_energy;
            if cand.detector.contains(DetectorType::CB) {
                record.n_photons_cb += 1;
                record.cb_sum_veto_e += cand.veto_energy;
            }
            if cand.detector.contains(DetectorType::TAPS) {
                record.n_photons_taps += 1;
            }
            record.photon_thetas.push(cand.theta.to_degrees());
        }
        record
    }
}

/// Best tree fit of one signal sub-hypothesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalTreeRecord {
    pub fit: FitSummary,
    pub im_pi0: f64,
    pub im_pi0gg: f64,
    /// Invariant mass of the two photons not from the pi0
    pub im_gg: f64,
    pub im_pi0g: Vec<f64>,
    /// Energies of the bachelor photons in the eta' rest frame
    pub bachelor_e: Vec<f64>,
    pub g_non_pi0_theta: [f64; 2],
    pub g_non_pi0_calo_e: [f64; 2],
    /// All three photon invariant masses of the unfitted photons
    pub ggg: Vec<f64>,
    /// The three ways to pair four photons, first and second pair
    pub gg_gg1: Vec<f64>,
    pub gg_gg2: Vec<f64>,
    pub proton_photon: ProtonPhotonRecord,
}

/// Three photon masses and the two photon pairings of the given photons
pub fn photon_combinatorics(photons: &[LorentzVec]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let n = photons.len();
    let mut ggg = Vec::new();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                ggg.push((photons[i] + photons[j] + photons[k]).m());
            }
        }
    }

    let mut gg_gg1 = Vec::new();
    let mut gg_gg2 = Vec::new();
    if n == 4 {
        for [a, b, c, d] in [[0, 1, 2, 3], [0, 2, 1, 3], [0, 3, 1, 2]] {
            gg_gg1.push((photons[a] + photons[b]).m());
            gg_gg2.push((photons[c] + photons[d]).m());
        }
    }
    (ggg, gg_gg1, gg_gg2)
}

/// A signal candidate: passed the kinematic fit and the anti-hypothesis veto, and at least one
/// of the sub-hypotheses was fitted successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub common: CommonRecord,
    pub kinfit: FitSummary,
    pub anti_pi0pi0: Option<FitSummary>,
    pub anti_pi0eta: Option<FitSummary>,
    pub pi0: Option<SignalTreeRecord>,
    pub omega_pi0: Option<SignalTreeRecord>,
}

/// A reference candidate `eta' -> g g`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub common: CommonRecord,
    pub kinfit: FitSummary,
    pub proton_photon: ProtonPhotonRecord,
    pub im_2g: f64,
}

/// Cut counters and totals of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_number: i32,
    pub events: u64,
    /// Event documents that could not be read and were skipped
    pub malformed_events: u64,
    pub signal_records: u64,
    pub reference_records: u64,
    pub event_cuts: Vec<CutCount>,
    pub signal_cuts: Vec<CutCount>,
    pub reference_cuts: Vec<CutCount>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;
    use crate::particle::Particle;
    use crate::particle_type::ParticleType;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    #[test]
    fn test_photon_combinatorics() {
        let photons: Vec<LorentzVec> = (0..4)
            .map(|i| {
                let i = i as f64;
                LorentzVec::from_ek_theta_phi(100.0, 0.5 + 0.5 * i, 1.5 * i, 0.0)
            })
            .collect();
        let (ggg, gg_gg1, gg_gg2) = photon_combinatorics(&photons);
        assert_eq!(ggg.len(), 4);
        assert_eq!(gg_gg1.len(), 3);
        assert_relative_eq!(ggg[3], (photons[1] + photons[2] + photons[3]).m());
        assert_relative_eq!(gg_gg1[2], (photons[0] + photons[3]).m());
        assert_relative_eq!(gg_gg2[2], (photons[1] + photons[2]).m());

        let (ggg, gg_gg1, _) = photon_combinatorics(&photons[..2]);
        assert!(ggg.is_empty());
        assert!(gg_gg1.is_empty());
    }

    #[test]
    fn test_proton_photon_record() {
        let mut cb = Candidate::new(200.0, 1.0, 0.5, DetectorType::CB);
        cb.veto_energy = 1.5;
        let taps = Candidate::new(100.0, 0.2, -2.0, DetectorType::TAPS);
        let mut proton = Candidate::new(80.0, 0.3, 0.5 + std::f64::consts::PI, DetectorType::TAPS);
        proton.time = 2.0;
        let photons = vec![
            Particle::new(ParticleType::Photon, Arc::new(cb)),
            Particle::new(ParticleType::Photon, Arc::new(taps)),
        ];
        let comb = ProtonPhotonComb {
            proton: Particle::new(ParticleType::Proton, Arc::new(proton)),
            photon_sum: photons.iter().map(|p| p.lorentz()).sum(),
            photons,
            discarded_ek: 12.0,
            missing_mass: 940.0,
        };
        let record = ProtonPhotonRecord::new(&comb, 85.0);
        assert_eq!(record.photons_ek, 300.0);
        assert_eq!(record.n_photons_cb, 1);
        assert_eq!(record.n_photons_taps, 1);
        assert_eq!(record.cb_sum_veto_e, 1.5);
        assert_eq!(record.photon_thetas.len(), 2);
        assert_eq!(record.proton_time, 2.0);
        assert_eq!(record.fitted_proton_e, 85.0);
        assert!(record.proton_copl.abs() < 180.0);
    }
}
