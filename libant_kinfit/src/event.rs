use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::candidate::{Candidate, Cluster, DetectorType};
use super::lorentz::LorentzVec;

fn not_a_number() -> f64 {
    f64::NAN
}

/// One hit in the photon tagger: a beam photon candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaggerHit {
    pub channel: u32,
    pub photon_energy: f64,
    pub time: f64,
}

impl TaggerHit {
    pub fn new(channel: u32, photon_energy: f64, time: f64) -> Self {
        Self {
            channel,
            photon_energy,
            time,
        }
    }

    /// The beam photon travels along +z
    pub fn photon_beam(&self) -> LorentzVec {
        LorentzVec::new(Vector3::new(0.0, 0.0, self.photon_energy), self.photon_energy)
    }
}

/// Trigger information as reconstructed (or simulated) for the event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(default)]
    pub cb_energy_sum: f64,
    #[serde(default = "not_a_number")]
    pub cb_avg_time: f64,
}

impl Default for Trigger {
    fn default() -> Self {
        Self {
            cb_energy_sum: 0.0,
            cb_avg_time: f64::NAN,
        }
    }
}

/// The reconstructed content of one event, as handed over by the upstream reconstruction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub is_mc: bool,
    #[serde(default)]
    pub true_z_vertex: Option<f64>,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    #[serde(default)]
    pub tagger_hits: Vec<TaggerHit>,
}

impl Event {
    /// Sum of all PID cluster energies, which may differ from the matched veto energies
    pub fn pid_energy_sum(&self) -> f64 {
        self.clusters
            .iter()
            .filter(|cl| cl.detector == DetectorType::PID)
            .map(|cl| cl.energy)
            .sum()
    }

    pub fn has_taps_candidate(&self) -> bool {
        self.candidates
            .iter()
            .any(|c| c.detector.contains(DetectorType::TAPS))
    }
}
