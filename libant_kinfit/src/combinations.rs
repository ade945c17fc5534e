use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::candidate::Candidate;
use super::constants::MASS_PROTON;
use super::cut_counter::CutCounter;
use super::error::SmearError;
use super::interval::Interval;
use super::lorentz::LorentzVec;
use super::particle::Particle;
use super::particle_type::ParticleType;
use super::smear::MCSmear;

/// One proton/photon assignment of the candidates of an event.
///
/// The filter bookkeeping (`photon_sum`, `discarded_ek`, `missing_mass`) is only meaningful
/// for combinations returned by [`ProtonPhotonCombs::filter`].
#[derive(Debug, Clone)]
pub struct ProtonPhotonComb {
    pub proton: Particle,
    pub photons: Vec<Particle>,
    pub photon_sum: LorentzVec,
    pub discarded_ek: f64,
    pub missing_mass: f64,
}

impl ProtonPhotonComb {
    fn new(proton: Particle, photons: Vec<Particle>) -> Self {
        Self {
            proton,
            photons,
            photon_sum: LorentzVec::default(),
            discarded_ek: 0.0,
            missing_mass: f64::NAN,
        }
    }
}

/// Cut values of the combination filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    pub n_photons: usize,
    pub max_discarded_ek: f64,
    pub missing_mass: Interval,
    pub photon_sum_mass: Interval,
}

/// All proton/photon combinations of one event, one per candidate taken as the proton.
///
/// Photons keep the order of the candidates, which the analysis sorts by descending
/// calorimeter energy.
#[derive(Debug, Clone, Default)]
pub struct ProtonPhotonCombs {
    combs: Vec<ProtonPhotonComb>,
}

impl ProtonPhotonCombs {
    pub fn new(candidates: &[Arc<Candidate>]) -> Self {
        let protons = make_particles(candidates, ParticleType::Proton);
        let photons = make_particles(candidates, ParticleType::Photon);
        Self::assign(protons, photons)
    }

    /// Like [`ProtonPhotonCombs::new`], but every hypothesized particle is smeared first
    pub fn new_smeared(
        candidates: &[Arc<Candidate>],
        smear: &mut MCSmear,
    ) -> Result<Self, SmearError> {
        let protons = make_particles(candidates, ParticleType::Proton)
            .iter()
            .map(|p| smear.smear(p))
            .collect::<Result<Vec<_>, _>>()?;
        let photons = make_particles(candidates, ParticleType::Photon)
            .iter()
            .map(|p| smear.smear(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::assign(protons, photons))
    }

    fn assign(protons: Vec<Particle>, photons: Vec<Particle>) -> Self {
        let combs = protons
            .into_iter()
            .map(|proton| {
                let others = photons
                    .iter()
                    .filter(|photon| !photon.same_candidate(&proton))
                    .cloned()
                    .collect();
                ProtonPhotonComb::new(proton, others)
            })
            .collect();
        Self { combs }
    }

    pub fn len(&self) -> usize {
        self.combs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProtonPhotonComb> {
        self.combs.iter()
    }

    /// Select the combinations compatible with `n` photons recoiling against a proton.
    ///
    /// The leading `n` photons are summed. Photons beyond that count as discarded energy.
    /// Surviving combinations carry exactly `n` photons. An empty result means the
    /// hypothesis set of this event is empty.
    pub fn filter(
        &self,
        params: &FilterParams,
        beam_target: &LorentzVec,
        counter: &mut CutCounter,
    ) -> Vec<ProtonPhotonComb> {
        counter.fill("Seen");
        let n = params.n_photons;
        let mut survivors = Vec::new();

        for comb in self.combs.iter() {
            if comb.photons.len() < n {
                continue;
            }
            counter.fill("Seen protons");

            let photon_sum: LorentzVec = comb.photons.iter().take(n).map(|p| p.lorentz()).sum();
            let discarded_ek: f64 = comb.photons.iter().skip(n).map(|p| p.ek).sum();
            if discarded_ek > params.max_discarded_ek {
                continue;
            }
            counter.fill("DiscEk ok");

            let missing_mass = (*beam_target - photon_sum).m();
            if !params.missing_mass.contains(missing_mass) {
                continue;
            }
            counter.fill("MM ok");

            if !params.photon_sum_mass.contains(photon_sum.m()) {
                continue;
            }
            counter.fill("IM ok");

            survivors.push(ProtonPhotonComb {
                proton: comb.proton.clone(),
                photons: comb.photons[..n].to_vec(),
                photon_sum,
                discarded_ek,
                missing_mass,
            });
        }
        survivors
    }
}

fn make_particles(candidates: &[Arc<Candidate>], ptype: ParticleType) -> Vec<Particle> {
    candidates
        .iter()
        .map(|cand| Particle::new(ptype, cand.clone()))
        .collect()
}

/// Beam photon plus proton target at rest
pub fn beam_target(beam: &LorentzVec) -> LorentzVec {
    *beam + LorentzVec::at_rest(MASS_PROTON)
}
