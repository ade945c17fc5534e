use std::collections::VecDeque;
use std::sync::Arc;

use super::engine::FitEngine;
use super::model::{FitModel, MassConstraint};
use super::result::{FailureKind, FitResult};
use super::settings::{FitSettings, ZVertex};
use super::topology::{DecayTree, FlatTree};
use crate::error::{FitterError, TopologyError};
use crate::lorentz::LorentzVec;
use crate::particle::Particle;
use crate::particle_type::ParticleType;
use crate::uncertainty::UncertaintyModel;

/// Unfitted invariant masses of the internal nodes for one photon permutation, in the
/// depth-first order of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMasses {
    entries: Vec<(ParticleType, f64)>,
}

impl NodeMasses {
    /// Masses of all nodes of the given type
    pub fn of(&self, ptype: ParticleType) -> impl Iterator<Item = f64> + '_ {
        self.entries
            .iter()
            .filter(move |(t, _)| *t == ptype)
            .map(|(_, m)| *m)
    }

    /// Mass of the first node of the given type
    pub fn get(&self, ptype: ParticleType) -> Option<f64> {
        self.of(ptype).next()
    }
}

/// Decides which photon permutations are fitted, based on the unfitted node masses.
///
/// Filters only save work; the best result is the same whenever the skipped permutations
/// would have failed or lost anyway.
pub enum IterationFilter {
    /// Fit a permutation only if the predicate holds
    Accept(Box<dyn Fn(&NodeMasses) -> bool + Send>),
    /// Fit only the `max` permutations with the highest score. NaN scores rank last.
    Rank {
        score: Box<dyn Fn(&NodeMasses) -> f64 + Send>,
        max: usize,
    },
}

impl std::fmt::Debug for IterationFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accept(_) => write!(f, "Accept(..)"),
            Self::Rank { max, .. } => write!(f, "Rank {{ max: {max} }}"),
        }
    }
}

/// A resonance of the tree after the fit
#[derive(Debug, Clone, PartialEq)]
pub struct FittedNode {
    pub ptype: ParticleType,
    /// The mass of this node was not constrained
    pub excluded: bool,
    pub parent: Option<usize>,
    pub fitted: LorentzVec,
    pub unfitted: LorentzVec,
}

/// A photon of the tree after the fit
#[derive(Debug, Clone, PartialEq)]
pub struct FittedLeaf {
    /// Index of the parent in [`TreeFitResult::nodes`], `None` for photons at the root level
    pub parent: Option<usize>,
    /// Index of the photon in the list given to the fitter
    pub photon_index: usize,
    pub fitted: LorentzVec,
    pub unfitted: LorentzVec,
}

/// The fit of one photon permutation. Fitted four-momenta are NaN if the fit failed.
#[derive(Debug, Clone)]
pub struct TreeFitResult {
    pub fit: FitResult,
    /// Leaf slot to photon index
    pub permutation: Vec<usize>,
    pub nodes: Vec<FittedNode>,
    pub leaves: Vec<FittedLeaf>,
}

impl TreeFitResult {
    fn failed(kind: FailureKind, flat: &FlatTree, excluded: &[bool]) -> Self {
        let nan = LorentzVec::new(nalgebra::Vector3::repeat(f64::NAN), f64::NAN);
        Self {
            fit: FitResult::failed(kind),
            permutation: Vec::new(),
            nodes: flat
                .nodes
                .iter()
                .zip(excluded)
                .map(|(node, &excluded)| FittedNode {
                    ptype: node.ptype,
                    excluded,
                    parent: node.parent,
                    fitted: nan,
                    unfitted: nan,
                })
                .collect(),
            leaves: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.fit.is_success()
    }

    /// First node of the given type
    pub fn node(&self, ptype: ParticleType) -> Option<&FittedNode> {
        self.nodes.iter().find(|n| n.ptype == ptype)
    }

    fn node_index(&self, ptype: ParticleType) -> Option<usize> {
        self.nodes.iter().position(|n| n.ptype == ptype)
    }

    /// Photons directly attached to the first node of the given type
    pub fn photon_daughters(&self, ptype: ParticleType) -> Vec<&FittedLeaf> {
        let Some(idx) = self.node_index(ptype) else {
            return Vec::new();
        };
        self.leaves
            .iter()
            .filter(|leaf| leaf.parent == Some(idx))
            .collect()
    }
}

#[derive(Debug)]
enum Pending {
    Unprepared,
    Permutations(VecDeque<usize>),
    Done,
}

/// Kinematic fit with additional resonance mass constraints along a decay tree.
///
/// After configuration, [`TreeFitter::next_fit`] yields one result per photon permutation
/// that is distinct under the symmetries of the tree (and passes the iteration filter),
/// until it returns `None`. Any `set_*` call starts the permutations over.
#[derive(Debug)]
pub struct TreeFitter {
    tree: DecayTree,
    flat: FlatTree,
    permutations: Vec<Vec<usize>>,
    excluded: Vec<bool>,
    masses: Vec<MassConstraint>,
    filter: Option<IterationFilter>,
    model: Arc<dyn UncertaintyModel>,
    z_vertex: ZVertex,
    engine: FitEngine,
    beam_energy: Option<f64>,
    proton: Option<Particle>,
    photons: Vec<Particle>,
    pending: Pending,
}

impl TreeFitter {
    pub fn new(
        tree: DecayTree,
        model: Arc<dyn UncertaintyModel>,
        settings: FitSettings,
        z_vertex: ZVertex,
    ) -> Result<Self, FitterError> {
        if settings.max_iterations == 0 {
            return Err(FitterError::InvalidSettings(String::from(
                "max_iterations must be at least 1",
            )));
        }
        let flat = FlatTree::new(&tree);
        let permutations = flat.unique_permutations(&tree);
        let excluded = vec![false; flat.nodes.len()];
        let mut fitter = Self {
            tree,
            flat,
            permutations,
            excluded,
            masses: Vec::new(),
            filter: None,
            model,
            z_vertex,
            engine: FitEngine::new(settings),
            beam_energy: None,
            proton: None,
            photons: Vec::new(),
            pending: Pending::Unprepared,
        };
        fitter.update_masses();
        Ok(fitter)
    }

    /// Drop the mass constraints of all nodes of the given types
    pub fn set_excluded(&mut self, ptypes: &[ParticleType]) -> Result<(), FitterError> {
        let mut excluded = vec![false; self.flat.nodes.len()];
        for ptype in ptypes {
            let mut found = false;
            for (flag, node) in excluded.iter_mut().zip(self.flat.nodes.iter()) {
                if node.ptype == *ptype {
                    *flag = true;
                    found = true;
                }
            }
            if !found {
                return Err(TopologyError::NoSuchNode(*ptype).into());
            }
        }
        self.excluded = excluded;
        self.update_masses();
        self.pending = Pending::Unprepared;
        Ok(())
    }

    pub fn set_iteration_filter(&mut self, filter: Option<IterationFilter>) {
        self.filter = filter;
        self.pending = Pending::Unprepared;
    }

    pub fn set_beam_energy(&mut self, beam_energy: f64) {
        self.beam_energy = Some(beam_energy);
        self.pending = Pending::Unprepared;
    }

    pub fn set_proton(&mut self, proton: &Particle) {
        self.proton = Some(proton.clone());
        self.pending = Pending::Unprepared;
    }

    pub fn set_photons(&mut self, photons: &[Particle]) {
        self.photons = photons.to_vec();
        self.pending = Pending::Unprepared;
    }

    fn update_masses(&mut self) {
        self.masses = self
            .flat
            .nodes
            .iter()
            .zip(self.excluded.iter())
            .filter(|(_, excluded)| !**excluded)
            .map(|(node, _)| MassConstraint {
                photons: node.leaves.clone(),
                mass: node.ptype.mass(),
            })
            .collect();
    }

    fn node_masses(&self, permutation: &[usize]) -> NodeMasses {
        let entries = self
            .flat
            .nodes
            .iter()
            .map(|node| {
                let sum: LorentzVec = node
                    .leaves
                    .iter()
                    .map(|&slot| self.photons[permutation[slot]].lorentz())
                    .sum();
                (node.ptype, sum.m())
            })
            .collect();
        NodeMasses { entries }
    }

    fn prepare(&self) -> VecDeque<usize> {
        match &self.filter {
            None => (0..self.permutations.len()).collect(),
            Some(IterationFilter::Accept(accept)) => (0..self.permutations.len())
                .filter(|&idx| accept(&self.node_masses(&self.permutations[idx])))
                .collect(),
            Some(IterationFilter::Rank { score, max }) => {
                let mut scored: Vec<(usize, f64)> = (0..self.permutations.len())
                    .map(|idx| {
                        let s = score(&self.node_masses(&self.permutations[idx]));
                        (idx, if s.is_nan() { f64::NEG_INFINITY } else { s })
                    })
                    .collect();
                scored.sort_by(|a, b| b.1.total_cmp(&a.1));
                scored.truncate(*max);
                scored.into_iter().map(|(idx, _)| idx).collect()
            }
        }
    }

    /// Fit the next photon permutation
    pub fn next_fit(&mut self) -> Option<TreeFitResult> {
        if let Pending::Unprepared = self.pending {
            if self.beam_energy.is_none() || self.proton.is_none() {
                self.pending = Pending::Done;
                return Some(TreeFitResult::failed(
                    FailureKind::NotConfigured,
                    &self.flat,
                    &self.excluded,
                ));
            }
            if self.photons.len() != self.flat.n_leaves() {
                spdlog::trace!(
                    "Tree {} needs {} photons, got {}",
                    self.tree,
                    self.flat.n_leaves(),
                    self.photons.len()
                );
                self.pending = Pending::Done;
                return Some(TreeFitResult::failed(
                    FailureKind::Multiplicity,
                    &self.flat,
                    &self.excluded,
                ));
            }
            self.pending = Pending::Permutations(self.prepare());
        }

        let idx = match &mut self.pending {
            Pending::Permutations(queue) => queue.pop_front(),
            _ => None,
        };
        match idx {
            Some(idx) => Some(self.fit_permutation(idx)),
            None => {
                self.pending = Pending::Done;
                None
            }
        }
    }

    /// All remaining fits as an iterator
    pub fn fits(&mut self) -> impl Iterator<Item = TreeFitResult> + '_ {
        std::iter::from_fn(move || self.next_fit())
    }

    fn fit_permutation(&mut self, idx: usize) -> TreeFitResult {
        let (Some(beam_energy), Some(proton)) = (self.beam_energy, self.proton.as_ref()) else {
            return TreeFitResult::failed(FailureKind::NotConfigured, &self.flat, &self.excluded);
        };
        let permutation = self.permutations[idx].clone();
        let photons: Vec<Particle> = permutation
            .iter()
            .map(|&i| self.photons[i].clone())
            .collect();

        let model = FitModel::new(
            self.model.as_ref(),
            beam_energy,
            proton,
            &photons,
            self.z_vertex,
        );
        let fit = match self.engine.solve(
            &model.variables,
            FitModel::n_constraints(&self.masses),
            model.constraints(&self.masses),
        ) {
            Ok(solution) => model.result(solution),
            Err(kind) => {
                spdlog::trace!("Tree fit of {} failed: {kind}", self.tree);
                FitResult::failed(kind)
            }
        };

        let unfitted: Vec<LorentzVec> = photons.iter().map(|p| p.lorentz()).collect();
        let nan = LorentzVec::new(nalgebra::Vector3::repeat(f64::NAN), f64::NAN);
        let fitted_photon = |slot: usize| fit.photons.get(slot).copied().unwrap_or(nan);

        let nodes = self
            .flat
            .nodes
            .iter()
            .zip(self.excluded.iter())
            .map(|(node, &excluded)| FittedNode {
                ptype: node.ptype,
                excluded,
                parent: node.parent,
                fitted: node.leaves.iter().map(|&s| fitted_photon(s)).sum(),
                unfitted: node.leaves.iter().map(|&s| unfitted[s]).sum(),
            })
            .collect();
        let leaves = self
            .flat
            .leaf_parents
            .iter()
            .enumerate()
            .map(|(slot, &parent)| FittedLeaf {
                parent,
                photon_index: permutation[slot],
                fitted: fitted_photon(slot),
                unfitted: unfitted[slot],
            })
            .collect();

        TreeFitResult {
            fit,
            permutation,
            nodes,
            leaves,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::topology::Channel;
    use crate::synthetic::two_pi0_event;
    use crate::uncertainty::ParametrizedModel;

    fn configured(channel: Channel) -> TreeFitter {
        let mut event = two_pi0_event();
        let beam = event.tagger_hits[0].photon_energy;
        let proton = Particle::new(ParticleType::Proton, Arc::new(event.candidates.pop().unwrap()));
        let photons: Vec<Particle> = event
            .candidates
            .into_iter()
            .map(|c| Particle::new(ParticleType::Photon, Arc::new(c)))
            .collect();
        let mut fitter = TreeFitter::new(
            channel.tree().unwrap(),
            Arc::new(ParametrizedModel::default()),
            FitSettings::default().with_max_iterations(10),
            ZVertex::default(),
        )
        .unwrap();
        fitter.set_beam_energy(beam);
        fitter.set_proton(&proton);
        fitter.set_photons(&photons);
        fitter
    }

    fn pairs(result: &TreeFitResult) -> Vec<Vec<usize>> {
        let mut pairs: Vec<Vec<usize>> = (0..result.nodes.len())
            .map(|idx| {
                let mut pair: Vec<usize> = result
                    .leaves
                    .iter()
                    .filter(|l| l.parent == Some(idx))
                    .map(|l| l.photon_index)
                    .collect();
                pair.sort();
                pair
            })
            .collect();
        pairs.sort();
        pairs
    }

    #[test]
    fn test_two_pi0_finds_true_pairing() {
        let mut fitter = configured(Channel::TwoPi0_4g);
        let results: Vec<TreeFitResult> = fitter.fits().collect();
        assert_eq!(results.len(), 3);
        let successes: Vec<&TreeFitResult> = results.iter().filter(|r| r.is_success()).collect();
        assert_eq!(successes.len(), 1);

        let best = successes[0];
        assert!(best.fit.probability > 0.01);
        assert_eq!(pairs(best), vec![vec![0, 3], vec![1, 2]]);
        for node in best.nodes.iter() {
            assert!((node.fitted.m() - ParticleType::Pi0.mass()).abs() < 1e-2);
        }
        assert!(fitter.next_fit().is_none());
    }

    #[test]
    fn test_reconfigure_restarts() {
        let mut fitter = configured(Channel::TwoPi0_4g);
        assert!(fitter.next_fit().is_some());
        fitter.set_beam_energy(1200.0);
        assert_eq!(fitter.fits().count(), 3);
    }

    #[test]
    fn test_accept_filter() {
        let mut fitter = configured(Channel::TwoPi0_4g);
        let window = ParticleType::Pi0.window(80.0);
        let accept = move |masses: &NodeMasses| {
            masses.of(ParticleType::Pi0).all(|m| window.contains(m))
        };
        fitter.set_iteration_filter(Some(IterationFilter::Accept(Box::new(accept))));
        let results: Vec<TreeFitResult> = fitter.fits().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_success());
        assert_eq!(pairs(&results[0]), vec![vec![0, 3], vec![1, 2]]);
    }

    #[test]
    fn test_rank_filter() {
        let mut fitter = configured(Channel::TwoPi0_4g);
        fitter.set_iteration_filter(Some(IterationFilter::Rank {
            score: Box::new(|masses: &NodeMasses| {
                -masses
                    .of(ParticleType::Pi0)
                    .map(|m| (m - ParticleType::Pi0.mass()).abs())
                    .sum::<f64>()
            }),
            max: 2,
        }));
        let results: Vec<TreeFitResult> = fitter.fits().collect();
        assert_eq!(results.len(), 2);
        // best ranked comes first
        assert_eq!(pairs(&results[0]), vec![vec![0, 3], vec![1, 2]]);
    }

    #[test]
    fn test_excluded_nodes() {
        let mut fitter = configured(Channel::TwoPi0_4g);
        assert_eq!(
            fitter.set_excluded(&[ParticleType::Eta]).unwrap_err(),
            FitterError::Topology(TopologyError::NoSuchNode(ParticleType::Eta))
        );
        fitter.set_excluded(&[ParticleType::Pi0]).unwrap();
        // without mass constraints every pairing is the plain kinematic fit
        let results: Vec<TreeFitResult> = fitter.fits().collect();
        assert_eq!(results.len(), 3);
        for result in results.iter() {
            assert!(result.is_success());
            assert_eq!(result.fit.ndf, 3);
            assert!(result.nodes.iter().all(|n| n.excluded));
        }
    }

    #[test]
    fn test_multiplicity_mismatch() {
        let mut fitter = configured(Channel::ThreePi0_6g);
        let result = fitter.next_fit().unwrap();
        assert_eq!(result.fit.failure(), Some(FailureKind::Multiplicity));
        assert_eq!(result.nodes.len(), 3);
        assert!(result.nodes[0].fitted.e.is_nan());
        assert!(fitter.next_fit().is_none());
    }

    #[test]
    fn test_unconfigured() {
        let mut fitter = TreeFitter::new(
            Channel::Pi0_2g.tree().unwrap(),
            Arc::new(ParametrizedModel::default()),
            FitSettings::default(),
            ZVertex::Fixed,
        )
        .unwrap();
        let result = fitter.next_fit().unwrap();
        assert_eq!(result.fit.failure(), Some(FailureKind::NotConfigured));
        assert!(fitter.next_fit().is_none());

        assert!(TreeFitter::new(
            Channel::Pi0_2g.tree().unwrap(),
            Arc::new(ParametrizedModel::default()),
            FitSettings::default().with_max_iterations(0),
            ZVertex::Fixed,
        )
        .is_err());
    }
}
