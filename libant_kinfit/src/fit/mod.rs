//! Constrained kinematic fits of proton + photon final states.
//!
//! [`kinfit::KinFitter`] enforces four-momentum conservation, [`treefit::TreeFitter`]
//! additionally constrains the resonance masses of a [`topology::DecayTree`] and iterates
//! over the photon permutations. Both share the solver in [`engine`].
pub mod engine;
pub mod kinfit;
pub(crate) mod model;
pub mod result;
pub mod select;
pub mod settings;
pub mod topology;
pub mod treefit;

pub use model::{chi2_probability, vertex_direction};
