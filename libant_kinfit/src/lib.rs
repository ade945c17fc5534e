//! # ant_kinfit
//!
//! ant_kinfit is a kinematic-fit driven hypothesis selection engine for photoproduction
//! experiments with the Crystal Ball and TAPS calorimeters, written in Rust. It takes the
//! reconstructed candidates and tagger hits of each event, builds every proton/photon
//! assignment, fits them with energy-momentum and resonance mass constraints, and keeps the
//! best hypothesis per tagger hit, weighted for prompt-random background subtraction.
//!
//! The bundled analysis selects `gamma p -> eta' p` with `eta' -> omega g -> pi0 g g` as signal
//! and `eta' -> g g` as reference channel.
//!
//! ## Installation
//!
//! The only method of install is from source. If you have not used Rust before, see the
//! [Rust docs](https://www.rust-lang.org/tools/install) for installation instructions of the
//! tool chain.
//!
//! To build and install the CLI use `cargo install --path ./ant_kinfit_cli` from the top level
//! repository. The binary is installed to your cargo install location (typically
//! `~/.cargo/bin/`).
//!
//! ## Documentation
//!
//! Documentation is provided for the `libant_kinfit` library; the source code of
//! `ant_kinfit_cli` should be examined for an example of using the library.
//!
//! The main building blocks are
//!
//! - [`combinations::ProtonPhotonCombs`]: all proton/photon assignments of an event, and the
//! filter which reduces them with discarded energy, missing mass and invariant mass cuts
//! - [`prompt_random::PromptRandomWindow`]: classification of tagger times and the background
//! subtraction weight
//! - [`fit::kinfit::KinFitter`]: constrained fit of energy and momentum conservation
//! - [`fit::treefit::TreeFitter`]: the same fit with additional mass constraints taken from a
//! decay tree, run over every distinct assignment of the photons to the tree
//! - [`fit::select`]: selection of the best fit by probability
//! - [`analysis::EtapOmegaG`]: the full analysis
//!
//! ## Configuration
//!
//! The CLI is driven by a YAML configuration. A template with the standard analysis settings is
//! written by `ant_kinfit_cli new -p config.yml`. The top level fields are
//!
//! ```yml
//! input_path: /path/to/events
//! output_path: /path/to/output
//! first_run_number: 0
//! last_run_number: 0
//! prompt_random: ...
//! fit: ...
//! preselection: ...
//! signal: ...
//! reference: ...
//! uncertainty_model: ...
//! mc_smear: null
//! ```
//!
//! All analysis sections are optional and default to the standard settings.
//!
//! ## Input
//!
//! The input directory contains one subdirectory per run in the `run_0001` format. Every
//! `.yml`/`.yaml` file in a run directory is a stream of YAML documents with one event each;
//! the files are read in sorted order.
//!
//! ## Output
//!
//! For every run three files are written to the output directory
//!
//! ```text
//! run_0001_sig.yml - signal records, one document per accepted tagger hit
//! run_0001_ref.yml - reference records, one document per accepted tagger hit
//! run_0001_summary.yml - the cut counters and totals of the run
//! ```
pub mod analysis;
pub mod candidate;
pub mod combinations;
pub mod config;
pub mod constants;
pub mod cut_counter;
pub mod error;
pub mod event;
pub mod event_file;
pub mod event_stack;
pub mod fit;
pub mod interval;
pub mod lorentz;
pub mod particle;
pub mod particle_type;
pub mod process;
pub mod prompt_random;
pub mod record_writer;
pub mod smear;
pub mod synthetic;
pub mod uncertainty;
pub mod worker_status;
