// Nominal masses in MeV
pub const MASS_PROTON: f64 = 938.272;
pub const MASS_PI0: f64 = 134.9766;
pub const MASS_ETA: f64 = 547.862;
pub const MASS_OMEGA: f64 = 782.65;
pub const MASS_ETAPRIME: f64 = 957.78;

// Detector geometry in cm, measured from the target center
pub const CB_RADIUS: f64 = 25.4;
pub const TAPS_DISTANCE: f64 = 145.7;

// Signal branch defaults
pub const SIG_N_PHOTONS: usize = 4;
pub const SIG_MIN_PHOTON_SUM: f64 = 550.0;
pub const SIG_KINFIT_ITERATIONS: usize = 10;
pub const SIG_TREEFIT_ITERATIONS: usize = 15;
pub const SIG_MIN_KINFIT_PROB: f64 = 0.005;
pub const SIG_MAX_ANTI_PROB: f64 = 0.05;
pub const SIG_RANKED_PERMUTATIONS: usize = 4;

// Reference branch defaults
pub const REF_N_PHOTONS: usize = 2;
pub const REF_MIN_PHOTON_SUM: f64 = 600.0;
pub const REF_KINFIT_ITERATIONS: usize = 15;
pub const REF_MIN_KINFIT_PROB: f64 = 0.005;

// Shared filter defaults
pub const MAX_DISCARDED_EK: f64 = 70.0;
pub const MISSING_MASS_WINDOW: f64 = 350.0;
pub const ANTI_PI0_WINDOW: f64 = 80.0;
pub const ANTI_ETA_WINDOW: f64 = 120.0;

// Preselection defaults
pub const MC_MIN_CB_ENERGY_SUM: f64 = 550.0;
pub const MIN_CANDIDATES: usize = 3;

// Vertex fit
pub const Z_VERTEX_SIGMA: f64 = 3.0;
