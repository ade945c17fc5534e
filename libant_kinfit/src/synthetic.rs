//! Events generated from exact two-body kinematics.
//!
//! Used by the tests and by the `demo` command of the CLI. All decays happen at the target
//! center, so the reconstructed quantities are the true ones.
use std::f64::consts::PI;

use crate::candidate::{Candidate, DetectorType};
use crate::constants::*;
use crate::event::{Event, TaggerHit, Trigger};
use crate::lorentz::{unit_vector, LorentzVec};

/// Smallest polar angle covered by the Crystal Ball, in degrees. Below it is TAPS.
const CB_MIN_THETA: f64 = 20.0;

/// Decay of `parent` into two daughters of masses `m1` and `m2`. The first daughter is
/// emitted along (theta, phi) in the rest frame of the parent, the second back to back.
pub fn two_body(
    parent: &LorentzVec,
    m1: f64,
    m2: f64,
    theta: f64,
    phi: f64,
) -> (LorentzVec, LorentzVec) {
    let mass = parent.m();
    let p = ((mass * mass - (m1 + m2).powi(2)) * (mass * mass - (m1 - m2).powi(2)))
        .max(0.0)
        .sqrt()
        / (2.0 * mass);
    let first = LorentzVec::from_direction(p, &unit_vector(theta, phi), m1);
    let second = LorentzVec::from_direction(p, &unit_vector(PI - theta, phi + PI), m2);
    let beta = parent.boost_vector();
    (first.boost(&beta), second.boost(&beta))
}

/// The candidate a particle of the given mass would leave in the calorimeters
pub fn candidate_from(particle: &LorentzVec, mass: f64) -> Candidate {
    let theta = particle.theta();
    let detector = if theta < CB_MIN_THETA.to_radians() {
        DetectorType::TAPS
    } else {
        DetectorType::CB
    };
    Candidate::new(particle.e - mass, theta, particle.phi(), detector)
}

/// Event with one prompt tagger hit and the candidates sorted by descending energy
pub fn event_from(beam_energy: f64, proton: Candidate, photons: Vec<Candidate>) -> Event {
    let mut candidates = photons;
    candidates.push(proton);
    candidates.sort_by(|a, b| b.calo_energy.total_cmp(&a.calo_energy));
    let cb_energy_sum = candidates
        .iter()
        .filter(|c| c.detector.contains(DetectorType::CB))
        .map(|c| c.calo_energy)
        .sum();
    Event {
        id: 0,
        is_mc: false,
        true_z_vertex: None,
        trigger: Trigger {
            cb_energy_sum,
            cb_avg_time: 0.0,
        },
        candidates,
        clusters: Vec::new(),
        tagger_hits: vec![TaggerHit::new(0, beam_energy, 0.0)],
    }
}

fn deg(angle: f64) -> f64 {
    angle.to_radians()
}

fn initial_state(beam_energy: f64) -> LorentzVec {
    LorentzVec::new(
        nalgebra::Vector3::new(0.0, 0.0, beam_energy),
        beam_energy + MASS_PROTON,
    )
}

/// `gamma p -> X p, X -> pi0 pi0 -> 4g` at 1200 MeV, with a 580 MeV heavy state X.
///
/// The proton only deposits 25 MeV, as protons stopping in the calorimeter do. All
/// candidates are in the Crystal Ball.
pub fn two_pi0_event() -> Event {
    let beam_energy = 1200.0;
    let (x, proton) = two_body(
        &initial_state(beam_energy),
        580.0,
        MASS_PROTON,
        deg(100.0),
        deg(30.0),
    );
    let (pi0_1, pi0_2) = two_body(&x, MASS_PI0, MASS_PI0, deg(60.0), deg(120.0));
    let (g1, g2) = two_body(&pi0_1, 0.0, 0.0, deg(40.0), deg(10.0));
    let (g3, g4) = two_body(&pi0_2, 0.0, 0.0, deg(120.0), deg(250.0));

    let mut proton = candidate_from(&proton, MASS_PROTON);
    proton.calo_energy = 25.0;
    let photons = [g1, g2, g3, g4]
        .iter()
        .map(|g| candidate_from(g, 0.0))
        .collect();
    event_from(beam_energy, proton, photons)
}

/// The same `X -> pi0 pi0 -> 4g` decays at 1200 MeV, but with the proton going forward
/// into TAPS with its full kinetic energy, so the event passes the preselection.
pub fn two_pi0_taps_event() -> Event {
    let beam_energy = 1200.0;
    let (x, proton) = two_body(
        &initial_state(beam_energy),
        580.0,
        MASS_PROTON,
        deg(175.0),
        deg(30.0),
    );
    let (pi0_1, pi0_2) = two_body(&x, MASS_PI0, MASS_PI0, deg(60.0), deg(120.0));
    let (g1, g2) = two_body(&pi0_1, 0.0, 0.0, deg(40.0), deg(10.0));
    let (g3, g4) = two_body(&pi0_2, 0.0, 0.0, deg(120.0), deg(250.0));

    let photons = [g1, g2, g3, g4]
        .iter()
        .map(|g| candidate_from(g, 0.0))
        .collect();
    event_from(beam_energy, candidate_from(&proton, MASS_PROTON), photons)
}

/// `gamma p -> eta' p, eta' -> g omega, omega -> g pi0, pi0 -> g g` at 1550 MeV.
///
/// The proton goes into TAPS.
pub fn etap_omega_event() -> Event {
    let beam_energy = 1550.0;
    let (etap, proton) = two_body(
        &initial_state(beam_energy),
        MASS_ETAPRIME,
        MASS_PROTON,
        deg(70.0),
        deg(200.0),
    );
    let (g_etap, omega) = two_body(&etap, 0.0, MASS_OMEGA, deg(90.0), deg(80.0));
    let (g_omega, pi0) = two_body(&omega, 0.0, MASS_PI0, deg(150.0), deg(300.0));
    let (g1, g2) = two_body(&pi0, 0.0, 0.0, deg(60.0), deg(15.0));

    let photons = [g_etap, g_omega, g1, g2]
        .iter()
        .map(|g| candidate_from(g, 0.0))
        .collect();
    event_from(beam_energy, candidate_from(&proton, MASS_PROTON), photons)
}

/// `gamma p -> eta' p, eta' -> g g` at 1550 MeV
pub fn etap_2g_event() -> Event {
    let beam_energy = 1550.0;
    let (etap, proton) = two_body(
        &initial_state(beam_energy),
        MASS_ETAPRIME,
        MASS_PROTON,
        deg(70.0),
        deg(200.0),
    );
    let (g1, g2) = two_body(&etap, 0.0, 0.0, deg(80.0), deg(30.0));
    let photons = vec![candidate_from(&g1, 0.0), candidate_from(&g2, 0.0)];
    event_from(beam_energy, candidate_from(&proton, MASS_PROTON), photons)
}
