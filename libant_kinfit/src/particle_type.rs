use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use super::constants::*;
use super::error::TopologyError;
use super::interval::Interval;

/// The particle species known to the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParticleType {
    Photon,
    Proton,
    Pi0,
    Eta,
    Omega,
    EtaPrime,
}

impl ParticleType {
    pub fn mass(&self) -> f64 {
        match self {
            Self::Photon => 0.0,
            Self::Proton => MASS_PROTON,
            Self::Pi0 => MASS_PI0,
            Self::Eta => MASS_ETA,
            Self::Omega => MASS_OMEGA,
            Self::EtaPrime => MASS_ETAPRIME,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Photon => "g",
            Self::Proton => "p",
            Self::Pi0 => "Pi0",
            Self::Eta => "Eta",
            Self::Omega => "Omega",
            Self::EtaPrime => "EtaPrime",
        }
    }

    /// Mass window of the given total width around the nominal mass
    pub fn window(&self, width: f64) -> Interval {
        Interval::centered(self.mass(), width)
    }

    /// Can appear as an internal node of a decay tree
    pub fn is_resonance(&self) -> bool {
        !matches!(self, Self::Photon | Self::Proton)
    }
}

impl Display for ParticleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ParticleType {
    type Err = TopologyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "g" | "Photon" => Ok(Self::Photon),
            "p" | "Proton" => Ok(Self::Proton),
            "Pi0" => Ok(Self::Pi0),
            "Eta" => Ok(Self::Eta),
            "Omega" => Ok(Self::Omega),
            "EtaPrime" => Ok(Self::EtaPrime),
            _ => Err(TopologyError::UnknownParticle(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for t in [
            ParticleType::Photon,
            ParticleType::Proton,
            ParticleType::Pi0,
            ParticleType::Eta,
            ParticleType::Omega,
            ParticleType::EtaPrime,
        ] {
            assert_eq!(ParticleType::from_str(t.name()).unwrap(), t);
        }
        assert!(ParticleType::from_str("Rho").is_err());
    }

    #[test]
    fn test_window() {
        let w = ParticleType::Proton.window(350.0);
        assert!(w.contains(938.272));
        assert!(w.contains(763.3));
        assert!(!w.contains(763.2));
    }
}
