use serde::{Deserialize, Serialize};

/// A closed interval `[start, stop]` of reals.
///
/// Either bound may be infinite, e.g. `Interval::new(550.0, f64::INFINITY)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub stop: f64,
}

impl Interval {
    pub fn new(start: f64, stop: f64) -> Self {
        Self { start, stop }
    }

    /// Interval of the given total width centered on `center`
    pub fn centered(center: f64, width: f64) -> Self {
        Self {
            start: center - width / 2.0,
            stop: center + width / 2.0,
        }
    }

    /// Everything from start upwards
    pub fn above(start: f64) -> Self {
        Self {
            start,
            stop: f64::INFINITY,
        }
    }

    pub fn everything() -> Self {
        Self {
            start: f64::NEG_INFINITY,
            stop: f64::INFINITY,
        }
    }

    /// NaN is never contained
    pub fn contains(&self, value: f64) -> bool {
        value >= self.start && value <= self.stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_bounds() {
        let iv = Interval::centered(938.272, 350.0);
        assert!(iv.contains(763.272));
        assert!(iv.contains(1113.272));
        assert!(!iv.contains(1113.3));
        assert!(!iv.contains(f64::NAN));
        assert!(Interval::above(550.0).contains(1.0e9));
    }
}
