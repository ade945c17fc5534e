use nalgebra::Vector3;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

/// A four-momentum (px, py, pz, E) in MeV.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LorentzVec {
    pub p: Vector3<f64>,
    pub e: f64,
}

impl LorentzVec {
    pub fn new(p: Vector3<f64>, e: f64) -> Self {
        Self { p, e }
    }

    /// A particle at rest
    pub fn at_rest(mass: f64) -> Self {
        Self {
            p: Vector3::zeros(),
            e: mass,
        }
    }

    /// Build from momentum magnitude along the unit vector `dir`
    pub fn from_direction(p_mag: f64, dir: &Vector3<f64>, mass: f64) -> Self {
        Self {
            p: dir * p_mag,
            e: (p_mag * p_mag + mass * mass).sqrt(),
        }
    }

    /// Build from kinetic energy and the unit direction `dir`
    pub fn from_ek(ek: f64, dir: &Vector3<f64>, mass: f64) -> Self {
        let p_mag = (ek * ek + 2.0 * ek * mass).max(0.0).sqrt();
        Self {
            p: dir * p_mag,
            e: ek + mass,
        }
    }

    /// Build from kinetic energy and spherical angles
    pub fn from_ek_theta_phi(ek: f64, theta: f64, phi: f64, mass: f64) -> Self {
        Self::from_ek(ek, &unit_vector(theta, phi), mass)
    }

    /// Invariant mass squared
    pub fn m2(&self) -> f64 {
        self.e * self.e - self.p.norm_squared()
    }

    /// Invariant mass; spacelike vectors give 0
    pub fn m(&self) -> f64 {
        self.m2().max(0.0).sqrt()
    }

    pub fn p_mag(&self) -> f64 {
        self.p.norm()
    }

    pub fn theta(&self) -> f64 {
        self.p.x.hypot(self.p.y).atan2(self.p.z)
    }

    pub fn phi(&self) -> f64 {
        self.p.y.atan2(self.p.x)
    }

    /// Kinetic energy with respect to the invariant mass
    pub fn ek(&self) -> f64 {
        self.e - self.m()
    }

    pub fn boost_vector(&self) -> Vector3<f64> {
        self.p / self.e
    }

    /// Lorentz boost by velocity `beta`
    pub fn boost(&self, beta: &Vector3<f64>) -> Self {
        let b2 = beta.norm_squared();
        if b2 <= 0.0 {
            return *self;
        }
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let bp = beta.dot(&self.p);
        let gamma2 = (gamma - 1.0) / b2;
        Self {
            p: self.p + beta * (gamma2 * bp + gamma * self.e),
            e: gamma * (self.e + bp),
        }
    }

    /// Opening angle to another vector in rad
    pub fn angle(&self, other: &Vector3<f64>) -> f64 {
        self.p.angle(other)
    }
}

/// Unit vector from spherical angles
pub fn unit_vector(theta: f64, phi: f64) -> Vector3<f64> {
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    Vector3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta)
}

/// Map an angle to [-pi, pi)
pub fn phi_mpi_pi(phi: f64) -> f64 {
    use std::f64::consts::PI;
    (phi + PI).rem_euclid(2.0 * PI) - PI
}

impl Add for LorentzVec {
    type Output = LorentzVec;
    fn add(self, rhs: LorentzVec) -> LorentzVec {
        LorentzVec {
            p: self.p + rhs.p,
            e: self.e + rhs.e,
        }
    }
}

impl Sub for LorentzVec {
    type Output = LorentzVec;
    fn sub(self, rhs: LorentzVec) -> LorentzVec {
        LorentzVec {
            p: self.p - rhs.p,
            e: self.e - rhs.e,
        }
    }
}

impl Neg for LorentzVec {
    type Output = LorentzVec;
    fn neg(self) -> LorentzVec {
        LorentzVec {
            p: -self.p,
            e: -self.e,
        }
    }
}

impl AddAssign for LorentzVec {
    fn add_assign(&mut self, rhs: LorentzVec) {
        self.p += rhs.p;
        self.e += rhs.e;
    }
}

impl Sum for LorentzVec {
    fn sum<I: Iterator<Item = LorentzVec>>(iter: I) -> Self {
        iter.fold(LorentzVec::default(), |acc, v| acc + v)
    }
}

impl<'a> Sum<&'a LorentzVec> for LorentzVec {
    fn sum<I: Iterator<Item = &'a LorentzVec>>(iter: I) -> Self {
        iter.fold(LorentzVec::default(), |acc, v| acc + *v)
    }
}
