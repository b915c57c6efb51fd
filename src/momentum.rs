//! This module implements some domain-specific 4-momentum handling logic.

use crate::numeric::{floats::consts::PI, Float};
use nalgebra::SVector;
use prefix_num_ops::real::*;

/// 4-momentum dimension
pub const MOMENTUM_DIM: usize = 4;

/// Relativistic 4-momentum
pub type Momentum = SVector<Float, MOMENTUM_DIM>;

/// Convenience const for accessing the X coordinate of a 4-vector
pub const X: usize = 0;

/// Convenience const for accessing the Y coordinate of a 4-vector
pub const Y: usize = 1;

/// Convenience const for accessing the Z coordinate of a 4-vector
pub const Z: usize = 2;

/// Convenience const for accessing the E coordinate of a 4-vector
pub const E: usize = 3;

/// Build a 4-momentum from collider coordinates (pt, eta, phi, mass)
pub fn from_pt_eta_phi_m(pt: Float, eta: Float, phi: Float, mass: Float) -> Momentum {
    let p = pt * eta.cosh();
    Momentum::new(
        pt * cos(phi),
        pt * sin(phi),
        pt * eta.sinh(),
        sqrt(p * p + mass * mass),
    )
}

/// Azimuthal separation, wrapped into [-π, π)
pub fn delta_phi(phi1: Float, phi2: Float) -> Float {
    (phi1 - phi2 + PI).rem_euclid(2. * PI) - PI
}

/// Anything which has a direction and a mass in the detector frame
///
/// Physics objects store (pt, eta, phi, mass) directly, composite objects
/// store a cartesian 4-momentum, and this trait lets both be combined.
///
pub trait Kinematics {
    /// Transverse momentum
    fn pt(&self) -> Float;

    /// Pseudorapidity
    fn eta(&self) -> Float;

    /// Azimuth
    fn phi(&self) -> Float;

    /// Invariant mass
    fn mass(&self) -> Float;

    /// Cartesian 4-momentum
    fn p4(&self) -> Momentum {
        from_pt_eta_phi_m(self.pt(), self.eta(), self.phi(), self.mass())
    }

    /// Signed azimuthal separation from another object
    fn delta_phi(&self, other: &impl Kinematics) -> Float {
        delta_phi(self.phi(), other.phi())
    }

    /// Angular separation ΔR = sqrt(Δη² + Δφ²) from another object
    fn delta_r(&self, other: &impl Kinematics) -> Float {
        let d_eta = self.eta() - other.eta();
        let d_phi = self.delta_phi(other);
        sqrt(d_eta * d_eta + d_phi * d_phi)
    }
}

impl Kinematics for Momentum {
    fn pt(&self) -> Float {
        self[X].hypot(self[Y])
    }

    fn eta(&self) -> Float {
        let pt = self.pt();
        if pt == 0. {
            // Purely longitudinal (or null) momentum
            if self[Z] == 0. {
                0.
            } else {
                Float::INFINITY.copysign(self[Z])
            }
        } else {
            (self[Z] / pt).asinh()
        }
    }

    fn phi(&self) -> Float {
        self[Y].atan2(self[X])
    }

    fn mass(&self) -> Float {
        // Space-like vectors get a negative mass, as in ROOT's TLorentzVector
        let m2 = self[E] * self[E] - self.fixed_rows::<3>(X).norm_squared();
        if m2 < 0. {
            -sqrt(-m2)
        } else {
            sqrt(m2)
        }
    }

    fn p4(&self) -> Momentum {
        *self
    }
}

/// Transverse mass of a visible object and missing transverse momentum
pub fn transverse_mass(visible: &impl Kinematics, missing: &impl Kinematics) -> Float {
    sqrt(2. * visible.pt() * missing.pt() * (1. - cos(visible.delta_phi(missing))))
}
