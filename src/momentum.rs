//! This module implements some domain-specific 4-momentum handling logic.

use crate::numeric::{functions::delta_phi, Float};
use nalgebra::SVector;
use prefix_num_ops::real::*;
use std::ops::Add;

/// 4-momentum dimension
pub const MOMENTUM_DIM: usize = 4;

/// Storage of a relativistic 4-momentum
pub type Momentum = SVector<Float, MOMENTUM_DIM>;

/// Convenience const for accessing the X coordinate of a 4-vector
pub const X: usize = 0;

/// Convenience const for accessing the Y coordinate of a 4-vector
pub const Y: usize = 1;

/// Convenience const for accessing the Z coordinate of a 4-vector
pub const Z: usize = 2;

/// Convenience const for accessing the E coordinate of a 4-vector
pub const E: usize = 3;

/// Pseudorapidity reported for momenta which are parallel to the beam
const BEAM_AXIS_ETA: Float = 1e10;

/// Lorentz 4-momentum, stored in cartesian (px, py, pz, E) form
///
/// Collider-style constructors and accessors are provided on top, following
/// the usual conventions for degenerate momenta: a vanishing transverse
/// momentum has an azimuth of zero, and a pseudorapidity of zero too unless
/// the momentum points along the beam.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FourMomentum(Momentum);
//
impl FourMomentum {
    /// Build a 4-momentum from its transverse momentum, pseudorapidity,
    /// azimuth and rest mass
    pub fn from_pt_eta_phi_m(pt: Float, eta: Float, phi: Float, mass: Float) -> Self {
        let pt = abs(pt);
        let px = pt * cos(phi);
        let py = pt * sin(phi);
        let pz = pt * eta.sinh();
        let e = sqrt(px.powi(2) + py.powi(2) + pz.powi(2) + mass.powi(2));
        Self(Momentum::new(px, py, pz, e))
    }

    /// Transverse momentum
    pub fn pt(&self) -> Float {
        sqrt(self.0[X].powi(2) + self.0[Y].powi(2))
    }

    /// Azimuthal angle, in [-π, π]
    pub fn phi(&self) -> Float {
        if self.0[X] == 0. && self.0[Y] == 0. {
            0.
        } else {
            self.0[Y].atan2(self.0[X])
        }
    }

    /// Pseudorapidity
    pub fn eta(&self) -> Float {
        let pt = self.pt();
        if pt > 0. {
            (self.0[Z] / pt).asinh()
        } else if self.0[Z] == 0. {
            0.
        } else {
            BEAM_AXIS_ETA.copysign(self.0[Z])
        }
    }

    /// Invariant mass
    ///
    /// Space-like momenta, which can appear through rounding errors, get a
    /// negative mass whose magnitude is that of the Minkowski norm.
    ///
    pub fn mass(&self) -> Float {
        let m2 = self.0[E].powi(2) - self.0.xyz().norm_squared();
        if m2 < 0. {
            -sqrt(-m2)
        } else {
            sqrt(m2)
        }
    }

    /// Angular separation ΔR = √(Δη² + Δφ²) from another 4-momentum
    pub fn delta_r(&self, other: &Self) -> Float {
        let deta = self.eta() - other.eta();
        let dphi = delta_phi(self.phi(), other.phi());
        sqrt(deta.powi(2) + dphi.powi(2))
    }
}

impl Add for FourMomentum {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}
