//! Basic numerical concepts used throughout the program

#![allow(missing_docs)]

// Floating-point precision is configured here
#[cfg(feature = "f32")]
pub type Float = f32;
#[cfg(feature = "f32")]
pub use std::f32 as floats;
#[cfg(not(feature = "f32"))]
pub type Float = f64;
#[cfg(not(feature = "f32"))]
pub use std::f64 as floats;

/// Mathematical functions
pub mod functions {
    use super::{floats::consts::PI, Float};

    /// Absolute azimuthal separation between two angles, in [0, π]
    ///
    /// The difference is brought back into (-π, π] by whole turns before its
    /// magnitude is taken. Non-finite angles give NaN.
    ///
    pub fn delta_phi(phi1: Float, phi2: Float) -> Float {
        // Reduce to [0, 2π] in one step, however many turns apart the angles are
        let mut dphi = (phi1 - phi2).rem_euclid(2. * PI);
        if dphi > PI {
            dphi -= 2. * PI;
        }
        dphi.abs()
    }
}
