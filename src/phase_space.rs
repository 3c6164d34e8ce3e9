//! Cartesian phase-space states.
//!
//! A [`PhaseSpaceState`] is the `(x, y, z, vx, vy, vz)` sextuple of one particle in galactocentric
//! Cartesian coordinates. Batches are plain `Vec<PhaseSpaceState>` / `&[PhaseSpaceState]`; the
//! index of a state is the particle identity through the whole pipeline (grid axes, DF values
//! and histogram binning all rely on it).
use std::fmt;

use nalgebra::{Vector3, Vector6};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseSpaceState {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

impl PhaseSpaceState {
    pub fn new(position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        PhaseSpaceState { position, velocity }
    }

    pub fn from_array(s: [f64; 6]) -> Self {
        PhaseSpaceState {
            position: Vector3::new(s[0], s[1], s[2]),
            velocity: Vector3::new(s[3], s[4], s[5]),
        }
    }

    pub fn to_array(&self) -> [f64; 6] {
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z,
        ]
    }

    pub fn to_vector6(&self) -> Vector6<f64> {
        Vector6::from_row_slice(&self.to_array())
    }

    /// Cylindrical radius `sqrt(x² + y²)`.
    pub fn cylindrical_radius(&self) -> f64 {
        self.position.x.hypot(self.position.y)
    }

    /// Azimuth `atan2(y, x)` in radians.
    pub fn azimuth(&self) -> f64 {
        self.position.y.atan2(self.position.x)
    }

    /// Cylindrical velocities `(vr, vphi)`, with the same sign convention as the
    /// initial-condition grid (`vr > 0` outward, `vphi = r·dphi/dt`).
    pub fn cylindrical_velocity(&self) -> (f64, f64) {
        let (sin_phi, cos_phi) = self.azimuth().sin_cos();
        let vr = self.velocity.x * cos_phi + self.velocity.y * sin_phi;
        let vphi = -self.velocity.x * sin_phi + self.velocity.y * cos_phi;
        (vr, vphi)
    }

    /// z-component of the specific angular momentum, `x·vy − y·vx`.
    pub fn angular_momentum_z(&self) -> f64 {
        self.position.x * self.velocity.y - self.position.y * self.velocity.x
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().chain(self.velocity.iter()).all(|v| v.is_finite())
    }
}

impl From<[f64; 6]> for PhaseSpaceState {
    fn from(s: [f64; 6]) -> Self {
        PhaseSpaceState::from_array(s)
    }
}

impl fmt::Display for PhaseSpaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(x={:.6}, y={:.6}, z={:.6}, vx={:.6}, vy={:.6}, vz={:.6})",
            self.position.x,
            self.position.y,
            self.position.z,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z
        )
    }
}

#[cfg(test)]
mod phase_space_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_array_conversion() {
        let s = PhaseSpaceState::from_array([1., 2., 3., 4., 5., 6.]);
        assert_eq!(s.to_array(), [1., 2., 3., 4., 5., 6.]);
        assert_eq!(s.to_vector6()[4], 5.);
    }

    #[test]
    fn test_cylindrical_velocity() {
        // at phi = 90°, vx = -1 is a positive azimuthal velocity
        let s = PhaseSpaceState::from_array([0., 2., 0., -1., 0.5, 0.]);
        let (vr, vphi) = s.cylindrical_velocity();
        assert_abs_diff_eq!(vr, 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(vphi, 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(s.angular_momentum_z(), 2.0, epsilon = 1e-15);
        assert_abs_diff_eq!(s.cylindrical_radius(), 2.0);
    }
}
