//! Actions in the epicyclic approximation.
//!
//! For a star of angular momentum `Lz` the guiding radius `Rc` solves `Rc · vc(Rc) = |Lz|`.
//! Around it the radial and vertical motions are harmonic with frequencies
//!
//! ```text
//! κ² = ∂²Φ/∂R² + (3/R) ∂Φ/∂R      ν² = ∂²Φ/∂z²      (at R = Rc, z = 0)
//! ```
//!
//! and the actions are the oscillation energies divided by the frequencies:
//!
//! ```text
//! Jr = (vR² + κ² (R − Rc)²) / (2κ)      Jz = (vz² + ν² z²) / (2ν)
//! ```
//!
//! Derivatives are taken numerically from the potential's acceleration, so any axisymmetric
//! [`Potential`] works.
use std::sync::Arc;

use nalgebra::Vector3;

use crate::{
    bibimb_errors::BibimbError, constants::Time, phase_space::PhaseSpaceState,
    potential::Potential,
};

use super::{ActionFinder, Actions};

/// Guiding radii below this value are clamped.
const MIN_GUIDING_RADIUS: f64 = 1e-3;
const MAX_BISECTIONS: usize = 200;

/// Epicyclic quantities at a guiding radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpicycleFrequencies {
    pub guiding_radius: f64,
    /// Circular angular frequency `Ω = vc / Rc`.
    pub omega: f64,
    pub kappa: f64,
    pub nu: f64,
}

impl EpicycleFrequencies {
    /// Frequencies at the guiding radius of angular momentum `lz`.
    pub fn from_angular_momentum(
        potential: &dyn Potential,
        lz: f64,
        t: Time,
    ) -> Result<Self, BibimbError> {
        let rc = guiding_radius(potential, lz.abs(), t)?;
        Ok(Self::at_radius(potential, rc, t))
    }

    /// Frequencies on the circular orbit of radius `rc`.
    pub fn at_radius(potential: &dyn Potential, rc: f64, t: Time) -> Self {
        let h = 1e-4 * rc;
        let radial = |r: f64| -potential.acceleration(&Vector3::new(r, 0.0, 0.0), t).x;
        let vertical = |z: f64| -potential.acceleration(&Vector3::new(rc, 0.0, z), t).z;

        let dphi_dr = radial(rc);
        let d2phi_dr2 = (radial(rc + h) - radial(rc - h)) / (2.0 * h);
        let d2phi_dz2 = (vertical(h) - vertical(-h)) / (2.0 * h);

        EpicycleFrequencies {
            guiding_radius: rc,
            omega: (dphi_dr / rc).max(0.0).sqrt(),
            kappa: (d2phi_dr2 + 3.0 * dphi_dr / rc).max(0.0).sqrt(),
            nu: d2phi_dz2.max(0.0).sqrt(),
        }
    }
}

/// Radius where `R · vc(R) = lz_abs`, by bisection.
fn guiding_radius(potential: &dyn Potential, lz_abs: f64, t: Time) -> Result<f64, BibimbError> {
    let g = |r: f64| r * potential.circular_velocity(r, t) - lz_abs;
    if !lz_abs.is_finite() {
        return Err(BibimbError::InvalidParameter(format!(
            "angular momentum is not finite: {lz_abs}"
        )));
    }
    if g(MIN_GUIDING_RADIUS) >= 0.0 {
        return Ok(MIN_GUIDING_RADIUS);
    }

    let mut lo = MIN_GUIDING_RADIUS;
    let mut hi = 1.0;
    let mut expansions = 0;
    while g(hi) < 0.0 {
        lo = hi;
        hi *= 2.0;
        expansions += 1;
        if expansions > 60 {
            return Err(BibimbError::InvalidParameter(format!(
                "no guiding radius for |Lz| = {lz_abs}"
            )));
        }
    }

    for _ in 0..MAX_BISECTIONS {
        let mid = 0.5 * (lo + hi);
        if g(mid) < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= 1e-13 * hi {
            break;
        }
    }
    Ok(0.5 * (lo + hi))
}

/// Action finder in the epicyclic approximation of an axisymmetric potential.
#[derive(Debug, Clone)]
pub struct EpicyclicActionFinder {
    potential: Arc<dyn Potential>,
    time: Time,
}

impl EpicyclicActionFinder {
    pub fn new(potential: Arc<dyn Potential>) -> Self {
        EpicyclicActionFinder {
            potential,
            time: 0.0,
        }
    }

    /// Evaluate the potential at `time` instead of `0`.
    pub fn at_time(mut self, time: Time) -> Self {
        self.time = time;
        self
    }

    pub fn potential(&self) -> &Arc<dyn Potential> {
        &self.potential
    }

    pub fn actions_of(&self, state: &PhaseSpaceState) -> Result<Actions, BibimbError> {
        let lz = state.angular_momentum_z();
        let f = EpicycleFrequencies::from_angular_momentum(self.potential.as_ref(), lz, self.time)?;
        let (vr, _) = state.cylindrical_velocity();
        let (z, vz) = (state.position.z, state.velocity.z);
        let dr = state.cylindrical_radius() - f.guiding_radius;

        let jr = (vr * vr + f.kappa * f.kappa * dr * dr) / (2.0 * f.kappa);
        let jz = (vz * vz + f.nu * f.nu * z * z) / (2.0 * f.nu);
        Ok(Actions::new(jr, lz, jz))
    }
}

impl ActionFinder for EpicyclicActionFinder {
    fn actions(&self, states: &[PhaseSpaceState]) -> Result<Vec<Actions>, BibimbError> {
        states.iter().map(|s| self.actions_of(s)).collect()
    }
}
