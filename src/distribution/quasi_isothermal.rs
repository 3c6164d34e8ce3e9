//! Quasi-isothermal disc DF (Binney & McMillan 2011).
//!
//! ```text
//! f(J) = Ω Σ / (π σr² κ) · (1 + tanh(−Lz / L0)) · exp(−κ Jr / σr²)
//!      · ν / (2π σz²) · exp(−ν Jz / σz²)
//!
//! Σ(Rc)  = Σ0 exp(−Rc / Rd)
//! σr(Rc) = σr0 exp(−Rc / Rσ)
//! σz(Rc) = √2 ν(Rc) h
//! ```
//!
//! with the epicyclic frequencies evaluated at the guiding radius `Rc` of `Lz`. The tanh factor
//! favours `Lz < 0`, the prograde sense of a galaxy rotating clockwise.
use std::sync::Arc;

use serde::Deserialize;

use crate::{
    bibimb_errors::BibimbError,
    constants::{Time, DPI},
    potential::Potential,
};

use super::{epicycle::EpicycleFrequencies, Actions, DistributionFunction};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuasiIsothermalParams {
    /// Central surface density `Σ0`.
    pub sigma0: f64,
    /// Scale length of the surface density.
    pub r_disk: f64,
    /// Scale height, sets the vertical dispersion.
    pub h_disk: f64,
    /// Scale length of the radial dispersion.
    pub r_sigma_r: f64,
    /// Central radial dispersion.
    pub sigma_r0: f64,
    /// Width `L0` of the transition between retrograde and prograde stars.
    pub lz_cutoff: f64,
}

impl Default for QuasiIsothermalParams {
    fn default() -> Self {
        QuasiIsothermalParams {
            sigma0: 1.0,
            r_disk: 2.5,
            h_disk: 0.3,
            r_sigma_r: 5.0,
            // 35 km/s at 8 kpc
            sigma_r0: 35.0 / (-8.0f64 / 5.0).exp(),
            lz_cutoff: 10.0,
        }
    }
}

impl QuasiIsothermalParams {
    pub fn validate(&self) -> Result<(), BibimbError> {
        let positive = [
            ("sigma0", self.sigma0),
            ("r_disk", self.r_disk),
            ("h_disk", self.h_disk),
            ("r_sigma_r", self.r_sigma_r),
            ("sigma_r0", self.sigma_r0),
            ("lz_cutoff", self.lz_cutoff),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(BibimbError::InvalidParameter(format!(
                    "{name} must be > 0, got {v}"
                )));
            }
        }
        Ok(())
    }

    pub fn surface_density(&self, rc: f64) -> f64 {
        self.sigma0 * (-rc / self.r_disk).exp()
    }

    pub fn sigma_r(&self, rc: f64) -> f64 {
        self.sigma_r0 * (-rc / self.r_sigma_r).exp()
    }
}

#[derive(Debug, Clone)]
pub struct QuasiIsothermal {
    params: QuasiIsothermalParams,
    potential: Arc<dyn Potential>,
    time: Time,
}

impl QuasiIsothermal {
    pub fn new(
        params: QuasiIsothermalParams,
        potential: Arc<dyn Potential>,
    ) -> Result<Self, BibimbError> {
        params.validate()?;
        Ok(QuasiIsothermal {
            params,
            potential,
            time: 0.0,
        })
    }

    pub fn params(&self) -> &QuasiIsothermalParams {
        &self.params
    }

    pub fn value(&self, a: &Actions) -> Result<f64, BibimbError> {
        let p = &self.params;
        let f = EpicycleFrequencies::from_angular_momentum(self.potential.as_ref(), a.lz, self.time)?;
        let rc = f.guiding_radius;

        let sr2 = p.sigma_r(rc).powi(2);
        let sz2 = 2.0 * (f.nu * p.h_disk).powi(2);

        let radial = f.omega * p.surface_density(rc) / (std::f64::consts::PI * sr2 * f.kappa)
            * (1.0 + (-a.lz / p.lz_cutoff).tanh())
            * (-f.kappa * a.jr / sr2).exp();
        let vertical = f.nu / (DPI * sz2) * (-f.nu * a.jz / sz2).exp();
        Ok(radial * vertical)
    }
}

impl DistributionFunction for QuasiIsothermal {
    fn density(&self, actions: &[Actions]) -> Result<Vec<f64>, BibimbError> {
        actions.iter().map(|a| self.value(a)).collect()
    }
}
