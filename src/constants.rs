//! # Constants, type aliases and unit system
//!
//! This module centralizes the **physical constants**, **conversion factors** and **type
//! aliases** used across `bibimb`, together with the explicit [`UnitSystem`] value that every
//! entry point needing physical units receives as an argument.
//!
//! ## Overview
//!
//! - Gravitational constant in astrophysical units
//! - Unit conversions (degrees ↔ radians, kpc/(km/s) ↔ Gyr)
//! - Core type aliases used across the crate
//! - [`UnitSystem`]: the (mass, length, velocity) units the numbers are expressed in
//!
//! There is no global unit state: potentials built from declarations, run configurations and
//! reports all take a `&UnitSystem`.

use serde::Deserialize;

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Gravitational constant in kpc (km/s)² / Msun
pub const G_KPC_KMS_MSUN: f64 = 4.300917270038e-6;

/// One kpc/(km/s) expressed in Gyr
pub const KPC_PER_KMS_IN_GYR: f64 = 0.977_792_221_680_356;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;

/// Angle in radians
pub type Radian = f64;

/// Time in internal units (length unit / velocity unit)
pub type Time = f64;

/// Angular speed in internal units (velocity unit / length unit)
pub type PatternSpeed = f64;

// -------------------------------------------------------------------------------------------------
// Unit system
// -------------------------------------------------------------------------------------------------

/// Units in which positions, velocities and masses are expressed.
///
/// Each field gives the size of one internal unit in astrophysical units:
/// `mass` in solar masses, `length` in kpc and `velocity` in km/s. The time unit is derived
/// (`length / velocity`).
///
/// The default, `(1 Msun, 1 kpc, 1 km/s)`, gives times in kpc/(km/s) ≈ 0.978 Gyr and pattern
/// speeds in km/s/kpc.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct UnitSystem {
    pub mass: f64,
    pub length: f64,
    pub velocity: f64,
}

impl Default for UnitSystem {
    fn default() -> Self {
        UnitSystem {
            mass: 1.0,
            length: 1.0,
            velocity: 1.0,
        }
    }
}

impl UnitSystem {
    pub fn new(mass: f64, length: f64, velocity: f64) -> Self {
        UnitSystem {
            mass,
            length,
            velocity,
        }
    }

    /// Gravitational constant expressed in this unit system.
    pub fn gravitational_constant(&self) -> f64 {
        G_KPC_KMS_MSUN * self.mass / (self.length * self.velocity * self.velocity)
    }

    /// Size of one internal time unit, in Gyr.
    pub fn time_unit_gyr(&self) -> f64 {
        KPC_PER_KMS_IN_GYR * self.length / self.velocity
    }

    /// Convert an internal time into Gyr.
    pub fn to_gyr(&self, t: Time) -> f64 {
        t * self.time_unit_gyr()
    }
}
