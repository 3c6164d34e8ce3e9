//! # Initial-condition grids
//!
//! Builds the Cartesian product of two free phase-space coordinates (the four others held
//! fixed) and converts every grid point into a Cartesian [`PhaseSpaceState`].
//!
//! ## Conventions
//!
//! Inputs are cylindrical: `r` (radius), `phi` (azimuth, **degrees**), `z`, `vr`, `vphi`, `vz`.
//!
//! ```text
//! x  = r·cos(phi)                    y  = r·sin(phi)                    z  = z
//! vx = vr·cos(phi) − vphi·sin(phi)   vy = vr·sin(phi) + vphi·cos(phi)   vz = vz
//! ```
//!
//! * `vr > 0` is outward motion.
//! * `vphi = r·dphi/dt`. The galaxy is taken to rotate clockwise when seen from `+z`, so
//!   **`vphi < 0` is prograde**. Pattern speeds share the same angular sense (a prograde bar has
//!   `omega < 0`), hence a star corotating with the pattern has `vphi = omega·r`.
//!
//! ## Grid layout
//!
//! The free coordinates are taken in the order `r, phi, z, vr, vphi, vz`; the first one found
//! is axis 1. The grid uses matrix (`ij`) indexing: axis 1 varies slowest, so particle
//! `i·N2 + j` has `axis1 = samples1[i]` and `axis2 = samples2[j]`.
//!
//! ```rust
//! use bibimb::initial_conditions::{Coordinate, InitialConditionGrid, InitialConditionSpec};
//!
//! let spec = InitialConditionSpec::new(
//!     Coordinate::Fixed(8.0),
//!     Coordinate::Fixed(0.0),
//!     Coordinate::Fixed(0.0),
//!     Coordinate::linspace(-50.0, 50.0, 5),
//!     Coordinate::linspace(-250.0, -150.0, 5),
//!     Coordinate::Fixed(0.0),
//! )
//! .unwrap();
//!
//! let grid = InitialConditionGrid::new(&spec);
//! assert_eq!(grid.len(), 25);
//! ```
use std::{fmt, str::FromStr};

use itertools::iproduct;
use nalgebra::Vector3;

use crate::{
    bibimb_errors::BibimbError, constants::RADEG, numeric::linspace,
    phase_space::PhaseSpaceState,
};

/// The six cylindrical coordinates an initial condition is specified in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinateName {
    R,
    Phi,
    Z,
    VR,
    VPhi,
    VZ,
}

impl CoordinateName {
    pub const ALL: [CoordinateName; 6] = [
        CoordinateName::R,
        CoordinateName::Phi,
        CoordinateName::Z,
        CoordinateName::VR,
        CoordinateName::VPhi,
        CoordinateName::VZ,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CoordinateName::R => "r",
            CoordinateName::Phi => "phi",
            CoordinateName::Z => "z",
            CoordinateName::VR => "vr",
            CoordinateName::VPhi => "vphi",
            CoordinateName::VZ => "vz",
        }
    }
}

impl fmt::Display for CoordinateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CoordinateName {
    type Err = BibimbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CoordinateName::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| BibimbError::Configuration(format!("Unknown coordinate: {s}")))
    }
}

/// One coordinate of the initial conditions: held fixed or iterated over a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Coordinate {
    Fixed(f64),
    Free(Vec<f64>),
}

impl Coordinate {
    /// Free coordinate sampled at `n` evenly spaced values over `[min, max]`.
    pub fn linspace(min: f64, max: f64, n: usize) -> Self {
        Coordinate::Free(linspace(min, max, n))
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Coordinate::Free(_))
    }
}

impl From<f64> for Coordinate {
    fn from(v: f64) -> Self {
        Coordinate::Fixed(v)
    }
}

impl From<Vec<f64>> for Coordinate {
    fn from(v: Vec<f64>) -> Self {
        Coordinate::Free(v)
    }
}

/// Validated description of the initial conditions: exactly two [`Coordinate::Free`] entries.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialConditionSpec {
    coordinates: [Coordinate; 6],
    free: (CoordinateName, CoordinateName),
}

impl InitialConditionSpec {
    /// Build and validate the grid description.
    ///
    /// Arguments
    /// -----------------
    /// * `r`, `phi` (degrees), `z`, `vr`, `vphi`, `vz`: each either fixed or free.
    ///
    /// Return
    /// ----------
    /// * The description, or [`BibimbError::Configuration`] when the number of free
    ///   coordinates is not exactly two or a free sequence is empty.
    pub fn new(
        r: Coordinate,
        phi: Coordinate,
        z: Coordinate,
        vr: Coordinate,
        vphi: Coordinate,
        vz: Coordinate,
    ) -> Result<Self, BibimbError> {
        let coordinates = [r, phi, z, vr, vphi, vz];

        let free: Vec<CoordinateName> = CoordinateName::ALL
            .into_iter()
            .zip(coordinates.iter())
            .filter(|(_, c)| c.is_free())
            .map(|(name, _)| name)
            .collect();

        let (first, second) = match free.as_slice() {
            [a, b] => (*a, *b),
            _ => {
                return Err(BibimbError::Configuration(format!(
                    "exactly two free coordinates are required, got {} ({})",
                    free.len(),
                    free.iter().map(|c| c.label()).collect::<Vec<_>>().join(", ")
                )))
            }
        };

        for (name, coord) in CoordinateName::ALL.into_iter().zip(coordinates.iter()) {
            if let Coordinate::Free(values) = coord {
                if values.is_empty() {
                    return Err(BibimbError::Configuration(format!(
                        "free coordinate {name} has no samples"
                    )));
                }
            }
        }

        Ok(InitialConditionSpec {
            coordinates,
            free: (first, second),
        })
    }

    pub fn get(&self, name: CoordinateName) -> &Coordinate {
        &self.coordinates[name as usize]
    }

    /// Names of the two free coordinates, in axis order.
    pub fn free_axes(&self) -> (CoordinateName, CoordinateName) {
        self.free
    }

    fn samples(&self, name: CoordinateName) -> &[f64] {
        match self.get(name) {
            Coordinate::Free(values) => values,
            Coordinate::Fixed(_) => &[],
        }
    }
}

/// Particles generated from an [`InitialConditionSpec`] and the grid coordinates of each.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialConditionGrid {
    pub particles: Vec<PhaseSpaceState>,
    /// Value of the first free coordinate for every particle.
    pub axis1: Vec<f64>,
    /// Value of the second free coordinate for every particle.
    pub axis2: Vec<f64>,
    /// Names of the free coordinates behind `axis1` and `axis2`.
    pub axis_names: (CoordinateName, CoordinateName),
    /// Distinct samples of the first free coordinate (length `N1`).
    pub samples1: Vec<f64>,
    /// Distinct samples of the second free coordinate (length `N2`).
    pub samples2: Vec<f64>,
}

impl InitialConditionGrid {
    pub fn new(spec: &InitialConditionSpec) -> Self {
        let (name1, name2) = spec.free_axes();
        let samples1 = spec.samples(name1).to_vec();
        let samples2 = spec.samples(name2).to_vec();

        let n = samples1.len() * samples2.len();
        let mut particles = Vec::with_capacity(n);
        let mut axis1 = Vec::with_capacity(n);
        let mut axis2 = Vec::with_capacity(n);

        for (&a, &b) in iproduct!(samples1.iter(), samples2.iter()) {
            let value = |name: CoordinateName| -> f64 {
                if name == name1 {
                    a
                } else if name == name2 {
                    b
                } else {
                    match spec.get(name) {
                        Coordinate::Fixed(v) => *v,
                        // only the two axes are free
                        Coordinate::Free(_) => f64::NAN,
                    }
                }
            };

            particles.push(cylindrical_to_cartesian(
                value(CoordinateName::R),
                value(CoordinateName::Phi),
                value(CoordinateName::Z),
                value(CoordinateName::VR),
                value(CoordinateName::VPhi),
                value(CoordinateName::VZ),
            ));
            axis1.push(a);
            axis2.push(b);
        }

        tracing::debug!(
            particles = particles.len(),
            axis1 = %name1,
            axis2 = %name2,
            "initial-condition grid built"
        );

        InitialConditionGrid {
            particles,
            axis1,
            axis2,
            axis_names: (name1, name2),
            samples1,
            samples2,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Grid shape `(N1, N2)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.samples1.len(), self.samples2.len())
    }
}

/// Build the grid straight from the six coordinates.
///
/// Shorthand for [`InitialConditionSpec::new`] followed by [`InitialConditionGrid::new`].
pub fn set_initial_conditions(
    r: Coordinate,
    phi: Coordinate,
    z: Coordinate,
    vr: Coordinate,
    vphi: Coordinate,
    vz: Coordinate,
) -> Result<InitialConditionGrid, BibimbError> {
    let spec = InitialConditionSpec::new(r, phi, z, vr, vphi, vz)?;
    Ok(InitialConditionGrid::new(&spec))
}

/// Convert one cylindrical initial condition (`phi` in degrees) into a Cartesian state.
pub fn cylindrical_to_cartesian(
    r: f64,
    phi_deg: f64,
    z: f64,
    vr: f64,
    vphi: f64,
    vz: f64,
) -> PhaseSpaceState {
    let (sin_phi, cos_phi) = (phi_deg * RADEG).sin_cos();
    PhaseSpaceState::new(
        Vector3::new(r * cos_phi, r * sin_phi, z),
        Vector3::new(
            vr * cos_phi - vphi * sin_phi,
            vr * sin_phi + vphi * cos_phi,
            vz,
        ),
    )
}

#[cfg(test)]
mod initial_conditions_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn velocity_spec() -> InitialConditionSpec {
        InitialConditionSpec::new(
            8.0.into(),
            0.0.into(),
            0.0.into(),
            Coordinate::linspace(-50., 50., 5),
            Coordinate::linspace(-250., -150., 3),
            0.0.into(),
        )
        .unwrap()
    }

    #[test]
    fn test_grid_shape() {
        let grid = InitialConditionGrid::new(&velocity_spec());
        assert_eq!(grid.len(), 15);
        assert_eq!(grid.axis1.len(), 15);
        assert_eq!(grid.axis2.len(), 15);
        assert_eq!(grid.shape(), (5, 3));
        assert_eq!(grid.axis_names, (CoordinateName::VR, CoordinateName::VPhi));
    }

    #[test]
    fn test_matrix_indexing() {
        let grid = InitialConditionGrid::new(&velocity_spec());
        // first axis varies slowest
        assert_eq!(&grid.axis1[..4], &[-50., -50., -50., -25.]);
        assert_eq!(&grid.axis2[..4], &[-250., -200., -150., -250.]);

        for (i, p) in grid.particles.iter().enumerate() {
            // phi = 0: vx = vr, vy = vphi
            assert_eq!(p.velocity.x, grid.axis1[i]);
            assert_eq!(p.velocity.y, grid.axis2[i]);
            assert_eq!(p.position.x, 8.0);
        }
    }

    #[test]
    fn test_coordinate_conversion() {
        let s = cylindrical_to_cartesian(1., 0., 0., 1., 0., 0.);
        assert_eq!(s.to_array(), [1., 0., 0., 1., 0., 0.]);

        let s = cylindrical_to_cartesian(1., 90., 0., 1., 0., 0.);
        let a = s.to_array();
        assert_abs_diff_eq!(a[0], 0., epsilon = 1e-15);
        assert_abs_diff_eq!(a[1], 1., epsilon = 1e-15);
        // outward velocity at phi = 90° points along +y
        assert_abs_diff_eq!(a[3], 0., epsilon = 1e-15);
        assert_abs_diff_eq!(a[4], 1., epsilon = 1e-15);

        // azimuthal velocity at phi = 90° points along -x
        let s = cylindrical_to_cartesian(1., 90., 0., 0., 1., 0.);
        assert_abs_diff_eq!(s.velocity.x, -1., epsilon = 1e-15);
        assert_abs_diff_eq!(s.velocity.y, 0., epsilon = 1e-15);
    }

    #[test]
    fn test_prograde_sign() {
        // vphi < 0 is prograde: negative angular momentum
        let s = cylindrical_to_cartesian(8., 30., 0., 0., -220., 0.);
        assert!(s.angular_momentum_z() < 0.);
        let (_, vphi) = s.cylindrical_velocity();
        assert_abs_diff_eq!(vphi, -220., epsilon = 1e-10);
    }

    #[test]
    fn test_free_phi_in_degrees() {
        let grid = set_initial_conditions(
            vec![4., 8.].into(),
            vec![0., 90., 180.].into(),
            0.0.into(),
            0.0.into(),
            (-200.0).into(),
            0.0.into(),
        )
        .unwrap();

        assert_eq!(grid.axis_names, (CoordinateName::R, CoordinateName::Phi));
        assert_eq!(grid.axis2[1], 90.);
        assert_abs_diff_eq!(grid.particles[1].position.y, 4., epsilon = 1e-12);
        assert_abs_diff_eq!(grid.particles[5].position.x, -8., epsilon = 1e-12);
    }

    #[test]
    fn test_wrong_number_of_free_coordinates() {
        let err = InitialConditionSpec::new(
            8.0.into(),
            0.0.into(),
            0.0.into(),
            Coordinate::linspace(-50., 50., 5),
            (-200.0).into(),
            0.0.into(),
        )
        .unwrap_err();
        assert!(matches!(err, BibimbError::Configuration(_)));

        let err = InitialConditionSpec::new(
            vec![7., 8.].into(),
            0.0.into(),
            vec![0., 0.1].into(),
            Coordinate::linspace(-50., 50., 5),
            (-200.0).into(),
            0.0.into(),
        )
        .unwrap_err();
        assert!(matches!(err, BibimbError::Configuration(_)));
    }

    #[test]
    fn test_empty_free_coordinate() {
        let err = InitialConditionSpec::new(
            8.0.into(),
            0.0.into(),
            0.0.into(),
            Coordinate::Free(vec![]),
            Coordinate::linspace(-250., -150., 3),
            0.0.into(),
        )
        .unwrap_err();
        assert!(matches!(err, BibimbError::Configuration(_)));
    }

    #[test]
    fn test_coordinate_name_parse() {
        assert_eq!("vphi".parse::<CoordinateName>().unwrap(), CoordinateName::VPhi);
        assert_eq!("VR".parse::<CoordinateName>().unwrap(), CoordinateName::VR);
        assert!("theta".parse::<CoordinateName>().is_err());
    }
}
