//! # Distribution functions
//!
//! The DF of the particles at the end of the backward integration is obtained in two steps:
//! an [`ActionFinder`] maps phase-space states to [`Actions`], then a [`DistributionFunction`]
//! maps actions to a phase-space density. [`ActionDf`] chains both into a [`DfGenerator`],
//! the only thing the pipeline needs.
//!
//! Any closure `Fn(&[PhaseSpaceState]) -> Result<Vec<f64>, BibimbError>` is also a
//! [`DfGenerator`], which is handy for tests and for densities not written in actions.
//!
//! Provided implementations:
//!
//! * [`EpicyclicActionFinder`] – actions in the epicyclic approximation of an axisymmetric
//!   potential,
//! * [`QuasiIsothermal`] – the quasi-isothermal disc DF of Binney & McMillan (2011).
pub mod epicycle;
pub mod quasi_isothermal;

use crate::{bibimb_errors::BibimbError, phase_space::PhaseSpaceState};

pub use epicycle::{EpicycleFrequencies, EpicyclicActionFinder};
pub use quasi_isothermal::{QuasiIsothermal, QuasiIsothermalParams};

/// Radial action, signed azimuthal action and vertical action.
///
/// `lz = x·vy − y·vx` keeps its sign: prograde stars of a galaxy rotating clockwise have
/// `lz < 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Actions {
    pub jr: f64,
    pub lz: f64,
    pub jz: f64,
}

impl Actions {
    pub fn new(jr: f64, lz: f64, jz: f64) -> Self {
        Actions { jr, lz, jz }
    }
}

pub trait ActionFinder {
    fn actions(&self, states: &[PhaseSpaceState]) -> Result<Vec<Actions>, BibimbError>;
}

pub trait DistributionFunction {
    /// Phase-space density for each set of actions.
    fn density(&self, actions: &[Actions]) -> Result<Vec<f64>, BibimbError>;
}

/// Anything turning a batch of states into one DF value per state.
pub trait DfGenerator {
    fn evaluate(&self, states: &[PhaseSpaceState]) -> Result<Vec<f64>, BibimbError>;
}

impl<F> DfGenerator for F
where
    F: Fn(&[PhaseSpaceState]) -> Result<Vec<f64>, BibimbError>,
{
    fn evaluate(&self, states: &[PhaseSpaceState]) -> Result<Vec<f64>, BibimbError> {
        self(states)
    }
}

/// An [`ActionFinder`] followed by a [`DistributionFunction`].
#[derive(Debug, Clone)]
pub struct ActionDf<A, D> {
    pub finder: A,
    pub df: D,
}

impl<A: ActionFinder, D: DistributionFunction> ActionDf<A, D> {
    pub fn new(finder: A, df: D) -> Self {
        ActionDf { finder, df }
    }
}

impl<A: ActionFinder, D: DistributionFunction> DfGenerator for ActionDf<A, D> {
    fn evaluate(&self, states: &[PhaseSpaceState]) -> Result<Vec<f64>, BibimbError> {
        let actions = self.finder.actions(states)?;
        let values = self.df.density(&actions)?;
        tracing::debug!(particles = states.len(), "evaluated DF");
        Ok(values)
    }
}
