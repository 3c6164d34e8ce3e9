//! Backward integration of test particles in rotating galactic potentials, and reconstruction
//! of their distribution function on a grid of present-day initial conditions.
pub mod bibimb;
pub mod bibimb_errors;
pub mod config;
pub mod constants;
pub mod distribution;
pub mod frame;
pub mod growth_curve;
pub mod histogram;
pub mod initial_conditions;
pub mod integrator;
mod numeric;
pub mod orbits;
pub mod phase_space;
pub mod potential;

pub mod prelude {
    pub use crate::bibimb::{Bibimb, RunOutput};
    pub use crate::bibimb_errors::BibimbError;
    pub use crate::config::{Binning, RunConfig};
    pub use crate::constants::UnitSystem;
    pub use crate::distribution::{
        ActionDf, ActionFinder, Actions, DfGenerator, DistributionFunction,
        EpicyclicActionFinder, QuasiIsothermal, QuasiIsothermalParams,
    };
    pub use crate::frame::{inertial_to_rotating, rotating_to_inertial, FrameTransform};
    pub use crate::growth_curve::{GrowthMode, GrowthTable};
    pub use crate::histogram::{binned_sum_2d, BinSpec, DfHistogram2D, DfReducer};
    pub use crate::initial_conditions::{
        set_initial_conditions, Coordinate, CoordinateName, InitialConditionGrid,
        InitialConditionSpec,
    };
    pub use crate::integrator::{OrbitIntegrator, OrbitTrajectory, RungeKutta4};
    pub use crate::orbits::{BackIntegrationResult, IntegrationParams, OrbitBackIntegrator};
    pub use crate::phase_space::PhaseSpaceState;
    pub use crate::potential::{
        CompositePotential, DehnenBar, Logarithmic, MiyamotoNagai, Nfw, Plummer, Potential,
    };
}
