//! # Bibimb: one backward-integration run from start to end
//!
//! [`Bibimb`] holds the two potentials of a run and the parameters of the DF, and chains the
//! stages of the pipeline:
//!
//! 1. build the initial-condition grid,
//! 2. integrate every particle backward in the rotating frame
//!    ([`OrbitBackIntegrator`]),
//! 3. rotate the final states to the inertial frame and evaluate the quasi-isothermal DF of the
//!    base potential on them,
//! 4. sum the DF on the grid of the two free coordinates ([`DfReducer`]).
//!
//! [`Bibimb::run_config`] does all of the above from a [`RunConfig`] and stores the histogram
//! in the output directory.
//!
//! ## Typical usage
//!
//! ```rust,no_run
//! use bibimb::prelude::*;
//! use camino::Utf8Path;
//!
//! # fn main() -> Result<(), BibimbError> {
//! let config = RunConfig::read_file(Utf8Path::new("run.toml"))?;
//! let output = Bibimb::run_config(&config)?;
//! println!("total DF: {}", output.histogram.total());
//! # Ok(())
//! # }
//! ```
use std::{fs, sync::Arc};

use camino::Utf8PathBuf;

use crate::{
    bibimb_errors::BibimbError,
    config::{Binning, RunConfig},
    constants::UnitSystem,
    distribution::{ActionDf, EpicyclicActionFinder, QuasiIsothermal, QuasiIsothermalParams},
    histogram::{BinSpec, DfHistogram2D, DfReducer},
    initial_conditions::InitialConditionGrid,
    integrator::{OrbitIntegrator, RungeKutta4},
    orbits::{BackIntegrationResult, IntegrationParams, OrbitBackIntegrator},
    potential::{ini::read_potential, Potential},
};

/// Everything produced by one run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub grid: InitialConditionGrid,
    pub integration: BackIntegrationResult,
    pub histogram: DfHistogram2D,
    /// Files written, empty unless the run was stored.
    pub files: Vec<Utf8PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Bibimb {
    potential: Arc<dyn Potential>,
    base_potential: Arc<dyn Potential>,
    df_params: QuasiIsothermalParams,
}

impl Bibimb {
    /// Arguments
    /// -----------------
    /// * `potential`: potential the orbits are integrated in (rotating frame).
    /// * `base_potential`: axisymmetric potential the DF is defined in.
    pub fn new(potential: Arc<dyn Potential>, base_potential: Arc<dyn Potential>) -> Self {
        Bibimb {
            potential,
            base_potential,
            df_params: QuasiIsothermalParams::default(),
        }
    }

    pub fn with_df_params(mut self, df_params: QuasiIsothermalParams) -> Self {
        self.df_params = df_params;
        self
    }

    /// Read both potential declarations named in `config`.
    pub fn from_config(config: &RunConfig) -> Result<Self, BibimbError> {
        let units: &UnitSystem = &config.units;
        let potential = read_potential(&config.potential, units)?;
        let base_potential = read_potential(&config.base_potential, units)?;
        if base_potential.is_time_dependent() {
            tracing::warn!(
                path = %config.base_potential,
                "base potential is time dependent; the DF uses it at t = 0"
            );
        }
        Ok(Bibimb::new(Arc::from(potential), Arc::from(base_potential)).with_df_params(config.df))
    }

    pub fn potential(&self) -> &dyn Potential {
        self.potential.as_ref()
    }

    /// Epicyclic actions in the base potential fed to the quasi-isothermal DF.
    pub fn df_generator(
        &self,
    ) -> Result<ActionDf<EpicyclicActionFinder, QuasiIsothermal>, BibimbError> {
        let finder = EpicyclicActionFinder::new(self.base_potential.clone());
        let df = QuasiIsothermal::new(self.df_params, self.base_potential.clone())?;
        Ok(ActionDf::new(finder, df))
    }

    /// Integrate the grid backward and sum the DF on it.
    pub fn backward_histogram<I: OrbitIntegrator>(
        &self,
        grid: &InitialConditionGrid,
        integrator: I,
        params: IntegrationParams,
        binning: Binning,
    ) -> Result<RunOutput, BibimbError> {
        let back = OrbitBackIntegrator::new(integrator, params);
        let df = self.df_generator()?;
        let x_edges = binning.bins(&grid.samples1).edges()?;
        let y_edges = binning.bins(&grid.samples2).edges()?;

        tracing::info!(
            particles = grid.len(),
            t_start = params.t_start,
            total_time = params.total_time,
            pattern_speed = params.pattern_speed,
            "backward integration"
        );
        let integration =
            back.run_backward_integration(&grid.particles, self.potential.as_ref(), &df)?;

        let (name1, name2) = grid.axis_names;
        let histogram = DfReducer::new(name1.label(), name2.label()).reduce_values(
            &integration.df_values,
            &grid.axis1,
            &grid.axis2,
            &BinSpec::Edges(x_edges),
            &BinSpec::Edges(y_edges),
        )?;

        Ok(RunOutput {
            grid: grid.clone(),
            integration,
            histogram,
            files: Vec::new(),
        })
    }

    /// Run everything `config` describes and store the histogram under
    /// [`RunConfig::output_prefix`].
    pub fn run_config(config: &RunConfig) -> Result<RunOutput, BibimbError> {
        let bibimb = Bibimb::from_config(config)?;
        let grid = config.initial_conditions()?;
        let params = config.integration_params()?;
        let integrator = config
            .integration
            .max_step
            .map(RungeKutta4::new)
            .unwrap_or_default();

        let mut output =
            bibimb.backward_histogram(&grid, integrator, params, config.histogram.binning)?;

        fs::create_dir_all(&config.output_directory)?;
        output.files = output.histogram.write_csv(&config.output_prefix())?.to_vec();
        tracing::info!(
            prefix = %config.output_prefix(),
            total = output.histogram.total(),
            "run stored"
        );
        Ok(output)
    }
}
