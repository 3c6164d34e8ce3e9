//! # Run configuration
//!
//! A [`RunConfig`] describes one complete run: potentials, initial-condition grid,
//! integration times, DF and binning. It is read from TOML:
//!
//! ```toml
//! output_directory = "results"
//! potential = "potentials/bar.ini"
//! base_potential = "potentials/axisymmetric.ini"
//!
//! [units]                 # optional, defaults to 1 Msun, 1 kpc, 1 km/s
//! mass = 1.0
//!
//! [grid]                  # number: fixed, list or {min, max, n}: free
//! r = 8.0
//! phi = 25.0
//! z = 0.0
//! vr = { min = -50.0, max = 50.0, n = 51 }
//! vphi = { min = -300.0, max = -150.0, n = 76 }
//! vz = 0.0
//!
//! [integration]
//! steps_per_dt = 10
//! number_of_cycles = 5
//! dyn_time_base = 0.157   # kpc/(km/s)
//! pattern_speed = -40.0   # km/s/kpc, negative: prograde
//!
//! [df]                    # optional, quasi-isothermal parameters
//! r_disk = 2.5
//!
//! [histogram]             # optional
//! binning = "sample_centers"
//! ```
//!
//! With the default `sample_centers` binning an `N1×N2` grid gives an `N1×N2` histogram.
//! `binning = "sample_edges"` uses the grid samples as bin edges, which gives the
//! `(N1 − 1)×(N2 − 1)` histograms of the older runner scripts.
//!
//! The older whitespace-separated `key value` input files are read by
//! [`RunConfig::from_key_value_str`].
use std::{collections::HashMap, fs};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::{
    bibimb_errors::BibimbError,
    constants::{PatternSpeed, Time, UnitSystem},
    distribution::QuasiIsothermalParams,
    histogram::BinSpec,
    initial_conditions::{Coordinate, InitialConditionGrid, InitialConditionSpec},
    orbits::IntegrationParams,
};

/// One coordinate of the grid as written in the configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CoordinateInput {
    Value(f64),
    Values(Vec<f64>),
    Range { min: f64, max: f64, n: usize },
}

impl CoordinateInput {
    pub fn to_coordinate(&self) -> Coordinate {
        match self {
            CoordinateInput::Value(v) => Coordinate::Fixed(*v),
            CoordinateInput::Values(v) => Coordinate::Free(v.clone()),
            CoordinateInput::Range { min, max, n } => Coordinate::linspace(*min, *max, *n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    pub r: CoordinateInput,
    pub phi: CoordinateInput,
    pub z: CoordinateInput,
    pub vr: CoordinateInput,
    pub vphi: CoordinateInput,
    pub vz: CoordinateInput,
}

impl GridConfig {
    pub fn to_spec(&self) -> Result<InitialConditionSpec, BibimbError> {
        InitialConditionSpec::new(
            self.r.to_coordinate(),
            self.phi.to_coordinate(),
            self.z.to_coordinate(),
            self.vr.to_coordinate(),
            self.vphi.to_coordinate(),
            self.vz.to_coordinate(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationConfig {
    /// Snapshots per dynamical time.
    pub steps_per_dt: usize,
    /// Number of dynamical times integrated.
    pub number_of_cycles: usize,
    /// Reference dynamical time.
    pub dyn_time_base: Time,
    pub pattern_speed: PatternSpeed,
    /// Largest RK4 step; the integrator default when absent.
    #[serde(default)]
    pub max_step: Option<Time>,
}

impl IntegrationConfig {
    pub fn total_time(&self) -> Time {
        self.dyn_time_base * self.number_of_cycles as f64
    }

    /// The present-day states sit at `t = total_time` and are integrated back to `t = 0`.
    pub fn to_params(&self) -> Result<IntegrationParams, BibimbError> {
        IntegrationParams::builder()
            .t_start(self.total_time())
            .total_time(self.total_time())
            .pattern_speed(self.pattern_speed)
            .n_snapshots(self.steps_per_dt * self.number_of_cycles + 1)
            .build()
    }
}

/// How the grid samples are turned into histogram bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binning {
    /// One bin centred on each grid sample.
    #[default]
    SampleCenters,
    /// The grid samples are the bin edges.
    SampleEdges,
}

impl Binning {
    /// Bins for the grid samples of one axis, taken in increasing order without duplicates.
    pub fn bins(&self, samples: &[f64]) -> BinSpec {
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        sorted.dedup();
        match self {
            Binning::SampleCenters => BinSpec::SampleCenters(sorted),
            Binning::SampleEdges => BinSpec::SampleEdges(sorted),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistogramConfig {
    pub binning: Binning,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub output_directory: Utf8PathBuf,
    /// Declaration of the potential the orbits are integrated in.
    pub potential: Utf8PathBuf,
    /// Declaration of the axisymmetric potential the DF is defined in.
    pub base_potential: Utf8PathBuf,
    #[serde(default)]
    pub units: UnitSystem,
    pub grid: GridConfig,
    pub integration: IntegrationConfig,
    #[serde(default)]
    pub df: QuasiIsothermalParams,
    #[serde(default)]
    pub histogram: HistogramConfig,
}

impl RunConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, BibimbError> {
        Ok(toml::from_str(content)?)
    }

    /// Read a configuration file.
    ///
    /// `.toml` files are parsed as TOML, anything else as a `key value` input file.
    pub fn read_file(path: &Utf8Path) -> Result<Self, BibimbError> {
        let content = fs::read_to_string(path)?;
        let config = if path.extension() == Some("toml") {
            Self::from_toml_str(&content)?
        } else {
            Self::from_key_value_str(&content)?
        };
        tracing::debug!(%path, "run configuration read");
        Ok(config)
    }

    /// Parse the whitespace-separated `key value` input format.
    ///
    /// Keys: `directory`, `filename`, `filename_base`, `r`, `phi`, `z`, `vz`, `vrmin`, `vrmax`,
    /// `vphimin`, `vphimax`, `Nvr`, `Nvphi`, `steps_per_dt`, `number_of_cycles`,
    /// `dyn_time_base`, `pattern_speed`. The grid is free in `vr` and `vphi`.
    pub fn from_key_value_str(content: &str) -> Result<Self, BibimbError> {
        let mut entries = HashMap::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tokens = line.split_whitespace();
            match (tokens.next(), tokens.next(), tokens.next()) {
                (Some(key), Some(value), None) => {
                    entries.insert(key.to_string(), value.to_string());
                }
                _ => {
                    return Err(BibimbError::FileFormat(format!(
                        "line {}: expected `key value`, got {line:?}",
                        lineno + 1
                    )))
                }
            }
        }

        let text = |key: &str| -> Result<String, BibimbError> {
            entries
                .get(key)
                .cloned()
                .ok_or_else(|| BibimbError::Configuration(format!("missing input `{key}`")))
        };
        let number = |key: &str| -> Result<f64, BibimbError> {
            let raw = text(key)?;
            raw.parse::<f64>().map_err(|e| {
                BibimbError::Configuration(format!("input `{key}` = {raw:?} is not a number: {e}"))
            })
        };
        // integers may be written as floats
        let count = |key: &str| -> Result<usize, BibimbError> {
            let v = number(key)?;
            if v < 0.0 || v.fract() != 0.0 {
                return Err(BibimbError::Configuration(format!(
                    "input `{key}` must be a non-negative integer, got {v}"
                )));
            }
            Ok(v as usize)
        };

        Ok(RunConfig {
            output_directory: Utf8PathBuf::from(text("directory")?),
            potential: Utf8PathBuf::from(text("filename")?),
            base_potential: Utf8PathBuf::from(text("filename_base")?),
            units: UnitSystem::default(),
            grid: GridConfig {
                r: CoordinateInput::Value(number("r")?),
                phi: CoordinateInput::Value(number("phi")?),
                z: CoordinateInput::Value(number("z")?),
                vr: CoordinateInput::Range {
                    min: number("vrmin")?,
                    max: number("vrmax")?,
                    n: count("Nvr")?,
                },
                vphi: CoordinateInput::Range {
                    min: number("vphimin")?,
                    max: number("vphimax")?,
                    n: count("Nvphi")?,
                },
                vz: CoordinateInput::Value(number("vz")?),
            },
            integration: IntegrationConfig {
                steps_per_dt: count("steps_per_dt")?,
                number_of_cycles: count("number_of_cycles")?,
                dyn_time_base: number("dyn_time_base")?,
                pattern_speed: number("pattern_speed")?,
                max_step: None,
            },
            df: QuasiIsothermalParams::default(),
            histogram: HistogramConfig::default(),
        })
    }

    pub fn initial_conditions(&self) -> Result<InitialConditionGrid, BibimbError> {
        Ok(InitialConditionGrid::new(&self.grid.to_spec()?))
    }

    pub fn integration_params(&self) -> Result<IntegrationParams, BibimbError> {
        self.integration.to_params()
    }

    /// `BackwardsIntegration_R{r}_Phi{phi}_Time{T}_Omega{omega}`, `T` rounded to 2 decimals.
    pub fn output_name(&self) -> String {
        let label = |c: &CoordinateInput| match c {
            CoordinateInput::Value(v) => format!("{v:?}"),
            _ => "grid".to_string(),
        };
        let time = (self.integration.total_time() * 100.0).round() / 100.0;
        format!(
            "BackwardsIntegration_R{}_Phi{}_Time{time:?}_Omega{:?}",
            label(&self.grid.r),
            label(&self.grid.phi),
            self.integration.pattern_speed
        )
    }

    /// Prefix of every output file of the run.
    pub fn output_prefix(&self) -> Utf8PathBuf {
        self.output_directory.join(self.output_name())
    }
}
