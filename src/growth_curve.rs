//! # Growth curves for time-dependent potentials
//!
//! A [`GrowthTable`] is an ordered list of rows `(time, mass_scale, radius_scale)` with strictly
//! increasing time. It parametrizes the amplitude of a perturbation (typically a bar) that is
//! switched on smoothly; [`ScaledPotential`](crate::potential::time_dependent::ScaledPotential)
//! interpolates it at every force evaluation.
//!
//! ## Profiles
//!
//! [`GrowthTable::generate`] samples `nodes` times evenly over `[0, tf]` (rows are always sorted
//! by increasing time, whatever the sign of `tf`) and fills the mass column with one of:
//!
//! * [`GrowthMode::Linear`] – ramp from `0` to `amplitude`,
//! * [`GrowthMode::Exponential`] – `amplitude · 10^e` with `e` evenly spaced over `[−10, 0]`,
//! * [`GrowthMode::Dehnen`] – the quintic ease-in/ease-out of Dehnen (2000):
//!   with `u = 2t/tf − 1`,
//!   `amplitude · (3/16·u⁵ − 5/8·u³ + 15/16·u + 1/2)`.
//!
//! The radius column is set to `1`.
//!
//! ## Reversal
//!
//! Integrating backward through a growth turns it into a decay. [`GrowthTable::reverse`] keeps
//! the time column and reads the mass/radius columns in reverse row order. The result has the
//! same number of rows as the input.
//!
//! ## File format
//!
//! ```text
//! # time mass_scale radius_scale
//! 0 0 1
//! 5 0.5 1
//! 10 1 1
//! ```
//!
//! Lines starting with `#` and blank lines are ignored on read; values are separated by
//! whitespace.
use std::{fmt, fs, str::FromStr};

use camino::Utf8Path;
use nom::{
    character::complete::{multispace0, space1},
    combinator::all_consuming,
    number::complete::double,
    sequence::{preceded, terminated},
    IResult, Parser,
};

use crate::{
    bibimb_errors::BibimbError,
    constants::Time,
    numeric::{is_strictly_increasing, linspace, logspace},
};

/// Number of decades spanned by the exponential profile.
const EXPONENTIAL_DECADES: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthMode {
    Linear,
    Exponential,
    Dehnen,
}

impl FromStr for GrowthMode {
    type Err = BibimbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(GrowthMode::Linear),
            "exponential" => Ok(GrowthMode::Exponential),
            "dehnen" => Ok(GrowthMode::Dehnen),
            _ => Err(BibimbError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for GrowthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GrowthMode::Linear => "linear",
            GrowthMode::Exponential => "exponential",
            GrowthMode::Dehnen => "dehnen",
        };
        f.write_str(name)
    }
}

/// Dehnen (2000) quintic switch, `u ∈ [−1, 1]` mapped onto `[0, 1]`.
pub fn dehnen_profile(u: f64) -> f64 {
    3.0 / 16.0 * u.powi(5) - 5.0 / 8.0 * u.powi(3) + 15.0 / 16.0 * u + 0.5
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthRow {
    pub time: Time,
    pub mass_scale: f64,
    pub radius_scale: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrowthTable {
    rows: Vec<GrowthRow>,
}

impl GrowthTable {
    /// Wrap already computed rows.
    ///
    /// Return
    /// ----------
    /// * [`BibimbError::Configuration`] if the table is empty or its time column is not
    ///   strictly increasing.
    pub fn new(rows: Vec<GrowthRow>) -> Result<Self, BibimbError> {
        Self::check_rows(&rows).map_err(BibimbError::Configuration)?;
        Ok(GrowthTable { rows })
    }

    fn check_rows(rows: &[GrowthRow]) -> Result<(), String> {
        if rows.is_empty() {
            return Err("growth table has no rows".into());
        }
        let times: Vec<f64> = rows.iter().map(|r| r.time).collect();
        if !is_strictly_increasing(&times) {
            return Err("growth table times must be strictly increasing".into());
        }
        Ok(())
    }

    /// Generate a growth table.
    ///
    /// Arguments
    /// -----------------
    /// * `tf`: time at the far end of the curve (either sign).
    /// * `mode`: the profile of the mass column.
    /// * `nodes`: number of rows, at least 2.
    /// * `amplitude`: final value of the profile.
    ///
    /// Return
    /// ----------
    /// * The table sorted by increasing time, or [`BibimbError::Configuration`] when
    ///   `nodes < 2` or `tf` is zero or not finite.
    pub fn generate(
        tf: Time,
        mode: GrowthMode,
        nodes: usize,
        amplitude: f64,
    ) -> Result<Self, BibimbError> {
        if nodes < 2 {
            return Err(BibimbError::Configuration(format!(
                "growth table needs at least 2 nodes, got {nodes}"
            )));
        }
        if tf == 0.0 || !tf.is_finite() {
            return Err(BibimbError::Configuration(format!(
                "growth table end time must be finite and non-zero, got {tf}"
            )));
        }

        let times = linspace(0.0, tf, nodes);
        let scales: Vec<f64> = match mode {
            GrowthMode::Linear => linspace(0.0, amplitude, nodes),
            GrowthMode::Exponential => logspace(-EXPONENTIAL_DECADES, 0.0, nodes)
                .into_iter()
                .map(|s| amplitude * s)
                .collect(),
            GrowthMode::Dehnen => times
                .iter()
                .map(|t| amplitude * dehnen_profile(2.0 * t / tf - 1.0))
                .collect(),
        };

        let mut rows: Vec<GrowthRow> = times
            .into_iter()
            .zip(scales)
            .map(|(time, mass_scale)| GrowthRow {
                time,
                mass_scale,
                radius_scale: 1.0,
            })
            .collect();

        if tf < 0.0 {
            rows.reverse();
        }

        GrowthTable::new(rows)
    }

    pub fn rows(&self) -> &[GrowthRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn times(&self) -> Vec<Time> {
        self.rows.iter().map(|r| r.time).collect()
    }

    pub fn mass_scales(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.mass_scale).collect()
    }

    pub fn radius_scales(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.radius_scale).collect()
    }

    /// Time-reversed amplitude curve: same time column, scale columns in reverse row order.
    pub fn reverse(&self) -> GrowthTable {
        let rows = self
            .rows
            .iter()
            .zip(self.rows.iter().rev())
            .map(|(row, mirrored)| GrowthRow {
                time: row.time,
                mass_scale: mirrored.mass_scale,
                radius_scale: mirrored.radius_scale,
            })
            .collect();
        GrowthTable { rows }
    }

    /// Interpolated `(mass_scale, radius_scale)` at time `t`.
    ///
    /// Linear between rows, constant beyond the first and the last row.
    pub fn scale_at(&self, t: Time) -> (f64, f64) {
        let first = self.rows[0];
        let last = self.rows[self.rows.len() - 1];
        if t <= first.time {
            return (first.mass_scale, first.radius_scale);
        }
        if t >= last.time {
            return (last.mass_scale, last.radius_scale);
        }

        // first row with time > t; 1 <= idx < len here
        let idx = self.rows.partition_point(|r| r.time <= t);
        let (a, b) = (self.rows[idx - 1], self.rows[idx]);
        let w = (t - a.time) / (b.time - a.time);
        (
            a.mass_scale + w * (b.mass_scale - a.mass_scale),
            a.radius_scale + w * (b.radius_scale - a.radius_scale),
        )
    }

    /// Render the table in its text format.
    pub fn to_text(&self) -> String {
        let mut out = String::from("# time mass_scale radius_scale\n");
        for r in &self.rows {
            out.push_str(&format!("{} {} {}\n", r.time, r.mass_scale, r.radius_scale));
        }
        out
    }

    pub fn write_file(&self, path: &Utf8Path) -> Result<(), BibimbError> {
        fs::write(path, self.to_text())?;
        tracing::debug!(%path, rows = self.len(), "growth table written");
        Ok(())
    }

    pub fn read_file(path: &Utf8Path) -> Result<Self, BibimbError> {
        fs::read_to_string(path)?.parse()
    }
}

fn parse_row(input: &str) -> IResult<&str, GrowthRow> {
    all_consuming(terminated(
        (
            preceded(multispace0, double),
            preceded(space1, double),
            preceded(space1, double),
        ),
        multispace0,
    ))
    .map(|(time, mass_scale, radius_scale)| GrowthRow {
        time,
        mass_scale,
        radius_scale,
    })
    .parse(input)
}

impl FromStr for GrowthTable {
    type Err = BibimbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rows = s
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
            .map(|line| {
                parse_row(line)
                    .map(|(_, row)| row)
                    .map_err(|_| BibimbError::FileFormat(format!("bad growth table line: {line}")))
            })
            .collect::<Result<Vec<_>, BibimbError>>()?;

        GrowthTable::check_rows(&rows).map_err(BibimbError::FileFormat)?;
        Ok(GrowthTable { rows })
    }
}

#[cfg(test)]
mod growth_curve_test {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_linear() {
        let table = GrowthTable::generate(10.0, GrowthMode::Linear, 3, 1.0).unwrap();
        assert_eq!(table.times(), vec![0., 5., 10.]);
        assert_eq!(table.mass_scales(), vec![0., 0.5, 1.]);
        assert_eq!(table.radius_scales(), vec![1., 1., 1.]);
    }

    #[test]
    fn test_exponential() {
        let table = GrowthTable::generate(4.0, GrowthMode::Exponential, 11, 2.0).unwrap();
        let m = table.mass_scales();
        assert_relative_eq!(m[0], 2e-10, max_relative = 1e-12);
        assert_relative_eq!(m[5], 2e-5, max_relative = 1e-12);
        assert_eq!(m[10], 2.0);
        assert!(is_strictly_increasing(&m));
    }

    #[test]
    fn test_dehnen() {
        let table = GrowthTable::generate(2.0, GrowthMode::Dehnen, 5, 3.0).unwrap();
        let m = table.mass_scales();
        assert_abs_diff_eq!(m[0], 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(m[2], 1.5, epsilon = 1e-15);
        assert_abs_diff_eq!(m[4], 3.0, epsilon = 1e-15);
        // symmetric around the midpoint
        assert_abs_diff_eq!(m[1] + m[3], 3.0, epsilon = 1e-14);
        assert_abs_diff_eq!(dehnen_profile(-1.0), 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(dehnen_profile(1.0), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_negative_end_time_is_sorted() {
        let table = GrowthTable::generate(-10.0, GrowthMode::Linear, 3, 1.0).unwrap();
        assert_eq!(table.times(), vec![-10., -5., 0.]);
        assert_eq!(table.mass_scales(), vec![1., 0.5, 0.]);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            "quadratic".parse::<GrowthMode>(),
            Err(BibimbError::InvalidMode(_))
        ));
        assert_eq!("Dehnen".parse::<GrowthMode>().unwrap(), GrowthMode::Dehnen);
        assert!(matches!(
            GrowthTable::generate(10.0, GrowthMode::Linear, 1, 1.0),
            Err(BibimbError::Configuration(_))
        ));
        assert!(matches!(
            GrowthTable::generate(0.0, GrowthMode::Linear, 3, 1.0),
            Err(BibimbError::Configuration(_))
        ));
    }

    #[test]
    fn test_reverse() {
        let table = GrowthTable::generate(10.0, GrowthMode::Dehnen, 7, 1.0).unwrap();
        let reversed = table.reverse();

        assert_eq!(reversed.len(), table.len());
        assert_eq!(reversed.times(), table.times());
        let mut m = table.mass_scales();
        m.reverse();
        assert_eq!(reversed.mass_scales(), m);

        // no trailing padding row: the last time is still tf
        assert_eq!(*reversed.times().last().unwrap(), 10.0);
        assert_eq!(reversed.reverse(), table);
    }

    #[test]
    fn test_scale_at() {
        let table = GrowthTable::generate(10.0, GrowthMode::Linear, 3, 1.0).unwrap();
        assert_eq!(table.scale_at(-1.0), (0.0, 1.0));
        assert_eq!(table.scale_at(2.5), (0.25, 1.0));
        assert_eq!(table.scale_at(5.0), (0.5, 1.0));
        assert_eq!(table.scale_at(7.5), (0.75, 1.0));
        assert_eq!(table.scale_at(12.0), (1.0, 1.0));
    }

    #[test]
    fn test_text_round_trip() {
        let table = GrowthTable::generate(-3.7, GrowthMode::Dehnen, 9, 0.8).unwrap();
        let text = table.to_text();
        assert!(text.starts_with('#'));
        let parsed: GrowthTable = text.parse().unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_parse_errors() {
        let bad = "# header\n0 0 1\n1 abc 1\n";
        assert!(matches!(
            bad.parse::<GrowthTable>(),
            Err(BibimbError::FileFormat(_))
        ));

        let unsorted = "# header\n0 0 1\n2 0.5 1\n1 1 1\n";
        assert!(matches!(
            unsorted.parse::<GrowthTable>(),
            Err(BibimbError::FileFormat(_))
        ));

        let missing_column = "0 0\n";
        assert!(matches!(
            missing_column.parse::<GrowthTable>(),
            Err(BibimbError::FileFormat(_))
        ));

        let tabs = "#t m r\n0\t0.0\t1.0\n1  1e-1  1\n";
        let table: GrowthTable = tabs.parse().unwrap();
        assert_eq!(table.mass_scales(), vec![0.0, 0.1]);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("growth.txt")).unwrap();
        let table = GrowthTable::generate(5.0, GrowthMode::Exponential, 6, 1.0).unwrap();
        table.write_file(&path).unwrap();
        assert_eq!(GrowthTable::read_file(&path).unwrap(), table);
    }
}
