//! # DF accumulation on a 2D grid
//!
//! [`DfReducer`] evaluates a [`DfGenerator`] on the particles at the end of the backward
//! integration and sums the values into the bins of the two free initial-condition axes.
//!
//! Bin convention
//! -----------------
//! Bins are half-open `[e_k, e_{k+1})`, except the last one which also contains its right
//! edge. Coordinates outside the edges (or NaN) are dropped with a warning; NaN weights are
//! summed and make their bin NaN.
//!
//! Persistence
//! -----------------
//! [`DfHistogram2D::write_csv`] stores three headerless CSV files next to each other:
//! `<prefix><x>_edges.csv`, `<prefix><y>_edges.csv` (one edge per line) and `<prefix>dfsum.csv`
//! (one row per `x` bin, one column per `y` bin).
use std::fs::File;

use camino::{Utf8Path, Utf8PathBuf};
use nalgebra::DMatrix;

use crate::{
    bibimb_errors::BibimbError, distribution::DfGenerator, numeric::is_strictly_increasing,
    numeric::linspace, phase_space::PhaseSpaceState,
};

/// How the bins of one axis are laid out.
#[derive(Debug, Clone, PartialEq)]
pub enum BinSpec {
    /// The grid samples themselves are the edges: `n` samples give `n − 1` bins.
    SampleEdges(Vec<f64>),
    /// One bin centred on each sample, edges halfway between samples.
    SampleCenters(Vec<f64>),
    /// Explicit edges.
    Edges(Vec<f64>),
    /// `count` bins of equal width between `min` and `max`.
    Uniform { min: f64, max: f64, count: usize },
}

impl BinSpec {
    /// Bin edges, strictly increasing with at least two entries.
    pub fn edges(&self) -> Result<Vec<f64>, BibimbError> {
        let edges = match self {
            BinSpec::SampleEdges(e) | BinSpec::Edges(e) => e.clone(),
            BinSpec::SampleCenters(c) => centers_to_edges(c)?,
            BinSpec::Uniform { min, max, count } => {
                if *count == 0 || !(min < max) {
                    return Err(BibimbError::Configuration(format!(
                        "uniform bins need count > 0 and min < max, got {count} in [{min}, {max}]"
                    )));
                }
                linspace(*min, *max, count + 1)
            }
        };
        if edges.len() < 2 || !is_strictly_increasing(&edges) {
            return Err(BibimbError::Configuration(format!(
                "bin edges must be strictly increasing with at least two entries, got {edges:?}"
            )));
        }
        Ok(edges)
    }
}

/// A single sample gets a bin of unit width.
fn centers_to_edges(centers: &[f64]) -> Result<Vec<f64>, BibimbError> {
    match centers {
        [] => Err(BibimbError::Configuration("no bin centres given".into())),
        [c] => Ok(vec![c - 0.5, c + 0.5]),
        _ => {
            let n = centers.len();
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(centers[0] - 0.5 * (centers[1] - centers[0]));
            edges.extend(centers.windows(2).map(|w| 0.5 * (w[0] + w[1])));
            edges.push(centers[n - 1] + 0.5 * (centers[n - 1] - centers[n - 2]));
            Ok(edges)
        }
    }
}

/// Bin holding `v`, or `None` when `v` is outside the edges.
fn bin_index(edges: &[f64], v: f64) -> Option<usize> {
    let n_bins = edges.len() - 1;
    let j = edges.partition_point(|&e| e <= v);
    match j {
        0 => None,
        j if j <= n_bins => Some(j - 1),
        _ if v == edges[n_bins] => Some(n_bins - 1),
        _ => None,
    }
}

/// Sum `weights` into the 2D bins of `(x, y)`.
///
/// Return
/// ----------
/// * A `(x_edges.len() − 1) × (y_edges.len() − 1)` matrix, or a
///   [`BibimbError::Configuration`] when the input lengths differ or the edges are invalid.
pub fn binned_sum_2d(
    x: &[f64],
    y: &[f64],
    weights: &[f64],
    x_edges: &[f64],
    y_edges: &[f64],
) -> Result<DMatrix<f64>, BibimbError> {
    if x.len() != y.len() || x.len() != weights.len() {
        return Err(BibimbError::Configuration(format!(
            "binned sum needs equal lengths, got x: {}, y: {}, weights: {}",
            x.len(),
            y.len(),
            weights.len()
        )));
    }
    for edges in [x_edges, y_edges] {
        if edges.len() < 2 || !is_strictly_increasing(edges) {
            return Err(BibimbError::Configuration(format!(
                "bin edges must be strictly increasing with at least two entries, got {edges:?}"
            )));
        }
    }

    let mut sums = DMatrix::zeros(x_edges.len() - 1, y_edges.len() - 1);
    let mut dropped = 0usize;
    for ((&xv, &yv), &w) in x.iter().zip(y).zip(weights) {
        match (bin_index(x_edges, xv), bin_index(y_edges, yv)) {
            (Some(i), Some(j)) => sums[(i, j)] += w,
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::warn!(dropped, total = x.len(), "particles outside the histogram range");
    }
    Ok(sums)
}

/// Summed DF on a 2D grid, with its edges.
#[derive(Debug, Clone, PartialEq)]
pub struct DfHistogram2D {
    pub values: DMatrix<f64>,
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
    pub x_name: String,
    pub y_name: String,
}

impl DfHistogram2D {
    /// `(x bins, y bins)`.
    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    /// Sum over every bin.
    pub fn total(&self) -> f64 {
        self.values.sum()
    }

    pub fn x_centers(&self) -> Vec<f64> {
        self.x_edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    pub fn y_centers(&self) -> Vec<f64> {
        self.y_edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    /// Paths of the x-edges, y-edges and sum files for `prefix`.
    pub fn csv_paths(
        prefix: &Utf8Path,
        x_name: &str,
        y_name: &str,
    ) -> (Utf8PathBuf, Utf8PathBuf, Utf8PathBuf) {
        let with = |suffix: &str| Utf8PathBuf::from(format!("{prefix}{suffix}"));
        (
            with(&format!("{x_name}_edges.csv")),
            with(&format!("{y_name}_edges.csv")),
            with("dfsum.csv"),
        )
    }

    /// Write the three arrays, returning the paths written.
    pub fn write_csv(&self, prefix: &Utf8Path) -> Result<[Utf8PathBuf; 3], BibimbError> {
        let (xp, yp, sp) = Self::csv_paths(prefix, &self.x_name, &self.y_name);
        write_column(&xp, &self.x_edges)?;
        write_column(&yp, &self.y_edges)?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(File::create(&sp)?);
        for row in self.values.row_iter() {
            wtr.write_record(row.iter().map(|v| v.to_string()))?;
        }
        wtr.flush()?;

        tracing::info!(%sp, "stored DF histogram");
        Ok([xp, yp, sp])
    }

    /// Read back the arrays written by [`DfHistogram2D::write_csv`].
    pub fn read_csv(prefix: &Utf8Path, x_name: &str, y_name: &str) -> Result<Self, BibimbError> {
        let (xp, yp, sp) = Self::csv_paths(prefix, x_name, y_name);
        let x_edges = read_rows(&xp)?.into_iter().flatten().collect::<Vec<_>>();
        let y_edges = read_rows(&yp)?.into_iter().flatten().collect::<Vec<_>>();
        let rows = read_rows(&sp)?;

        let (nx, ny) = (x_edges.len().saturating_sub(1), y_edges.len().saturating_sub(1));
        if rows.len() != nx || rows.iter().any(|r| r.len() != ny) {
            return Err(BibimbError::FileFormat(format!(
                "{sp}: expected {nx}×{ny} values matching the edge files"
            )));
        }
        Ok(DfHistogram2D {
            values: DMatrix::from_fn(nx, ny, |i, j| rows[i][j]),
            x_edges,
            y_edges,
            x_name: x_name.to_string(),
            y_name: y_name.to_string(),
        })
    }
}

fn write_column(path: &Utf8Path, values: &[f64]) -> Result<(), BibimbError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(File::create(path)?);
    for v in values {
        wtr.write_record([v.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

fn read_rows(path: &Utf8Path) -> Result<Vec<Vec<f64>>, BibimbError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|field| {
                field.trim().parse::<f64>().map_err(|e| {
                    BibimbError::FileFormat(format!("{path}: invalid number {field:?}: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }
    Ok(rows)
}

/// Evaluates the DF of the final states and sums it on the grid of the initial conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct DfReducer {
    x_name: String,
    y_name: String,
}

impl Default for DfReducer {
    fn default() -> Self {
        DfReducer::new("x", "y")
    }
}

impl DfReducer {
    /// Axis names are only used to label the output files.
    pub fn new(x_name: impl Into<String>, y_name: impl Into<String>) -> Self {
        DfReducer {
            x_name: x_name.into(),
            y_name: y_name.into(),
        }
    }

    /// Evaluate `df_generator` on `states` and sum the values into the bins of
    /// `(axis1, axis2)`, the initial-condition coordinates of each state.
    pub fn reduce(
        &self,
        states: &[PhaseSpaceState],
        df_generator: &dyn DfGenerator,
        axis1: &[f64],
        axis2: &[f64],
        bins_x: &BinSpec,
        bins_y: &BinSpec,
    ) -> Result<DfHistogram2D, BibimbError> {
        let df_values = df_generator.evaluate(states)?;
        if df_values.len() != states.len() {
            return Err(BibimbError::Configuration(format!(
                "DF generator returned {} values for {} particles",
                df_values.len(),
                states.len()
            )));
        }
        self.reduce_values(&df_values, axis1, axis2, bins_x, bins_y)
    }

    /// Same as [`DfReducer::reduce`] with the DF values already computed.
    pub fn reduce_values(
        &self,
        df_values: &[f64],
        axis1: &[f64],
        axis2: &[f64],
        bins_x: &BinSpec,
        bins_y: &BinSpec,
    ) -> Result<DfHistogram2D, BibimbError> {
        let x_edges = bins_x.edges()?;
        let y_edges = bins_y.edges()?;
        let values = binned_sum_2d(axis1, axis2, df_values, &x_edges, &y_edges)?;
        tracing::debug!(shape = ?values.shape(), "reduced DF on grid");
        Ok(DfHistogram2D {
            values,
            x_edges,
            y_edges,
            x_name: self.x_name.clone(),
            y_name: self.y_name.clone(),
        })
    }
}
