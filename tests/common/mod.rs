#![allow(dead_code)]

use approx::assert_relative_eq;
use bibimb::prelude::*;
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// Disc + halo, axisymmetric.
pub const BASE_INI: &str = "\
[Potential disc]
type = MiyamotoNagai
mass = 6.8e10
scaleRadius = 3.0
scaleHeight = 0.28

[Potential halo]
type = Logarithmic
v0 = 150
scaleRadius = 2.0
axisRatioZ = 0.9
";

/// The base model plus a weak bar along the x axis.
pub const BAR_INI: &str = "\
[Potential disc]
type = MiyamotoNagai
mass = 6.8e10
scaleRadius = 3.0
scaleHeight = 0.28

[Potential halo]
type = Logarithmic
v0 = 150
scaleRadius = 2.0
axisRatioZ = 0.9

[Potential bar]
type = DehnenBar
strength = 800
barRadius = 3.5
barAngle = 25
";

pub fn temp_dir() -> (TempDir, Utf8PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
    (tmp, dir)
}

/// Write `base.ini`, `bar.ini` and a `run.toml` using them; returns the config path.
pub fn write_run(dir: &Utf8Path, grid: &str, integration: &str) -> Utf8PathBuf {
    std::fs::write(dir.join("base.ini"), BASE_INI).unwrap();
    std::fs::write(dir.join("bar.ini"), BAR_INI).unwrap();
    let config = format!(
        "output_directory = \"{out}\"\n\
         potential = \"{dir}/bar.ini\"\n\
         base_potential = \"{dir}/base.ini\"\n\n\
         [grid]\n{grid}\n\n[integration]\n{integration}\n",
        out = dir.join("out"),
    );
    let path = dir.join("run.toml");
    std::fs::write(&path, config).unwrap();
    path
}

pub fn assert_state_close(actual: &PhaseSpaceState, expected: &PhaseSpaceState, epsilon: f64) {
    for (a, e) in actual.to_array().iter().zip(expected.to_array()) {
        assert_relative_eq!(*a, e, epsilon = epsilon);
    }
}
