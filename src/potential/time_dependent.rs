//! Time-dependent potentials.
//!
//! * [`ScaledPotential`] – a component whose mass and size follow a [`GrowthTable`]:
//!   `Φ(x, t) = (m(t) / s(t)) · Φ0(x / s(t))`, the potential of the same density profile with
//!   its mass multiplied by `m` and its length scale by `s`.
//! * [`EvolvingPotential`] – a sequence of snapshot potentials at increasing times,
//!   interpolated linearly between consecutive snapshots (or held piecewise constant).
use nalgebra::Vector3;

use crate::{
    bibimb_errors::BibimbError, constants::Time, growth_curve::GrowthTable,
    numeric::is_strictly_increasing,
};

use super::Potential;

#[derive(Debug)]
pub struct ScaledPotential {
    inner: Box<dyn Potential>,
    table: GrowthTable,
}

impl ScaledPotential {
    pub fn new(inner: Box<dyn Potential>, table: GrowthTable) -> Self {
        ScaledPotential { inner, table }
    }

    pub fn table(&self) -> &GrowthTable {
        &self.table
    }
}

impl Potential for ScaledPotential {
    fn value(&self, pos: &Vector3<f64>, t: Time) -> f64 {
        let (m, s) = self.table.scale_at(t);
        if m == 0.0 {
            return 0.0;
        }
        m / s * self.inner.value(&(pos / s), t)
    }

    fn acceleration(&self, pos: &Vector3<f64>, t: Time) -> Vector3<f64> {
        let (m, s) = self.table.scale_at(t);
        if m == 0.0 {
            return Vector3::zeros();
        }
        self.inner.acceleration(&(pos / s), t) * (m / (s * s))
    }

    fn is_time_dependent(&self) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct EvolvingPotential {
    times: Vec<Time>,
    snapshots: Vec<Box<dyn Potential>>,
    interp_linear: bool,
}

impl EvolvingPotential {
    /// Build from `(time, potential)` pairs.
    ///
    /// Return
    /// ----------
    /// * [`BibimbError::Configuration`] when no snapshot is given or the times are not
    ///   strictly increasing.
    pub fn new(
        snapshots: Vec<(Time, Box<dyn Potential>)>,
        interp_linear: bool,
    ) -> Result<Self, BibimbError> {
        if snapshots.is_empty() {
            return Err(BibimbError::Configuration(
                "evolving potential needs at least one snapshot".into(),
            ));
        }
        let (times, snapshots): (Vec<_>, Vec<_>) = snapshots.into_iter().unzip();
        if !is_strictly_increasing(&times) {
            return Err(BibimbError::Configuration(
                "evolving potential timestamps must be strictly increasing".into(),
            ));
        }
        Ok(EvolvingPotential {
            times,
            snapshots,
            interp_linear,
        })
    }

    pub fn times(&self) -> &[Time] {
        &self.times
    }

    /// Snapshot indices and weights `(i, j, w)`: the value at `t` is `(1 − w)·Φi + w·Φj`.
    fn bracket(&self, t: Time) -> (usize, usize, f64) {
        let last = self.times.len() - 1;
        if t <= self.times[0] {
            return (0, 0, 0.0);
        }
        if t >= self.times[last] {
            return (last, last, 0.0);
        }
        let j = self.times.partition_point(|&ts| ts <= t);
        let i = j - 1;
        if !self.interp_linear {
            return (i, i, 0.0);
        }
        let w = (t - self.times[i]) / (self.times[j] - self.times[i]);
        (i, j, w)
    }
}

impl Potential for EvolvingPotential {
    fn value(&self, pos: &Vector3<f64>, t: Time) -> f64 {
        let (i, j, w) = self.bracket(t);
        let vi = self.snapshots[i].value(pos, t);
        if i == j {
            return vi;
        }
        (1.0 - w) * vi + w * self.snapshots[j].value(pos, t)
    }

    fn acceleration(&self, pos: &Vector3<f64>, t: Time) -> Vector3<f64> {
        let (i, j, w) = self.bracket(t);
        let ai = self.snapshots[i].acceleration(pos, t);
        if i == j {
            return ai;
        }
        ai * (1.0 - w) + self.snapshots[j].acceleration(pos, t) * w
    }

    fn is_time_dependent(&self) -> bool {
        self.snapshots.len() > 1 || self.snapshots[0].is_time_dependent()
    }
}

#[cfg(test)]
mod time_dependent_test {
    use super::super::potential_test::assert_consistent_gradient;
    use super::*;
    use crate::growth_curve::{GrowthMode, GrowthRow};
    use crate::potential::Plummer;
    use approx::assert_relative_eq;

    #[test]
    fn test_scaled_mass() {
        let table = GrowthTable::generate(10.0, GrowthMode::Linear, 3, 1.0).unwrap();
        let scaled = ScaledPotential::new(Box::new(Plummer::new(2.0, 1.0)), table);
        let pos = Vector3::new(1.0, 2.0, -0.5);

        assert_eq!(scaled.value(&pos, 0.0), 0.0);
        assert_eq!(scaled.acceleration(&pos, -5.0), Vector3::zeros());
        assert_relative_eq!(
            scaled.value(&pos, 5.0),
            Plummer::new(1.0, 1.0).value(&pos, 0.0),
            max_relative = 1e-14
        );
        assert!(scaled.is_time_dependent());
        assert_consistent_gradient(&scaled, pos, 7.3);
    }

    #[test]
    fn test_scaled_radius() {
        // a Plummer sphere stretched by s is the Plummer sphere with scale radius s·b
        let rows = vec![
            GrowthRow {
                time: 0.0,
                mass_scale: 1.0,
                radius_scale: 2.0,
            },
            GrowthRow {
                time: 1.0,
                mass_scale: 1.0,
                radius_scale: 2.0,
            },
        ];
        let table = GrowthTable::new(rows).unwrap();
        let scaled = ScaledPotential::new(Box::new(Plummer::new(3.0, 0.5)), table);
        let pos = Vector3::new(0.7, -0.1, 0.2);
        assert_relative_eq!(
            scaled.value(&pos, 0.5),
            Plummer::new(3.0, 1.0).value(&pos, 0.5),
            max_relative = 1e-14
        );
        assert_relative_eq!(
            scaled.acceleration(&pos, 0.5),
            Plummer::new(3.0, 1.0).acceleration(&pos, 0.5),
            max_relative = 1e-14
        );
    }

    #[test]
    fn test_evolving_interpolation() {
        let evolving = EvolvingPotential::new(
            vec![
                (0.0, Box::new(Plummer::new(1.0, 1.0)) as Box<dyn Potential>),
                (2.0, Box::new(Plummer::new(3.0, 1.0))),
            ],
            true,
        )
        .unwrap();
        let pos = Vector3::new(1.0, 0.0, 0.0);
        let p1 = Plummer::new(1.0, 1.0).value(&pos, 0.0);

        assert_relative_eq!(evolving.value(&pos, -1.0), p1);
        assert_relative_eq!(evolving.value(&pos, 1.0), 2.0 * p1, max_relative = 1e-14);
        assert_relative_eq!(evolving.value(&pos, 5.0), 3.0 * p1, max_relative = 1e-14);
        assert!(evolving.is_time_dependent());
        assert_consistent_gradient(&evolving, pos, 0.4);
    }

    #[test]
    fn test_evolving_piecewise_constant() {
        let evolving = EvolvingPotential::new(
            vec![
                (0.0, Box::new(Plummer::new(1.0, 1.0)) as Box<dyn Potential>),
                (2.0, Box::new(Plummer::new(3.0, 1.0))),
            ],
            false,
        )
        .unwrap();
        let pos = Vector3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(
            evolving.value(&pos, 1.9),
            Plummer::new(1.0, 1.0).value(&pos, 0.0)
        );
    }

    #[test]
    fn test_evolving_rejects_unsorted() {
        let err = EvolvingPotential::new(
            vec![
                (1.0, Box::new(Plummer::new(1.0, 1.0)) as Box<dyn Potential>),
                (1.0, Box::new(Plummer::new(3.0, 1.0))),
            ],
            true,
        )
        .unwrap_err();
        assert!(matches!(err, BibimbError::Configuration(_)));
        assert!(EvolvingPotential::new(vec![], true).is_err());
    }
}
