//! # Gravitational potentials
//!
//! The backward integrations only need two things from a potential: its value and its
//! acceleration at a point and a time. Both are exposed through the [`Potential`] trait, so the
//! pipeline works with any model implementing it.
//!
//! ## Provided models
//!
//! * [`analytic`] – Plummer sphere, Miyamoto–Nagai disc, logarithmic halo, NFW halo and a
//!   Dehnen (2000) quadrupole bar.
//! * [`CompositePotential`] – sum of any number of components.
//! * [`time_dependent`] – a component rescaled in mass and size by a
//!   [`GrowthTable`](crate::growth_curve::GrowthTable), and an evolving potential interpolated
//!   between snapshots.
//! * [`ini`] – the `[Potential <name>]` declaration format, turned into the models above with
//!   an explicit [`UnitSystem`](crate::constants::UnitSystem).
//!
//! All potentials are expressed in the frame they are integrated in: a bar is static in the
//! rotating frame and the integrator adds the fictitious forces.
pub mod analytic;
pub mod ini;
pub mod time_dependent;

use std::fmt;

use nalgebra::Vector3;

use crate::constants::Time;

pub use analytic::{DehnenBar, Logarithmic, MiyamotoNagai, Nfw, Plummer};
pub use time_dependent::{EvolvingPotential, ScaledPotential};

pub trait Potential: Send + Sync + fmt::Debug {
    /// Potential at `pos` and time `t`.
    fn value(&self, pos: &Vector3<f64>, t: Time) -> f64;

    /// Acceleration `−∇Φ` at `pos` and time `t`.
    fn acceleration(&self, pos: &Vector3<f64>, t: Time) -> Vector3<f64>;

    /// Whether the potential changes with time.
    fn is_time_dependent(&self) -> bool {
        false
    }

    /// Circular velocity in the `z = 0` plane at cylindrical radius `r`, along the `x` axis.
    ///
    /// Returns `0` where the radial force is repulsive.
    fn circular_velocity(&self, r: f64, t: Time) -> f64 {
        let acc = self.acceleration(&Vector3::new(r, 0.0, 0.0), t);
        (-acc.x * r).max(0.0).sqrt()
    }
}

impl<P: Potential + ?Sized> Potential for Box<P> {
    fn value(&self, pos: &Vector3<f64>, t: Time) -> f64 {
        (**self).value(pos, t)
    }

    fn acceleration(&self, pos: &Vector3<f64>, t: Time) -> Vector3<f64> {
        (**self).acceleration(pos, t)
    }

    fn is_time_dependent(&self) -> bool {
        (**self).is_time_dependent()
    }
}

/// Sum of several potentials.
#[derive(Debug, Default)]
pub struct CompositePotential {
    components: Vec<Box<dyn Potential>>,
}

impl CompositePotential {
    pub fn new(components: Vec<Box<dyn Potential>>) -> Self {
        CompositePotential { components }
    }

    pub fn push(&mut self, component: Box<dyn Potential>) {
        self.components.push(component);
    }

    pub fn with(mut self, component: impl Potential + 'static) -> Self {
        self.components.push(Box::new(component));
        self
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl Potential for CompositePotential {
    fn value(&self, pos: &Vector3<f64>, t: Time) -> f64 {
        self.components.iter().map(|c| c.value(pos, t)).sum()
    }

    fn acceleration(&self, pos: &Vector3<f64>, t: Time) -> Vector3<f64> {
        self.components
            .iter()
            .fold(Vector3::zeros(), |acc, c| acc + c.acceleration(pos, t))
    }

    fn is_time_dependent(&self) -> bool {
        self.components.iter().any(|c| c.is_time_dependent())
    }
}

#[cfg(test)]
pub(crate) mod potential_test {
    use super::*;
    use approx::assert_relative_eq;

    /// Central-difference gradient check of `acceleration` against `value`.
    pub(crate) fn assert_consistent_gradient(pot: &dyn Potential, pos: Vector3<f64>, t: Time) {
        let h = 1e-5 * (1.0 + pos.norm());
        let acc = pot.acceleration(&pos, t);
        for i in 0..3 {
            let mut p = pos;
            let mut m = pos;
            p[i] += h;
            m[i] -= h;
            let numeric = -(pot.value(&p, t) - pot.value(&m, t)) / (2.0 * h);
            assert!(
                (numeric - acc[i]).abs() <= 1e-6 * (1.0 + acc.norm()),
                "component {i}: numeric {numeric} vs analytic {} at {pos:?}",
                acc[i]
            );
        }
    }

    #[test]
    fn test_composite_sums_components() {
        let a = Plummer::new(1.0, 1.0);
        let b = Plummer::new(2.0, 0.5);
        let composite = CompositePotential::default()
            .with(Plummer::new(1.0, 1.0))
            .with(Plummer::new(2.0, 0.5));
        assert_eq!(composite.len(), 2);

        let pos = Vector3::new(0.3, -1.2, 0.4);
        assert_relative_eq!(
            composite.value(&pos, 0.0),
            a.value(&pos, 0.0) + b.value(&pos, 0.0)
        );
        assert_relative_eq!(
            composite.acceleration(&pos, 0.0),
            a.acceleration(&pos, 0.0) + b.acceleration(&pos, 0.0)
        );
        assert!(!composite.is_time_dependent());
        assert_consistent_gradient(&composite, pos, 0.0);
    }

    #[test]
    fn test_circular_velocity() {
        let log = Logarithmic::new(200.0, 0.0, 1.0);
        assert_relative_eq!(log.circular_velocity(8.0, 0.0), 200.0, max_relative = 1e-12);
    }
}
