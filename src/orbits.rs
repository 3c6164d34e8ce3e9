//! # Backward integration of a batch of particles
//!
//! [`OrbitBackIntegrator`] ties an [`OrbitIntegrator`] to a set of [`IntegrationParams`]:
//!
//! 1. integrate every particle from `t_start` back to `t_start − total_time` in the frame
//!    rotating at `pattern_speed` (a negative `total_time` integrates forward),
//! 2. keep the last sampled state of each particle,
//! 3. rotate it to the inertial frame with the time origin at `t_start`.
//!
//! Output order and count always match the input.
//!
//! Example
//! -----------------
//! ```rust,no_run
//! use bibimb::prelude::*;
//!
//! # fn main() -> Result<(), BibimbError> {
//! let params = IntegrationParams::builder()
//!     .t_start(2.5)
//!     .total_time(2.5)
//!     .pattern_speed(-40.0)
//!     .n_snapshots(101)
//!     .build()?;
//!
//! let potential = Logarithmic::new(220.0, 0.5, 0.9);
//! let states = vec![PhaseSpaceState::from_array([8.0, 0.0, 0.0, 0.0, -220.0, 0.0])];
//!
//! let back = OrbitBackIntegrator::new(RungeKutta4::default(), params);
//! let inertial = back.run(&states, &potential)?;
//! assert_eq!(inertial.len(), 1);
//! # Ok(())
//! # }
//! ```
use crate::{
    bibimb_errors::BibimbError,
    constants::{PatternSpeed, Time},
    distribution::DfGenerator,
    frame::FrameTransform,
    integrator::{OrbitIntegrator, OrbitTrajectoryBatch},
    phase_space::PhaseSpaceState,
    potential::Potential,
};

/// Relative spread allowed between the final times of the orbits of one batch.
const FINAL_TIME_TOLERANCE: f64 = 1e-12;

/// Times and frame of one backward integration.
///
/// Build with [`IntegrationParams::builder`] to get the values validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationParams {
    /// Time of the present-day states.
    pub t_start: Time,
    /// Length of the integration: positive integrates backward, negative forward.
    pub total_time: Time,
    /// Angular speed of the rotating frame (negative: prograde).
    pub pattern_speed: PatternSpeed,
    /// Samples per orbit, including both ends.
    pub n_snapshots: usize,
}

impl Default for IntegrationParams {
    fn default() -> Self {
        IntegrationParams {
            t_start: 0.0,
            total_time: 1.0,
            pattern_speed: 0.0,
            n_snapshots: 2,
        }
    }
}

impl IntegrationParams {
    pub fn builder() -> IntegrationParamsBuilder {
        IntegrationParamsBuilder::new()
    }

    /// Time of the last snapshot, `t_start − total_time`.
    pub fn t_end(&self) -> Time {
        self.t_start - self.total_time
    }
}

/// Builder for [`IntegrationParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct IntegrationParamsBuilder {
    params: IntegrationParams,
}

impl IntegrationParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn t_start(mut self, v: Time) -> Self {
        self.params.t_start = v;
        self
    }
    pub fn total_time(mut self, v: Time) -> Self {
        self.params.total_time = v;
        self
    }
    pub fn pattern_speed(mut self, v: PatternSpeed) -> Self {
        self.params.pattern_speed = v;
        self
    }
    pub fn n_snapshots(mut self, v: usize) -> Self {
        self.params.n_snapshots = v;
        self
    }

    /// Finalize the builder.
    ///
    /// Validation rules
    /// -----------------
    /// * `t_start` and `pattern_speed` finite.
    /// * `total_time` finite and non-zero (negative: forward integration).
    /// * `n_snapshots ≥ 2`.
    pub fn build(self) -> Result<IntegrationParams, BibimbError> {
        let p = self.params;
        if !p.t_start.is_finite() || !p.pattern_speed.is_finite() {
            return Err(BibimbError::InvalidParameter(
                "t_start and pattern_speed must be finite".into(),
            ));
        }
        if !p.total_time.is_finite() || p.total_time == 0.0 {
            return Err(BibimbError::InvalidParameter(format!(
                "total_time must be finite and non-zero, got {}",
                p.total_time
            )));
        }
        if p.n_snapshots < 2 {
            return Err(BibimbError::InvalidParameter(format!(
                "n_snapshots must be ≥ 2, got {}",
                p.n_snapshots
            )));
        }
        Ok(p)
    }
}

/// Result of [`OrbitBackIntegrator::run_backward_integration`].
#[derive(Debug, Clone, PartialEq)]
pub struct BackIntegrationResult {
    /// DF of each particle at the end of the backward integration.
    pub df_values: Vec<f64>,
    /// Sampled times, shared by every orbit.
    pub times: Vec<Time>,
    /// Full orbits, in the rotating frame.
    pub orbits: OrbitTrajectoryBatch,
}

#[derive(Debug, Clone)]
pub struct OrbitBackIntegrator<I: OrbitIntegrator> {
    integrator: I,
    params: IntegrationParams,
}

impl<I: OrbitIntegrator> OrbitBackIntegrator<I> {
    pub fn new(integrator: I, params: IntegrationParams) -> Self {
        OrbitBackIntegrator { integrator, params }
    }

    pub fn params(&self) -> &IntegrationParams {
        &self.params
    }

    pub fn frame(&self) -> FrameTransform {
        FrameTransform::new(self.params.pattern_speed).with_time_origin(self.params.t_start)
    }

    /// Integrate `states` backward, returning the full orbits in the rotating frame.
    pub fn integrate_backwards(
        &self,
        states: &[PhaseSpaceState],
        potential: &dyn Potential,
    ) -> Result<OrbitTrajectoryBatch, BibimbError> {
        let p = &self.params;
        self.integrator.integrate(
            states,
            potential,
            p.t_start,
            -p.total_time,
            p.pattern_speed,
            p.n_snapshots,
        )
    }

    /// Inertial-frame states at the end of the backward integration.
    ///
    /// Return
    /// ----------
    /// * One state per input state, in the same order.
    pub fn run(
        &self,
        states: &[PhaseSpaceState],
        potential: &dyn Potential,
    ) -> Result<Vec<PhaseSpaceState>, BibimbError> {
        let orbits = self.integrate_backwards(states, potential)?;
        self.final_inertial_states(&orbits, states.len())
    }

    /// Integrate backward and evaluate `df` on the final inertial states.
    pub fn run_backward_integration(
        &self,
        states: &[PhaseSpaceState],
        potential: &dyn Potential,
        df: &dyn DfGenerator,
    ) -> Result<BackIntegrationResult, BibimbError> {
        let orbits = self.integrate_backwards(states, potential)?;
        let finals = self.final_inertial_states(&orbits, states.len())?;
        let df_values = df.evaluate(&finals)?;
        if df_values.len() != finals.len() {
            return Err(BibimbError::Configuration(format!(
                "DF generator returned {} values for {} particles",
                df_values.len(),
                finals.len()
            )));
        }
        let times = orbits.first().map(|o| o.times.clone()).unwrap_or_default();
        Ok(BackIntegrationResult {
            df_values,
            times,
            orbits,
        })
    }

    fn final_inertial_states(
        &self,
        orbits: &OrbitTrajectoryBatch,
        expected: usize,
    ) -> Result<Vec<PhaseSpaceState>, BibimbError> {
        if orbits.len() != expected {
            return Err(BibimbError::Integration(format!(
                "integrator returned {} orbits for {expected} particles",
                orbits.len()
            )));
        }
        if orbits.is_empty() {
            return Ok(Vec::new());
        }

        let mut t_last: Option<Time> = None;
        let last = orbits
            .iter()
            .enumerate()
            .map(|(i, o)| {
                let (t, s) = o.last().ok_or_else(|| {
                    BibimbError::Integration(format!("orbit {i} has no sampled state"))
                })?;
                match t_last {
                    None => t_last = Some(t),
                    Some(t0) if (t - t0).abs() > FINAL_TIME_TOLERANCE * (1.0 + t0.abs()) => {
                        return Err(BibimbError::Integration(format!(
                            "orbit {i} ends at t = {t}, orbit 0 at t = {t0}"
                        )));
                    }
                    Some(_) => {}
                }
                Ok(*s)
            })
            .collect::<Result<Vec<_>, BibimbError>>()?;
        let t_last = t_last.unwrap_or(self.params.t_end());

        tracing::debug!(particles = last.len(), t_last, "rotating final states to inertial frame");
        Ok(self.frame().to_inertial(t_last, &last))
    }
}

#[cfg(test)]
mod orbits_test {
    use super::*;
    use crate::{
        initial_conditions::cylindrical_to_cartesian,
        integrator::{OrbitTrajectory, RungeKutta4},
        potential::{Logarithmic, Plummer},
    };
    use approx::assert_relative_eq;

    fn params(pattern_speed: f64) -> IntegrationParams {
        IntegrationParams::builder()
            .t_start(0.5)
            .total_time(0.5)
            .pattern_speed(pattern_speed)
            .n_snapshots(11)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_validation() {
        assert!(IntegrationParams::builder().n_snapshots(1).build().is_err());
        assert!(IntegrationParams::builder().total_time(0.0).build().is_err());
        assert!(IntegrationParams::builder()
            .total_time(f64::NAN)
            .build()
            .is_err());
        assert!(IntegrationParams::builder()
            .pattern_speed(f64::INFINITY)
            .build()
            .is_err());
        let p = params(-30.0);
        assert_eq!(p.t_end(), 0.0);
    }

    #[test]
    fn test_integrate_backwards_times() {
        let back = OrbitBackIntegrator::new(RungeKutta4::default(), params(0.0));
        let ic = [cylindrical_to_cartesian(8., 0., 0., 0., -200., 0.)];
        let orbits = back
            .integrate_backwards(&ic, &Plummer::new(1e6, 1.0))
            .unwrap();
        assert_eq!(orbits[0].times.len(), 11);
        assert_relative_eq!(orbits[0].times[0], 0.5);
        assert_relative_eq!(orbits[0].times[10], 0.0);
    }

    #[test]
    fn test_run_preserves_order_and_count() {
        let back = OrbitBackIntegrator::new(RungeKutta4::default(), params(-25.0));
        let pot = Logarithmic::new(220.0, 0.0, 0.9);
        let ics: Vec<_> = (0..4)
            .map(|k| cylindrical_to_cartesian(4.0 + 2.0 * k as f64, 0., 0., 0., -220., 0.))
            .collect();
        let out = back.run(&ics, &pot).unwrap();
        assert_eq!(out.len(), 4);
        // circular orbits keep their radius whatever the frame
        for (k, s) in out.iter().enumerate() {
            let r0 = 4.0 + 2.0 * k as f64;
            assert_relative_eq!(s.cylindrical_radius(), r0, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_run_with_empty_batch() {
        let back = OrbitBackIntegrator::new(RungeKutta4::default(), params(-25.0));
        let out = back.run(&[], &Plummer::new(1.0, 1.0)).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_corotating_star_ends_rotated() {
        // static in the rotating frame, so in the inertial frame it has turned by ω·(t_end − t0)
        let pot = Logarithmic::new(200.0, 0.0, 1.0);
        let r = 5.0;
        let omega = -200.0 / r;
        let back = OrbitBackIntegrator::new(RungeKutta4::new(1e-4), params(omega));
        let ic = [cylindrical_to_cartesian(r, 0., 0., 0., omega * r, 0.)];
        let end = back.run(&ic, &pot).unwrap()[0];
        let turned = (omega * -0.5).to_degrees();
        let expected = cylindrical_to_cartesian(r, turned, 0., 0., omega * r, 0.);
        assert!((end.position - expected.position).norm() < 1e-6);
        assert!((end.velocity - expected.velocity).norm() < 1e-4);
    }

    #[test]
    fn test_run_backward_integration() {
        let back = OrbitBackIntegrator::new(RungeKutta4::default(), params(0.0));
        let ics = [
            cylindrical_to_cartesian(8., 0., 0., 0., -200., 0.),
            cylindrical_to_cartesian(7., 0., 0., 10., -190., 0.),
        ];
        let radius = |s: &[PhaseSpaceState]| -> Result<Vec<f64>, BibimbError> {
            Ok(s.iter().map(|p| p.cylindrical_radius()).collect())
        };
        let res = back
            .run_backward_integration(&ics, &Logarithmic::new(200.0, 0.0, 1.0), &radius)
            .unwrap();
        assert_eq!(res.df_values.len(), 2);
        assert_eq!(res.times.len(), 11);
        assert_eq!(res.orbits.len(), 2);
        assert_relative_eq!(res.df_values[0], 8.0, max_relative = 1e-6);
    }

    #[test]
    fn test_df_length_mismatch() {
        let back = OrbitBackIntegrator::new(RungeKutta4::default(), params(0.0));
        let ics = [cylindrical_to_cartesian(8., 0., 0., 0., -200., 0.)];
        let wrong = |_: &[PhaseSpaceState]| -> Result<Vec<f64>, BibimbError> { Ok(vec![]) };
        let err = back
            .run_backward_integration(&ics, &Plummer::new(1e6, 1.0), &wrong)
            .unwrap_err();
        assert!(matches!(err, BibimbError::Configuration(_)));
    }

    #[test]
    fn test_integrator_errors_propagate() {
        struct Failing;
        impl OrbitIntegrator for Failing {
            fn integrate(
                &self,
                _: &[PhaseSpaceState],
                _: &dyn Potential,
                _: Time,
                _: Time,
                _: PatternSpeed,
                _: usize,
            ) -> Result<OrbitTrajectoryBatch, BibimbError> {
                Err(BibimbError::Integration("boom".into()))
            }
        }
        let back = OrbitBackIntegrator::new(Failing, params(0.0));
        let ics = [cylindrical_to_cartesian(8., 0., 0., 0., -200., 0.)];
        assert_eq!(
            back.run(&ics, &Plummer::new(1.0, 1.0)).unwrap_err(),
            BibimbError::Integration("boom".into())
        );

        struct Short;
        impl OrbitIntegrator for Short {
            fn integrate(
                &self,
                _: &[PhaseSpaceState],
                _: &dyn Potential,
                _: Time,
                _: Time,
                _: PatternSpeed,
                _: usize,
            ) -> Result<OrbitTrajectoryBatch, BibimbError> {
                Ok(vec![OrbitTrajectory {
                    times: vec![],
                    states: vec![],
                }])
            }
        }
        let back = OrbitBackIntegrator::new(Short, params(0.0));
        assert!(back.run(&ics, &Plummer::new(1.0, 1.0)).is_err());
    }

    #[test]
    fn test_negative_total_time_integrates_forward() {
        let p = IntegrationParams::builder()
            .t_start(0.0)
            .total_time(-0.05)
            .n_snapshots(3)
            .build()
            .unwrap();
        assert_eq!(p.t_end(), 0.05);

        let back = OrbitBackIntegrator::new(RungeKutta4::default(), p);
        let ic = [cylindrical_to_cartesian(8., 0., 0., 0., -200., 0.)];
        let pot = Logarithmic::new(200.0, 0.0, 1.0);
        let orbits = back.integrate_backwards(&ic, &pot).unwrap();
        assert_eq!(orbits[0].times, vec![0.0, 0.025, 0.05]);

        // a prograde circular orbit turns clockwise forward in time, here by 1.25 rad
        let end = back.run(&ic, &pot).unwrap()[0];
        assert_relative_eq!(end.cylindrical_radius(), 8.0, max_relative = 1e-6);
        assert!(end.azimuth() < 0.0);
    }

    #[test]
    fn test_mismatched_final_times_rejected() {
        struct Ragged;
        impl OrbitIntegrator for Ragged {
            fn integrate(
                &self,
                initial_states: &[PhaseSpaceState],
                _: &dyn Potential,
                t_start: Time,
                duration: Time,
                _: PatternSpeed,
                _: usize,
            ) -> Result<OrbitTrajectoryBatch, BibimbError> {
                Ok(initial_states
                    .iter()
                    .enumerate()
                    .map(|(i, s)| OrbitTrajectory {
                        times: vec![t_start, t_start + duration * (1.0 + i as f64)],
                        states: vec![*s, *s],
                    })
                    .collect())
            }
        }
        let ics = [
            cylindrical_to_cartesian(8., 0., 0., 0., -200., 0.),
            cylindrical_to_cartesian(7., 0., 0., 0., -200., 0.),
        ];
        let back = OrbitBackIntegrator::new(Ragged, params(-20.0));
        assert!(matches!(
            back.run(&ics, &Plummer::new(1.0, 1.0)),
            Err(BibimbError::Integration(_))
        ));
        // a single orbit has nothing to disagree with
        assert!(back.run(&ics[..1], &Plummer::new(1.0, 1.0)).is_ok());
    }
}
