//! # Orbit integration
//!
//! [`OrbitIntegrator`] is the seam between the pipeline and the numerical orbit integration.
//! Any integrator can be plugged in; [`RungeKutta4`] is the one shipped with the crate.
//!
//! ## Rotating frame
//!
//! Orbits are integrated in a frame rotating at `pattern_speed` (`ω`) about `z`, where a bar
//! potential is static. States passed in and returned are expressed in the **rotating axes
//! with inertial velocity components** (the convention of
//! [`FrameTransform`](crate::frame::FrameTransform)), so a pure rotation maps them to the
//! inertial frame. Internally the velocity relative to the rotating frame,
//! `v_rot = v − Ω × r`, is integrated with
//!
//! ```text
//! dr/dt     = v_rot
//! dv_rot/dt = −∇Φ(r, t) − 2 Ω × v_rot − Ω × (Ω × r)
//! ```
//!
//! ## Sampling
//!
//! `n_snapshots` states are returned per particle, evenly spaced in time from `t_start` to
//! `t_start + duration` (both included). A negative `duration` integrates backward.
use nalgebra::Vector3;

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    bibimb_errors::BibimbError,
    constants::{PatternSpeed, Time},
    numeric::linspace,
    phase_space::PhaseSpaceState,
    potential::Potential,
};

/// Sampled orbit of one particle.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitTrajectory {
    pub times: Vec<Time>,
    pub states: Vec<PhaseSpaceState>,
}

impl OrbitTrajectory {
    /// Last sampled time and state.
    pub fn last(&self) -> Option<(Time, &PhaseSpaceState)> {
        Some((*self.times.last()?, self.states.last()?))
    }
}

pub type OrbitTrajectoryBatch = Vec<OrbitTrajectory>;

pub trait OrbitIntegrator {
    /// Integrate every initial state through `potential`.
    ///
    /// Arguments
    /// -----------------
    /// * `initial_states`: states at `t_start`, in the rotating axes.
    /// * `potential`: potential expressed in the rotating frame.
    /// * `t_start`: time of the initial states.
    /// * `duration`: signed integration time (negative: backward).
    /// * `pattern_speed`: angular speed of the rotating frame.
    /// * `n_snapshots`: number of samples per orbit, at least 2.
    ///
    /// Return
    /// ----------
    /// * One [`OrbitTrajectory`] per initial state, in the same order, or
    ///   [`BibimbError::Integration`] on numerical failure.
    fn integrate(
        &self,
        initial_states: &[PhaseSpaceState],
        potential: &dyn Potential,
        t_start: Time,
        duration: Time,
        pattern_speed: PatternSpeed,
        n_snapshots: usize,
    ) -> Result<OrbitTrajectoryBatch, BibimbError>;
}

/// Classical fourth-order Runge–Kutta with a fixed step no longer than `max_step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RungeKutta4 {
    pub max_step: Time,
}

impl Default for RungeKutta4 {
    fn default() -> Self {
        RungeKutta4 { max_step: 1e-3 }
    }
}

impl RungeKutta4 {
    pub fn new(max_step: Time) -> Self {
        RungeKutta4 { max_step }
    }

    /// Right-hand side of the rotating-frame equations of motion.
    #[inline]
    fn derivative(
        potential: &dyn Potential,
        omega: f64,
        t: Time,
        pos: &Vector3<f64>,
        vel: &Vector3<f64>,
    ) -> Vector3<f64> {
        let force = potential.acceleration(pos, t);
        Vector3::new(
            force.x + 2.0 * omega * vel.y + omega * omega * pos.x,
            force.y - 2.0 * omega * vel.x + omega * omega * pos.y,
            force.z,
        )
    }

    fn step(
        potential: &dyn Potential,
        omega: f64,
        t: Time,
        h: Time,
        pos: &mut Vector3<f64>,
        vel: &mut Vector3<f64>,
    ) {
        let k1_x = *vel;
        let k1_v = Self::derivative(potential, omega, t, pos, vel);

        let p2 = *pos + k1_x * (h * 0.5);
        let v2 = *vel + k1_v * (h * 0.5);
        let k2_x = v2;
        let k2_v = Self::derivative(potential, omega, t + 0.5 * h, &p2, &v2);

        let p3 = *pos + k2_x * (h * 0.5);
        let v3 = *vel + k2_v * (h * 0.5);
        let k3_x = v3;
        let k3_v = Self::derivative(potential, omega, t + 0.5 * h, &p3, &v3);

        let p4 = *pos + k3_x * h;
        let v4 = *vel + k3_v * h;
        let k4_x = v4;
        let k4_v = Self::derivative(potential, omega, t + h, &p4, &v4);

        *pos += (k1_x + k2_x * 2.0 + k3_x * 2.0 + k4_x) * (h / 6.0);
        *vel += (k1_v + k2_v * 2.0 + k3_v * 2.0 + k4_v) * (h / 6.0);
    }

    fn integrate_one(
        &self,
        index: usize,
        initial: &PhaseSpaceState,
        potential: &dyn Potential,
        times: &[Time],
        omega: f64,
    ) -> Result<OrbitTrajectory, BibimbError> {
        let frame_velocity = |p: &Vector3<f64>| Vector3::new(-omega * p.y, omega * p.x, 0.0);

        let mut pos = initial.position;
        let mut vel = initial.velocity - frame_velocity(&pos);
        let mut states = Vec::with_capacity(times.len());
        states.push(*initial);

        for w in times.windows(2) {
            let (t0, t1) = (w[0], w[1]);
            let n_sub = ((t1 - t0).abs() / self.max_step).ceil().max(1.0) as usize;
            let h = (t1 - t0) / n_sub as f64;

            for k in 0..n_sub {
                Self::step(potential, omega, t0 + h * k as f64, h, &mut pos, &mut vel);
            }

            let state = PhaseSpaceState::new(pos, vel + frame_velocity(&pos));
            if !state.is_finite() {
                return Err(BibimbError::Integration(format!(
                    "particle {index} diverged before t = {t1}"
                )));
            }
            states.push(state);
        }

        Ok(OrbitTrajectory {
            times: times.to_vec(),
            states,
        })
    }
}

impl OrbitIntegrator for RungeKutta4 {
    fn integrate(
        &self,
        initial_states: &[PhaseSpaceState],
        potential: &dyn Potential,
        t_start: Time,
        duration: Time,
        pattern_speed: PatternSpeed,
        n_snapshots: usize,
    ) -> Result<OrbitTrajectoryBatch, BibimbError> {
        if n_snapshots < 2 {
            return Err(BibimbError::InvalidParameter(format!(
                "at least 2 snapshots are required, got {n_snapshots}"
            )));
        }
        if !(self.max_step > 0.0) {
            return Err(BibimbError::InvalidParameter(format!(
                "max_step must be > 0, got {}",
                self.max_step
            )));
        }
        if !t_start.is_finite() || !duration.is_finite() || !pattern_speed.is_finite() {
            return Err(BibimbError::InvalidParameter(
                "integration times and pattern speed must be finite".into(),
            ));
        }
        if let Some(i) = initial_states.iter().position(|s| !s.is_finite()) {
            return Err(BibimbError::Integration(format!(
                "initial state of particle {i} is not finite"
            )));
        }

        let times = linspace(t_start, t_start + duration, n_snapshots);
        tracing::debug!(
            particles = initial_states.len(),
            t_start,
            duration,
            pattern_speed,
            n_snapshots,
            "integrating orbits"
        );

        #[cfg(feature = "progress")]
        let pb = {
            let pb = ProgressBar::new(initial_states.len() as u64);
            if let Ok(style) = ProgressStyle::with_template(
                "{bar:40.cyan/blue} {pos}/{len} ({percent:>3}%) | {per_sec} | ETA {eta_precise}",
            ) {
                pb.set_style(style);
            }
            pb
        };

        let mut batch = Vec::with_capacity(initial_states.len());
        for (i, s) in initial_states.iter().enumerate() {
            batch.push(self.integrate_one(i, s, potential, &times, pattern_speed)?);
            #[cfg(feature = "progress")]
            pb.inc(1);
        }

        #[cfg(feature = "progress")]
        pb.finish_and_clear();

        Ok(batch)
    }
}
