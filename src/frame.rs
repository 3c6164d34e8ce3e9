//! # Rotating ↔ inertial frame transforms
//!
//! A rotating (bar / pattern) frame turns at constant angular speed `omega` about the `z`
//! axis. At time `t` its axes are rotated by
//!
//! ```text
//! θ(t) = omega · (t − t0)
//! ```
//!
//! with respect to the inertial axes, where `t0` is the time origin at which both frames
//! coincide. Positions and velocities given in the rotating frame are mapped to the inertial
//! frame by a rotation of `+θ` in the `(x, y)` and `(vx, vy)` planes; the inverse map uses `−θ`.
//! `z` and `vz` are never touched.
//!
//! ```text
//! to_inertial: x' = x·cos θ − y·sin θ     y' = x·sin θ + y·cos θ
//! to_rotating: x' = x·cos θ + y·sin θ     y' = −x·sin θ + y·cos θ
//! ```
//!
//! Velocities are transformed as plain vectors (no `omega × r` term): the states handled by the
//! pipeline are always expressed with inertial velocity components, the rotation only relabels
//! the axes.
//!
//! The sign of `omega` follows the initial-condition convention: a prograde pattern has
//! `omega < 0`.
use nalgebra::{Rotation2, Vector2};

use crate::{
    constants::{PatternSpeed, Radian, Time},
    phase_space::PhaseSpaceState,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransform {
    pub pattern_speed: PatternSpeed,
    pub time_origin: Time,
}

impl FrameTransform {
    /// Transform for a frame rotating at `pattern_speed`, aligned with the inertial frame at `t = 0`.
    pub fn new(pattern_speed: PatternSpeed) -> Self {
        FrameTransform {
            pattern_speed,
            time_origin: 0.0,
        }
    }

    /// Measure the rotation angle from `time_origin` instead of `t = 0`.
    pub fn with_time_origin(mut self, time_origin: Time) -> Self {
        self.time_origin = time_origin;
        self
    }

    /// Rotation angle of the rotating axes at time `t`.
    pub fn angle(&self, t: Time) -> Radian {
        self.pattern_speed * (t - self.time_origin)
    }

    /// Express rotating-frame states at time `t` in the inertial frame.
    pub fn to_inertial(&self, t: Time, states: &[PhaseSpaceState]) -> Vec<PhaseSpaceState> {
        rotate_batch(states, Rotation2::new(self.angle(t)))
    }

    /// Express inertial-frame states at time `t` in the rotating frame.
    pub fn to_rotating(&self, t: Time, states: &[PhaseSpaceState]) -> Vec<PhaseSpaceState> {
        rotate_batch(states, Rotation2::new(-self.angle(t)))
    }
}

/// Free-function form of [`FrameTransform::to_inertial`].
pub fn rotating_to_inertial(
    t: Time,
    states: &[PhaseSpaceState],
    pattern_speed: PatternSpeed,
    time_origin: Time,
) -> Vec<PhaseSpaceState> {
    FrameTransform::new(pattern_speed)
        .with_time_origin(time_origin)
        .to_inertial(t, states)
}

/// Free-function form of [`FrameTransform::to_rotating`].
pub fn inertial_to_rotating(
    t: Time,
    states: &[PhaseSpaceState],
    pattern_speed: PatternSpeed,
    time_origin: Time,
) -> Vec<PhaseSpaceState> {
    FrameTransform::new(pattern_speed)
        .with_time_origin(time_origin)
        .to_rotating(t, states)
}

fn rotate_batch(states: &[PhaseSpaceState], rot: Rotation2<f64>) -> Vec<PhaseSpaceState> {
    states
        .iter()
        .map(|s| {
            let pos = rot * Vector2::new(s.position.x, s.position.y);
            let vel = rot * Vector2::new(s.velocity.x, s.velocity.y);
            PhaseSpaceState::from_array([pos.x, pos.y, s.position.z, vel.x, vel.y, s.velocity.z])
        })
        .collect()
}
