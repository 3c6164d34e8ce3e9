//! Closed-form potential models.
//!
//! Masses are stored premultiplied by the gravitational constant (`gm = G·M`), in the unit
//! system the positions and velocities are expressed in. Building from a declaration
//! ([`ini`](crate::potential::ini)) takes care of the multiplication.
use nalgebra::Vector3;

use crate::constants::{Time, RADEG};

use super::Potential;

/// Plummer sphere, `Φ = −GM / sqrt(r² + b²)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plummer {
    pub gm: f64,
    pub scale_radius: f64,
}

impl Plummer {
    pub fn new(gm: f64, scale_radius: f64) -> Self {
        Plummer { gm, scale_radius }
    }
}

impl Potential for Plummer {
    fn value(&self, pos: &Vector3<f64>, _t: Time) -> f64 {
        -self.gm / (pos.norm_squared() + self.scale_radius.powi(2)).sqrt()
    }

    fn acceleration(&self, pos: &Vector3<f64>, _t: Time) -> Vector3<f64> {
        let d2 = pos.norm_squared() + self.scale_radius.powi(2);
        pos * (-self.gm / (d2 * d2.sqrt()))
    }
}

/// Miyamoto & Nagai (1975) disc, `Φ = −GM / sqrt(R² + (a + sqrt(z² + b²))²)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MiyamotoNagai {
    pub gm: f64,
    pub scale_radius: f64,
    pub scale_height: f64,
}

impl MiyamotoNagai {
    pub fn new(gm: f64, scale_radius: f64, scale_height: f64) -> Self {
        MiyamotoNagai {
            gm,
            scale_radius,
            scale_height,
        }
    }
}

impl Potential for MiyamotoNagai {
    fn value(&self, pos: &Vector3<f64>, _t: Time) -> f64 {
        let zeta = pos.z.hypot(self.scale_height);
        let r2 = pos.x * pos.x + pos.y * pos.y;
        -self.gm / (r2 + (self.scale_radius + zeta).powi(2)).sqrt()
    }

    fn acceleration(&self, pos: &Vector3<f64>, _t: Time) -> Vector3<f64> {
        let zeta = pos.z.hypot(self.scale_height);
        let az = self.scale_radius + zeta;
        let r2 = pos.x * pos.x + pos.y * pos.y;
        let d2 = r2 + az * az;
        let f = -self.gm / (d2 * d2.sqrt());
        let fz = if zeta > 0.0 { f * az / zeta } else { 0.0 };
        Vector3::new(f * pos.x, f * pos.y, fz * pos.z)
    }
}

/// Cored logarithmic halo, `Φ = ½ v0² ln(rc² + R² + z²/q²)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Logarithmic {
    pub v0: f64,
    pub core_radius: f64,
    /// Vertical axis ratio `q`.
    pub axis_ratio_z: f64,
}

impl Logarithmic {
    pub fn new(v0: f64, core_radius: f64, axis_ratio_z: f64) -> Self {
        Logarithmic {
            v0,
            core_radius,
            axis_ratio_z,
        }
    }

    fn m2(&self, pos: &Vector3<f64>) -> f64 {
        self.core_radius.powi(2)
            + pos.x * pos.x
            + pos.y * pos.y
            + (pos.z / self.axis_ratio_z).powi(2)
    }
}

impl Potential for Logarithmic {
    fn value(&self, pos: &Vector3<f64>, _t: Time) -> f64 {
        0.5 * self.v0.powi(2) * self.m2(pos).ln()
    }

    fn acceleration(&self, pos: &Vector3<f64>, _t: Time) -> Vector3<f64> {
        let f = -self.v0.powi(2) / self.m2(pos);
        Vector3::new(
            f * pos.x,
            f * pos.y,
            f * pos.z / self.axis_ratio_z.powi(2),
        )
    }
}

/// Navarro–Frenk–White halo, `Φ = −GM ln(1 + r/rs) / r`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nfw {
    pub gm: f64,
    pub scale_radius: f64,
}

impl Nfw {
    pub fn new(gm: f64, scale_radius: f64) -> Self {
        Nfw { gm, scale_radius }
    }
}

impl Potential for Nfw {
    fn value(&self, pos: &Vector3<f64>, _t: Time) -> f64 {
        let r = pos.norm();
        if r == 0.0 {
            return -self.gm / self.scale_radius;
        }
        -self.gm * (r / self.scale_radius).ln_1p() / r
    }

    fn acceleration(&self, pos: &Vector3<f64>, _t: Time) -> Vector3<f64> {
        let r = pos.norm();
        if r == 0.0 {
            return Vector3::zeros();
        }
        let dphi_dr = self.gm
            * ((r / self.scale_radius).ln_1p() / (r * r) - 1.0 / (r * (r + self.scale_radius)));
        pos * (-dphi_dr / r)
    }
}

/// Quadrupole bar of Dehnen (2000), in the 3D form of Monari et al. (2016):
///
/// ```text
/// Φ = A · (R/r)² · cos 2(φ − φb) · U(r)
/// U(r) = −(rb/r)³            r ≥ rb
///        (r/rb)³ − 2         r < rb
/// ```
///
/// The bar is static: it is meant to be integrated in the frame rotating with it. Its
/// strength `A` has units of velocity².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DehnenBar {
    pub strength: f64,
    pub bar_radius: f64,
    /// Angle of the long axis with the `x` axis, in degrees.
    pub bar_angle: f64,
}

impl DehnenBar {
    pub fn new(strength: f64, bar_radius: f64, bar_angle: f64) -> Self {
        DehnenBar {
            strength,
            bar_radius,
            bar_angle,
        }
    }

    /// `(W(r), dW/dr)` with `W = U(r) / r²`.
    fn radial(&self, r: f64) -> (f64, f64) {
        let rb3 = self.bar_radius.powi(3);
        if r >= self.bar_radius {
            (-rb3 / r.powi(5), 5.0 * rb3 / r.powi(6))
        } else {
            (r / rb3 - 2.0 / (r * r), 1.0 / rb3 + 4.0 / r.powi(3))
        }
    }

    /// Position in the bar's own axes.
    fn to_bar_axes(&self, pos: &Vector3<f64>) -> (f64, f64) {
        let (s, c) = (self.bar_angle * RADEG).sin_cos();
        (c * pos.x + s * pos.y, -s * pos.x + c * pos.y)
    }
}

impl Potential for DehnenBar {
    fn value(&self, pos: &Vector3<f64>, _t: Time) -> f64 {
        let r = pos.norm();
        if r == 0.0 {
            return 0.0;
        }
        let (xb, yb) = self.to_bar_axes(pos);
        let (w, _) = self.radial(r);
        self.strength * (xb * xb - yb * yb) * w
    }

    fn acceleration(&self, pos: &Vector3<f64>, _t: Time) -> Vector3<f64> {
        let r = pos.norm();
        if r == 0.0 {
            return Vector3::zeros();
        }
        let (xb, yb) = self.to_bar_axes(pos);
        let (w, dw) = self.radial(r);
        let q = xb * xb - yb * yb;

        // gradient in bar axes, then back to the galactic axes
        let gx_b = 2.0 * xb * w;
        let gy_b = -2.0 * yb * w;
        let (s, c) = (self.bar_angle * RADEG).sin_cos();
        let gx = c * gx_b - s * gy_b;
        let gy = s * gx_b + c * gy_b;

        let grad = Vector3::new(gx, gy, 0.0) + pos * (q * dw / r);
        grad * -self.strength
    }
}
