//! State lattice dimensions and damage interpolation.
//!
//! The lattice is `(t, ts, d)` for decisions and `(t, ts, d, h)` for
//! fitness and frequencies. Every tensor in the crate is an `ndarray`
//! array in that axis order, so indexing is row-major and bounds-checked.

use crate::config::LatticeConfig;
use ndarray::{Array3, Array4};
use serde::{Deserialize, Serialize};

/// Dimensions of the discrete state lattice
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lattice {
    pub max_t: usize,
    pub max_ts: usize,
    pub max_d: usize,
    pub max_h: usize,
}

impl Lattice {
    pub fn new(max_t: usize, max_ts: usize, max_d: usize, max_h: usize) -> Self {
        Self {
            max_t,
            max_ts,
            max_d,
            max_h,
        }
    }

    pub fn from_config(config: &LatticeConfig) -> Self {
        Self::new(config.max_t, config.max_ts, config.max_d, config.max_h)
    }

    /// Shape of `(t, ts, d)` tensors, `ts` including the season boundary
    #[inline]
    pub fn decision_shape(&self) -> (usize, usize, usize) {
        (self.max_t + 1, self.max_ts + 1, self.max_d + 1)
    }

    /// Shape of `(t, ts, d, h)` tensors
    #[inline]
    pub fn state_shape(&self) -> (usize, usize, usize, usize) {
        (self.max_t + 1, self.max_ts + 1, self.max_d + 1, self.max_h + 1)
    }

    /// Shape of `(t, d, h)` tensors (season-boundary snapshots)
    #[inline]
    pub fn boundary_shape(&self) -> (usize, usize, usize) {
        (self.max_t + 1, self.max_d + 1, self.max_h + 1)
    }

    pub fn decision_tensor<A: Clone>(&self, fill: A) -> Array3<A> {
        Array3::from_elem(self.decision_shape(), fill)
    }

    pub fn state_tensor(&self) -> Array4<f64> {
        Array4::zeros(self.state_shape())
    }

    pub fn boundary_tensor(&self) -> Array3<f64> {
        Array3::zeros(self.boundary_shape())
    }

    /// Time-since-attack after a step without an attack
    #[inline]
    pub fn next_t(&self, t: usize) -> usize {
        (t + 1).min(self.max_t)
    }

    /// Number of `(t, ts, d, h)` cells
    pub fn state_count(&self) -> usize {
        let (a, b, c, d) = self.state_shape();
        a * b * c * d
    }

    /// Approximate memory of one `(t, ts, d, h)` tensor of `f64`
    pub fn state_tensor_bytes(&self) -> usize {
        self.state_count() * std::mem::size_of::<f64>()
    }
}

impl Default for Lattice {
    fn default() -> Self {
        Self::from_config(&LatticeConfig::default())
    }
}

/// A continuous damage value split across its two neighbouring lattice levels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageSplit {
    /// `floor(dnew)`
    pub lower: usize,
    /// `ceil(dnew)`
    pub upper: usize,
    /// Weight of the upper level, `dnew - floor(dnew)`
    pub weight: f64,
}

impl DamageSplit {
    /// Split a damage value already clamped to `[0, max_d]`
    #[inline]
    pub fn new(dnew: f64) -> Self {
        let lower = dnew.floor();
        Self {
            lower: lower as usize,
            upper: dnew.ceil() as usize,
            weight: dnew - lower,
        }
    }

    /// Linear interpolation of a per-damage quantity
    #[inline]
    pub fn interpolate<F: Fn(usize) -> f64>(&self, value_at: F) -> f64 {
        (1.0 - self.weight) * value_at(self.lower) + self.weight * value_at(self.upper)
    }
}
