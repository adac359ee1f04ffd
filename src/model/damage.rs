//! Somatic damage dynamics.
//!
//! Damage grows quadratically with the distance of the hormone level from
//! its damage-minimising value and is repaired at a constant rate. The
//! result is continuous; the solver splits it across the two neighbouring
//! integer levels with [`DamageSplit`](crate::lattice::DamageSplit).

use crate::config::ModelConstants;
use ndarray::Array2;

/// Next damage level for every `(d, h)`, clamped to `[0, max_d]`
pub fn damage_transition(constants: &ModelConstants, max_d: usize, max_h: usize) -> Array2<f64> {
    Array2::from_shape_fn((max_d + 1, max_h + 1), |(d, h)| {
        next_damage(constants, d, h, max_d, max_h)
    })
}

#[inline]
pub fn next_damage(
    constants: &ModelConstants,
    d: usize,
    h: usize,
    max_d: usize,
    max_h: usize,
) -> f64 {
    let deviation = constants.hmin - h as f64 / max_h as f64;
    let raw = d as f64 + constants.hslope * deviation * deviation - constants.repair;
    raw.min(max_d as f64).max(0.0)
}

/// Hormone lattice level closest to the damage minimum `hmin * max_h`
pub fn damage_minimising_hormone(constants: &ModelConstants, max_h: usize) -> usize {
    let target = (constants.hmin * max_h as f64).round().max(0.0);
    (target as usize).min(max_h)
}
