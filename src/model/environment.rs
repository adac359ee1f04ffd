//! Predator presence as a renewal process.
//!
//! `t` counts time steps since the last attack. Immediately after an attack
//! the predator is known to be present, so `pPred[1]` is the chance it has not
//! left since. Each further step without an attack is evidence that it may be
//! gone, which the Bayesian update below accounts for.

use crate::config::ModelParams;
use ndarray::Array1;

/// Probability that the predator is present, indexed by time since attack.
///
/// Entry `0` is unused by the recursion (an individual that has just been
/// attacked moves to `t = 1`) and is left at zero.
pub fn predator_presence(params: &ModelParams, max_t: usize) -> Array1<f64> {
    let mut p_pred = Array1::zeros(max_t + 1);
    if max_t == 0 {
        return p_pred;
    }

    p_pred[1] = 1.0 - params.p_leave;

    for t in 2..=max_t {
        let prev = p_pred[t - 1];
        // P(present at t | no attack at t-1)
        p_pred[t] = (prev * (1.0 - params.p_attack) * (1.0 - params.p_leave)
            + (1.0 - prev) * params.p_arrive)
            / (1.0 - prev * params.p_attack);
    }

    p_pred
}
