//! Solver state aggregate.

use crate::lattice::Lattice;
use ndarray::{Array3, Array4};
use serde::{Deserialize, Serialize};

/// Every tensor the value iteration reads or writes.
///
/// `fitness` is the `W`/`Wnext` pair laid out in one `(t, ts, d, h)` tensor:
///
/// - slots `ts < max_ts` hold this iteration's expected fitness `W`, written
///   from `max_ts - 1` down to `0` and each read once by the epoch below it;
/// - slot `ts = max_ts` holds `Wnext`, the season-boundary fitness carried
///   over from the previous iteration.
///
/// The two halves never alias within a sweep: epoch `ts` reads only slot
/// `ts + 1` and writes only slot `ts`. At the end of an iteration slot `0`
/// is published into slot `max_ts`, which is the ping-pong step.
/// `reproductive_value` (`V`) keeps the previous boundary values for the
/// convergence measure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationState {
    pub lattice: Lattice,
    /// `hormone[t][ts][d]`
    pub hormone: Array3<usize>,
    /// `Wopt[t][ts][d]`
    pub optimal_fitness: Array3<f64>,
    /// `W[t][ts][d][h]` for `ts < max_ts`, `Wnext[t][max_ts][d][h]` at the boundary
    pub fitness: Array4<f64>,
    /// `V[t][d][h]`
    pub reproductive_value: Array3<f64>,
}

impl SimulationState {
    pub fn new(lattice: Lattice) -> Self {
        Self {
            lattice,
            hormone: lattice.decision_tensor(0usize),
            optimal_fitness: lattice.decision_tensor(0.0),
            fitness: lattice.state_tensor(),
            reproductive_value: lattice.boundary_tensor(),
        }
    }

    /// Optimal hormone level in state `(t, ts, d)`
    #[inline]
    pub fn hormone(&self, t: usize, ts: usize, d: usize) -> usize {
        self.hormone[[t, ts, d]]
    }

    #[inline]
    pub fn optimal_fitness(&self, t: usize, ts: usize, d: usize) -> f64 {
        self.optimal_fitness[[t, ts, d]]
    }

    #[inline]
    pub fn fitness(&self, t: usize, ts: usize, d: usize, h: usize) -> f64 {
        self.fitness[[t, ts, d, h]]
    }

    /// Season-boundary fitness carried into the next iteration
    pub fn boundary_fitness(&self, t: usize, d: usize, h: usize) -> f64 {
        self.fitness[[t, self.lattice.max_ts, d, h]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_allocation() {
        let lattice = Lattice::new(8, 4, 20, 50);
        let state = SimulationState::new(lattice);

        assert_eq!(state.hormone.dim(), (9, 5, 21));
        assert_eq!(state.optimal_fitness.dim(), (9, 5, 21));
        assert_eq!(state.fitness.dim(), (9, 5, 21, 51));
        assert_eq!(state.reproductive_value.dim(), (9, 21, 51));
        assert_eq!(state.boundary_fitness(8, 20, 50), 0.0);
    }
}
