//! Converged decision table.

use crate::lattice::Lattice;
use crate::solver::state::SimulationState;
use ndarray::{s, Array3};
use serde::{Deserialize, Serialize};

/// Optimal hormone level per `(t, ts, d)` together with its fitness
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Policy {
    pub lattice: Lattice,
    /// `hormone[t][ts][d]` for `ts < max_ts`
    pub hormone: Array3<usize>,
    /// `Wopt[t][ts][d]` for `ts < max_ts`
    pub optimal_fitness: Array3<f64>,
    /// Outer iterations behind this policy
    pub iterations: u64,
    pub converged: bool,
}

/// One row of the policy table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub t: usize,
    pub d: usize,
    pub ts: usize,
    pub hormone: usize,
}

impl Policy {
    /// Copy the decision part of the solver state; the season-boundary
    /// slot is dropped because it duplicates `ts = 0`
    pub fn from_state(state: &SimulationState, iterations: u64, converged: bool) -> Self {
        let max_ts = state.lattice.max_ts;
        Self {
            lattice: state.lattice,
            hormone: state.hormone.slice(s![.., ..max_ts, ..]).to_owned(),
            optimal_fitness: state.optimal_fitness.slice(s![.., ..max_ts, ..]).to_owned(),
            iterations,
            converged,
        }
    }

    /// Decision in state `(t, ts, d)`; `ts` is taken modulo the season length
    #[inline]
    pub fn hormone(&self, t: usize, ts: usize, d: usize) -> usize {
        self.hormone[[t, ts % self.lattice.max_ts, d]]
    }

    #[inline]
    pub fn optimal_fitness(&self, t: usize, ts: usize, d: usize) -> f64 {
        self.optimal_fitness[[t, ts % self.lattice.max_ts, d]]
    }

    /// Decisions across damage levels for one `(t, ts)`
    pub fn damage_profile(&self, t: usize, ts: usize) -> Vec<usize> {
        self.hormone
            .slice(s![t, ts % self.lattice.max_ts, ..])
            .to_vec()
    }

    /// Table rows ordered by `t`, then `ts`, then `d`
    pub fn entries(&self) -> impl Iterator<Item = PolicyEntry> + '_ {
        let l = self.lattice;
        (0..=l.max_t).flat_map(move |t| {
            (0..l.max_ts).flat_map(move |ts| {
                (0..=l.max_d).map(move |d| PolicyEntry {
                    t,
                    d,
                    ts,
                    hormone: self.hormone[[t, ts, d]],
                })
            })
        })
    }

    /// Mean hormone level over the whole table
    pub fn mean_hormone(&self) -> f64 {
        let n = self.hormone.len().max(1);
        self.hormone.iter().sum::<usize>() as f64 / n as f64
    }

    /// `(min, max)` hormone level in the table
    pub fn hormone_range(&self) -> (usize, usize) {
        let min = self.hormone.iter().copied().min().unwrap_or(0);
        let max = self.hormone.iter().copied().max().unwrap_or(0);
        (min, max)
    }

    /// True when `|h - target|` never increases with damage for fixed `(t, ts)`
    pub fn approaches_with_damage(&self, t: usize, ts: usize, target: usize) -> bool {
        let profile = self.damage_profile(t, ts);
        profile
            .windows(2)
            .all(|pair| pair[1].abs_diff(target) <= pair[0].abs_diff(target))
    }
}
