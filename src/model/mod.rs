//! Static model tables consumed by the solver.
//!
//! This module contains:
//! - Predator presence per time since attack
//! - Kill probability per hormone level
//! - Background mortality per damage level
//! - Damage transitions per damage and hormone level
//! - Reproductive output per epoch and damage level

pub mod damage;
pub mod environment;
pub mod reproduction;
pub mod risk;

use crate::config::Config;
use crate::lattice::{DamageSplit, Lattice};
use ndarray::{Array1, Array2};

pub use damage::{damage_minimising_hormone, damage_transition};
pub use environment::predator_presence;
pub use reproduction::reproductive_output;
pub use risk::{background_mortality, kill_probability};

/// Per-state arrays derived once from the configuration
#[derive(Clone, Debug)]
pub struct ModelTables {
    pub lattice: Lattice,
    /// Attack probability given a present predator
    pub p_attack: f64,
    /// `pPred[t]`
    pub p_pred: Array1<f64>,
    /// `pKilled[h]`
    pub p_killed: Array1<f64>,
    /// `mu[d]`
    pub mu: Array1<f64>,
    /// `dnew[d][h]`
    pub dnew: Array2<f64>,
    /// `repro[ts][d]`
    pub repro: Array2<f64>,
}

impl ModelTables {
    pub fn new(config: &Config) -> Self {
        let lattice = config.lattice();
        let params = &config.params;
        let constants = &config.constants;

        Self {
            lattice,
            p_attack: params.p_attack,
            p_pred: predator_presence(params, lattice.max_t),
            p_killed: kill_probability(params.alpha, lattice.max_h),
            mu: background_mortality(constants.mu0, params.k_mort, lattice.max_d),
            dnew: damage_transition(constants, lattice.max_d, lattice.max_h),
            repro: reproductive_output(params.k_fec, lattice.max_ts, lattice.max_d),
        }
    }

    /// Probability of being attacked in state `t`
    #[inline]
    pub fn attack_probability(&self, t: usize) -> f64 {
        self.p_pred[t] * self.p_attack
    }

    /// Damage split reached from `(d, h)`
    #[inline]
    pub fn damage_split(&self, d: usize, h: usize) -> DamageSplit {
        DamageSplit::new(self.dnew[[d, h]])
    }

    /// Branch weights `(survive attack, no attack)` for state `(t, d, h)`,
    /// both already multiplied by background survival
    #[inline]
    pub fn branch_weights(&self, t: usize, d: usize, h: usize) -> (f64, f64) {
        let attack = self.attack_probability(t);
        let survive_background = 1.0 - self.mu[d];
        (
            attack * (1.0 - self.p_killed[h]) * survive_background,
            (1.0 - attack) * survive_background,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_shapes() {
        let mut config = Config::default();
        config.lattice.max_t = 8;
        config.lattice.max_ts = 4;
        config.lattice.max_d = 20;
        config.lattice.max_h = 50;

        let tables = ModelTables::new(&config);
        assert_eq!(tables.p_pred.len(), 9);
        assert_eq!(tables.p_killed.len(), 51);
        assert_eq!(tables.mu.len(), 21);
        assert_eq!(tables.dnew.dim(), (21, 51));
        assert_eq!(tables.repro.dim(), (5, 21));
    }

    #[test]
    fn test_branch_weights_conserve_survivors() {
        let tables = ModelTables::new(&Config::default());
        for &(t, d, h) in &[(1, 0, 0), (5, 10, 250), (100, 20, 500)] {
            let (attacked, quiet) = tables.branch_weights(t, d, h);
            let killed = tables.attack_probability(t) * tables.p_killed[h];
            let survivors = (1.0 - killed) * (1.0 - tables.mu[d]);
            assert!((attacked + quiet - survivors).abs() < 1e-12);
        }
    }
}
