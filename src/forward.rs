//! Forward projection of population state frequencies under a fixed policy.
//!
//! The population starts with all mass at `(t = max_t, ts = 0, d = 0, h = 0)`
//! and is pushed through one season at a time with the same branch weights
//! and damage interpolation as the value iteration. At each season boundary
//! the survivors are renormalised to one, compared with the previous
//! boundary distribution, and carried into the next season. The run stops
//! once the boundary distribution is stationary.

use crate::config::ForwardConfig;
use crate::model::ModelTables;
use crate::solver::Policy;
use log::{debug, info, warn};
use ndarray::{s, Array4};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Probability mass lost over one season, by cause
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeathTally {
    /// Killed by an attacking predator
    pub predation: f64,
    /// Mortality in excess of the undamaged baseline
    pub damage: f64,
    /// Baseline mortality `mu0`
    pub background: f64,
}

impl DeathTally {
    pub fn total(&self) -> f64 {
        self.predation + self.damage + self.background
    }
}

/// Outcome of a forward projection
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ForwardReport {
    pub cycles: u64,
    pub converged: bool,
    /// Largest per-state change at the last season boundary
    pub max_change: f64,
    /// Deaths over the last season
    pub deaths: DeathTally,
    pub elapsed_secs: f64,
}

impl ForwardReport {
    /// Format as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "Cycles: {} | {} | maxfreqdiff: {:.3e} | Deaths pred: {:.4} dmg: {:.4} bkg: {:.4}",
            self.cycles,
            if self.converged { "stationary" } else { "NOT stationary" },
            self.max_change,
            self.deaths.predation,
            self.deaths.damage,
            self.deaths.background
        )
    }
}

/// Forward-projection engine over `F[t][ts][d][h]`
pub struct ForwardProjection<'a> {
    policy: &'a Policy,
    tables: &'a ModelTables,
    settings: ForwardConfig,
    frequencies: Array4<f64>,
    cycle: u64,
    last_max_change: f64,
    deaths: DeathTally,
}

impl<'a> ForwardProjection<'a> {
    pub fn new(policy: &'a Policy, tables: &'a ModelTables, settings: &ForwardConfig) -> Self {
        debug_assert_eq!(policy.lattice, tables.lattice);
        let lattice = tables.lattice;

        let mut frequencies = lattice.state_tensor();
        // Undamaged, unstressed, long since the last attack, at the breeding point
        frequencies[[lattice.max_t, 0, 0, 0]] = 1.0;

        Self {
            policy,
            tables,
            settings: settings.clone(),
            frequencies,
            cycle: 0,
            last_max_change: f64::INFINITY,
            deaths: DeathTally::default(),
        }
    }

    /// `F[t][ts][d][h]`; after a run, `ts = 0` and `ts = max_ts` hold the
    /// stationary boundary distribution and the interior holds the last season
    pub fn frequencies(&self) -> &Array4<f64> {
        &self.frequencies
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn deaths(&self) -> DeathTally {
        self.deaths
    }

    pub fn is_converged(&self) -> bool {
        self.last_max_change < self.settings.tolerance
    }

    /// Total mass in one epoch slice
    pub fn epoch_mass(&self, ts: usize) -> f64 {
        self.frequencies.slice(s![.., ts, .., ..]).sum()
    }

    /// Mean damage of the population at the start of the season
    pub fn mean_damage(&self) -> f64 {
        let start = self.frequencies.slice(s![.., 0, .., ..]);
        let mass = start.sum();
        if mass <= 0.0 {
            return 0.0;
        }
        start
            .indexed_iter()
            .map(|((_, d, _), &f)| d as f64 * f)
            .sum::<f64>()
            / mass
    }

    /// Occupied states as `((t, ts, d, h), frequency)`
    pub fn occupied(&self) -> impl Iterator<Item = ((usize, usize, usize, usize), f64)> + '_ {
        self.frequencies
            .indexed_iter()
            .filter(|(_, &f)| f > 0.0)
            .map(|(index, &f)| (index, f))
    }

    /// Push the boundary distribution through one season; returns the
    /// deaths incurred on the way
    fn propagate_season(&mut self) -> DeathTally {
        let tables = self.tables;
        let policy = self.policy;
        let lattice = tables.lattice;
        let mu0 = tables.mu[0];
        let frequencies = &mut self.frequencies;

        frequencies.slice_mut(s![.., 1.., .., ..]).fill(0.0);

        let mut deaths = DeathTally::default();

        // Epochs in ascending order: every slice is complete before it is read
        for ts in 0..lattice.max_ts {
            for t in 1..=lattice.max_t {
                let next_t = lattice.next_t(t);
                for d in 0..=lattice.max_d {
                    for h in 0..=lattice.max_h {
                        let mass = frequencies[[t, ts, d, h]];
                        if mass == 0.0 {
                            continue;
                        }

                        let split = tables.damage_split(d, h);
                        let (attacked, quiet) = tables.branch_weights(t, d, h);

                        for (next_d, share) in [
                            (split.lower, 1.0 - split.weight),
                            (split.upper, split.weight),
                        ] {
                            let h_attacked = policy.hormone[[0, ts, next_d]];
                            frequencies[[1, ts + 1, next_d, h_attacked]] += mass * attacked * share;

                            let h_quiet = policy.hormone[[t, ts, next_d]];
                            frequencies[[next_t, ts + 1, next_d, h_quiet]] += mass * quiet * share;
                        }

                        let killed = tables.attack_probability(t) * tables.p_killed[h];
                        deaths.predation += mass * killed;
                        deaths.damage += mass * (1.0 - killed) * (tables.mu[d] - mu0);
                        deaths.background += mass * (1.0 - killed) * mu0;
                    }
                }
            }
        }

        deaths
    }

    /// One season cycle; returns the largest per-state frequency change at
    /// the boundary
    pub fn step(&mut self) -> f64 {
        let deaths = self.propagate_season();
        let survivors = 1.0 - deaths.total();
        let max_ts = self.tables.lattice.max_ts;

        let (mut start, mut end) = self
            .frequencies
            .multi_slice_mut((s![.., 0, .., ..], s![.., max_ts, .., ..]));

        if survivors > 0.0 {
            end.mapv_inplace(|f| f / survivors);
        } else {
            warn!("Population extinct in forward cycle {}", self.cycle + 1);
        }

        let max_change = end
            .iter()
            .zip(start.iter())
            .map(|(new, old)| (new - old).abs())
            .fold(0.0, f64::max);

        // Boundary distribution becomes the start of the next season
        start.assign(&end);

        self.cycle += 1;
        self.deaths = deaths;
        self.last_max_change = max_change;

        debug!("{}\t{:e}", self.cycle, max_change);
        max_change
    }

    /// Cycle until stationary or the cap is reached
    pub fn run(&mut self) -> ForwardReport {
        let start = Instant::now();

        while self.cycle < self.settings.max_cycles && !self.is_converged() {
            self.step();
        }

        let converged = self.is_converged();
        if converged {
            info!(
                "Forward projection stationary after {} cycles (predation deaths {:.4})",
                self.cycle, self.deaths.predation
            );
        } else {
            warn!(
                "Forward projection not stationary within {} cycles (maxfreqdiff {:e})",
                self.cycle, self.last_max_change
            );
        }

        ForwardReport {
            cycles: self.cycle,
            converged,
            max_change: self.last_max_change,
            deaths: self.deaths,
            elapsed_secs: start.elapsed().as_secs_f64(),
        }
    }
}
