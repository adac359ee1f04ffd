//! Backward-induction value iteration.
//!
//! One outer iteration sweeps the season backwards from `ts = max_ts - 1`
//! to `ts = 0`. Each epoch first searches the optimal hormone level for
//! every `(t, d)` against the fitness of the epoch above it, then derives
//! the expected fitness `W[t][ts][d][h]` of every state from those optima.
//! After the sweep the start-of-season fitness is published as the
//! boundary fitness for the next iteration and compared with the previous
//! one; the summed absolute change is the only convergence signal.

use crate::checkpoint::Checkpoint;
use crate::config::Config;
use crate::model::ModelTables;
use crate::solver::golden::{golden_section_argmax, UnimodalityAudit};
use crate::solver::policy::Policy;
use crate::solver::state::SimulationState;
use crate::stats::{ConvergenceHistory, SolveReport};
use log::{debug, info, warn};
use ndarray::{s, Axis};
use rayon::prelude::*;
use std::time::Instant;

/// Value-iteration engine
pub struct ValueIteration {
    pub config: Config,
    pub tables: ModelTables,
    pub state: SimulationState,
    pub history: ConvergenceHistory,

    iteration: u64,
    last_fitdiff: f64,
    audit: Option<UnimodalityAudit>,
}

impl ValueIteration {
    /// Create an engine with terminal fitness seeded
    pub fn new(config: Config) -> Self {
        let tables = ModelTables::new(&config);
        let state = SimulationState::new(tables.lattice);
        let history = ConvergenceHistory::new(config.logging.progress_interval);
        let audit = config.solver.audit_unimodality.then(UnimodalityAudit::new);

        let mut engine = Self {
            config,
            tables,
            state,
            history,
            iteration: 0,
            last_fitdiff: f64::INFINITY,
            audit,
        };
        engine.seed_terminal_fitness();
        engine
    }

    /// Restore an engine from a solver checkpoint
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Self {
        let tables = ModelTables::new(&checkpoint.config);
        let audit = checkpoint
            .config
            .solver
            .audit_unimodality
            .then(UnimodalityAudit::new);

        Self {
            config: checkpoint.config,
            tables,
            state: checkpoint.state,
            history: checkpoint.history,
            iteration: checkpoint.iteration,
            last_fitdiff: checkpoint.last_fitdiff,
            audit,
        }
    }

    /// Snapshot of the current solver state
    pub fn create_checkpoint(&self) -> Checkpoint {
        Checkpoint::new(
            self.iteration,
            self.last_fitdiff,
            self.config.clone(),
            self.state.clone(),
            self.history.clone(),
        )
    }

    /// Outer iterations completed so far
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// `fitdiff` of the last completed iteration
    pub fn last_fitdiff(&self) -> f64 {
        self.last_fitdiff
    }

    pub fn is_converged(&self) -> bool {
        self.last_fitdiff < self.config.solver.tolerance
    }

    pub fn audit(&self) -> Option<&UnimodalityAudit> {
        self.audit.as_ref()
    }

    /// Fitness beyond the horizon equals immediate fecundity.
    ///
    /// Seeds the boundary slot of the fitness tensor and the reproductive
    /// value with `repro[max_ts][d]` for every `t >= 1` and `h`.
    pub fn seed_terminal_fitness(&mut self) {
        let lattice = self.tables.lattice;
        let max_ts = lattice.max_ts;

        for t in 1..=lattice.max_t {
            for d in 0..=lattice.max_d {
                let terminal = self.tables.repro[[max_ts, d]];
                self.state
                    .fitness
                    .slice_mut(s![t, max_ts, d, ..])
                    .fill(terminal);
                self.state
                    .reproductive_value
                    .slice_mut(s![t, d, ..])
                    .fill(terminal);
            }
        }
    }

    /// Backward sweep over one season: decision search and fitness
    /// propagation for every epoch
    pub fn optimise_decisions(&mut self) {
        for ts in (0..self.tables.lattice.max_ts).rev() {
            let audit = self.search_epoch(ts);
            if let (Some(total), Some(epoch)) = (self.audit.as_mut(), audit) {
                if !epoch.is_clean() {
                    debug!(
                        "Epoch {}: {} of {} rows not unimodal",
                        ts, epoch.mismatches, epoch.rows_checked
                    );
                }
                total.merge(&epoch);
            }
            self.propagate_epoch(ts);
        }
    }

    /// Optimal hormone level and its fitness for every `(t, d)` at epoch `ts`
    fn search_epoch(&mut self, ts: usize) -> Option<UnimodalityAudit> {
        let lattice = self.tables.lattice;
        let audit_enabled = self.audit.is_some();

        let state = &mut self.state;
        let fitness = &state.fitness;
        let mut hormone = state.hormone.slice_mut(s![.., ts, ..]);
        let mut optimal = state.optimal_fitness.slice_mut(s![.., ts, ..]);

        let audit = hormone
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(optimal.axis_iter_mut(Axis(0)).into_par_iter())
            .enumerate()
            .map(|(t, (mut hormone_row, mut optimal_row))| {
                let mut audit = UnimodalityAudit::new();
                // Fitness of the state reached after this step
                let next_t = lattice.next_t(t);

                for d in 0..=lattice.max_d {
                    let row = fitness.slice(s![next_t, ts + 1, d, ..]);
                    let value_at = |h: usize| row[h];

                    let best = golden_section_argmax(lattice.max_h, value_at);
                    if audit_enabled {
                        audit.check(lattice.max_h, value_at, best);
                    }

                    hormone_row[d] = best;
                    optimal_row[d] = row[best];
                }
                audit
            })
            .reduce(UnimodalityAudit::new, |mut a, b| {
                a.merge(&b);
                a
            });

        audit_enabled.then_some(audit)
    }

    /// Expected fitness `W[t][ts][d][h]` before the predator does or does
    /// not attack, for every `t >= 1`
    fn propagate_epoch(&mut self, ts: usize) {
        let tables = &self.tables;
        let lattice = tables.lattice;
        let optimal = &self.state.optimal_fitness;
        let mut plane = self.state.fitness.slice_mut(s![1.., ts, .., ..]);

        plane
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(i, mut cells)| {
                let t = i + 1;
                for d in 0..=lattice.max_d {
                    let repro = tables.repro[[ts, d]];
                    for h in 0..=lattice.max_h {
                        let split = tables.damage_split(d, h);
                        let (attacked, quiet) = tables.branch_weights(t, d, h);

                        // A survived attack resets the clock to 0
                        let after_attack = split.interpolate(|next_d| optimal[[0, ts, next_d]]);
                        let after_quiet = split.interpolate(|next_d| optimal[[t, ts, next_d]]);

                        cells[[d, h]] =
                            attacked * (repro + after_attack) + quiet * (repro + after_quiet);
                    }
                }
            });
    }

    /// Publish start-of-season fitness as next iteration's boundary fitness.
    ///
    /// Returns `fitdiff`, the summed absolute change against the previous
    /// boundary values. The policy at the season boundary is set to the
    /// policy at the start of the season.
    pub fn replace_fitness(&mut self) -> f64 {
        let max_ts = self.tables.lattice.max_ts;
        let state = &mut self.state;

        let (current, mut boundary) = state
            .fitness
            .multi_slice_mut((s![1.., 0, .., ..], s![1.., max_ts, .., ..]));
        let mut previous = state.reproductive_value.slice_mut(s![1.., .., ..]);

        let fitdiff: f64 = current
            .iter()
            .zip(previous.iter())
            .map(|(w, v)| (v - w).abs())
            .sum();

        previous.assign(&current);
        boundary.assign(&current);

        let (season_start, mut season_end) = state
            .hormone
            .multi_slice_mut((s![.., 0, ..], s![.., max_ts, ..]));
        season_end.assign(&season_start);

        fitdiff
    }

    /// One outer iteration; returns its `fitdiff`
    pub fn step(&mut self) -> f64 {
        self.optimise_decisions();
        let fitdiff = self.replace_fitness();

        self.iteration += 1;
        self.last_fitdiff = fitdiff;

        if self.history.is_due(self.iteration) || self.is_converged() {
            self.history.record(self.iteration, fitdiff);
        }

        fitdiff
    }

    /// Iterate until converged or the cap is reached
    pub fn run(&mut self) -> SolveReport {
        self.run_with(|_| {})
    }

    /// Iterate until converged or the cap is reached, calling
    /// `on_iteration` after every iteration
    pub fn run_with<F>(&mut self, mut on_iteration: F) -> SolveReport
    where
        F: FnMut(&ValueIteration),
    {
        let lattice = self.tables.lattice;
        let max_iterations = self.config.solver.max_iterations;
        let progress_interval = self.config.logging.progress_interval.max(1);

        info!(
            "Solving lattice t<={} ts<{} d<={} h<={} ({:.1} MB per state tensor)",
            lattice.max_t,
            lattice.max_ts,
            lattice.max_d,
            lattice.max_h,
            lattice.state_tensor_bytes() as f64 / 1_000_000.0
        );

        let start = Instant::now();

        while self.iteration < max_iterations && !self.is_converged() {
            let fitdiff = self.step();

            if self.iteration % progress_interval == 0 || self.is_converged() {
                info!("{}\t{:e}", self.iteration, fitdiff);
            }

            on_iteration(self);
        }

        let converged = self.is_converged();
        if !converged {
            warn!(
                "*** DID NOT CONVERGE WITHIN {} ITERATIONS *** (fitdiff {:e})",
                self.iteration, self.last_fitdiff
            );
        }
        if let Some(audit) = &self.audit {
            if !audit.is_clean() {
                warn!(
                    "Golden-section search missed the row maximum in {} of {} rows (worst shortfall {:e})",
                    audit.mismatches, audit.rows_checked, audit.worst_shortfall
                );
            }
        }

        SolveReport {
            iterations: self.iteration,
            max_iterations,
            converged,
            final_fitdiff: self.last_fitdiff,
            elapsed_secs: start.elapsed().as_secs_f64(),
            audit: self.audit.clone(),
        }
    }

    /// Current decision table
    pub fn policy(&self) -> Policy {
        Policy::from_state(&self.state, self.iteration, self.is_converged())
    }
}
