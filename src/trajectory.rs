//! Single-individual trajectory under a scripted predator schedule.
//!
//! Replays a solved policy for one individual: the predator attacks on every
//! step inside the scripted window, the individual reads its hormone level
//! from the policy, and its next damage level is drawn between the two
//! lattice neighbours of the continuous damage transition.

use crate::config::TrajectoryConfig;
use crate::model::reproduction::is_breeding_epoch;
use crate::model::ModelTables;
use crate::solver::Policy;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// One logged time step
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStep {
    /// Simulated time step
    pub time: u64,
    /// Time since the last attack
    pub t: usize,
    /// Epoch within the season
    pub ts: usize,
    /// Damage after this step
    pub damage: usize,
    pub hormone: usize,
    pub attack: bool,
    pub reproduce: bool,
}

/// Predator encounters over a contiguous window of time steps
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackSchedule {
    pub start: u64,
    /// Inclusive
    pub end: u64,
}

impl AttackSchedule {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn attacks_at(&self, time: u64) -> bool {
        (self.start..=self.end).contains(&time)
    }
}

/// Trajectory simulator
pub struct TrajectorySimulator<'a> {
    policy: &'a Policy,
    tables: &'a ModelTables,
    schedule: AttackSchedule,
    steps: u64,
    start_ts: usize,
    rng: ChaCha8Rng,
    seed: u64,
}

impl<'a> TrajectorySimulator<'a> {
    /// Create a simulator; a missing seed is drawn from the thread RNG
    pub fn new(policy: &'a Policy, tables: &'a ModelTables, config: &TrajectoryConfig) -> Self {
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        Self {
            policy,
            tables,
            schedule: AttackSchedule::new(config.attack_start, config.attack_end),
            steps: config.steps,
            start_ts: config.start_ts,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed in use (for reproducibility)
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Simulate the configured number of steps
    pub fn run(&mut self) -> Vec<TrajectoryStep> {
        let lattice = self.tables.lattice;
        let mut log = Vec::with_capacity(self.steps as usize);

        let mut t = lattice.max_t;
        let mut ts = self.start_ts;
        let mut d = 0usize;

        for time in 0..self.steps {
            let attack = self.schedule.attacks_at(time);
            t = if attack { 0 } else { lattice.next_t(t) };

            let season_ts = ts % lattice.max_ts;
            let h = self.policy.hormone(t, season_ts, d);

            let split = self.tables.damage_split(d, h);
            d = if self.rng.gen::<f64>() < split.weight {
                split.upper
            } else {
                split.lower
            };

            log.push(TrajectoryStep {
                time,
                t,
                ts: season_ts,
                damage: d,
                hormone: h,
                attack,
                reproduce: is_breeding_epoch(season_ts, lattice.max_ts),
            });

            ts += 1;
        }

        log
    }
}
