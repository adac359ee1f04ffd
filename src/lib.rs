//! # stressdp
//!
//! Stochastic dynamic programming model of the stress response under
//! predation risk.
//!
//! An individual chooses a hormone level in every state
//! `(time since attack, epoch in season, damage)`. High hormone levels
//! protect against predator attacks but cause physiological damage, and
//! damage lowers fecundity and raises mortality. Backward induction finds
//! the hormone level that maximises expected lifetime reproductive output.
//!
//! ## Features
//!
//! - **Parallel**: each epoch's decision search and fitness update run on
//!   all CPU cores via Rayon
//! - **Configurable**: YAML configuration files
//! - **Resumable**: binary checkpoints of the solver state
//! - **Reproducible**: seeded random number generation for trajectories
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stressdp::{Config, ForwardProjection, ValueIteration};
//!
//! let config = Config::default();
//! let mut engine = ValueIteration::new(config.clone());
//!
//! // Backward induction until fitness is stationary
//! let report = engine.run();
//! println!("{}", report.summary());
//!
//! // Stationary state distribution under the optimal policy
//! let policy = engine.policy();
//! let mut projection = ForwardProjection::new(&policy, &engine.tables, &config.forward);
//! println!("{}", projection.run().summary());
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use stressdp::Config;
//!
//! let mut config = Config::default();
//! config.params.p_attack = 0.3;
//! config.lattice.max_h = 100;
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Checkpoints
//!
//! ```rust,no_run
//! use stressdp::checkpoint::Checkpoint;
//! use stressdp::{Config, ValueIteration};
//!
//! let mut engine = ValueIteration::new(Config::default());
//! engine.step();
//!
//! // Save checkpoint
//! let checkpoint = engine.create_checkpoint();
//! checkpoint.save("checkpoint.bin").unwrap();
//!
//! // Load checkpoint
//! let loaded = Checkpoint::load("checkpoint.bin").unwrap();
//! let mut restored = ValueIteration::from_checkpoint(loaded);
//! restored.run();
//! ```

pub mod checkpoint;
pub mod config;
pub mod export;
pub mod forward;
pub mod lattice;
pub mod model;
pub mod solver;
pub mod stats;
pub mod trajectory;

// Re-export main types
pub use config::Config;
pub use forward::ForwardProjection;
pub use solver::{Policy, ValueIteration};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Time a fixed number of outer iterations
pub fn benchmark(config: Config, iterations: u64) -> BenchmarkResult {
    use std::time::Instant;

    let lattice = config.lattice();
    let mut engine = ValueIteration::new(config);

    let start = Instant::now();
    for _ in 0..iterations {
        engine.step();
    }
    let elapsed = start.elapsed().as_secs_f64();

    BenchmarkResult {
        iterations,
        states: lattice.state_count(),
        elapsed_secs: elapsed,
        iterations_per_second: if elapsed > 0.0 {
            iterations as f64 / elapsed
        } else {
            0.0
        },
        final_fitdiff: engine.last_fitdiff(),
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub iterations: u64,
    /// Cells in one `(t, ts, d, h)` tensor
    pub states: usize,
    pub elapsed_secs: f64,
    pub iterations_per_second: f64,
    pub final_fitdiff: f64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Iterations: {}", self.iterations)?;
        writeln!(f, "States: {}", self.states)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.2} iterations/s", self.iterations_per_second)?;
        writeln!(f, "Last fitdiff: {:e}", self.final_fitdiff)?;
        Ok(())
    }
}
