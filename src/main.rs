//! stressdp - CLI Entry Point
//!
//! Optimal stress response under predation risk.

use clap::{Args, Parser, Subcommand};
use log::info;
use stressdp::checkpoint::{Checkpoint, CheckpointManager};
use stressdp::export::ExportSystem;
use stressdp::stats::ConvergenceHistory;
use stressdp::trajectory::TrajectorySimulator;
use stressdp::{benchmark, Config, ForwardProjection, ValueIteration};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "stressdp")]
#[command(version)]
#[command(about = "Stochastic dynamic programming model of the stress response under predation risk")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a new model
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        #[command(flatten)]
        params: ParamOverrides,

        /// Output directory for reports and checkpoints
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Random seed for the trajectory simulation
        #[arg(long)]
        seed: Option<u64>,

        /// Skip the forward projection
        #[arg(long)]
        no_forward: bool,

        /// Skip the trajectory simulation
        #[arg(long)]
        no_trajectory: bool,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Resume value iteration from a checkpoint
    Resume {
        /// Checkpoint file, or a directory to resume from its latest checkpoint
        #[arg(short, long)]
        checkpoint: PathBuf,

        /// Raise the iteration cap
        #[arg(long)]
        max_iterations: Option<u64>,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Time outer iterations
    Benchmark {
        /// Configuration file (YAML); defaults are used when absent
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of outer iterations
        #[arg(short, long, default_value = "10")]
        iterations: u64,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Analyze a checkpoint file
    Analyze {
        /// Checkpoint file
        checkpoint: PathBuf,

        /// Convergence history (JSON) to report instead of the checkpoint's own
        #[arg(long)]
        history: Option<PathBuf>,
    },
}

/// Per-run scalars that override the configuration file
#[derive(Args)]
struct ParamOverrides {
    #[arg(long)]
    p_leave: Option<f64>,
    #[arg(long)]
    p_arrive: Option<f64>,
    #[arg(long)]
    p_attack: Option<f64>,
    #[arg(long)]
    alpha: Option<f64>,
    #[arg(long)]
    k_mort: Option<f64>,
    #[arg(long)]
    k_fec: Option<f64>,
}

impl ParamOverrides {
    fn apply(&self, config: &mut Config) {
        let p = &mut config.params;
        for (value, target) in [
            (self.p_leave, &mut p.p_leave),
            (self.p_arrive, &mut p.p_arrive),
            (self.p_attack, &mut p.p_attack),
            (self.alpha, &mut p.alpha),
            (self.k_mort, &mut p.k_mort),
            (self.k_fec, &mut p.k_fec),
        ] {
            if let Some(v) = value {
                *target = v;
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            params,
            output,
            seed,
            no_forward,
            no_trajectory,
            quiet,
        } => {
            let mut config = load_config(&config)?;
            params.apply(&mut config);
            if seed.is_some() {
                config.trajectory.seed = seed;
            }
            config.forward.enabled &= !no_forward;
            config.trajectory.enabled &= !no_trajectory;
            config.validate()?;

            init_logging(&config.logging.log_level);
            run_model(ValueIteration::new(config), output, quiet)
        }

        Commands::Resume {
            checkpoint,
            max_iterations,
            output,
            quiet,
        } => {
            let path = resolve_checkpoint(&checkpoint)?;
            println!("Loading checkpoint: {}", path);
            let mut checkpoint = Checkpoint::load(&path)?;
            if let Some(cap) = max_iterations {
                checkpoint.set_max_iterations(cap)?;
            }

            init_logging(&checkpoint.config.logging.log_level);
            let engine = ValueIteration::from_checkpoint(checkpoint);
            println!("Resumed at iteration {}", engine.iteration());
            run_model(engine, output, quiet)
        }

        Commands::Benchmark { config, iterations } => {
            init_logging("warn");
            run_benchmark(config, iterations)
        }

        Commands::Init { output } => generate_config(output),

        Commands::Analyze {
            checkpoint,
            history,
        } => analyze_checkpoint(checkpoint, history),
    }
}

fn init_logging(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// A directory resolves to the latest checkpoint inside it
fn resolve_checkpoint(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Ok(path.to_string_lossy().to_string());
    }

    let manager = CheckpointManager::new(path.to_string_lossy().to_string(), 0, usize::MAX);
    let latest = manager
        .find_latest()
        .ok_or_else(|| format!("No checkpoints in {:?}", path))?;
    Ok(latest)
}

fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if path.exists() {
        println!("Loading config from: {:?}", path);
        Config::from_file(path)
    } else {
        println!("Using default configuration");
        Ok(Config::default())
    }
}

/// Value iteration followed by the reports, forward projection and
/// trajectory simulation
fn run_model(
    mut engine: ValueIteration,
    output: PathBuf,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&output)?;

    // Fixed up front so the policy report can record it
    let seed = engine
        .config
        .trajectory
        .seed
        .unwrap_or_else(rand::random::<u64>);
    engine.config.trajectory.seed = Some(seed);

    let config = engine.config.clone();
    let lattice = config.lattice();

    if !quiet {
        println!("Starting value iteration");
        println!(
            "  Parameters: pLeave {} pArrive {} pAttack {} alpha {} Kmort {} Kfec {}",
            config.params.p_leave,
            config.params.p_arrive,
            config.params.p_attack,
            config.params.alpha,
            config.params.k_mort,
            config.params.k_fec
        );
        println!(
            "  Lattice: t {} ts {} d {} h {}",
            lattice.max_t, lattice.max_ts, lattice.max_d, lattice.max_h
        );
        println!("  Seed: {}", seed);
        println!();
    }

    let mut checkpoint_mgr = CheckpointManager::new(
        output.join("checkpoints").to_string_lossy().to_string(),
        config.solver.checkpoint_interval,
        5, // Keep last 5 checkpoints
    );

    let report = engine.run_with(|e| {
        if checkpoint_mgr.should_save(e.iteration()) {
            match checkpoint_mgr.save(&e.create_checkpoint()) {
                Ok(path) => {
                    if !quiet {
                        println!("  Checkpoint saved: {}", path);
                    }
                }
                Err(err) => eprintln!("  Checkpoint error: {}", err),
            }
        }
    });

    println!();
    println!("=== Value Iteration Complete ===");
    println!("{}", report.summary());
    println!("Speed: {:.2} iterations/s", report.iterations_per_second());

    let policy = engine.policy();
    let path = ExportSystem::export_policy(&output, &config, &policy, Some(seed))?;
    println!("Policy: {:?}", path);

    let final_path = output.join("checkpoint_final.bin");
    engine.create_checkpoint().save(&final_path)?;
    println!("Final checkpoint: {:?}", final_path);

    let history_path = output.join("convergence_history.json");
    engine
        .history
        .save(&history_path.to_string_lossy())?;
    println!("Convergence history: {:?}", history_path);

    if config.forward.enabled {
        info!("Starting forward projection");
        let mut projection = ForwardProjection::new(&policy, &engine.tables, &config.forward);
        let forward_report = projection.run();
        println!("{}", forward_report.summary());
        println!("Mean damage at season start: {:.3}", projection.mean_damage());

        let path = ExportSystem::export_forward(&output, &config, &projection)?;
        println!("Forward table: {:?}", path);
    }

    if config.trajectory.enabled {
        let steps = TrajectorySimulator::new(&policy, &engine.tables, &config.trajectory).run();
        let attacks = steps.iter().filter(|s| s.attack).count();
        let peak = steps.iter().map(|s| s.damage).max().unwrap_or(0);
        println!(
            "Trajectory: {} steps, {} attacks, peak damage {}",
            steps.len(),
            attacks,
            peak
        );

        let path = ExportSystem::export_trajectory(&output, &config, &steps)?;
        println!("Trajectory log: {:?}", path);
    }

    Ok(())
}

fn run_benchmark(
    config_path: Option<PathBuf>,
    iterations: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let lattice = config.lattice();

    println!("=== stressdp Benchmark ===");
    println!(
        "Lattice: t {} ts {} d {} h {}",
        lattice.max_t, lattice.max_ts, lattice.max_d, lattice.max_h
    );
    println!("Iterations: {}", iterations);
    println!();

    let result = benchmark(config, iterations);
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}

fn analyze_checkpoint(
    checkpoint_path: PathBuf,
    history_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Checkpoint Analysis ===");
    println!("File: {:?}", checkpoint_path);
    println!();

    let checkpoint = Checkpoint::load(&checkpoint_path)?;
    let size = checkpoint.size_bytes();
    let params = checkpoint.config.params;
    let lattice = checkpoint.state.lattice;

    println!("Iteration: {}", checkpoint.iteration);
    println!("Last fitdiff: {:e}", checkpoint.last_fitdiff);
    println!(
        "Converged: {}",
        checkpoint.last_fitdiff < checkpoint.config.solver.tolerance
    );
    println!(
        "Parameters: pLeave {} pArrive {} pAttack {} alpha {} Kmort {} Kfec {}",
        params.p_leave, params.p_arrive, params.p_attack, params.alpha, params.k_mort, params.k_fec
    );
    println!(
        "Lattice: t {} ts {} d {} h {}",
        lattice.max_t, lattice.max_ts, lattice.max_d, lattice.max_h
    );
    println!();

    let engine = ValueIteration::from_checkpoint(checkpoint);
    let policy = engine.policy();
    let (min_h, max_h) = policy.hormone_range();
    println!("Mean hormone: {:.2}", policy.mean_hormone());
    println!("Hormone range: {} - {}", min_h, max_h);
    println!(
        "Long since attack, start of season: {:?}",
        policy.damage_profile(lattice.max_t, 0)
    );
    println!(
        "Just attacked, start of season: {:?}",
        policy.damage_profile(0, 0)
    );

    let history = match history_path {
        Some(path) => ConvergenceHistory::load(&path.to_string_lossy())?,
        None => engine.history.clone(),
    };
    let series = history.fitdiff_series();
    if !series.is_empty() {
        println!();
        println!("History: {} records", series.len());
        for (iteration, fitdiff) in series.iter().skip(series.len().saturating_sub(5)) {
            println!("  {}\t{:e}", iteration, fitdiff);
        }
    }

    println!();
    println!("Checkpoint size: {:.2} MB", size as f64 / 1_000_000.0);

    Ok(())
}
