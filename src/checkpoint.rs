//! Checkpoint system for saving and resuming solver runs.

use crate::config::Config;
use crate::solver::SimulationState;
use crate::stats::ConvergenceHistory;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Magic bytes at the start of every checkpoint file
const MAGIC: &[u8; 4] = b"SDPC";

/// Complete solver state for checkpointing
#[derive(Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Version for compatibility checking
    pub version: u32,
    /// Outer iterations completed
    pub iteration: u64,
    /// `fitdiff` of the last completed iteration
    pub last_fitdiff: f64,
    /// Configuration the state was computed under
    pub config: Config,
    /// Policy and fitness tensors
    pub state: SimulationState,
    /// Convergence history so far
    pub history: ConvergenceHistory,
}

impl Checkpoint {
    /// Current checkpoint version
    pub const VERSION: u32 = 1;

    /// Create a new checkpoint
    pub fn new(
        iteration: u64,
        last_fitdiff: f64,
        config: Config,
        state: SimulationState,
        history: ConvergenceHistory,
    ) -> Self {
        Self {
            version: Self::VERSION,
            iteration,
            last_fitdiff,
            config,
            state,
            history,
        }
    }

    /// Save checkpoint to binary file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC)?;
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;

        Ok(())
    }

    /// Load checkpoint from binary file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(CheckpointError::InvalidFormat("Invalid magic bytes".to_string()));
        }

        let checkpoint: Checkpoint = bincode::deserialize_from(&mut reader)?;

        if checkpoint.version != Self::VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: Self::VERSION,
                found: checkpoint.version,
            });
        }

        let expected = checkpoint.config.lattice();
        if checkpoint.state.lattice != expected {
            return Err(CheckpointError::InvalidFormat(
                "State lattice does not match configuration".to_string(),
            ));
        }

        Ok(checkpoint)
    }

    /// Raise the iteration cap before resuming; the new cap must leave
    /// iterations to run
    pub fn set_max_iterations(&mut self, max_iterations: u64) -> Result<(), String> {
        if max_iterations <= self.iteration {
            return Err(format!(
                "max_iterations {} must exceed the {} iterations already completed",
                max_iterations, self.iteration
            ));
        }
        self.config.solver.max_iterations = max_iterations;
        self.config.validate()
    }

    /// Get approximate size in bytes
    pub fn size_bytes(&self) -> usize {
        bincode::serialized_size(self).unwrap_or(0) as usize
    }
}

/// Errors that can occur during checkpoint operations
#[derive(Debug)]
pub enum CheckpointError {
    Io(std::io::Error),
    Serialization(bincode::Error),
    InvalidFormat(String),
    VersionMismatch { expected: u32, found: u32 },
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            Self::VersionMismatch { expected, found } => {
                write!(f, "Version mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<std::io::Error> for CheckpointError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<bincode::Error> for CheckpointError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e)
    }
}

/// Periodic checkpointing during long solver runs
pub struct CheckpointManager {
    /// Base directory for checkpoints
    pub base_dir: String,
    /// Iterations between checkpoints (0 disables)
    pub interval: u64,
    /// Maximum checkpoints to keep
    pub max_checkpoints: usize,
    /// Iteration of the last checkpoint
    last_checkpoint: u64,
}

impl CheckpointManager {
    pub fn new(base_dir: String, interval: u64, max_checkpoints: usize) -> Self {
        std::fs::create_dir_all(&base_dir).ok();

        Self {
            base_dir,
            interval,
            max_checkpoints,
            last_checkpoint: 0,
        }
    }

    /// Check if a checkpoint is due at this iteration
    pub fn should_save(&self, iteration: u64) -> bool {
        self.interval > 0
            && iteration > 0
            && iteration % self.interval == 0
            && iteration != self.last_checkpoint
    }

    pub fn checkpoint_path(&self, iteration: u64) -> String {
        format!("{}/checkpoint_{:08}.bin", self.base_dir, iteration)
    }

    /// Save checkpoint and prune old ones
    pub fn save(&mut self, checkpoint: &Checkpoint) -> Result<String, CheckpointError> {
        let path = self.checkpoint_path(checkpoint.iteration);
        checkpoint.save(&path)?;
        self.last_checkpoint = checkpoint.iteration;

        self.cleanup()?;

        Ok(path)
    }

    fn checkpoint_files(&self) -> Result<Vec<std::fs::DirEntry>, CheckpointError> {
        Ok(std::fs::read_dir(&self.base_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("checkpoint_")
            })
            .collect())
    }

    /// Remove old checkpoints beyond max limit
    fn cleanup(&self) -> Result<(), CheckpointError> {
        let mut checkpoints = self.checkpoint_files()?;

        if checkpoints.len() > self.max_checkpoints {
            // Zero-padded names sort by iteration
            checkpoints.sort_by_key(|e| e.file_name());

            let to_remove = checkpoints.len() - self.max_checkpoints;
            for entry in checkpoints.into_iter().take(to_remove) {
                std::fs::remove_file(entry.path())?;
            }
        }

        Ok(())
    }

    /// Find latest checkpoint in directory
    pub fn find_latest(&self) -> Option<String> {
        self.checkpoint_files()
            .ok()?
            .into_iter()
            .max_by_key(|e| e.file_name())
            .map(|e| e.path().to_string_lossy().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::ValueIteration;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.lattice.max_t = 4;
        config.lattice.max_ts = 3;
        config.lattice.max_d = 6;
        config.lattice.max_h = 20;
        config
    }

    fn temp_path(name: &str) -> String {
        std::env::temp_dir().join(name).to_string_lossy().to_string()
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let mut engine = ValueIteration::new(small_config());
        engine.step();
        engine.step();

        let checkpoint = engine.create_checkpoint();
        let path = temp_path("stressdp_test_checkpoint.bin");
        checkpoint.save(&path).unwrap();
        let loaded = Checkpoint::load(&path).unwrap();

        assert_eq!(loaded.iteration, 2);
        assert_eq!(loaded.last_fitdiff, engine.last_fitdiff());
        assert_eq!(loaded.state.hormone, engine.state.hormone);
        assert_eq!(loaded.state.fitness, engine.state.fitness);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_resume_matches_uninterrupted_run() {
        let mut straight = ValueIteration::new(small_config());
        for _ in 0..4 {
            straight.step();
        }

        let mut first = ValueIteration::new(small_config());
        first.step();
        first.step();
        let mut resumed = ValueIteration::from_checkpoint(first.create_checkpoint());
        resumed.step();
        resumed.step();

        assert_eq!(resumed.iteration(), 4);
        assert_eq!(resumed.last_fitdiff(), straight.last_fitdiff());
        assert_eq!(resumed.state.fitness, straight.state.fitness);
    }

    #[test]
    fn test_iteration_cap_must_leave_work() {
        let mut engine = ValueIteration::new(small_config());
        engine.step();
        engine.step();
        let mut checkpoint = engine.create_checkpoint();

        assert!(checkpoint.set_max_iterations(0).is_err());
        assert!(checkpoint.set_max_iterations(2).is_err());
        assert_eq!(checkpoint.config.solver.max_iterations, 1_000_000);

        checkpoint.set_max_iterations(6).unwrap();
        let report = ValueIteration::from_checkpoint(checkpoint).run();
        assert!(report.iterations > 2 && report.iterations <= 6);
    }

    #[test]
    fn test_rejects_foreign_file() {
        let path = temp_path("stressdp_test_not_a_checkpoint.bin");
        std::fs::write(&path, b"XXXXxxxx").unwrap();

        match Checkpoint::load(&path) {
            Err(CheckpointError::InvalidFormat(_)) => {}
            other => panic!("expected InvalidFormat, got {:?}", other.err()),
        }

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_manager_interval() {
        let dir = temp_path("stressdp_test_manager");
        let manager = CheckpointManager::new(dir.clone(), 50, 3);

        assert!(!manager.should_save(0));
        assert!(!manager.should_save(49));
        assert!(manager.should_save(50));
        assert!(manager.checkpoint_path(50).ends_with("checkpoint_00000050.bin"));

        let disabled = CheckpointManager::new(dir.clone(), 0, 3);
        assert!(!disabled.should_save(50));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_manager_keeps_latest() {
        let dir = temp_path("stressdp_test_manager_cleanup");
        std::fs::remove_dir_all(&dir).ok();
        let mut manager = CheckpointManager::new(dir.clone(), 1, 2);

        let mut engine = ValueIteration::new(small_config());
        for _ in 0..3 {
            engine.step();
            manager.save(&engine.create_checkpoint()).unwrap();
        }

        let latest = manager.find_latest().unwrap();
        assert!(latest.ends_with("checkpoint_00000003.bin"));
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }
}
