//! Configuration system for the stress-damage model.
//!
//! Supports YAML configuration files with defaults matching the published
//! model constants. The six scalars in [`ModelParams`] are the per-run
//! inputs; everything else is fixed for a family of runs.

use crate::lattice::Lattice;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub params: ModelParams,
    pub constants: ModelConstants,
    pub lattice: LatticeConfig,
    pub solver: SolverConfig,
    #[serde(default)]
    pub forward: ForwardConfig,
    #[serde(default)]
    pub trajectory: TrajectoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Runtime scalars supplied per run
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelParams {
    /// Probability that a present predator leaves per time step
    pub p_leave: f64,
    /// Probability that an absent predator arrives per time step
    pub p_arrive: f64,
    /// Probability that a present predator attacks
    pub p_attack: f64,
    /// Shape exponent of kill probability against hormone level
    pub alpha: f64,
    /// Increase in background mortality per unit damage
    pub k_mort: f64,
    /// Decrease in fecundity per unit damage
    pub k_fec: f64,
}

/// Physiological constants
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelConstants {
    /// Hormone level (as a fraction of max_h) that minimises damage
    pub hmin: f64,
    /// Slope of damage increase with deviation from hmin
    pub hslope: f64,
    /// Damage units repaired per time step
    pub repair: f64,
    /// Background mortality independent of damage and predation
    pub mu0: f64,
}

/// Bounds of the state lattice
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatticeConfig {
    /// Maximum time steps since the last attack (censored)
    pub max_t: usize,
    /// Season length in time steps
    pub max_ts: usize,
    /// Maximum damage level
    pub max_d: usize,
    /// Maximum hormone level
    pub max_h: usize,
}

/// Value iteration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Outer iteration cap
    pub max_iterations: u64,
    /// Convergence threshold on total absolute fitness change
    pub tolerance: f64,
    /// Compare every golden-section result against a full scan
    #[serde(default)]
    pub audit_unimodality: bool,
    /// Iterations between solver checkpoints (0 disables)
    #[serde(default)]
    pub checkpoint_interval: u64,
}

/// Forward projection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardConfig {
    pub enabled: bool,
    /// Season cycle cap
    pub max_cycles: u64,
    /// Convergence threshold on the largest per-state frequency change
    pub tolerance: f64,
}

/// Scripted single-individual trajectory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryConfig {
    pub enabled: bool,
    /// Number of simulated time steps
    pub steps: u64,
    /// First step of the scripted attack window
    pub attack_start: u64,
    /// Last step of the scripted attack window (inclusive)
    pub attack_end: u64,
    /// Epoch within the season at which the individual starts
    pub start_ts: usize,
    /// Random seed for damage sampling
    pub seed: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Iterations between progress lines
    pub progress_interval: u64,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            params: ModelParams::default(),
            constants: ModelConstants::default(),
            lattice: LatticeConfig::default(),
            solver: SolverConfig::default(),
            forward: ForwardConfig::default(),
            trajectory: TrajectoryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            p_leave: 0.5,
            p_arrive: 0.1,
            p_attack: 0.5,
            alpha: 1.0,
            k_mort: 0.0,
            k_fec: 0.05,
        }
    }
}

impl Default for ModelConstants {
    fn default() -> Self {
        Self {
            hmin: 0.3,
            hslope: 20.0,
            repair: 1.0,
            mu0: 0.002,
        }
    }
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            max_t: 100,
            max_ts: 10,
            max_d: 20,
            max_h: 500,
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1_000_000,
            tolerance: 1e-6,
            audit_unimodality: false,
            checkpoint_interval: 0,
        }
    }
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_cycles: 100_000,
            tolerance: 1e-6,
        }
    }
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            steps: 30,
            attack_start: 17,
            attack_end: 32,
            start_ts: 0,
            seed: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            progress_interval: 1,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Lattice dimensions derived from this configuration
    pub fn lattice(&self) -> Lattice {
        Lattice::from_config(&self.lattice)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        let p = &self.params;
        for (name, value) in [
            ("p_leave", p.p_leave),
            ("p_arrive", p.p_arrive),
            ("p_attack", p.p_attack),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be between 0 and 1", name));
            }
        }
        if p.p_leave == 0.0 && p.p_attack == 1.0 {
            return Err("p_attack must be < 1 when p_leave is 0".to_string());
        }
        if p.alpha < 0.0 {
            return Err("alpha must be >= 0".to_string());
        }
        if p.k_mort < 0.0 || p.k_fec < 0.0 {
            return Err("k_mort and k_fec must be >= 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.constants.mu0) {
            return Err("mu0 must be between 0 and 1".to_string());
        }

        let l = &self.lattice;
        if l.max_t == 0 || l.max_ts == 0 || l.max_d == 0 || l.max_h == 0 {
            return Err("lattice maxima must be > 0".to_string());
        }
        if self.solver.max_iterations == 0 {
            return Err("max_iterations must be > 0".to_string());
        }
        if self.solver.tolerance <= 0.0 || self.forward.tolerance <= 0.0 {
            return Err("tolerances must be > 0".to_string());
        }
        if self.trajectory.attack_start > self.trajectory.attack_end {
            return Err("attack_start cannot exceed attack_end".to_string());
        }
        if self.logging.progress_interval == 0 {
            return Err("progress_interval must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let loaded: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.lattice.max_h, loaded.lattice.max_h);
        assert_eq!(config.params.k_fec, loaded.params.k_fec);
    }

    #[test]
    fn test_optional_sections_default() {
        let yaml = r#"
params: { p_leave: 0.5, p_arrive: 0.1, p_attack: 0.3, alpha: 1.0, k_mort: 0.0, k_fec: 0.05 }
constants: { hmin: 0.3, hslope: 20.0, repair: 1.0, mu0: 0.002 }
lattice: { max_t: 8, max_ts: 4, max_d: 20, max_h: 50 }
solver: { max_iterations: 100, tolerance: 1.0e-6 }
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.forward.enabled);
        assert!(!config.solver.audit_unimodality);
        assert_eq!(config.logging.progress_interval, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_probability() {
        let mut config = Config::default();
        config.params.p_attack = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_degenerate_predator() {
        let mut config = Config::default();
        config.params.p_leave = 0.0;
        config.params.p_attack = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_lattice() {
        let mut config = Config::default();
        config.lattice.max_h = 0;
        assert!(config.validate().is_err());
    }
}
