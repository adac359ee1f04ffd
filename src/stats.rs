//! Convergence tracking and run summaries.

use crate::solver::golden::UnimodalityAudit;
use serde::{Deserialize, Serialize};

/// Fitness change recorded after one outer iteration
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u64,
    /// Total absolute change of the season-boundary fitness
    pub fitdiff: f64,
}

/// Historical convergence tracker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConvergenceHistory {
    /// Recorded iterations
    pub records: Vec<IterationRecord>,
    /// Recording interval
    pub interval: u64,
}

impl ConvergenceHistory {
    /// Create new history with recording interval
    pub fn new(interval: u64) -> Self {
        Self {
            records: Vec::new(),
            interval: interval.max(1),
        }
    }

    /// Whether an iteration falls on the recording interval
    pub fn is_due(&self, iteration: u64) -> bool {
        iteration % self.interval == 0
    }

    pub fn record(&mut self, iteration: u64, fitdiff: f64) {
        self.records.push(IterationRecord { iteration, fitdiff });
    }

    pub fn latest(&self) -> Option<&IterationRecord> {
        self.records.last()
    }

    /// `(iteration, fitdiff)` pairs for plotting
    pub fn fitdiff_series(&self) -> Vec<(u64, f64)> {
        self.records.iter().map(|r| (r.iteration, r.fitdiff)).collect()
    }

    /// Save history to a JSON file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
    }

    /// Load history from a JSON file
    pub fn load(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Outcome of a value-iteration run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolveReport {
    /// Outer iterations performed in total
    pub iterations: u64,
    /// Iteration cap in force
    pub max_iterations: u64,
    /// Whether `fitdiff` dropped below the tolerance
    pub converged: bool,
    /// `fitdiff` of the last iteration
    pub final_fitdiff: f64,
    pub elapsed_secs: f64,
    /// Present when the unimodality audit was enabled
    pub audit: Option<UnimodalityAudit>,
}

impl SolveReport {
    /// Format as a one-line summary
    pub fn summary(&self) -> String {
        let status = if self.converged {
            "converged"
        } else {
            "NOT converged"
        };
        let mut line = format!(
            "Iterations: {} | {} | fitdiff: {:.3e} | Time: {:.2}s",
            self.iterations, status, self.final_fitdiff, self.elapsed_secs
        );
        if let Some(audit) = &self.audit {
            line.push_str(&format!(
                " | Audit: {}/{} rows off (worst {:.3e})",
                audit.mismatches, audit.rows_checked, audit.worst_shortfall
            ));
        }
        line
    }

    /// Rate of outer iterations
    pub fn iterations_per_second(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.iterations as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_series() {
        let mut history = ConvergenceHistory::new(10);

        for i in 1..=50u64 {
            if history.is_due(i) {
                history.record(i, 1.0 / i as f64);
            }
        }

        let series = history.fitdiff_series();
        assert_eq!(series.len(), 5);
        assert_eq!(series[0].0, 10);
        assert_eq!(history.latest().map(|r| r.iteration), Some(50));
    }

    #[test]
    fn test_history_json_roundtrip() {
        let mut history = ConvergenceHistory::new(1);
        history.record(1, 2.5);
        history.record(2, 0.5);

        let path = std::env::temp_dir().join("stressdp_test_history.json");
        let path = path.to_string_lossy().to_string();
        history.save(&path).unwrap();
        let loaded = ConvergenceHistory::load(&path).unwrap();
        assert_eq!(loaded.records, history.records);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_report_summary() {
        let report = SolveReport {
            iterations: 12,
            max_iterations: 100,
            converged: false,
            final_fitdiff: 0.25,
            elapsed_secs: 2.0,
            audit: None,
        };
        assert!(report.summary().contains("NOT converged"));
        assert!((report.iterations_per_second() - 6.0).abs() < 1e-12);
    }
}
