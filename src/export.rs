//! Tab-separated reports for analysis in external tools.

use crate::config::{Config, ModelParams};
use crate::forward::ForwardProjection;
use crate::solver::Policy;
use crate::trajectory::TrajectoryStep;
use std::fs::File;
use std::io::{BufWriter, Result, Write};
use std::path::{Path, PathBuf};

/// Report file prefixes
pub const POLICY_PREFIX: &str = "stress";
pub const FORWARD_PREFIX: &str = "fwdCalc";
pub const TRAJECTORY_PREFIX: &str = "simAttacks";

/// Export system for saving solver output
pub struct ExportSystem;

impl ExportSystem {
    /// File name keyed by the parameters that vary between runs,
    /// e.g. `stressL0.500000A0.100000Kmort0.000000Kfec0.050000.txt`
    pub fn output_name(prefix: &str, params: &ModelParams) -> String {
        format!(
            "{}L{:.6}A{:.6}Kmort{:.6}Kfec{:.6}.txt",
            prefix, params.p_leave, params.p_arrive, params.k_mort, params.k_fec
        )
    }

    /// Write the decision table
    pub fn write_policy<W: Write>(out: &mut W, policy: &Policy, seed: Option<u64>) -> Result<()> {
        if let Some(seed) = seed {
            writeln!(out, "seed\t{}", seed)?;
        }
        if !policy.converged {
            writeln!(
                out,
                "*** DID NOT CONVERGE WITHIN {} ITERATIONS ***",
                policy.iterations
            )?;
        }

        writeln!(out, "t\td\tts\thormone")?;
        for entry in policy.entries() {
            writeln!(out, "{}\t{}\t{}\t{}", entry.t, entry.d, entry.ts, entry.hormone)?;
        }

        writeln!(out)?;
        writeln!(out, "nIterations\t{}", policy.iterations)?;
        writeln!(out)?;
        Ok(())
    }

    /// Echo every scalar and constant of the run
    pub fn write_parameters<W: Write>(out: &mut W, config: &Config) -> Result<()> {
        let p = &config.params;
        let c = &config.constants;
        let l = &config.lattice;

        writeln!(out)?;
        writeln!(out, "PARAMETER VALUES")?;
        writeln!(out, "pLeave: \t{}", p.p_leave)?;
        writeln!(out, "pArrive: \t{}", p.p_arrive)?;
        writeln!(out, "pAttack: \t{}", p.p_attack)?;
        writeln!(out, "alpha: \t{}", p.alpha)?;
        writeln!(out, "mu0: \t{}", c.mu0)?;
        writeln!(out, "Kmort: \t{}", p.k_mort)?;
        writeln!(out, "Kfec: \t{}", p.k_fec)?;
        writeln!(out, "maxI: \t{}", config.solver.max_iterations)?;
        writeln!(out, "maxT: \t{}", l.max_t)?;
        writeln!(out, "maxTs: \t{}", l.max_ts)?;
        writeln!(out, "maxD: \t{}", l.max_d)?;
        writeln!(out, "maxH: \t{}", l.max_h)?;
        writeln!(out, "hmin: \t{}", c.hmin)?;
        writeln!(out, "hslope: \t{}", c.hslope)?;
        writeln!(out, "repair: \t{}", c.repair)?;
        writeln!(out, "tolerance: \t{:e}", config.solver.tolerance)?;
        Ok(())
    }

    /// Death tallies followed by every occupied state
    pub fn write_forward<W: Write>(out: &mut W, projection: &ForwardProjection<'_>) -> Result<()> {
        let deaths = projection.deaths();

        writeln!(out, "SUMMARY STATS")?;
        writeln!(out, "predDeaths: \t{}", deaths.predation)?;
        writeln!(out, "damageDeaths: \t{}", deaths.damage)?;
        writeln!(out, "bkgrndDeaths: \t{}", deaths.background)?;
        writeln!(out, "cycles: \t{}", projection.cycle())?;
        if !projection.is_converged() {
            writeln!(out, "*** NOT STATIONARY AFTER {} CYCLES ***", projection.cycle())?;
        }
        writeln!(out)?;

        writeln!(out, "t\tts\tdamage\thormone\tfreq")?;
        for ((t, ts, d, h), freq) in projection.occupied() {
            writeln!(out, "{}\t{}\t{}\t{}\t{:.4}", t, ts, d, h, freq)?;
        }
        Ok(())
    }

    /// One line per simulated time step
    pub fn write_trajectory<W: Write>(out: &mut W, steps: &[TrajectoryStep]) -> Result<()> {
        writeln!(out, "time\tt\tts\tdamage\thormone\tattack\treproduce")?;
        for step in steps {
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                step.time,
                step.t,
                step.ts,
                step.damage,
                step.hormone,
                step.attack as u8,
                step.reproduce as u8
            )?;
        }
        Ok(())
    }

    /// Policy report with the parameter echo appended
    pub fn export_policy<P: AsRef<Path>>(
        dir: P,
        config: &Config,
        policy: &Policy,
        seed: Option<u64>,
    ) -> Result<PathBuf> {
        let path = dir
            .as_ref()
            .join(Self::output_name(POLICY_PREFIX, &config.params));
        let mut file = BufWriter::new(File::create(&path)?);

        Self::write_policy(&mut file, policy, seed)?;
        Self::write_parameters(&mut file, config)?;
        file.flush()?;

        Ok(path)
    }

    pub fn export_forward<P: AsRef<Path>>(
        dir: P,
        config: &Config,
        projection: &ForwardProjection<'_>,
    ) -> Result<PathBuf> {
        let path = dir
            .as_ref()
            .join(Self::output_name(FORWARD_PREFIX, &config.params));
        let mut file = BufWriter::new(File::create(&path)?);

        Self::write_forward(&mut file, projection)?;
        file.flush()?;

        Ok(path)
    }

    pub fn export_trajectory<P: AsRef<Path>>(
        dir: P,
        config: &Config,
        steps: &[TrajectoryStep],
    ) -> Result<PathBuf> {
        let path = dir
            .as_ref()
            .join(Self::output_name(TRAJECTORY_PREFIX, &config.params));
        let mut file = BufWriter::new(File::create(&path)?);

        Self::write_trajectory(&mut file, steps)?;
        file.flush()?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::Lattice;
    use crate::model::ModelTables;
    use crate::solver::SimulationState;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.lattice.max_t = 3;
        config.lattice.max_ts = 2;
        config.lattice.max_d = 4;
        config.lattice.max_h = 10;
        config
    }

    fn flat_policy(lattice: Lattice, converged: bool) -> Policy {
        let mut state = SimulationState::new(lattice);
        state.hormone.fill(3);
        Policy::from_state(&state, 42, converged)
    }

    fn as_text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_output_name() {
        let params = ModelParams::default();
        assert_eq!(
            ExportSystem::output_name(POLICY_PREFIX, &params),
            "stressL0.500000A0.100000Kmort0.000000Kfec0.050000.txt"
        );
        assert!(ExportSystem::output_name(TRAJECTORY_PREFIX, &params).starts_with("simAttacksL"));
    }

    #[test]
    fn test_policy_report_layout() {
        let config = small_config();
        let policy = flat_policy(config.lattice(), true);

        let mut buf = Vec::new();
        ExportSystem::write_policy(&mut buf, &policy, Some(7)).unwrap();
        let text = as_text(buf);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "seed\t7");
        assert_eq!(lines[1], "t\td\tts\thormone");
        assert_eq!(lines[2], "0\t0\t0\t3");
        // 4 t x 2 ts x 5 d rows
        assert_eq!(lines.iter().filter(|l| l.ends_with("\t3")).count(), 4 * 2 * 5);
        assert!(text.contains("nIterations\t42"));
        assert!(!text.contains("DID NOT CONVERGE"));
    }

    #[test]
    fn test_policy_report_flags_non_convergence() {
        let config = small_config();
        let policy = flat_policy(config.lattice(), false);

        let mut buf = Vec::new();
        ExportSystem::write_policy(&mut buf, &policy, None).unwrap();
        let text = as_text(buf);

        assert!(text.starts_with("*** DID NOT CONVERGE WITHIN 42 ITERATIONS ***"));
    }

    #[test]
    fn test_parameter_echo() {
        let mut buf = Vec::new();
        ExportSystem::write_parameters(&mut buf, &small_config()).unwrap();
        let text = as_text(buf);

        assert!(text.contains("PARAMETER VALUES"));
        assert!(text.contains("pLeave: \t0.5"));
        assert!(text.contains("maxH: \t10"));
        assert!(text.contains("repair: \t1"));
    }

    #[test]
    fn test_forward_table_lists_initial_mass() {
        let config = small_config();
        let tables = ModelTables::new(&config);
        let policy = flat_policy(config.lattice(), true);
        let projection = ForwardProjection::new(&policy, &tables, &config.forward);

        let mut buf = Vec::new();
        ExportSystem::write_forward(&mut buf, &projection).unwrap();
        let text = as_text(buf);

        assert!(text.starts_with("SUMMARY STATS"));
        assert!(text.contains("predDeaths: \t0"));
        assert!(text.contains("3\t0\t0\t0\t1.0000"));
    }

    #[test]
    fn test_trajectory_log() {
        let steps = [TrajectoryStep {
            time: 0,
            t: 3,
            ts: 0,
            damage: 1,
            hormone: 3,
            attack: false,
            reproduce: true,
        }];

        let mut buf = Vec::new();
        ExportSystem::write_trajectory(&mut buf, &steps).unwrap();
        assert_eq!(
            as_text(buf),
            "time\tt\tts\tdamage\thormone\tattack\treproduce\n0\t3\t0\t1\t3\t0\t1\n"
        );
    }

    #[test]
    fn test_export_policy_file() {
        let config = small_config();
        let policy = flat_policy(config.lattice(), true);
        let dir = std::env::temp_dir().join("stressdp_test_export");
        std::fs::create_dir_all(&dir).unwrap();

        let path = ExportSystem::export_policy(&dir, &config, &policy, None).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("nIterations\t42"));
        assert!(text.contains("PARAMETER VALUES"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
