use crate::analysis::Analyzer;
use crate::colony::Colony;
use crate::config::Config;
use crate::stats::Accumulator;
use anyhow::{Context, Result};
use glob::glob;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    pub fn create_run(&self) -> Result<()> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let result = self.perform_run(run_idx);
        discard_on_error(&run_dir, result)
    }

    fn perform_run(&self, run_idx: usize) -> Result<()> {
        let mut colony = Colony::new(self.cfg.clone()).context("failed to initialize colony")?;

        colony
            .perform_run(self.trajectory_file(run_idx))
            .context("failed to perform run")?;

        let n_stagnant = colony
            .sources()
            .iter()
            .filter(|source| source.trials() > 0)
            .count();
        log::info!(
            "finished {} iterations with {n_stagnant} stagnant food sources",
            colony.history().len()
        );

        Ok(())
    }

    pub fn analyze_sim(&self) -> Result<()> {
        let mut final_best = Accumulator::new();

        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let mut analyzer = Analyzer::new(self.cfg.clone());

            analyzer
                .add_file(self.trajectory_file(run_idx))
                .context("failed to add file")?;

            analyzer
                .save_results(self.results_file(run_idx))
                .context("failed to save results")?;

            if let Some(best_fitness) = analyzer.final_best() {
                final_best.add(best_fitness);
            }
            log::info!("analyzed {:?}", self.run_dir(run_idx));
        }

        let file = self.summary_file();
        let file = File::create(&file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);
        let summary = serde_json::json!({
            "n_runs": n_runs,
            "final_best_fitness": final_best.report(),
        });
        serde_json::to_writer_pretty(writer, &summary).context("failed to serialize summary")?;

        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        for run_dir in glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_dir())
        {
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }

        let summary_file = self.summary_file();
        if summary_file.exists() {
            fs::remove_file(&summary_file)
                .with_context(|| format!("failed to remove {summary_file:?}"))?;
        }

        Ok(())
    }

    fn count_run_dirs(&self) -> Result<usize> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let count = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_dir())
            .count();
        Ok(count)
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn trajectory_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("trajectory.msgpack")
    }

    fn results_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("results.json")
    }

    fn summary_file(&self) -> PathBuf {
        self.sim_dir.join("summary.json")
    }
}

// A partial run directory would break every later analysis.
fn discard_on_error(run_dir: &Path, result: Result<()>) -> Result<()> {
    if result.is_err() {
        match fs::remove_dir_all(run_dir) {
            Ok(()) => log::warn!("removed incomplete {run_dir:?}"),
            Err(error) => log::error!("failed to remove incomplete {run_dir:?}: {error}"),
        }
    }
    result
}
