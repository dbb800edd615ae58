use crate::config::Config;
use crate::model::Snapshot;
use crate::stats::Accumulator;
use anyhow::{Context, Result};
use rmp_serde::decode;
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

pub trait Obs {
    fn update(&mut self, snapshot: &Snapshot) -> Result<()>;
    fn report(&self) -> serde_json::Value;
}

pub struct BestFitness {
    best_fitness: Option<f64>,
    n_improving_iters: usize,
    last_improving_iter: Option<usize>,
}

impl BestFitness {
    pub fn new() -> Self {
        Self {
            best_fitness: None,
            n_improving_iters: 0,
            last_improving_iter: None,
        }
    }
}

impl Obs for BestFitness {
    fn update(&mut self, snapshot: &Snapshot) -> Result<()> {
        let improved = match self.best_fitness {
            Some(best_fitness) => snapshot.best_fitness > best_fitness,
            None => true,
        };
        if improved {
            if self.best_fitness.is_some() {
                self.n_improving_iters += 1;
            }
            self.last_improving_iter = Some(snapshot.iteration);
        }
        self.best_fitness = Some(snapshot.best_fitness);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "best_fitness": {
                "final": self.best_fitness,
                "n_improving_iters": self.n_improving_iters,
                "last_improving_iter": self.last_improving_iter,
            }
        })
    }
}

pub struct Abandonments {
    n_total: usize,
    acc: Accumulator,
}

impl Abandonments {
    pub fn new() -> Self {
        Self {
            n_total: 0,
            acc: Accumulator::new(),
        }
    }
}

impl Obs for Abandonments {
    fn update(&mut self, snapshot: &Snapshot) -> Result<()> {
        let n_scouts = snapshot.scout.len();
        self.n_total += n_scouts;
        self.acc.add(n_scouts as f64);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "abandonments": {
                "total": self.n_total,
                "per_iter": self.acc.report(),
            }
        })
    }
}

pub struct PopFitness {
    mean_fitness: Option<f64>,
}

impl PopFitness {
    pub fn new() -> Self {
        Self { mean_fitness: None }
    }
}

impl Obs for PopFitness {
    fn update(&mut self, snapshot: &Snapshot) -> Result<()> {
        let mut acc = Accumulator::new();
        snapshot.fitness.iter().for_each(|&fitness| acc.add(fitness));
        self.mean_fitness = Some(acc.report().mean);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "pop_fitness": { "final_mean": self.mean_fitness } })
    }
}

pub struct Analyzer {
    cfg: Config,
    n_iters: usize,
    final_best: Option<f64>,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(cfg: Config) -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(BestFitness::new()),
            Box::new(Abandonments::new()),
            Box::new(PopFitness::new()),
        ];
        Self {
            cfg,
            n_iters: 0,
            final_best: None,
            obs_ptr_vec,
        }
    }

    /// Best fitness of the last snapshot read.
    pub fn final_best(&self) -> Option<f64> {
        self.final_best
    }

    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        for _ in 0..self.cfg.run.iterations {
            let snapshot: Snapshot =
                decode::from_read(&mut reader).context("failed to read snapshot")?;
            for obs in &mut self.obs_ptr_vec {
                obs.update(&snapshot).context("failed to update observable")?;
            }
            self.n_iters += 1;
            self.final_best = Some(snapshot.best_fitness);
        }
        Ok(())
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);

        let mut reports = vec![serde_json::json!({ "n_iters": self.n_iters })];
        reports.extend(self.obs_ptr_vec.iter().map(|obs| obs.report()));
        serde_json::to_writer_pretty(writer, &reports).context("failed to serialize results")?;
        Ok(())
    }
}
