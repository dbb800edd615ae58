use crate::config::Config;
use crate::model::{FoodSource, Snapshot};
use crate::objective::{Evaluate, Objective};
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::{Uniform, weighted::WeightedIndex};
use rmp_serde::encode;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Keeps the onlooker normalization finite when all fitness values are equal.
const EPSILON: f64 = 1e-10;

/// Artificial bee colony.
///
/// Holds the configuration, the food sources, the best-fitness history and
/// the random number generator, and provides methods to advance the
/// optimization one phase or one iteration at a time.
pub struct Colony<E = Objective> {
    cfg: Config,
    objective: E,
    sources: Vec<FoodSource>,
    best: FoodSource,
    history: Vec<f64>,
    rng: ChaCha12Rng,
}

impl Colony {
    /// Create a new `Colony` with the configured objective and random food sources.
    ///
    /// The generator is seeded from the configuration if a seed is given,
    /// and from the OS otherwise.
    pub fn new(cfg: Config) -> Result<Self> {
        let rng = match cfg.run.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };
        let objective = cfg.colony.objective;
        Self::with_objective(cfg, objective, rng)
    }
}

impl<E: Evaluate> Colony<E> {
    /// Create a new `Colony` optimizing `objective`, with food sources drawn
    /// uniformly within the configured bounds.
    pub fn with_objective(cfg: Config, objective: E, mut rng: ChaCha12Rng) -> Result<Self> {
        let pos_dist = Uniform::new(cfg.colony.lower, cfg.colony.upper)?;
        let positions = (0..cfg.colony.num_food_sources)
            .map(|_| random_position(&pos_dist, cfg.colony.dim, &mut rng))
            .collect();
        Self::from_positions(cfg, objective, positions, rng)
    }

    /// Create a new `Colony` with food sources at the given positions.
    pub fn from_positions(
        cfg: Config,
        objective: E,
        positions: Vec<Vec<f64>>,
        rng: ChaCha12Rng,
    ) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;

        let n_sources = cfg.colony.num_food_sources;
        if positions.len() != n_sources {
            bail!("expected {n_sources} positions, but got {}", positions.len());
        }
        let dim = cfg.colony.dim;
        if let Some(position) = positions.iter().find(|position| position.len() != dim) {
            bail!("position length must be {dim}, but is {}", position.len());
        }

        let sources = positions
            .into_iter()
            .map(|position| {
                let fitness = evaluate_drawn(&objective, &position)
                    .context("failed to evaluate initial position")?;
                Ok(FoodSource::new(position, fitness))
            })
            .collect::<Result<Vec<_>>>()?;

        let best = sources
            .iter()
            .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
            .context("colony has no food sources")?
            .clone();

        let history = Vec::new();

        Ok(Self {
            cfg,
            objective,
            sources,
            best,
            history,
            rng,
        })
    }

    pub fn sources(&self) -> &[FoodSource] {
        &self.sources
    }

    /// Best fitness recorded at the end of every completed iteration.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Best food source found so far, including abandoned ones.
    pub fn best(&self) -> &FoodSource {
        &self.best
    }

    /// Run the configured number of iterations and save every snapshot to a binary file.
    pub fn perform_run<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let iterations = self.cfg.run.iterations;
        let iters_per_log = (iterations / 10).max(1);

        for i_iter in 0..iterations {
            let snapshot = self
                .step()
                .with_context(|| format!("failed to perform iteration {i_iter}"))?;

            encode::write(&mut writer, &snapshot).context("failed to serialize snapshot")?;

            if (i_iter + 1) % iters_per_log == 0 || i_iter + 1 == iterations {
                let progress = 100.0 * (i_iter + 1) as f64 / iterations as f64;
                log::info!(
                    "completed {progress:06.2}% (best fitness {:e})",
                    snapshot.best_fitness
                );
            }
        }

        writer.flush().context("failed to flush writer stream")?;

        log::info!(
            "best fitness {:e} at {:?}",
            self.best.fitness(),
            self.best.position()
        );

        Ok(())
    }

    /// Perform one full iteration (employed, onlooker and scout phases).
    pub fn step(&mut self) -> Result<Snapshot> {
        let employed = self
            .employed_phase()
            .context("failed to perform employed phase")?;

        let onlooker = self
            .onlooker_phase()
            .context("failed to perform onlooker phase")?;

        let scout = self.scout_phase().context("failed to perform scout phase")?;

        let best_fitness = self.best.fitness();
        self.history.push(best_fitness);

        let max_fitness = self
            .sources
            .iter()
            .map(FoodSource::fitness)
            .fold(f64::NEG_INFINITY, f64::max);

        Ok(Snapshot {
            iteration: self.history.len() - 1,
            positions: self.sources.iter().map(|s| s.position().to_vec()).collect(),
            fitness: self.sources.iter().map(FoodSource::fitness).collect(),
            trials: self.sources.iter().map(FoodSource::trials).collect(),
            employed,
            onlooker,
            scout,
            max_fitness,
            best_fitness,
        })
    }

    /// Exploit every food source once.
    ///
    /// Returns the proposed employed bee positions.
    pub fn employed_phase(&mut self) -> Result<Vec<Vec<f64>>> {
        let n_bees = self.cfg.colony.num_employed_bees();
        let jitter = self.cfg.output.employed_jitter;

        let mut proposed = Vec::with_capacity(n_bees);
        for i_src in 0..n_bees {
            let candidate = self.neighbor_search(i_src)?;
            self.try_improve(i_src, candidate)
                .with_context(|| format!("failed to exploit food source {i_src}"))?;
            proposed.push(self.jitter(i_src, jitter)?);
        }

        Ok(proposed)
    }

    /// Exploit food sources chosen with fitness-proportional probability.
    ///
    /// Returns the proposed onlooker bee positions.
    pub fn onlooker_phase(&mut self) -> Result<Vec<Vec<f64>>> {
        let n_bees = self.cfg.colony.num_onlooker_bees;
        let jitter = self.cfg.output.onlooker_jitter;

        let prob = self.selection_probabilities();
        let src_dist =
            WeightedIndex::new(&prob).context("failed to build selection distribution")?;

        let mut proposed = Vec::with_capacity(n_bees);
        for _ in 0..n_bees {
            let i_src = src_dist.sample(&mut self.rng);
            let candidate = self.neighbor_search(i_src)?;
            self.try_improve(i_src, candidate)
                .with_context(|| format!("failed to exploit food source {i_src}"))?;
            proposed.push(self.jitter(i_src, jitter)?);
        }

        Ok(proposed)
    }

    /// Replace every food source whose trial counter exceeds the limit.
    ///
    /// Returns the fresh positions of the abandoned sources.
    pub fn scout_phase(&mut self) -> Result<Vec<Vec<f64>>> {
        let limit = self.cfg.colony.limit;
        let pos_dist = Uniform::new(self.cfg.colony.lower, self.cfg.colony.upper)?;

        let mut scouts = Vec::new();
        for i_src in 0..self.sources.len() {
            if self.sources[i_src].trials() <= limit {
                continue;
            }

            let position = random_position(&pos_dist, self.cfg.colony.dim, &mut self.rng);
            let fitness = evaluate_drawn(&self.objective, &position)
                .context("failed to evaluate scouted position")?;
            log::debug!(
                "abandoned food source {i_src} after {} trials",
                self.sources[i_src].trials()
            );

            scouts.push(position.clone());
            self.sources[i_src] = FoodSource::new(position, fitness);
            self.remember(i_src);
        }

        Ok(scouts)
    }

    /// Fitness-proportional selection probabilities after min-max normalization.
    ///
    /// The worst source gets probability zero. If every source is equally fit
    /// the probabilities are uniform.
    pub fn selection_probabilities(&self) -> Vec<f64> {
        let (min, max) = self
            .sources
            .iter()
            .map(FoodSource::fitness)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), fitness| {
                (min.min(fitness), max.max(fitness))
            });

        let mut prob: Vec<_> = self
            .sources
            .iter()
            .map(|s| (s.fitness() - min) / (max - min + EPSILON))
            .collect();

        let sum: f64 = prob.iter().sum();
        if sum > 0.0 && sum.is_finite() {
            prob.iter_mut().for_each(|ele| *ele /= sum);
        } else {
            let n_sources = prob.len() as f64;
            prob.iter_mut().for_each(|ele| *ele = 1.0 / n_sources);
        }
        prob
    }

    /// Generate a candidate near food source `i_src`, using a random peer.
    pub fn neighbor_search(&mut self, i_src: usize) -> Result<Vec<f64>> {
        let i_peer = self.choose_peer(i_src);

        let phi_dist = Uniform::new_inclusive(-1.0, 1.0)?;
        let phi: Vec<_> = (0..self.cfg.colony.dim)
            .map(|_| phi_dist.sample(&mut self.rng))
            .collect();

        Ok(explore(
            self.sources[i_src].position(),
            self.sources[i_peer].position(),
            &phi,
        ))
    }

    /// Replace food source `i_src` if `candidate` is strictly fitter,
    /// otherwise count a failed trial.
    ///
    /// A candidate with non-finite fitness counts as a failed trial.
    ///
    /// Returns whether the source was improved.
    pub fn try_improve(&mut self, i_src: usize, candidate: Vec<f64>) -> Result<bool> {
        let fitness = self
            .objective
            .evaluate(&candidate)
            .context("failed to evaluate candidate")?;

        let source = &mut self.sources[i_src];
        if fitness.is_finite() && fitness > source.fitness() {
            *source = FoodSource::new(candidate, fitness);
            self.remember(i_src);
            Ok(true)
        } else {
            source.deplete();
            Ok(false)
        }
    }

    // Uniform over the other n_sources - 1 slots.
    fn choose_peer(&mut self, i_src: usize) -> usize {
        let mut i_peer = self.rng.random_range(0..self.sources.len() - 1);
        if i_peer >= i_src {
            i_peer += 1;
        }
        i_peer
    }

    fn jitter(&mut self, i_src: usize, amplitude: f64) -> Result<Vec<f64>> {
        let jitter_dist = Uniform::new_inclusive(-amplitude, amplitude)?;
        Ok(self.sources[i_src]
            .position()
            .iter()
            .map(|ele| ele + jitter_dist.sample(&mut self.rng))
            .collect())
    }

    fn remember(&mut self, i_src: usize) {
        if self.sources[i_src].fitness() > self.best.fitness() {
            self.best = self.sources[i_src].clone();
        }
    }
}

/// Neighbor search formula: `current + phi * (current - peer)`, element-wise.
///
/// The result is not clamped to the domain bounds.
pub fn explore(current: &[f64], peer: &[f64], phi: &[f64]) -> Vec<f64> {
    current
        .iter()
        .zip(peer)
        .zip(phi)
        .map(|((x, y), p)| x + p * (x - y))
        .collect()
}

// Drawn positions lie within the validated bounds, where the fitness must be finite.
fn evaluate_drawn<E: Evaluate>(objective: &E, position: &[f64]) -> Result<f64> {
    let fitness = objective.evaluate(position)?;
    if !fitness.is_finite() {
        bail!("fitness is not finite at {position:?}");
    }
    Ok(fitness)
}

fn random_position(pos_dist: &Uniform<f64>, dim: usize, rng: &mut ChaCha12Rng) -> Vec<f64> {
    (0..dim).map(|_| pos_dist.sample(rng)).collect()
}
