//! Optimization data types.

use serde::{Deserialize, Serialize};

/// Food source of the colony.
///
/// The fitness is always the objective evaluated at the current position,
/// and both are only ever replaced together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodSource {
    position: Vec<f64>,
    fitness: f64,
    trials: usize,
}

impl FoodSource {
    /// Create a fresh food source with a zero trial counter.
    pub fn new(position: Vec<f64>, fitness: f64) -> Self {
        Self {
            position,
            fitness,
            trials: 0,
        }
    }

    pub fn position(&self) -> &[f64] {
        &self.position
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Number of consecutive attempts that failed to improve this source.
    pub fn trials(&self) -> usize {
        self.trials
    }

    /// Count one failed improvement attempt.
    pub fn deplete(&mut self) {
        self.trials += 1;
    }
}

/// State of the colony at the end of one iteration.
///
/// Contains everything an external renderer needs to draw the iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Zero-based iteration index.
    pub iteration: usize,

    /// Food source positions (`n_sources x dim`).
    pub positions: Vec<Vec<f64>>,
    /// Food source fitness values.
    pub fitness: Vec<f64>,
    /// Food source trial counters.
    pub trials: Vec<usize>,

    /// Proposed employed bee positions (display only).
    pub employed: Vec<Vec<f64>>,
    /// Proposed onlooker bee positions (display only).
    pub onlooker: Vec<Vec<f64>>,
    /// Fresh positions of the sources abandoned this iteration.
    pub scout: Vec<Vec<f64>>,

    /// Highest fitness in the current population.
    pub max_fitness: f64,
    /// Newest entry of the best-fitness history (best ever seen, including
    /// abandoned sources).
    pub best_fitness: f64,
}
