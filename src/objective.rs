use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Maps a position of the search domain to its fitness (larger is better).
///
/// An `Err` is fatal for the run. A non-finite fitness is not an error here:
/// the colony rejects it for drawn positions and never accepts it as an
/// improvement.
pub trait Evaluate {
    fn evaluate(&self, position: &[f64]) -> Result<f64>;
}

/// Benchmark functions to minimize.
///
/// The fitness returned by [`Evaluate::evaluate`] is the negated function
/// value, so the global optimum of every variant has fitness 0.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Sum of squares.
    Sphere,
    /// Sphere with a cosine modulation (many local optima).
    Rastrigin,
    /// Banana-shaped valley, optimum at (1, ..., 1).
    Rosenbrock,
}

impl Objective {
    fn value(&self, x: &[f64]) -> f64 {
        match self {
            Objective::Sphere => x.iter().map(|ele| ele * ele).sum(),
            Objective::Rastrigin => {
                let a = 10.0;
                a * x.len() as f64
                    + x.iter()
                        .map(|ele| ele * ele - a * (2.0 * PI * ele).cos())
                        .sum::<f64>()
            }
            Objective::Rosenbrock => x
                .windows(2)
                .map(|pair| 100.0 * (pair[1] - pair[0] * pair[0]).powi(2) + (1.0 - pair[0]).powi(2))
                .sum(),
        }
    }
}

impl Evaluate for Objective {
    fn evaluate(&self, position: &[f64]) -> Result<f64> {
        Ok(-self.value(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_is_negated_sum_of_squares() {
        let fitness = Objective::Sphere.evaluate(&[3.0, -4.0]).unwrap();
        assert_eq!(fitness, -25.0);
        assert_eq!(Objective::Sphere.evaluate(&[0.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn optima_have_zero_fitness() {
        assert!(Objective::Rastrigin.evaluate(&[0.0; 3]).unwrap().abs() < 1e-12);
        assert_eq!(Objective::Rosenbrock.evaluate(&[1.0; 4]).unwrap(), 0.0);
        assert!(Objective::Rastrigin.evaluate(&[0.5, 0.5]).unwrap() < 0.0);
        assert!(Objective::Rosenbrock.evaluate(&[0.0, 0.0]).unwrap() < 0.0);
    }

    #[test]
    fn overflow_is_not_finite() {
        let fitness = Objective::Sphere.evaluate(&[f64::MAX, f64::MAX]).unwrap();
        assert_eq!(fitness, f64::NEG_INFINITY);
        assert!(Objective::Rosenbrock.evaluate(&[1e80, 1e80]).unwrap().is_infinite());
        assert!(Objective::Sphere.evaluate(&[f64::NAN]).unwrap().is_nan());
    }
}
