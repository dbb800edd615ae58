use crate::objective::{Evaluate, Objective};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Colony parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ColonyConfig {
    /// Number of food sources (population slots).
    pub num_food_sources: usize,
    /// Number of employed bees (defaults to the number of food sources).
    pub num_employed_bees: Option<usize>,
    /// Number of onlooker draws per iteration.
    pub num_onlooker_bees: usize,
    /// Number of scout bees. Informational only, abandonment is driven by `limit`.
    pub num_scout_bees: usize,

    /// Dimension of the search domain.
    pub dim: usize,
    /// Stagnation threshold: a source is abandoned once its trial counter exceeds it.
    pub limit: usize,

    /// Lower bound of every coordinate at initialization.
    pub lower: f64,
    /// Upper bound of every coordinate at initialization.
    pub upper: f64,

    /// Function being optimized.
    pub objective: Objective,
}

impl ColonyConfig {
    pub fn num_employed_bees(&self) -> usize {
        self.num_employed_bees.unwrap_or(self.num_food_sources)
    }
}

/// Run parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of iterations.
    pub iterations: usize,
    /// Random generator seed (taken from the OS if absent).
    pub seed: Option<u64>,
}

/// Output parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Amplitude of the display jitter of employed bees.
    pub employed_jitter: f64,
    /// Amplitude of the display jitter of onlooker bees.
    pub onlooker_jitter: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            employed_jitter: 2.0,
            onlooker_jitter: 3.0,
        }
    }
}

/// Optimization configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub colony: ColonyConfig,
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let colony = &self.colony;

        check_num(colony.num_food_sources, 2..).context("invalid number of food sources")?;
        let num_employed_bees = colony.num_employed_bees();
        if num_employed_bees != colony.num_food_sources {
            bail!(
                "number of employed bees must equal the number of food sources ({}), but is {num_employed_bees}",
                colony.num_food_sources
            );
        }
        check_num(colony.dim, 1..).context("invalid dimension")?;

        check_finite(colony.lower).context("invalid lower bound")?;
        check_finite(colony.upper).context("invalid upper bound")?;
        if colony.lower >= colony.upper {
            bail!(
                "lower bound must be below upper bound, but bounds are [{}, {}]",
                colony.lower,
                colony.upper
            );
        }
        check_objective(colony).context("invalid bounds for objective")?;

        check_finite(self.output.employed_jitter).context("invalid employed jitter")?;
        check_num(self.output.employed_jitter, 0.0..).context("invalid employed jitter")?;
        check_finite(self.output.onlooker_jitter).context("invalid onlooker jitter")?;
        check_num(self.output.onlooker_jitter, 0.0..).context("invalid onlooker jitter")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

// The benchmarks grow fastest towards the corners of the domain.
fn check_objective(colony: &ColonyConfig) -> Result<()> {
    let (lower, upper) = (colony.lower, colony.upper);
    let corners = [
        vec![lower; colony.dim],
        vec![upper; colony.dim],
        (0..colony.dim)
            .map(|i| if i % 2 == 0 { upper } else { lower })
            .collect(),
        (0..colony.dim)
            .map(|i| if i % 2 == 0 { lower } else { upper })
            .collect(),
    ];
    for corner in &corners {
        let fitness = colony.objective.evaluate(corner)?;
        if !fitness.is_finite() {
            bail!("{:?} is not finite at {corner:?}", colony.objective);
        }
    }
    Ok(())
}

fn check_finite(num: f64) -> Result<()> {
    if !num.is_finite() {
        bail!("number must be finite, but is {num}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
[colony]
num_food_sources = 10
num_onlooker_bees = 5
num_scout_bees = 1
dim = 2
limit = 5
lower = -50.0
upper = 50.0
objective = "sphere"

[run]
iterations = 50
seed = 42
"#;

    #[test]
    fn valid_config_parses() {
        let cfg = Config::from_toml(VALID).unwrap();
        assert_eq!(cfg.colony.num_food_sources, 10);
        assert_eq!(cfg.colony.num_employed_bees(), 10);
        assert_eq!(cfg.colony.objective, Objective::Sphere);
        assert_eq!(cfg.run.seed, Some(42));
        assert_eq!(cfg.output, OutputConfig::default());
    }

    #[test]
    fn single_food_source_is_rejected() {
        let toml = VALID.replace("num_food_sources = 10", "num_food_sources = 1");
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(format!("{err:#}").contains("invalid number of food sources"));
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let toml = VALID.replace("dim = 2", "dim = 0");
        assert!(Config::from_toml(&toml).is_err());
    }

    #[test]
    fn negative_limit_is_rejected() {
        let toml = VALID.replace("limit = 5", "limit = -1");
        assert!(Config::from_toml(&toml).is_err());
    }

    #[test]
    fn bad_bounds_are_rejected() {
        let toml = VALID.replace("upper = 50.0", "upper = inf");
        assert!(Config::from_toml(&toml).is_err());
        let toml = VALID.replace("upper = 50.0", "upper = -60.0");
        assert!(Config::from_toml(&toml).is_err());
    }

    #[test]
    fn overflowing_bounds_are_rejected() {
        let toml = VALID
            .replace("lower = -50.0", "lower = -1e80")
            .replace("upper = 50.0", "upper = 1e80")
            .replace("\"sphere\"", "\"rosenbrock\"");
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(format!("{err:#}").contains("invalid bounds for objective"));

        let toml = VALID
            .replace("lower = -50.0", "lower = -1e80")
            .replace("upper = 50.0", "upper = 1e80");
        assert!(Config::from_toml(&toml).is_ok());

        let toml = VALID.replace("upper = 50.0", "upper = 1e200");
        assert!(Config::from_toml(&toml).is_err());
    }

    #[test]
    fn mismatched_employed_bees_are_rejected() {
        let toml = VALID.replace("num_onlooker_bees = 5", "num_onlooker_bees = 5\nnum_employed_bees = 7");
        assert!(Config::from_toml(&toml).is_err());
        let toml = VALID.replace("num_onlooker_bees = 5", "num_onlooker_bees = 5\nnum_employed_bees = 10");
        assert!(Config::from_toml(&toml).is_ok());
    }
}
