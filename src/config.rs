use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::models::download;
use crate::pipeline::RunOptions;

/// Central configuration loaded from environment variables.
///
/// Everything per-run (input files, strategy) comes from the command line;
/// this holds what stays the same between runs. The .env file is loaded
/// automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing downloaded ONNX models
    pub model_dir: PathBuf,
    /// Custom jieba dictionary (e.g. Traditional Chinese); bundled one if unset
    pub jieba_dict: Option<PathBuf>,
    /// Trees in the neighbor-search forest (default 10)
    pub index_trees: usize,
    /// Seed for the forest's random hyperplanes (default 42)
    pub index_seed: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let model_dir = env::var("COLDPROP_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| download::default_model_dir());

        let jieba_dict = env::var("COLDPROP_JIEBA_DICT").ok().map(PathBuf::from);

        let index_trees = match env::var("COLDPROP_INDEX_TREES") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("COLDPROP_INDEX_TREES must be a positive integer, got {v:?}"))?,
            Err(_) => 10,
        };
        if index_trees == 0 {
            anyhow::bail!("COLDPROP_INDEX_TREES must be at least 1");
        }

        let index_seed = match env::var("COLDPROP_INDEX_SEED") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("COLDPROP_INDEX_SEED must be an integer, got {v:?}"))?,
            Err(_) => 42,
        };

        Ok(Self {
            model_dir,
            jieba_dict,
            index_trees,
            index_seed,
        })
    }

    /// Run options with the configured forest settings.
    ///
    /// Epsilon must be finite and positive: an exact match sits at distance
    /// 0.0 and would otherwise get an infinite weight.
    pub fn run_options(&self, neighbors: usize, epsilon: f64) -> Result<RunOptions> {
        if !epsilon.is_finite() || epsilon <= 0.0 {
            anyhow::bail!("--epsilon must be a positive finite number, got {epsilon}");
        }
        Ok(RunOptions {
            neighbors,
            trees: self.index_trees,
            seed: self.index_seed,
            epsilon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            model_dir: PathBuf::from("/tmp/models"),
            jieba_dict: None,
            index_trees: 3,
            index_seed: 9,
        }
    }

    #[test]
    fn test_run_options_carry_forest_settings() {
        let options = config().run_options(5, 0.01).unwrap();
        assert_eq!(options.trees, 3);
        assert_eq!(options.seed, 9);
        assert_eq!(options.neighbors, 5);
        assert!((options.epsilon - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn test_run_options_reject_unusable_epsilon() {
        let config = config();
        for epsilon in [0.0, -1e-5, f64::NAN, f64::INFINITY] {
            assert!(
                config.run_options(10, epsilon).is_err(),
                "epsilon {epsilon} should be rejected"
            );
        }
    }

    #[test]
    fn test_accepted_epsilon_keeps_exact_match_weight_finite() {
        use crate::propagation::{InverseDistance, NeighborWeight};

        let options = config().run_options(10, 1e-5).unwrap();
        let weight = InverseDistance {
            epsilon: options.epsilon,
        };
        assert!(weight.weight(0.0).is_finite());
    }
}
