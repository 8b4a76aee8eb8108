//! Training configuration

use crate::dataset::DatasetConfig;
use crate::error::Result;
use crate::feature_engineering::DEFAULT_MAX_FEATURES;
use crate::training::grid_search::ParamGrid;
use crate::training::xgboost::XGBoostConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the end-to-end training run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Split fraction and seed
    pub dataset: DatasetConfig,

    /// Vocabulary cap of the text vectorizer
    pub max_features: usize,

    /// Neighbors used by SMOTE
    pub smote_k_neighbors: usize,

    /// Hyperparameter grid
    pub grid: ParamGrid,

    /// Folds per candidate
    pub cv_folds: usize,

    /// Settings shared by every candidate (regularization, min child weight)
    pub booster: XGBoostConfig,

    /// Seed for SMOTE, fold assignment and boosting
    pub random_state: u64,

    /// Where the artifact pair is written
    pub artifact_dir: PathBuf,
}

/// `MODELS_DIR` if set, `./models` otherwise
pub fn default_artifact_dir() -> PathBuf {
    std::env::var("MODELS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./models"))
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            max_features: DEFAULT_MAX_FEATURES,
            smote_k_neighbors: 5,
            grid: ParamGrid::default(),
            cv_folds: 5,
            booster: XGBoostConfig::default(),
            random_state: 42,
            artifact_dir: default_artifact_dir(),
        }
    }
}

impl TrainerConfig {
    /// Create a new training configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON config; absent keys keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_grid(mut self, grid: ParamGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_max_features(mut self, n: usize) -> Self {
        self.max_features = n;
        self
    }

    pub fn with_dataset(mut self, dataset: DatasetConfig) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// Booster settings with the run seed applied
    pub fn base_booster(&self) -> XGBoostConfig {
        XGBoostConfig {
            random_state: Some(self.random_state),
            ..self.booster.clone()
        }
    }
}
