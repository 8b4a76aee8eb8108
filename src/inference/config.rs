//! Inference configuration

use crate::training::default_artifact_dir;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the artifact pair lives and how verdicts are drawn from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Directory holding the artifact pair
    pub artifact_dir: PathBuf,

    /// Bot probability at or above which a record is labeled a bot
    pub classification_threshold: f64,

    /// Batches at least this large are scored in parallel
    pub parallel_min_batch: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            classification_threshold: 0.5,
            parallel_min_batch: 256,
        }
    }
}

impl InferenceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// Probabilities at or above `threshold` are labeled bots
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.classification_threshold = threshold;
        self
    }

    pub fn with_parallel_min_batch(mut self, n: usize) -> Self {
        self.parallel_min_batch = n.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = InferenceConfig::new()
            .with_threshold(0.7)
            .with_artifact_dir("/srv/models")
            .with_parallel_min_batch(0);
        assert_eq!(config.classification_threshold, 0.7);
        assert_eq!(config.artifact_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.parallel_min_batch, 1);
    }
}
