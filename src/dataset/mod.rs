//! Labeled dataset assembly
//!
//! Loads the bot and genuine corpora, labels them, derives the description
//! and numeric features for every record, normalizes the numeric block and
//! produces one seeded train/test split shared by all partitions.

mod split;

pub use split::{test_count, train_test_split, DatasetSplit};

use crate::error::{DetectorError, Result};
use crate::feature_engineering::{synthesize, N_NUMERIC_FEATURES};
use crate::preprocessing::MinMaxScaler;
use crate::profile::{Label, ProfileRecord};
use crate::utils::DataLoader;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Split parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    /// Seed of the split shuffle
    pub random_state: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_state: 42,
        }
    }
}

impl DatasetConfig {
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

/// Fully derived, labeled and split dataset
#[derive(Debug, Clone)]
pub struct AssembledDataset {
    pub records: Vec<ProfileRecord>,
    pub labels: Array1<i64>,
    pub descriptions: Vec<String>,
    /// Derived numeric features before scaling
    pub numeric_raw: Array2<f64>,
    /// Derived numeric features after min-max scaling
    pub numeric: Array2<f64>,
    pub scaler: MinMaxScaler,
    pub split: DatasetSplit,
    pub n_bots: usize,
    pub n_genuine: usize,
}

impl AssembledDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn train_descriptions(&self) -> Vec<String> {
        self.pick_descriptions(&self.split.train)
    }

    pub fn test_descriptions(&self) -> Vec<String> {
        self.pick_descriptions(&self.split.test)
    }

    pub fn train_numeric(&self) -> Array2<f64> {
        self.numeric.select(Axis(0), &self.split.train)
    }

    pub fn test_numeric(&self) -> Array2<f64> {
        self.numeric.select(Axis(0), &self.split.test)
    }

    pub fn train_labels(&self) -> Array1<i64> {
        self.labels.select(Axis(0), &self.split.train)
    }

    pub fn test_labels(&self) -> Array1<i64> {
        self.labels.select(Axis(0), &self.split.test)
    }

    fn pick_descriptions(&self, indices: &[usize]) -> Vec<String> {
        indices.iter().map(|&i| self.descriptions[i].clone()).collect()
    }
}

/// Builds an [`AssembledDataset`] from the two labeled corpora
#[derive(Debug, Clone, Default)]
pub struct DatasetAssembler {
    config: DatasetConfig,
    loader: DataLoader,
}

impl DatasetAssembler {
    pub fn new(config: DatasetConfig) -> Self {
        Self {
            config,
            loader: DataLoader::new(),
        }
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// Load both corpora from disk and assemble them.
    ///
    /// Both paths are checked for existence before either file is parsed.
    pub fn assemble(&self, bot_path: &Path, genuine_path: &Path) -> Result<AssembledDataset> {
        for path in [bot_path, genuine_path] {
            if !path.exists() {
                return Err(DetectorError::DatasetNotFound {
                    path: path.to_path_buf(),
                });
            }
        }

        let bots = self.loader.load_corpus(bot_path, "bot")?;
        let genuine = self.loader.load_corpus(genuine_path, "genuine")?;
        self.assemble_records(bots, genuine)
    }

    /// Assemble already-loaded records; bots first, then genuine accounts.
    pub fn assemble_records(
        &self,
        bots: Vec<ProfileRecord>,
        genuine: Vec<ProfileRecord>,
    ) -> Result<AssembledDataset> {
        if bots.is_empty() || genuine.is_empty() {
            return Err(DetectorError::ValidationError(format!(
                "Both corpora must be non-empty (bots: {}, genuine: {})",
                bots.len(),
                genuine.len()
            )));
        }

        for (corpus, records) in [("bot", &bots), ("genuine", &genuine)] {
            for (index, record) in records.iter().enumerate() {
                record.validate().map_err(|e| DetectorError::InvalidRecord {
                    corpus: corpus.to_string(),
                    index,
                    reason: e.to_string(),
                })?;
            }
        }

        let n_bots = bots.len();
        let n_genuine = genuine.len();
        let n = n_bots + n_genuine;

        let mut labels = Vec::with_capacity(n);
        labels.extend(std::iter::repeat(Label::Bot.class()).take(n_bots));
        labels.extend(std::iter::repeat(Label::Genuine.class()).take(n_genuine));

        let mut records = bots;
        records.extend(genuine);

        let mut descriptions = Vec::with_capacity(n);
        let mut numeric_raw = Array2::zeros((n, N_NUMERIC_FEATURES));
        for (i, record) in records.iter().enumerate() {
            let features = synthesize(record);
            descriptions.push(features.description);
            for (j, value) in features.numeric.iter().enumerate() {
                numeric_raw[[i, j]] = *value;
            }
        }

        let mut scaler = MinMaxScaler::new();
        let numeric = scaler.fit_transform(&numeric_raw)?;

        let split = train_test_split(n, self.config.test_size, self.config.random_state)?;

        info!(
            rows = n,
            bots = n_bots,
            genuine = n_genuine,
            train = split.n_train(),
            test = split.n_test(),
            seed = self.config.random_state,
            "Assembled dataset"
        );

        Ok(AssembledDataset {
            records,
            labels: Array1::from_vec(labels),
            descriptions,
            numeric_raw,
            numeric,
            scaler,
            split,
            n_bots,
            n_genuine,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(followers: u64, following: u64, digits: u64) -> ProfileRecord {
        ProfileRecord {
            follower_count: followers,
            following_count: following,
            biography_length: 12,
            media_count: 30,
            has_profile_picture: true,
            is_private: false,
            username_digit_count: digits,
            username_length: 9,
        }
    }

    fn assembled() -> AssembledDataset {
        let bots = (0..6).map(|i| record(i, 1500 + i, 4)).collect();
        let genuine = (0..9).map(|i| record(900 + i * 10, 100, 0)).collect();
        DatasetAssembler::default().assemble_records(bots, genuine).unwrap()
    }

    #[test]
    fn test_labels_follow_corpus_order() {
        let data = assembled();
        assert_eq!(data.len(), 15);
        assert!(data.labels.iter().take(6).all(|&l| l == 1));
        assert!(data.labels.iter().skip(6).all(|&l| l == 0));
    }

    #[test]
    fn test_numeric_is_normalized() {
        let data = assembled();
        assert_eq!(data.numeric.ncols(), N_NUMERIC_FEATURES);
        assert!(data.numeric.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!(data.scaler.is_fitted());
    }

    #[test]
    fn test_partitions_stay_aligned() {
        let data = assembled();
        let test_labels = data.test_labels();
        let test_text = data.test_descriptions();
        for (k, &row) in data.split.test.iter().enumerate() {
            assert_eq!(test_labels[k], data.labels[row]);
            assert_eq!(test_text[k], data.descriptions[row]);
        }
        assert_eq!(data.train_numeric().nrows() + data.test_numeric().nrows(), 15);
    }

    #[test]
    fn test_in_memory_records_are_validated() {
        let bots = vec![record(1, 1500, 4), record(2, 1600, 12)];
        let genuine = vec![record(900, 100, 0)];
        match DatasetAssembler::default().assemble_records(bots, genuine) {
            Err(DetectorError::InvalidRecord { corpus, index, .. }) => {
                assert_eq!(corpus, "bot");
                assert_eq!(index, 1);
            }
            other => panic!("expected InvalidRecord, got {:?}", other.map(|d| d.len())),
        }
    }

    #[test]
    fn test_empty_side_is_rejected() {
        let result = DatasetAssembler::default().assemble_records(vec![record(1, 1, 0)], vec![]);
        assert!(result.is_err());
    }
}
