//! End-to-end training: corpora in, evaluated artifact pair out

use crate::artifact::ArtifactPair;
use crate::dataset::{AssembledDataset, DatasetAssembler};
use crate::error::Result;
use crate::feature_engineering::{FeatureLayout, TfidfVectorizer};
use crate::profile::ProfileRecord;
use crate::synthetic::{ClassBalancer, SMOTE};
use crate::training::config::TrainerConfig;
use crate::training::grid_search::GridSearch;
use crate::training::metrics::ClassificationReport;
use crate::training::xgboost::{XGBoostClassifier, XGBoostConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Summary of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingOutcome {
    /// Accuracy on the held-out partition
    pub accuracy: f64,
    pub report: ClassificationReport,
    pub best_params: XGBoostConfig,
    /// Mean cross-validated accuracy of the chosen candidate
    pub best_cv_score: f64,
    pub candidates_evaluated: usize,
    pub n_train: usize,
    pub n_test: usize,
    /// Rows added by SMOTE
    pub n_synthetic: usize,
    pub vocabulary_size: usize,
    pub run_id: String,
    pub training_time_secs: f64,
    /// Set once the artifact pair has been written
    pub artifact_dir: Option<PathBuf>,
}

/// Runs dataset assembly, vectorization, balancing, grid search, refit,
/// evaluation and persistence
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    config: TrainerConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train from the two corpus files and write the artifact pair to
    /// `config.artifact_dir`. Corpus errors surface before any fitting.
    pub fn train(&self, bot_path: &Path, genuine_path: &Path) -> Result<TrainingOutcome> {
        let dataset = DatasetAssembler::new(self.config.dataset.clone()).assemble(bot_path, genuine_path)?;
        self.train_dataset(&dataset)
    }

    /// Same as [`train`](Self::train) for records already in memory
    pub fn train_records(&self, bots: Vec<ProfileRecord>, genuine: Vec<ProfileRecord>) -> Result<TrainingOutcome> {
        let dataset = DatasetAssembler::new(self.config.dataset.clone()).assemble_records(bots, genuine)?;
        self.train_dataset(&dataset)
    }

    pub fn train_dataset(&self, dataset: &AssembledDataset) -> Result<TrainingOutcome> {
        let (pair, mut outcome) = self.fit_dataset(dataset)?;
        pair.save(&self.config.artifact_dir)?;
        outcome.artifact_dir = Some(self.config.artifact_dir.clone());
        Ok(outcome)
    }

    /// Fit and evaluate without touching the disk
    pub fn fit_dataset(&self, dataset: &AssembledDataset) -> Result<(ArtifactPair, TrainingOutcome)> {
        let start = Instant::now();
        let seed = self.config.random_state;

        let mut vectorizer = TfidfVectorizer::new().with_max_features(self.config.max_features);
        let train_text = vectorizer.fit_transform(&dataset.train_descriptions())?;
        let test_text = vectorizer.transform(&dataset.test_descriptions())?;

        let layout = FeatureLayout::new(vectorizer.n_features());
        let x_train = layout.assemble(&train_text, &dataset.train_numeric())?;
        let x_test = layout.assemble(&test_text, &dataset.test_numeric())?;
        let y_train = dataset.train_labels();
        let y_test = dataset.test_labels();
        info!(
            vocabulary = vectorizer.n_features(),
            columns = layout.width(),
            train = x_train.nrows(),
            test = x_test.nrows(),
            "Built feature matrices"
        );

        let balanced = SMOTE::new()
            .with_k_neighbors(self.config.smote_k_neighbors)
            .with_seed(seed)
            .balance(&x_train, &y_train)?;
        let n_synthetic = balanced.n_synthetic();
        info!(rows = balanced.labels.len(), synthetic = n_synthetic, "Balanced training set");

        let search = GridSearch::new(self.config.grid.clone())
            .with_base_config(self.config.base_booster())
            .with_cv_folds(self.config.cv_folds)
            .with_random_state(seed)
            .run(&balanced.features, &balanced.labels)?;

        let mut model = XGBoostClassifier::new(search.best_params.clone());
        model.fit(&balanced.features, &balanced.labels)?;

        let y_pred = model.predict(&x_test)?;
        let report = ClassificationReport::compute(&y_test, &y_pred)?;

        let pair = ArtifactPair::new(model, vectorizer, dataset.scaler.clone())?;
        let outcome = TrainingOutcome {
            accuracy: report.accuracy,
            report,
            best_params: search.best_params,
            best_cv_score: search.best_score,
            candidates_evaluated: search.candidates.len(),
            n_train: x_train.nrows(),
            n_test: x_test.nrows(),
            n_synthetic,
            vocabulary_size: pair.layout().n_text(),
            run_id: pair.metadata().run_id.to_string(),
            training_time_secs: start.elapsed().as_secs_f64(),
            artifact_dir: None,
        };

        info!(
            accuracy = outcome.accuracy,
            cv_score = outcome.best_cv_score,
            run_id = outcome.run_id.as_str(),
            elapsed_secs = outcome.training_time_secs,
            "Training complete"
        );

        Ok((pair, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::ParamGrid;

    fn record(followers: u64, following: u64, digits: u64, media: u64) -> ProfileRecord {
        ProfileRecord {
            follower_count: followers,
            following_count: following,
            biography_length: if digits > 0 { 0 } else { 30 },
            media_count: media,
            has_profile_picture: digits == 0,
            is_private: false,
            username_digit_count: digits,
            username_length: 10,
        }
    }

    fn small_config(dir: &Path) -> TrainerConfig {
        TrainerConfig::default()
            .with_grid(ParamGrid {
                n_estimators: vec![10],
                max_depth: vec![2],
                learning_rate: vec![0.3],
                subsample: vec![1.0],
                colsample_bytree: vec![1.0],
            })
            .with_cv_folds(3)
            .with_max_features(50)
            .with_artifact_dir(dir)
    }

    #[test]
    fn test_imbalanced_training_is_balanced_and_saved() {
        let dir = tempfile::tempdir().unwrap();
        let bots: Vec<ProfileRecord> = (0..12).map(|i| record(3 + i, 1500 + 10 * i, 4, i % 3)).collect();
        let genuine: Vec<ProfileRecord> = (0..30).map(|i| record(900 + 25 * i, 150 + i, 0, 40 + i)).collect();

        let outcome = ModelTrainer::new(small_config(dir.path()))
            .train_records(bots, genuine)
            .unwrap();

        assert!(outcome.n_synthetic > 0);
        assert_eq!(outcome.candidates_evaluated, 1);
        assert!(outcome.accuracy >= 0.8, "accuracy = {}", outcome.accuracy);
        assert_eq!(outcome.artifact_dir.as_deref(), Some(dir.path()));
        assert!(ArtifactPair::load(dir.path()).is_ok());
    }

    #[test]
    fn test_missing_corpus_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = dir.path().join("models");
        let result = ModelTrainer::new(small_config(&artifacts))
            .train(&dir.path().join("bots.json"), &dir.path().join("real.json"));

        assert!(result.is_err());
        assert!(!artifacts.exists());
    }
}
