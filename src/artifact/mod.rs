//! Persisted classifier/vectorizer pair
//!
//! A trained model is stored as two bincode blobs in one directory:
//!
//! - `classifier.bin`: the boosted trees and the [`FeatureLayout`] they were fit against
//! - `vectorizer.bin`: the fitted TF-IDF vocabulary and the numeric [`MinMaxScaler`]
//!
//! Both blobs carry the same [`ArtifactMetadata`]. They are always written
//! and read together; a pair whose run ids or layouts disagree is rejected.

use crate::error::{DetectorError, Result};
use crate::feature_engineering::{synthesize, FeatureLayout, TfidfVectorizer};
use crate::inference::BotScorer;
use crate::preprocessing::MinMaxScaler;
use crate::profile::ProfileRecord;
use crate::training::XGBoostClassifier;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

pub const CLASSIFIER_FILE: &str = "classifier.bin";
pub const VECTORIZER_FILE: &str = "vectorizer.bin";

/// Bumped whenever either blob changes shape
pub const FORMAT_VERSION: u32 = 1;

/// Identifies one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub format_version: u32,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub crate_version: String,
}

impl ArtifactMetadata {
    pub fn new() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Default for ArtifactMetadata {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize, Deserialize)]
struct ClassifierBlob {
    metadata: ArtifactMetadata,
    layout: FeatureLayout,
    model: XGBoostClassifier,
}

#[derive(Serialize, Deserialize)]
struct VectorizerBlob {
    metadata: ArtifactMetadata,
    vectorizer: TfidfVectorizer,
    scaler: MinMaxScaler,
}

/// Fitted classifier and the feature transformation it was trained behind
#[derive(Debug, Clone)]
pub struct ArtifactPair {
    metadata: ArtifactMetadata,
    layout: FeatureLayout,
    model: XGBoostClassifier,
    vectorizer: TfidfVectorizer,
    scaler: MinMaxScaler,
}

impl ArtifactPair {
    /// Bundle fitted parts, checking that they agree on the column layout
    pub fn new(model: XGBoostClassifier, vectorizer: TfidfVectorizer, scaler: MinMaxScaler) -> Result<Self> {
        if !model.is_fitted() || !vectorizer.is_fitted() || !scaler.is_fitted() {
            return Err(DetectorError::NotFitted);
        }

        let layout = FeatureLayout::new(vectorizer.n_features());
        if scaler.n_features() != layout.numeric_columns().len() {
            return Err(DetectorError::ShapeError {
                expected: format!("{} scaled columns", layout.numeric_columns().len()),
                actual: format!("{} scaled columns", scaler.n_features()),
            });
        }
        if model.n_features() != layout.width() {
            return Err(DetectorError::ShapeError {
                expected: format!("{} model inputs", layout.width()),
                actual: format!("{} model inputs", model.n_features()),
            });
        }

        Ok(Self {
            metadata: ArtifactMetadata::new(),
            layout,
            model,
            vectorizer,
            scaler,
        })
    }

    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    pub fn model(&self) -> &XGBoostClassifier {
        &self.model
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }

    /// Combined input row for one record, exactly as seen during training
    pub fn featurize(&self, record: &ProfileRecord) -> Result<Vec<f64>> {
        let features = synthesize(record);
        let text = self.vectorizer.transform_one(&features.description)?;
        let numeric = self.scaler.transform_row(&features.numeric)?;
        self.layout.assemble_row(&text, &numeric)
    }

    /// Probability that the record belongs to a bot
    pub fn score(&self, record: &ProfileRecord) -> Result<f64> {
        let row = self.featurize(record)?;
        self.model.predict_proba_row(&row)
    }

    /// Top `n` text terms and numeric columns by share of split gain
    pub fn top_features(&self, n: usize) -> Vec<(String, f64)> {
        let importances = match self.model.feature_importances() {
            Some(imp) => imp,
            None => return Vec::new(),
        };
        let mut names = self.vectorizer.get_feature_names();
        names.extend(self.layout.numeric_columns().iter().cloned());

        let mut ranked: Vec<(String, f64)> = names.into_iter().zip(importances.iter().copied()).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(n);
        ranked
    }

    /// Write both blobs into `dir`.
    ///
    /// Both blobs are encoded before anything touches the disk, then staged
    /// as temporary files and renamed into place. On failure the staged
    /// files are removed and existing artifacts are left as they were.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let classifier = bincode::serialize(&ClassifierBlob {
            metadata: self.metadata.clone(),
            layout: self.layout.clone(),
            model: self.model.clone(),
        })
        .map_err(|e| write_error(&dir.join(CLASSIFIER_FILE), e))?;

        let vectorizer = bincode::serialize(&VectorizerBlob {
            metadata: self.metadata.clone(),
            vectorizer: self.vectorizer.clone(),
            scaler: self.scaler.clone(),
        })
        .map_err(|e| write_error(&dir.join(VECTORIZER_FILE), e))?;

        fs::create_dir_all(dir).map_err(|e| write_error(dir, e))?;

        let staged = [
            (dir.join(CLASSIFIER_FILE), staging_path(dir, CLASSIFIER_FILE), classifier),
            (dir.join(VECTORIZER_FILE), staging_path(dir, VECTORIZER_FILE), vectorizer),
        ];

        for (_, tmp, bytes) in &staged {
            if let Err(e) = fs::write(tmp, bytes) {
                discard(&staged);
                return Err(write_error(tmp, e));
            }
        }

        for (target, tmp, _) in &staged {
            if let Err(e) = fs::rename(tmp, target) {
                discard(&staged);
                return Err(write_error(target, e));
            }
        }

        info!(
            dir = %dir.display(),
            run_id = %self.metadata.run_id,
            text_columns = self.layout.n_text(),
            trees = self.model.n_trees(),
            "Saved artifact pair"
        );
        Ok(())
    }

    /// Read the pair from `dir`; both files must exist and agree
    pub fn load(dir: &Path) -> Result<Self> {
        let classifier_path = dir.join(CLASSIFIER_FILE);
        let vectorizer_path = dir.join(VECTORIZER_FILE);

        let classifier: ClassifierBlob = read_blob(&classifier_path)?;
        let vectorizer: VectorizerBlob = read_blob(&vectorizer_path)?;

        for (path, metadata) in [
            (&classifier_path, &classifier.metadata),
            (&vectorizer_path, &vectorizer.metadata),
        ] {
            if metadata.format_version != FORMAT_VERSION {
                return Err(load_error(
                    path,
                    format!(
                        "format version {} is not supported (expected {})",
                        metadata.format_version, FORMAT_VERSION
                    ),
                ));
            }
        }

        if classifier.metadata.run_id != vectorizer.metadata.run_id {
            return Err(load_error(
                dir,
                format!(
                    "classifier run {} does not match vectorizer run {}",
                    classifier.metadata.run_id, vectorizer.metadata.run_id
                ),
            ));
        }

        let expected = FeatureLayout::new(vectorizer.vectorizer.n_features());
        if classifier.layout != expected || classifier.model.n_features() != expected.width() {
            return Err(load_error(
                dir,
                format!(
                    "classifier expects {} text columns, vectorizer provides {}",
                    classifier.layout.n_text(),
                    expected.n_text()
                ),
            ));
        }
        if vectorizer.scaler.n_features() != expected.numeric_columns().len() {
            return Err(load_error(
                &vectorizer_path,
                format!("scaler covers {} columns", vectorizer.scaler.n_features()),
            ));
        }

        info!(
            dir = %dir.display(),
            run_id = %classifier.metadata.run_id,
            created_at = %classifier.metadata.created_at,
            "Loaded artifact pair"
        );

        Ok(Self {
            metadata: classifier.metadata,
            layout: classifier.layout,
            model: classifier.model,
            vectorizer: vectorizer.vectorizer,
            scaler: vectorizer.scaler,
        })
    }
}

impl BotScorer for ArtifactPair {
    fn bot_probability(&self, record: &ProfileRecord) -> Result<f64> {
        self.score(record)
    }

    fn run_id(&self) -> Option<String> {
        Some(self.metadata.run_id.to_string())
    }
}

fn read_blob<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| load_error(path, e))?;
    bincode::deserialize(&bytes).map_err(|e| load_error(path, e))
}

fn staging_path(dir: &Path, file: &str) -> PathBuf {
    dir.join(format!(".{}.tmp", file))
}

fn discard(staged: &[(PathBuf, PathBuf, Vec<u8>)]) {
    for (_, tmp, _) in staged {
        if tmp.exists() {
            if let Err(e) = fs::remove_file(tmp) {
                warn!(path = %tmp.display(), error = %e, "Failed to remove staged artifact");
            }
        }
    }
}

fn load_error(path: &Path, reason: impl ToString) -> DetectorError {
    DetectorError::ArtifactLoad {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn write_error(path: &Path, reason: impl ToString) -> DetectorError {
    DetectorError::ArtifactWrite {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_engineering::{numeric_features, N_NUMERIC_FEATURES};
    use crate::training::XGBoostConfig;
    use ndarray::{Array1, Array2};

    fn record(followers: u64, following: u64, digits: u64) -> ProfileRecord {
        ProfileRecord {
            follower_count: followers,
            following_count: following,
            biography_length: 10,
            media_count: 5,
            has_profile_picture: digits == 0,
            is_private: false,
            username_digit_count: digits,
            username_length: 10,
        }
    }

    fn fitted_pair() -> ArtifactPair {
        let records: Vec<ProfileRecord> = (0..20)
            .map(|i| if i % 2 == 0 { record(2000 + i, 100, 0) } else { record(5, 1800 + i, 4) })
            .collect();
        let labels = Array1::from_vec((0..20).map(|i| (i % 2) as i64).collect());

        let descriptions: Vec<String> = records.iter().map(|r| synthesize(r).description).collect();
        let mut vectorizer = TfidfVectorizer::new();
        let text = vectorizer.fit_transform(&descriptions).unwrap();

        let mut numeric = Array2::zeros((20, N_NUMERIC_FEATURES));
        for (i, r) in records.iter().enumerate() {
            for (j, v) in numeric_features(r).iter().enumerate() {
                numeric[[i, j]] = *v;
            }
        }
        let mut scaler = MinMaxScaler::new();
        let numeric = scaler.fit_transform(&numeric).unwrap();

        let layout = FeatureLayout::new(vectorizer.n_features());
        let x = layout.assemble(&text, &numeric).unwrap();

        let mut model = XGBoostClassifier::new(XGBoostConfig {
            n_estimators: 10,
            max_depth: 2,
            ..Default::default()
        });
        model.fit(&x, &labels).unwrap();

        ArtifactPair::new(model, vectorizer, scaler).unwrap()
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let pair = fitted_pair();
        pair.save(dir.path()).unwrap();

        assert!(dir.path().join(CLASSIFIER_FILE).exists());
        assert!(dir.path().join(VECTORIZER_FILE).exists());
        assert!(!staging_path(dir.path(), CLASSIFIER_FILE).exists());

        let loaded = ArtifactPair::load(dir.path()).unwrap();
        assert_eq!(loaded.metadata(), pair.metadata());
        let sample = record(12, 2100, 5);
        assert_eq!(loaded.score(&sample).unwrap(), pair.score(&sample).unwrap());
    }

    #[test]
    fn test_missing_blob_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        fitted_pair().save(dir.path()).unwrap();
        fs::remove_file(dir.path().join(VECTORIZER_FILE)).unwrap();

        let result = ArtifactPair::load(dir.path());
        assert!(matches!(result, Err(DetectorError::ArtifactLoad { .. })));
    }

    #[test]
    fn test_mixed_runs_are_rejected() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        fitted_pair().save(a.path()).unwrap();
        fitted_pair().save(b.path()).unwrap();
        fs::copy(b.path().join(VECTORIZER_FILE), a.path().join(VECTORIZER_FILE)).unwrap();

        let result = ArtifactPair::load(a.path());
        assert!(matches!(result, Err(DetectorError::ArtifactLoad { .. })));
    }

    #[test]
    fn test_corrupt_blob_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        fitted_pair().save(dir.path()).unwrap();
        fs::write(dir.path().join(CLASSIFIER_FILE), b"not a model").unwrap();

        assert!(matches!(
            ArtifactPair::load(dir.path()),
            Err(DetectorError::ArtifactLoad { .. })
        ));
    }

    #[test]
    fn test_bot_like_record_scores_high() {
        let pair = fitted_pair();
        let bot = pair.score(&record(5, 1850, 4)).unwrap();
        let genuine = pair.score(&record(2010, 100, 0)).unwrap();
        assert!(bot > 0.5);
        assert!(genuine < 0.5);
    }

    #[test]
    fn test_top_features_are_ranked() {
        let top = fitted_pair().top_features(3);
        assert!(!top.is_empty());
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
    }
}
