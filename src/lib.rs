//! Instagram bot detector
//!
//! Classifies Instagram accounts as automated or genuine from profile
//! signals. The pipeline turns raw profile attributes into a description and
//! eleven numeric features, vectorizes descriptions with TF-IDF, balances the
//! classes with SMOTE and fits a gradient-boosted tree classifier chosen by
//! cross-validated grid search.
//!
//! # Modules
//!
//! ## Data
//! - [`profile`] - Raw profile attributes and labels
//! - [`feature_engineering`] - Descriptions, numeric features, TF-IDF, column layout
//! - [`preprocessing`] - Min-max scaling of numeric features
//! - [`dataset`] - Corpus loading, labeling and the seeded train/test split
//! - [`synthetic`] - SMOTE oversampling
//!
//! ## Model
//! - [`training`] - Gradient boosting, cross-validation, grid search, reports
//! - [`artifact`] - Paired classifier and vectorizer blobs on disk
//! - [`inference`] - Single and batch scoring with hot-swappable artifacts
//!
//! ## Collection
//! - [`collector`] - Follower listing boundary and account-level analysis
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data
pub mod profile;
pub mod feature_engineering;
pub mod preprocessing;
pub mod dataset;
pub mod synthetic;
pub mod utils;

// Model
pub mod training;
pub mod artifact;
pub mod inference;

// Collection and interface
pub mod collector;
pub mod cli;

pub use error::{DetectorError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{DetectorError, Result};

    // Profiles
    pub use crate::profile::{Label, ProfileRecord};

    // Features
    pub use crate::feature_engineering::{synthesize, FeatureLayout, SynthesizedFeatures, TfidfVectorizer};
    pub use crate::preprocessing::MinMaxScaler;

    // Dataset
    pub use crate::dataset::{AssembledDataset, DatasetAssembler, DatasetConfig};
    pub use crate::utils::DataLoader;

    // Synthetic data
    pub use crate::synthetic::{BalancedSet, ClassBalancer, SMOTE};

    // Training
    pub use crate::training::{
        ClassificationReport, GridSearch, ModelTrainer, ParamGrid, TrainerConfig, TrainingOutcome,
        XGBoostClassifier, XGBoostConfig,
    };

    // Artifacts
    pub use crate::artifact::{ArtifactMetadata, ArtifactPair};

    // Inference
    pub use crate::inference::{BatchPrediction, BotScorer, InferenceConfig, InferenceEngine, InferenceStats, Prediction};

    // Collection
    pub use crate::collector::{AccountReport, FollowerAnalyzer, ProfileLookup, ProfileSource, SnapshotSource};
}
