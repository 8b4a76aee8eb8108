//! Model training module
//!
//! - Second-order gradient boosted trees for the bot/genuine decision
//! - Stratified k-fold cross-validation
//! - Exhaustive grid search over boosting hyperparameters
//! - Classification reports
//! - [`ModelTrainer`], which ties dataset assembly, vectorization, SMOTE,
//!   search, refit, evaluation and persistence together

mod config;
mod trainer;
pub mod cross_validation;
pub mod grid_search;
pub mod metrics;
pub mod xgboost;

pub use config::{default_artifact_dir, TrainerConfig};
pub use cross_validation::{Fold, FoldScores, KFold};
pub use grid_search::{CandidateScore, GridSearch, GridSearchResult, ParamGrid};
pub use metrics::{AverageMetrics, ClassMetrics, ClassificationReport};
pub use trainer::{ModelTrainer, TrainingOutcome};
pub use xgboost::{XGBoostClassifier, XGBoostConfig};
