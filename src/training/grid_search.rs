//! Exhaustive hyperparameter search with cross-validation

use crate::error::{DetectorError, Result};
use crate::training::cross_validation::{FoldScores, KFold};
use crate::training::xgboost::{XGBoostClassifier, XGBoostConfig};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Candidate values for each tuned hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<usize>,
    pub learning_rate: Vec<f64>,
    pub subsample: Vec<f64>,
    pub colsample_bytree: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100, 200, 300],
            max_depth: vec![3, 6, 9],
            learning_rate: vec![0.01, 0.1, 0.2],
            subsample: vec![0.8, 1.0],
            colsample_bytree: vec![0.8, 1.0],
        }
    }
}

impl ParamGrid {
    /// Small grid for fast runs
    pub fn quick() -> Self {
        Self {
            n_estimators: vec![50],
            max_depth: vec![3],
            learning_rate: vec![0.1, 0.2],
            subsample: vec![1.0],
            colsample_bytree: vec![1.0],
        }
    }

    /// Number of combinations
    pub fn len(&self) -> usize {
        self.n_estimators.len()
            * self.max_depth.len()
            * self.learning_rate.len()
            * self.subsample.len()
            * self.colsample_bytree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every combination applied over `base`, in nesting order
    /// n_estimators > max_depth > learning_rate > subsample > colsample_bytree
    /// (the last varies fastest)
    pub fn candidates(&self, base: &XGBoostConfig) -> Vec<XGBoostConfig> {
        let mut out = Vec::with_capacity(self.len());
        for &n_estimators in &self.n_estimators {
            for &max_depth in &self.max_depth {
                for &learning_rate in &self.learning_rate {
                    for &subsample in &self.subsample {
                        for &colsample_bytree in &self.colsample_bytree {
                            out.push(XGBoostConfig {
                                n_estimators,
                                max_depth,
                                learning_rate,
                                subsample,
                                colsample_bytree,
                                ..base.clone()
                            });
                        }
                    }
                }
            }
        }
        out
    }
}

/// Cross-validated score of one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: XGBoostConfig,
    pub cv: FoldScores,
}

/// Outcome of a grid search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchResult {
    pub best_params: XGBoostConfig,
    pub best_score: f64,
    pub best_index: usize,
    /// All candidates, in grid order
    pub candidates: Vec<CandidateScore>,
}

/// Fold matrices, materialized once and shared by every candidate
struct FoldData {
    x_train: Array2<f64>,
    y_train: Array1<i64>,
    x_valid: Array2<f64>,
    y_valid: Array1<i64>,
}

/// Grid search over [`XGBoostClassifier`] configurations scored by mean
/// stratified k-fold accuracy
#[derive(Debug, Clone)]
pub struct GridSearch {
    grid: ParamGrid,
    base: XGBoostConfig,
    cv_folds: usize,
    random_state: u64,
}

impl GridSearch {
    pub fn new(grid: ParamGrid) -> Self {
        Self {
            grid,
            base: XGBoostConfig::default(),
            cv_folds: 5,
            random_state: 42,
        }
    }

    /// Settings shared by every candidate (regularization, seed)
    pub fn with_base_config(mut self, base: XGBoostConfig) -> Self {
        self.base = base;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn run(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<GridSearchResult> {
        if self.grid.is_empty() {
            return Err(DetectorError::ValidationError(
                "Parameter grid has no candidates".to_string(),
            ));
        }

        let start = Instant::now();
        if x.nrows() != y.len() {
            return Err(DetectorError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }
        let folds: Vec<FoldData> = KFold::new(self.cv_folds)
            .with_seed(self.random_state)
            .folds(y)?
            .iter()
            .map(|fold| FoldData {
                x_train: x.select(Axis(0), &fold.train),
                y_train: y.select(Axis(0), &fold.train),
                x_valid: x.select(Axis(0), &fold.validation),
                y_valid: y.select(Axis(0), &fold.validation),
            })
            .collect();

        let candidates = self.grid.candidates(&self.base);
        info!(
            candidates = candidates.len(),
            folds = folds.len(),
            rows = x.nrows(),
            columns = x.ncols(),
            "Starting grid search"
        );

        // Indexed collect keeps grid order regardless of scheduling
        let scored: Vec<CandidateScore> = candidates
            .into_par_iter()
            .map(|params| -> Result<CandidateScore> {
                let scores = folds
                    .iter()
                    .map(|fold| {
                        let mut model = XGBoostClassifier::new(params.clone());
                        model.fit(&fold.x_train, &fold.y_train)?;
                        model.score(&fold.x_valid, &fold.y_valid)
                    })
                    .collect::<Result<Vec<f64>>>()?;
                let cv = FoldScores::new(scores);
                debug!(
                    n_estimators = params.n_estimators,
                    max_depth = params.max_depth,
                    learning_rate = params.learning_rate,
                    subsample = params.subsample,
                    colsample_bytree = params.colsample_bytree,
                    mean = cv.mean,
                    "Scored candidate"
                );
                Ok(CandidateScore { params, cv })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut best_index = 0;
        for (i, candidate) in scored.iter().enumerate() {
            if candidate.cv.mean > scored[best_index].cv.mean {
                best_index = i;
            }
        }

        let best = &scored[best_index];
        info!(
            best_index,
            best_score = best.cv.mean,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Grid search complete"
        );

        Ok(GridSearchResult {
            best_params: best.params.clone(),
            best_score: best.cv.mean,
            best_index,
            candidates: scored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_size_and_order() {
        let grid = ParamGrid::default();
        assert_eq!(grid.len(), 108);

        let candidates = grid.candidates(&XGBoostConfig::default());
        assert_eq!(candidates.len(), 108);

        // Last parameter varies fastest
        assert_eq!(candidates[0].colsample_bytree, 0.8);
        assert_eq!(candidates[1].colsample_bytree, 1.0);
        assert_eq!(candidates[1].subsample, 0.8);
        assert_eq!(candidates[2].subsample, 1.0);
        assert_eq!(candidates[107].n_estimators, 300);
        assert_eq!(candidates[107].max_depth, 9);
        assert_eq!(candidates[107].learning_rate, 0.2);
    }

    #[test]
    fn test_candidates_keep_base_settings() {
        let base = XGBoostConfig {
            reg_lambda: 3.0,
            random_state: Some(7),
            ..Default::default()
        };
        let candidates = ParamGrid::quick().candidates(&base);
        assert!(candidates.iter().all(|c| c.reg_lambda == 3.0 && c.random_state == Some(7)));
    }

    fn separable() -> (Array2<f64>, Array1<i64>) {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| if i < 20 { (i + j) as f64 } else { 100.0 + (i * j) as f64 });
        let y = Array1::from_vec((0..40).map(|i| (i >= 20) as i64).collect());
        (x, y)
    }

    #[test]
    fn test_grid_search_finds_separator() {
        let (x, y) = separable();
        let grid = ParamGrid {
            n_estimators: vec![5, 10],
            max_depth: vec![2],
            learning_rate: vec![0.3],
            subsample: vec![1.0],
            colsample_bytree: vec![1.0],
        };
        let result = GridSearch::new(grid).with_cv_folds(4).run(&x, &y).unwrap();

        assert_eq!(result.candidates.len(), 2);
        assert!((result.best_score - 1.0).abs() < 1e-12);
        // Both candidates tie; the first one wins
        assert_eq!(result.best_index, 0);
        assert_eq!(result.best_params.n_estimators, 5);
    }

    #[test]
    fn test_empty_grid_is_rejected() {
        let (x, y) = separable();
        let grid = ParamGrid {
            n_estimators: vec![],
            ..ParamGrid::quick()
        };
        assert!(GridSearch::new(grid).run(&x, &y).is_err());
    }
}
