//! K-fold partitioning for model selection

use crate::error::{DetectorError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One train/validation partition, row indices ascending
#[derive(Debug, Clone, PartialEq)]
pub struct Fold {
    pub index: usize,
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// K-fold splitter.
///
/// Stratified mode deals the rows of each class round-robin over the folds,
/// classes in ascending label order, so every fold keeps the class mix.
/// Plain mode cuts the (optionally shuffled) row order into contiguous blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KFold {
    pub n_folds: usize,
    pub stratified: bool,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl Default for KFold {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KFold {
    /// Stratified and shuffled
    pub fn new(n_folds: usize) -> Self {
        Self {
            n_folds,
            stratified: true,
            shuffle: true,
            seed: None,
        }
    }

    pub fn plain(n_folds: usize) -> Self {
        Self {
            stratified: false,
            ..Self::new(n_folds)
        }
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Fold number of every row
    pub fn assign(&self, y: &Array1<i64>) -> Result<Vec<usize>> {
        let n = y.len();
        if self.n_folds < 2 {
            return Err(DetectorError::ValidationError(format!(
                "Cross-validation needs at least 2 folds, got {}",
                self.n_folds
            )));
        }
        if n < self.n_folds {
            return Err(DetectorError::ValidationError(format!(
                "{} rows cannot fill {} folds",
                n, self.n_folds
            )));
        }

        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut fold_of = vec![0; n];

        if self.stratified {
            let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
            for (row, &label) in y.iter().enumerate() {
                by_class.entry(label).or_default().push(row);
            }
            let mut turn = 0;
            for rows in by_class.values_mut() {
                if self.shuffle {
                    rows.shuffle(&mut rng);
                }
                for &row in rows.iter() {
                    fold_of[row] = turn % self.n_folds;
                    turn += 1;
                }
            }
        } else {
            let mut order: Vec<usize> = (0..n).collect();
            if self.shuffle {
                order.shuffle(&mut rng);
            }
            // the first n % k folds take one extra row
            let (base, extra) = (n / self.n_folds, n % self.n_folds);
            let mut position = 0;
            for fold in 0..self.n_folds {
                let size = base + usize::from(fold < extra);
                for &row in &order[position..position + size] {
                    fold_of[row] = fold;
                }
                position += size;
            }
        }

        Ok(fold_of)
    }

    pub fn folds(&self, y: &Array1<i64>) -> Result<Vec<Fold>> {
        let fold_of = self.assign(y)?;
        Ok((0..self.n_folds)
            .map(|index| {
                let (validation, train): (Vec<usize>, Vec<usize>) =
                    (0..fold_of.len()).partition(|&row| fold_of[row] == index);
                Fold {
                    index,
                    train,
                    validation,
                }
            })
            .collect())
    }
}

/// Per-fold scores with their mean and population standard deviation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldScores {
    pub scores: Vec<f64>,
    pub mean: f64,
    pub std: f64,
}

impl FoldScores {
    pub fn new(scores: Vec<f64>) -> Self {
        if scores.is_empty() {
            return Self {
                scores,
                mean: 0.0,
                std: 0.0,
            };
        }
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let std = (scores.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n).sqrt();
        Self { scores, mean, std }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize, every: usize) -> Array1<i64> {
        Array1::from_vec((0..n).map(|i| i64::from(i % every == 0)).collect())
    }

    #[test]
    fn test_plain_blocks_cover_every_row_once() {
        let folds = KFold::plain(3).with_shuffle(false).folds(&labels(10, 2)).unwrap();

        let sizes: Vec<usize> = folds.iter().map(|f| f.validation.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert_eq!(folds[0].validation, vec![0, 1, 2, 3]);

        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.validation.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert!(folds.iter().all(|f| f.train.len() + f.validation.len() == 10));
    }

    #[test]
    fn test_stratified_keeps_class_mix() {
        let y = Array1::from_vec(vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1]);
        let folds = KFold::new(5).with_shuffle(false).folds(&y).unwrap();

        for fold in &folds {
            assert_eq!(fold.validation.len(), 2);
            assert_eq!(fold.validation.iter().filter(|&&i| y[i] == 1).count(), 1);
        }
    }

    #[test]
    fn test_seeded_assignment_repeats() {
        let y = labels(40, 3);
        let splitter = KFold::new(5).with_seed(42);
        assert_eq!(splitter.assign(&y).unwrap(), splitter.assign(&y).unwrap());
    }

    #[test]
    fn test_too_few_rows_or_folds() {
        assert!(KFold::new(5).assign(&labels(4, 2)).is_err());
        assert!(KFold::new(1).assign(&labels(10, 2)).is_err());
    }

    #[test]
    fn test_fold_scores() {
        let scores = FoldScores::new(vec![0.8, 0.9, 1.0]);
        assert!((scores.mean - 0.9).abs() < 1e-12);
        assert!(scores.std > 0.0);
        assert_eq!(FoldScores::new(vec![]).mean, 0.0);
    }
}
