//! Seeded train/test partitioning

use crate::error::{DetectorError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Row indices of the two partitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl DatasetSplit {
    pub fn n_train(&self) -> usize {
        self.train.len()
    }

    pub fn n_test(&self) -> usize {
        self.test.len()
    }
}

/// Number of test rows for `n` rows and a test fraction.
///
/// Rounds up, and keeps at least one row on each side.
pub fn test_count(n: usize, test_size: f64) -> usize {
    let raw = (n as f64 * test_size).ceil() as usize;
    raw.clamp(1, n.saturating_sub(1).max(1))
}

/// Shuffle `0..n` once and cut it into test (first) and train (rest).
///
/// Text, numeric and label partitions are all taken from the same index
/// lists, so they always stay aligned.
pub fn train_test_split(n: usize, test_size: f64, seed: u64) -> Result<DatasetSplit> {
    if n < 2 {
        return Err(DetectorError::ValidationError(format!(
            "Need at least 2 rows to split, got {}",
            n
        )));
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(DetectorError::ValidationError(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = test_count(n, test_size);
    let train = indices.split_off(n_test);

    Ok(DatasetSplit {
        train,
        test: indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes() {
        let split = train_test_split(200, 0.2, 42).unwrap();
        assert_eq!(split.n_test(), 40);
        assert_eq!(split.n_train(), 160);

        let mut all: Vec<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_reproducible() {
        let a = train_test_split(57, 0.2, 7).unwrap();
        let b = train_test_split(57, 0.2, 7).unwrap();
        assert_eq!(a, b);

        let c = train_test_split(57, 0.2, 8).unwrap();
        assert_ne!(a.test, c.test);
    }

    #[test]
    fn test_count_rounds_up_and_clamps() {
        assert_eq!(test_count(11, 0.2), 3);
        assert_eq!(test_count(2, 0.2), 1);
        assert_eq!(test_count(2, 0.9), 1);
    }

    #[test]
    fn test_too_few_rows() {
        assert!(train_test_split(1, 0.2, 42).is_err());
        assert!(train_test_split(10, 1.0, 42).is_err());
    }
}
