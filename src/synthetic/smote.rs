//! SMOTE oversampling

use super::{check_shapes, BalancedSet, ClassBalancer, ClassMembers};
use crate::error::{DetectorError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Synthetic Minority Over-sampling Technique.
///
/// Each new row lies on the segment between a random minority row and one of
/// its `k_neighbors` nearest rows of the same class:
/// `origin + gap * (neighbor - origin)` with `gap` in `[0, 1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SMOTE {
    k_neighbors: usize,
    seed: Option<u64>,
}

impl Default for SMOTE {
    fn default() -> Self {
        Self::new()
    }
}

impl SMOTE {
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            seed: None,
        }
    }

    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn k_neighbors(&self) -> usize {
        self.k_neighbors
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

fn by_distance(a: &(f64, usize), b: &(f64, usize)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(p, q)| (p - q) * (p - q)).sum()
}

/// Positions within `rows` of the `k` rows closest to `rows[origin]`,
/// nearest first. The origin is excluded by position, so an exact duplicate
/// of it is still a valid neighbor.
fn nearest(x: &Array2<f64>, rows: &[usize], origin: usize, k: usize) -> Vec<usize> {
    let anchor = x.row(rows[origin]);
    let mut candidates: Vec<(f64, usize)> = rows
        .iter()
        .enumerate()
        .filter(|&(pos, _)| pos != origin)
        .map(|(pos, &row)| (squared_distance(anchor, x.row(row)), pos))
        .collect();

    if candidates.len() > k {
        candidates.select_nth_unstable_by(k - 1, by_distance);
        candidates.truncate(k);
    }
    candidates.sort_by(by_distance);
    candidates.into_iter().map(|(_, pos)| pos).collect()
}

impl ClassBalancer for SMOTE {
    fn balance(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<BalancedSet> {
        check_shapes(x, y)?;

        let members = ClassMembers::from_labels(y);
        if members.n_classes() < 2 {
            return Err(DetectorError::ValidationError(format!(
                "SMOTE needs at least 2 classes, found {}",
                members.n_classes()
            )));
        }

        let target = members.majority_count();
        let n_cols = x.ncols();
        let mut rng = self.rng();

        let mut buffer: Vec<f64> = x.iter().copied().collect();
        let mut labels: Vec<i64> = y.to_vec();
        let mut synthetic = BTreeMap::new();

        for (label, rows) in members.iter() {
            let missing = target - rows.len();
            synthetic.insert(label, missing);
            if missing == 0 {
                continue;
            }

            if let [only] = rows {
                for _ in 0..missing {
                    buffer.extend(x.row(*only).iter().copied());
                }
            } else {
                let k = self.k_neighbors.min(rows.len() - 1);
                let mut neighbors: Vec<Option<Vec<usize>>> = vec![None; rows.len()];

                for _ in 0..missing {
                    let origin = rng.gen_range(0..rows.len());
                    let near = neighbors[origin].get_or_insert_with(|| nearest(x, rows, origin, k));
                    let partner = near[rng.gen_range(0..near.len())];
                    let gap: f64 = rng.gen();

                    let a = x.row(rows[origin]);
                    let b = x.row(rows[partner]);
                    buffer.extend(a.iter().zip(b.iter()).map(|(&p, &q)| p + gap * (q - p)));
                }
            }
            labels.extend(std::iter::repeat(label).take(missing));
            debug!(label, generated = missing, "Oversampled class");
        }

        let features = Array2::from_shape_vec((labels.len(), n_cols), buffer)?;
        Ok(BalancedSet {
            features,
            labels: Array1::from_vec(labels),
            synthetic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 20 genuine rows on a grid near the origin, 5 bot rows near (10, 10)
    fn imbalanced() -> (Array2<f64>, Array1<i64>) {
        let mut data = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            data.extend([(i % 5) as f64, (i / 5) as f64]);
            labels.push(0);
        }
        for i in 0..5 {
            data.extend([10.0 + (i % 3) as f64, 10.0 + (i / 3) as f64]);
            labels.push(1);
        }
        (Array2::from_shape_vec((25, 2), data).unwrap(), Array1::from_vec(labels))
    }

    #[test]
    fn test_classes_are_equalized() {
        let (x, y) = imbalanced();
        let set = SMOTE::new().with_k_neighbors(3).with_seed(42).balance(&x, &y).unwrap();

        let members = ClassMembers::from_labels(&set.labels);
        assert_eq!(members.count(0), 20);
        assert_eq!(members.count(1), 20);
        assert_eq!(set.synthetic[&0], 0);
        assert_eq!(set.synthetic[&1], 15);
        assert_eq!(set.n_original(), 25);
        assert_eq!(set.features.nrows(), 40);
    }

    #[test]
    fn test_originals_come_first() {
        let (x, y) = imbalanced();
        let set = SMOTE::new().with_seed(42).balance(&x, &y).unwrap();

        assert_eq!(set.features.slice(ndarray::s![..25, ..]), x);
        assert_eq!(set.labels.slice(ndarray::s![..25]), y);
    }

    #[test]
    fn test_new_rows_interpolate_minority() {
        let (x, y) = imbalanced();
        let set = SMOTE::new().with_seed(1).balance(&x, &y).unwrap();

        for row in set.features.rows().into_iter().skip(25) {
            assert!(row.iter().all(|v| (10.0..=12.0).contains(v)), "{:?}", row);
        }
    }

    #[test]
    fn test_same_seed_same_rows() {
        let (x, y) = imbalanced();
        let a = SMOTE::new().with_seed(9).balance(&x, &y).unwrap();
        let b = SMOTE::new().with_seed(9).balance(&x, &y).unwrap();
        assert_eq!(a.features, b.features);
    }

    #[test]
    fn test_nearest_prefers_lower_position_on_ties() {
        let x = Array2::from_shape_vec((4, 1), vec![0.0, 1.0, -1.0, 5.0]).unwrap();
        assert_eq!(nearest(&x, &[0, 1, 2, 3], 0, 2), vec![1, 2]);
    }

    #[test]
    fn test_duplicate_minority_rows() {
        let x = Array2::from_shape_vec((5, 1), vec![0.0, 1.0, 2.0, 7.0, 7.0]).unwrap();
        let y = Array1::from_vec(vec![0, 0, 0, 1, 1]);
        let set = SMOTE::new().with_seed(3).balance(&x, &y).unwrap();
        assert_eq!(set.features.nrows(), 6);
        assert_eq!(set.features[[5, 0]], 7.0);
    }

    #[test]
    fn test_single_sample_minority_is_copied() {
        let x = Array2::from_shape_vec((4, 2), vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 9.0, 8.0]).unwrap();
        let y = Array1::from_vec(vec![0, 0, 0, 1]);
        let set = SMOTE::new().with_seed(3).balance(&x, &y).unwrap();

        assert_eq!(set.features.nrows(), 6);
        for i in 4..6 {
            assert_eq!(set.features.row(i).to_vec(), vec![9.0, 8.0]);
        }
    }

    #[test]
    fn test_single_class_is_rejected() {
        let x = Array2::zeros((3, 2));
        let y = Array1::from_vec(vec![1, 1, 1]);
        assert!(matches!(
            SMOTE::new().balance(&x, &y),
            Err(DetectorError::ValidationError(_))
        ));
    }

    #[test]
    fn test_label_count_mismatch() {
        let x = Array2::zeros((3, 2));
        let y = Array1::from_vec(vec![0, 1]);
        assert!(matches!(SMOTE::new().balance(&x, &y), Err(DetectorError::ShapeError { .. })));
    }
}
