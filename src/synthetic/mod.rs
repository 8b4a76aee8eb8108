//! Class balancing for the training matrix
//!
//! Bot corpora are usually much smaller than genuine ones. Before the grid
//! search runs, every minority class is topped up with synthetic rows until it
//! matches the majority count.

mod smote;

pub use smote::SMOTE;

use crate::error::{DetectorError, Result};
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;

/// Training matrix after balancing. Original rows come first, in order.
#[derive(Debug, Clone)]
pub struct BalancedSet {
    pub features: Array2<f64>,
    pub labels: Array1<i64>,
    /// Rows added per class label
    pub synthetic: BTreeMap<i64, usize>,
}

impl BalancedSet {
    /// Total synthetic rows across all classes
    pub fn n_synthetic(&self) -> usize {
        self.synthetic.values().sum()
    }

    pub fn n_original(&self) -> usize {
        self.labels.len() - self.n_synthetic()
    }
}

/// Equalizes class counts of a labeled matrix
pub trait ClassBalancer: Send + Sync {
    fn balance(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<BalancedSet>;
}

/// Row positions grouped by class label, in ascending label order
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMembers {
    by_class: BTreeMap<i64, Vec<usize>>,
}

impl ClassMembers {
    pub fn from_labels(y: &Array1<i64>) -> Self {
        let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (row, &label) in y.iter().enumerate() {
            by_class.entry(label).or_default().push(row);
        }
        Self { by_class }
    }

    pub fn n_classes(&self) -> usize {
        self.by_class.len()
    }

    pub fn count(&self, label: i64) -> usize {
        self.by_class.get(&label).map_or(0, Vec::len)
    }

    /// Size of the largest class
    pub fn majority_count(&self) -> usize {
        self.by_class.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &[usize])> {
        self.by_class.iter().map(|(&label, rows)| (label, rows.as_slice()))
    }
}

fn check_shapes(x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(DetectorError::ShapeError {
            expected: format!("{} labels", x.nrows()),
            actual: format!("{} labels", y.len()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_members_order_and_counts() {
        let y = Array1::from_vec(vec![1, 0, 1, 1, 0, 1]);
        let members = ClassMembers::from_labels(&y);

        assert_eq!(members.n_classes(), 2);
        assert_eq!(members.count(1), 4);
        assert_eq!(members.count(7), 0);
        assert_eq!(members.majority_count(), 4);

        let groups: Vec<(i64, Vec<usize>)> = members.iter().map(|(l, r)| (l, r.to_vec())).collect();
        assert_eq!(groups, vec![(0, vec![1, 4]), (1, vec![0, 2, 3, 5])]);
    }
}
