//! Gradient-boosted trees on the logistic loss
//!
//! Each boosting round fits one regression tree to the first and second
//! derivatives of the loss at the current margins:
//!
//! - leaf weight `-T(G) / (H + lambda)`, with `T` the L1 soft threshold by `alpha`
//! - split gain `0.5 * [T(GL)²/(HL+λ) + T(GR)²/(HR+λ) - T(G)²/(H+λ)]`, kept only above `gamma`
//! - rows resampled every round, columns resampled per tree
//!
//! Trees are stored as flat node arrays with the learning rate folded into
//! the leaf values, so scoring a row is a sum of leaf lookups.

use crate::error::{DetectorError, Result};
use ndarray::{Array1, Array2, ArrayView1, Zip};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::{AddAssign, Sub};
use tracing::{debug, trace};

/// Booster hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XGBoostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Minimum hessian sum on each side of a split
    pub min_child_weight: f64,
    /// L2 penalty on leaf weights
    pub reg_lambda: f64,
    /// L1 penalty on leaf weights
    pub reg_alpha: f64,
    /// Minimum gain for a split to be kept
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub random_state: Option<u64>,
}

impl Default for XGBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: Some(42),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct GradPair {
    g: f64,
    h: f64,
}

impl AddAssign for GradPair {
    fn add_assign(&mut self, other: Self) {
        self.g += other.g;
        self.h += other.h;
    }
}

impl Sub for GradPair {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            g: self.g - other.g,
            h: self.h - other.h,
        }
    }
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

/// Logistic loss derivatives at `margin` for a 0/1 target
fn logistic_grad(margin: f64, target: f64) -> GradPair {
    let p = sigmoid(margin);
    GradPair {
        g: p - target,
        h: (p * (1.0 - p)).max(1e-7),
    }
}

#[derive(Debug, Clone, Copy)]
struct Penalty {
    lambda: f64,
    alpha: f64,
}

impl Penalty {
    fn from_config(config: &XGBoostConfig) -> Self {
        Self {
            lambda: config.reg_lambda,
            alpha: config.reg_alpha,
        }
    }

    fn soft_threshold(&self, g: f64) -> f64 {
        if g > self.alpha {
            g - self.alpha
        } else if g < -self.alpha {
            g + self.alpha
        } else {
            0.0
        }
    }

    fn weight(&self, sum: GradPair) -> f64 {
        -self.soft_threshold(sum.g) / (sum.h + self.lambda)
    }

    fn score(&self, sum: GradPair) -> f64 {
        let g = self.soft_threshold(sum.g);
        g * g / (sum.h + self.lambda)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Branch {
        feature: usize,
        threshold: f64,
        gain: f64,
        left: usize,
        right: usize,
    },
}

/// One regression tree; node 0 is the root
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn leaf_value(&self, row: ArrayView1<f64>) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { value } => return *value,
                Node::Branch {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => at = if row[*feature] <= *threshold { *left } else { *right },
            }
        }
    }

    fn add_gains(&self, totals: &mut [f64]) {
        for node in &self.nodes {
            if let Node::Branch { feature, gain, .. } = node {
                if let Some(total) = totals.get_mut(*feature) {
                    *total += gain;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl SplitCandidate {
    /// Higher gain ranks higher; on equal gain the higher feature index does,
    /// so the numeric block placed after the text columns wins ties
    fn rank(a: &Self, b: &Self) -> Ordering {
        a.gain.total_cmp(&b.gain).then_with(|| a.feature.cmp(&b.feature))
    }
}

/// Grows one tree with exact greedy split search
struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    grads: &'a [GradPair],
    features: &'a [usize],
    config: &'a XGBoostConfig,
    penalty: Penalty,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn new(x: &'a Array2<f64>, grads: &'a [GradPair], features: &'a [usize], config: &'a XGBoostConfig) -> Self {
        Self {
            x,
            grads,
            features,
            config,
            penalty: Penalty::from_config(config),
            nodes: Vec::new(),
        }
    }

    fn build(mut self, rows: Vec<usize>) -> Tree {
        self.grow(rows, 0);
        Tree { nodes: self.nodes }
    }

    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let mut total = GradPair::default();
        for &i in &rows {
            total += self.grads[i];
        }

        let slot = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: self.config.learning_rate * self.penalty.weight(total),
        });

        if depth >= self.config.max_depth || rows.len() < 2 || total.h < self.config.min_child_weight {
            return slot;
        }

        let split = match self.best_split(&rows, total) {
            Some(split) if split.gain > self.config.gamma => split,
            _ => return slot,
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&i| self.x[[i, split.feature]] <= split.threshold);
        if left_rows.is_empty() || right_rows.is_empty() {
            return slot;
        }

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[slot] = Node::Branch {
            feature: split.feature,
            threshold: split.threshold,
            gain: split.gain,
            left,
            right,
        };
        slot
    }

    fn best_split(&self, rows: &[usize], total: GradPair) -> Option<SplitCandidate> {
        self.features
            .par_iter()
            .filter_map(|&feature| self.scan(rows, feature, total))
            .max_by(SplitCandidate::rank)
    }

    /// Best threshold on one feature, scanning rows in value order
    fn scan(&self, rows: &[usize], feature: usize, total: GradPair) -> Option<SplitCandidate> {
        let mut ordered: Vec<(f64, usize)> = rows.iter().map(|&i| (self.x[[i, feature]], i)).collect();
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let parent = self.penalty.score(total);
        let mut left = GradPair::default();
        let mut best: Option<SplitCandidate> = None;

        for pair in ordered.windows(2) {
            let (value, row) = pair[0];
            let next = pair[1].0;
            left += self.grads[row];

            if value == next {
                continue;
            }
            let right = total - left;
            if left.h < self.config.min_child_weight || right.h < self.config.min_child_weight {
                continue;
            }

            let gain = 0.5 * (self.penalty.score(left) + self.penalty.score(right) - parent);
            if best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (value + next) / 2.0,
                    gain,
                });
            }
        }
        best
    }
}

/// `ceil(n * ratio)` distinct indices in ascending order, all of them when `ratio >= 1`
fn sample_indices(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    if ratio >= 1.0 {
        return indices;
    }
    let keep = ((n as f64 * ratio).ceil() as usize).clamp(1, n);
    indices.shuffle(rng);
    indices.truncate(keep);
    indices.sort_unstable();
    indices
}

/// Binary classifier; label 1 is the positive (bot) class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostClassifier {
    config: XGBoostConfig,
    trees: Vec<Tree>,
    /// Log-odds of the positive class in the training labels
    base_margin: f64,
    n_features: usize,
}

impl XGBoostClassifier {
    pub fn new(config: XGBoostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_margin: 0.0,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &XGBoostConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.n_features > 0
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        let (n_rows, n_cols) = x.dim();
        if n_rows == 0 || n_cols == 0 {
            return Err(DetectorError::TrainingError(format!(
                "Cannot fit on a {}x{} matrix",
                n_rows, n_cols
            )));
        }
        if y.len() != n_rows {
            return Err(DetectorError::ShapeError {
                expected: format!("{} labels", n_rows),
                actual: format!("{} labels", y.len()),
            });
        }
        if let Some(other) = y.iter().find(|&&label| label != 0 && label != 1) {
            return Err(DetectorError::TrainingError(format!(
                "Labels must be 0 or 1, got {}",
                other
            )));
        }

        let targets: Vec<f64> = y.iter().map(|&label| label as f64).collect();
        let positive = (targets.iter().sum::<f64>() / n_rows as f64).clamp(1e-7, 1.0 - 1e-7);
        self.base_margin = (positive / (1.0 - positive)).ln();
        self.n_features = n_cols;
        self.trees = Vec::with_capacity(self.config.n_estimators);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        let mut margins = vec![self.base_margin; n_rows];

        for round in 0..self.config.n_estimators {
            let grads: Vec<GradPair> = margins
                .iter()
                .zip(&targets)
                .map(|(&m, &t)| logistic_grad(m, t))
                .collect();

            let rows = sample_indices(&mut rng, n_rows, self.config.subsample);
            let columns = sample_indices(&mut rng, n_cols, self.config.colsample_bytree);
            let tree = TreeBuilder::new(x, &grads, &columns, &self.config).build(rows);

            // every row moves, sampled or not
            for (margin, row) in margins.iter_mut().zip(x.rows()) {
                *margin += tree.leaf_value(row);
            }
            trace!(round, nodes = tree.nodes.len(), "Grew tree");
            self.trees.push(tree);
        }

        debug!(
            trees = self.trees.len(),
            rows = n_rows,
            columns = n_cols,
            "Fitted booster"
        );
        Ok(())
    }

    fn margin(&self, row: ArrayView1<f64>) -> f64 {
        self.base_margin + self.trees.iter().map(|tree| tree.leaf_value(row)).sum::<f64>()
    }

    /// Positive-class probability for one row
    pub fn predict_proba_row(&self, row: &[f64]) -> Result<f64> {
        self.check_width(row.len())?;
        Ok(sigmoid(self.margin(ArrayView1::from(row))))
    }

    /// Positive-class probability per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_width(x.ncols())?;
        let mut probabilities = Array1::zeros(x.nrows());
        Zip::from(&mut probabilities)
            .and(x.rows())
            .par_for_each(|p, row| *p = sigmoid(self.margin(row)));
        Ok(probabilities)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        Ok(self.predict_proba(x)?.mapv(|p| i64::from(p >= 0.5)))
    }

    /// Fraction of rows predicted correctly
    pub fn score(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<f64> {
        let predicted = self.predict(x)?;
        if y.is_empty() {
            return Ok(0.0);
        }
        let hits = Zip::from(&predicted).and(y).fold(0usize, |acc, p, t| acc + usize::from(p == t));
        Ok(hits as f64 / y.len() as f64)
    }

    /// Total split gain per feature, normalized to sum to one.
    /// `None` before fitting.
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        if !self.is_fitted() {
            return None;
        }
        let mut totals = vec![0.0; self.n_features];
        for tree in &self.trees {
            tree.add_gains(&mut totals);
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|t| *t /= sum);
        }
        Some(Array1::from_vec(totals))
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if !self.is_fitted() {
            return Err(DetectorError::NotFitted);
        }
        if width != self.n_features {
            return Err(DetectorError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", width),
            });
        }
        Ok(())
    }
}
