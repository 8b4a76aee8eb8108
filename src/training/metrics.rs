//! Classification metrics

use crate::error::{DetectorError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class: i64,
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Averaged precision, recall and F1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class and averaged metrics for a labeled evaluation set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
}

fn class_name(class: i64) -> String {
    match class {
        0 => "genuine".to_string(),
        1 => "bot".to_string(),
        other => other.to_string(),
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

impl ClassificationReport {
    /// Compute the report; classes are every label seen in either array, ascending
    pub fn compute(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(DetectorError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(DetectorError::ValidationError(
                "Cannot report on an empty evaluation set".to_string(),
            ));
        }

        let mut labels: Vec<i64> = y_true.iter().chain(y_pred.iter()).copied().collect();
        labels.sort_unstable();
        labels.dedup();

        let classes: Vec<ClassMetrics> = labels
            .iter()
            .map(|&class| {
                let (tp, fp, fn_) = confusion_counts(y_true, y_pred, class);
                let precision = ratio(tp, tp + fp);
                let recall = ratio(tp, tp + fn_);
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    class,
                    name: class_name(class),
                    precision,
                    recall,
                    f1_score,
                    support: tp + fn_,
                }
            })
            .collect();

        let correct = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
        let total = y_true.len();
        let n_classes = classes.len() as f64;

        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n_classes,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n_classes,
            f1_score: classes.iter().map(|c| c.f1_score).sum::<f64>() / n_classes,
            support: total,
        };

        let weighted = |metric: fn(&ClassMetrics) -> f64| -> f64 {
            classes
                .iter()
                .map(|c| metric(c) * c.support as f64)
                .sum::<f64>()
                / total as f64
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1_score: weighted(|c| c.f1_score),
            support: total,
        };

        Ok(Self {
            accuracy: ratio(correct, total),
            classes,
            macro_avg,
            weighted_avg,
        })
    }

    pub fn class(&self, class: i64) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.class == class)
    }
}

/// (true positives, false positives, false negatives) for one class
fn confusion_counts(y_true: &Array1<i64>, y_pred: &Array1<i64>, class: i64) -> (usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut fn_ = 0;

    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        match (t == class, p == class) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }

    (tp, fp, fn_)
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                c.name, c.precision, c.recall, c.f1_score, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, avg.precision, avg.recall, avg.f1_score, avg.support
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classification_report() {
        let y_true = array![1, 0, 1, 1, 0, 1, 0, 0];
        let y_pred = array![1, 0, 1, 0, 0, 1, 1, 0];

        let report = ClassificationReport::compute(&y_true, &y_pred).unwrap();
        assert!((report.accuracy - 0.75).abs() < 1e-12);

        let bot = report.class(1).unwrap();
        assert_eq!(bot.support, 4);
        assert!((bot.precision - 0.75).abs() < 1e-12);
        assert!((bot.recall - 0.75).abs() < 1e-12);
        assert!((report.macro_avg.f1_score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_missing_prediction_class_scores_zero() {
        let y_true = array![0, 0, 1];
        let y_pred = array![0, 0, 0];
        let report = ClassificationReport::compute(&y_true, &y_pred).unwrap();
        let bot = report.class(1).unwrap();
        assert_eq!(bot.precision, 0.0);
        assert_eq!(bot.recall, 0.0);
    }

    #[test]
    fn test_display_lists_classes() {
        let report = ClassificationReport::compute(&array![0, 1], &array![0, 1]).unwrap();
        let text = report.to_string();
        assert!(text.contains("genuine"));
        assert!(text.contains("bot"));
        assert!(text.contains("weighted avg"));
    }

    #[test]
    fn test_length_mismatch() {
        let result = ClassificationReport::compute(&array![0, 1], &array![0]);
        assert!(matches!(result, Err(DetectorError::ShapeError { .. })));
    }
}
