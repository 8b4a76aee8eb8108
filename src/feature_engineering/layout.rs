//! Column layout of the combined feature matrix
//!
//! Every row the classifier sees is `[text columns | numeric columns]`, with
//! the text block sized by the fitted vocabulary and the numeric block in
//! [`NUMERIC_COLUMNS`] order. Training and inference both assemble rows
//! through [`FeatureLayout`].

use crate::error::{DetectorError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::text_features::SparseVector;

/// Number of numeric columns appended after the text block
pub const N_NUMERIC_FEATURES: usize = 11;

/// Numeric column names, in matrix order
pub const NUMERIC_COLUMNS: [&str; N_NUMERIC_FEATURES] = [
    "follower_count",
    "following_count",
    "biography_length",
    "media_count",
    "has_profile_picture",
    "is_private",
    "username_digit_count",
    "username_length",
    "follower_following_ratio",
    "has_numeric_username",
    "engagement_score",
];

/// Required raw fields as they are named in the labeled corpora
pub const CORPUS_FIELDS: [&str; 8] = [
    "userFollowerCount",
    "userFollowingCount",
    "userBiographyLength",
    "userMediaCount",
    "userHasProfilPic",
    "userIsPrivate",
    "usernameDigitCount",
    "usernameLength",
];

/// Shape of the combined matrix for a fitted vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    n_text: usize,
    numeric_columns: Vec<String>,
}

impl FeatureLayout {
    pub fn new(n_text: usize) -> Self {
        Self {
            n_text,
            numeric_columns: NUMERIC_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn n_text(&self) -> usize {
        self.n_text
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    /// Total number of columns
    pub fn width(&self) -> usize {
        self.n_text + self.numeric_columns.len()
    }

    /// Index of the first numeric column
    pub fn numeric_offset(&self) -> usize {
        self.n_text
    }

    /// Join one text vector and one (already scaled) numeric row
    pub fn assemble_row(&self, text: &SparseVector, numeric: &[f64]) -> Result<Vec<f64>> {
        self.check(text, numeric)?;
        let mut row = text.to_dense();
        row.extend_from_slice(numeric);
        Ok(row)
    }

    /// Join text vectors and a numeric matrix row by row
    pub fn assemble(&self, text: &[SparseVector], numeric: &Array2<f64>) -> Result<Array2<f64>> {
        if text.len() != numeric.nrows() {
            return Err(DetectorError::ShapeError {
                expected: format!("{} numeric rows", text.len()),
                actual: format!("{} numeric rows", numeric.nrows()),
            });
        }

        let mut matrix = Array2::zeros((text.len(), self.width()));
        for (i, vector) in text.iter().enumerate() {
            let row = numeric.row(i);
            let row = row.as_slice().ok_or_else(|| {
                DetectorError::DataError("numeric matrix is not contiguous".to_string())
            })?;
            self.check(vector, row)?;

            for (&j, &value) in vector.indices.iter().zip(vector.values.iter()) {
                matrix[[i, j]] = value;
            }
            for (k, &value) in row.iter().enumerate() {
                matrix[[i, self.n_text + k]] = value;
            }
        }

        Ok(matrix)
    }

    fn check(&self, text: &SparseVector, numeric: &[f64]) -> Result<()> {
        if text.dim != self.n_text {
            return Err(DetectorError::ShapeError {
                expected: format!("{} text columns", self.n_text),
                actual: format!("{} text columns", text.dim),
            });
        }
        if numeric.len() != self.numeric_columns.len() {
            return Err(DetectorError::ShapeError {
                expected: format!("{} numeric columns", self.numeric_columns.len()),
                actual: format!("{} numeric columns", numeric.len()),
            });
        }
        Ok(())
    }
}
