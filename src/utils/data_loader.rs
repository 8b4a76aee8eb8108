//! Data loading utilities

use crate::error::{DetectorError, Result};
use crate::feature_engineering::CORPUS_FIELDS;
use crate::profile::ProfileRecord;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Loader for labeled profile corpora
///
/// A corpus is a JSON array of objects carrying the eight raw fields named
/// in [`CORPUS_FIELDS`]. Extra fields are ignored.
#[derive(Debug, Clone, Default)]
pub struct DataLoader;

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self
    }

    /// Load a JSON array file into a DataFrame
    pub fn load_json(&self, path: &Path) -> Result<DataFrame> {
        if !path.exists() {
            return Err(DetectorError::DatasetNotFound {
                path: path.to_path_buf(),
            });
        }

        let bytes = std::fs::read(path)?;
        let compact: String = String::from_utf8_lossy(&bytes)
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if compact.is_empty() || compact == "[]" {
            return Err(DetectorError::EmptyCorpus {
                path: path.to_path_buf(),
            });
        }

        // infer over every record, not only the leading ones
        let df = JsonReader::new(Cursor::new(bytes))
            .infer_schema_len(None)
            .finish()
            .map_err(|e| DetectorError::DataError(format!("{}: {}", path.display(), e)))?;

        if df.height() == 0 {
            return Err(DetectorError::EmptyCorpus {
                path: path.to_path_buf(),
            });
        }

        Ok(df)
    }

    /// Load and validate a corpus of profile records.
    ///
    /// `corpus` names the corpus in error messages. The first record (by
    /// index) lacking a field is reported, naming the first absent field in
    /// schema order.
    pub fn load_corpus(&self, path: &Path, corpus: &str) -> Result<Vec<ProfileRecord>> {
        let start = Instant::now();
        let df = self.load_json(path)?;
        let n_rows = df.height();

        let mut columns: Vec<Vec<Option<f64>>> = Vec::with_capacity(CORPUS_FIELDS.len());
        for field in CORPUS_FIELDS {
            let values = match df.column(field) {
                Ok(column) => {
                    let cast = column.cast(&DataType::Float64)?;
                    let ca = cast.as_materialized_series().f64()?;
                    ca.into_iter().collect()
                }
                Err(_) => vec![None; n_rows],
            };
            columns.push(values);
        }

        let mut records = Vec::with_capacity(n_rows);
        for index in 0..n_rows {
            let mut row = [0.0f64; 8];
            for (j, field) in CORPUS_FIELDS.iter().enumerate() {
                row[j] = columns[j][index].ok_or_else(|| DetectorError::MissingField {
                    corpus: corpus.to_string(),
                    field: field.to_string(),
                    index,
                })?;
            }

            let record = record_from_row(&row).map_err(|reason| DetectorError::InvalidRecord {
                corpus: corpus.to_string(),
                index,
                reason,
            })?;
            record.validate().map_err(|e| DetectorError::InvalidRecord {
                corpus: corpus.to_string(),
                index,
                reason: e.to_string(),
            })?;
            records.push(record);
        }

        debug!(corpus, columns = df.width(), "Corpus columns parsed");
        info!(
            corpus,
            path = %path.display(),
            records = records.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded corpus"
        );

        Ok(records)
    }
}

fn record_from_row(row: &[f64; 8]) -> std::result::Result<ProfileRecord, String> {
    let count = |j: usize| -> std::result::Result<u64, String> {
        let v = row[j];
        if !v.is_finite() || v < 0.0 || v.fract() != 0.0 {
            return Err(format!("{} must be a non-negative integer, got {}", CORPUS_FIELDS[j], v));
        }
        Ok(v as u64)
    };

    Ok(ProfileRecord {
        follower_count: count(0)?,
        following_count: count(1)?,
        biography_length: count(2)?,
        media_count: count(3)?,
        has_profile_picture: row[4] != 0.0,
        is_private: row[5] != 0.0,
        username_digit_count: count(6)?,
        username_length: count(7)?,
    })
}
