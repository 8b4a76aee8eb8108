//! TF-IDF over profile descriptions

use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Default vocabulary cap
pub const DEFAULT_MAX_FEATURES: usize = 10_000;

/// Sparse row over a fixed vocabulary, indices ascending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub dim: usize,
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Number of stored (non-zero) entries
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_zero(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.dim];
        for (&i, &v) in self.indices.iter().zip(&self.values) {
            dense[i] = v;
        }
        dense
    }
}

/// Lowercased alphanumeric runs of at least two characters
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
}

/// Fitted state: column terms, their lookup and idf weights
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Vocabulary {
    terms: Vec<String>,
    columns: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl Vocabulary {
    fn len(&self) -> usize {
        self.terms.len()
    }
}

/// Term-count × smoothed-idf vectorizer with L2-normalized rows.
///
/// Columns are the `max_features` terms with the highest document frequency,
/// ties broken alphabetically; column `i` is the term of rank `i`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    max_features: usize,
    vocabulary: Option<Vocabulary>,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TfidfVectorizer {
    pub fn new() -> Self {
        Self {
            max_features: DEFAULT_MAX_FEATURES,
            vocabulary: None,
        }
    }

    pub fn with_max_features(mut self, n: usize) -> Self {
        self.max_features = n.max(1);
        self
    }

    pub fn max_features(&self) -> usize {
        self.max_features
    }

    pub fn fit(&mut self, documents: &[String]) -> Result<()> {
        if documents.is_empty() {
            return Err(DetectorError::ValidationError(
                "Cannot fit vectorizer on zero documents".to_string(),
            ));
        }

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for document in documents {
            let distinct: BTreeSet<String> = tokenize(document).collect();
            for term in distinct {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        // BTreeMap iteration is alphabetical, and the sort is stable
        let mut ranked: Vec<(String, usize)> = document_frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(self.max_features);

        let n = documents.len() as f64;
        let mut terms = Vec::with_capacity(ranked.len());
        let mut columns = HashMap::with_capacity(ranked.len());
        let mut idf = Vec::with_capacity(ranked.len());
        for (column, (term, df)) in ranked.into_iter().enumerate() {
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
            columns.insert(term.clone(), column);
            terms.push(term);
        }

        self.vocabulary = Some(Vocabulary { terms, columns, idf });
        Ok(())
    }

    /// Weight one description. Terms outside the vocabulary are ignored, so an
    /// unseen description yields the zero vector rather than an error.
    pub fn transform_one(&self, document: &str) -> Result<SparseVector> {
        let vocabulary = self.vocabulary.as_ref().ok_or(DetectorError::NotFitted)?;

        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in tokenize(document) {
            if let Some(&column) = vocabulary.columns.get(&term) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let (indices, mut values): (Vec<usize>, Vec<f64>) = counts
            .into_iter()
            .map(|(column, count)| (column, count * vocabulary.idf[column]))
            .unzip();

        let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in &mut values {
                *v /= norm;
            }
        }

        Ok(SparseVector {
            dim: vocabulary.len(),
            indices,
            values,
        })
    }

    pub fn transform(&self, documents: &[String]) -> Result<Vec<SparseVector>> {
        documents.iter().map(|d| self.transform_one(d)).collect()
    }

    pub fn fit_transform(&mut self, documents: &[String]) -> Result<Vec<SparseVector>> {
        self.fit(documents)?;
        self.transform(documents)
    }

    pub fn is_fitted(&self) -> bool {
        self.vocabulary.is_some()
    }

    /// Number of text columns produced by `transform`
    pub fn n_features(&self) -> usize {
        self.vocabulary.as_ref().map_or(0, Vocabulary::len)
    }

    /// Column terms in column order; empty before fitting
    pub fn get_feature_names(&self) -> Vec<String> {
        self.vocabulary
            .as_ref()
            .map(|v| v.terms.clone())
            .unwrap_or_default()
    }
}
