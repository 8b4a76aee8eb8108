//! Feature engineering module
//!
//! Turns profile records into classifier input:
//! - [`synthesizer`] derives a description and eleven numeric features per record
//! - [`text_features`] fits and applies the TF-IDF vectorizer over descriptions
//! - [`layout`] fixes the column order of the combined matrix

pub mod layout;
pub mod synthesizer;
pub mod text_features;

pub use layout::{FeatureLayout, CORPUS_FIELDS, NUMERIC_COLUMNS, N_NUMERIC_FEATURES};
pub use synthesizer::{describe, numeric_features, synthesize, SynthesizedFeatures};
pub use text_features::{tokenize, SparseVector, TfidfVectorizer, DEFAULT_MAX_FEATURES};
