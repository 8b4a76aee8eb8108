//! Data preprocessing module
//!
//! Provides min-max feature scaling for the numeric feature block. The
//! fitted scaler is persisted alongside the text vectorizer and reapplied,
//! never refit, when scoring.

mod scaler;

pub use scaler::MinMaxScaler;
