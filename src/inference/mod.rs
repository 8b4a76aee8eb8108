//! Inference engine module
//!
//! Scores profile records against a loaded artifact pair:
//! - Single-record and batch prediction with a configurable threshold
//! - Parallel scoring of large batches via rayon
//! - Atomic replacement of the live scorer
//! - Prediction, skip and latency counters

mod config;
mod engine;

pub use config::InferenceConfig;
pub use engine::{BatchPrediction, InferenceEngine, InferenceStats, Prediction};

use crate::error::Result;
use crate::profile::ProfileRecord;

/// Anything that turns a profile record into a bot probability
pub trait BotScorer: Send + Sync {
    /// Probability in [0, 1] that the record belongs to a bot
    fn bot_probability(&self, record: &ProfileRecord) -> Result<f64>;

    /// Identifier of the trained run behind this scorer, if any
    fn run_id(&self) -> Option<String> {
        None
    }
}
