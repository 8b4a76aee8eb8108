//! Inference engine implementation
//!
//! - Single-record and batch scoring through an `Arc`-shared [`BotScorer`]
//! - One scorer snapshot per call, so a concurrent swap never splits a batch
//! - Parallel batch processing via rayon above a size cutoff
//! - Invalid records in a batch are skipped and counted
//! - Lock-free counters for predictions, bots, skips and latency

use super::{BotScorer, InferenceConfig};
use crate::artifact::ArtifactPair;
use crate::error::{DetectorError, Result};
use crate::profile::{Label, ProfileRecord};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Verdict for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    /// Probability of the bot class
    pub bot_probability: f64,
    /// Probability of the predicted label
    pub confidence: f64,
}

impl Prediction {
    fn from_probability(bot_probability: f64, threshold: f64) -> Self {
        let label = if bot_probability >= threshold {
            Label::Bot
        } else {
            Label::Genuine
        };
        let confidence = match label {
            Label::Bot => bot_probability,
            Label::Genuine => 1.0 - bot_probability,
        };
        Self {
            label,
            bot_probability,
            confidence,
        }
    }

    pub fn is_bot(&self) -> bool {
        self.label == Label::Bot
    }

    /// "Bot Detected" or "Real User"
    pub fn verdict(&self) -> &'static str {
        self.label.verdict()
    }
}

/// Verdicts for a batch of records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPrediction {
    /// Bots among scored records, as a percentage; 0 when nothing was scored
    pub bot_percentage: f64,
    /// One entry per scored record, in input order
    pub predictions: Vec<Prediction>,
    /// Input position of each entry in `predictions`
    pub indices: Vec<usize>,
    /// Records that failed validation or scoring
    pub skipped: usize,
}

impl BatchPrediction {
    pub fn n_bots(&self) -> usize {
        self.predictions.iter().filter(|p| p.is_bot()).count()
    }
}

/// Inference statistics snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceStats {
    pub total_predictions: u64,
    pub bot_predictions: u64,
    pub skipped_records: u64,
    pub avg_latency_us: f64,
}

#[derive(Debug, Default)]
struct StatsCounters {
    predictions: AtomicU64,
    bots: AtomicU64,
    skipped: AtomicU64,
    latency_us: AtomicU64,
}

impl StatsCounters {
    fn record(&self, predictions: u64, bots: u64, skipped: u64, latency_us: u64) {
        self.predictions.fetch_add(predictions, Ordering::Relaxed);
        self.bots.fetch_add(bots, Ordering::Relaxed);
        self.skipped.fetch_add(skipped, Ordering::Relaxed);
        self.latency_us.fetch_add(latency_us, Ordering::Relaxed);
    }

    fn snapshot(&self) -> InferenceStats {
        let total = self.predictions.load(Ordering::Relaxed);
        let latency = self.latency_us.load(Ordering::Relaxed);
        InferenceStats {
            total_predictions: total,
            bot_predictions: self.bots.load(Ordering::Relaxed),
            skipped_records: self.skipped.load(Ordering::Relaxed),
            avg_latency_us: if total > 0 { latency as f64 / total as f64 } else { 0.0 },
        }
    }
}

/// Scores profile records against the live scorer
pub struct InferenceEngine {
    config: InferenceConfig,
    scorer: RwLock<Arc<dyn BotScorer>>,
    stats: StatsCounters,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("config", &self.config)
            .field("run_id", &self.scorer.read().run_id())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl InferenceEngine {
    /// Create an engine around an already loaded scorer
    pub fn new(config: InferenceConfig, scorer: Arc<dyn BotScorer>) -> Self {
        Self {
            config,
            scorer: RwLock::new(scorer),
            stats: StatsCounters::default(),
        }
    }

    /// Load the artifact pair from `config.artifact_dir`
    pub fn from_artifacts(config: InferenceConfig) -> Result<Self> {
        let pair = ArtifactPair::load(&config.artifact_dir)?;
        Ok(Self::new(config, Arc::new(pair)))
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// The scorer currently serving requests
    pub fn scorer(&self) -> Arc<dyn BotScorer> {
        Arc::clone(&self.scorer.read())
    }

    /// Swap in a new scorer; in-flight calls finish on the one they started with.
    /// Returns the replaced scorer.
    pub fn replace_scorer(&self, scorer: Arc<dyn BotScorer>) -> Arc<dyn BotScorer> {
        let previous = std::mem::replace(&mut *self.scorer.write(), scorer);
        info!(
            previous = previous.run_id().as_deref().unwrap_or("-"),
            current = self.scorer.read().run_id().as_deref().unwrap_or("-"),
            "Replaced scorer"
        );
        previous
    }

    /// Load a fresh pair from the configured directory and swap it in.
    /// On failure the live scorer is left untouched.
    pub fn reload(&self) -> Result<()> {
        let pair = ArtifactPair::load(&self.config.artifact_dir)?;
        self.replace_scorer(Arc::new(pair));
        Ok(())
    }

    /// Score a single record
    pub fn predict_one(&self, record: &ProfileRecord) -> Result<Prediction> {
        let start = Instant::now();
        let scorer = self.scorer();
        let prediction = self.score_with(scorer.as_ref(), record);

        let latency = start.elapsed().as_micros() as u64;
        match &prediction {
            Ok(p) => self.stats.record(1, p.is_bot() as u64, 0, latency),
            Err(_) => self.stats.record(0, 0, 1, 0),
        }
        prediction
    }

    /// Score a batch of records against one scorer snapshot.
    ///
    /// Records that fail are skipped and counted; an empty batch yields
    /// `bot_percentage == 0` and no predictions.
    pub fn predict_batch(&self, records: &[ProfileRecord]) -> BatchPrediction {
        if records.is_empty() {
            return BatchPrediction {
                bot_percentage: 0.0,
                predictions: Vec::new(),
                indices: Vec::new(),
                skipped: 0,
            };
        }

        let start = Instant::now();
        let scorer = self.scorer();
        let score = |(i, record): (usize, &ProfileRecord)| (i, self.score_with(scorer.as_ref(), record));

        let results: Vec<(usize, Result<Prediction>)> = if records.len() >= self.config.parallel_min_batch {
            records.par_iter().enumerate().map(score).collect()
        } else {
            records.iter().enumerate().map(score).collect()
        };

        let mut predictions = Vec::with_capacity(results.len());
        let mut indices = Vec::with_capacity(results.len());
        let mut skipped = 0;
        for (i, result) in results {
            match result {
                Ok(p) => {
                    predictions.push(p);
                    indices.push(i);
                }
                Err(e) => {
                    warn!(index = i, error = %e, "Skipping record");
                    skipped += 1;
                }
            }
        }

        let n_bots = predictions.iter().filter(|p| p.is_bot()).count();
        let bot_percentage = if predictions.is_empty() {
            0.0
        } else {
            n_bots as f64 / predictions.len() as f64 * 100.0
        };

        let latency = start.elapsed().as_micros() as u64;
        self.stats
            .record(predictions.len() as u64, n_bots as u64, skipped as u64, latency);
        debug!(
            records = records.len(),
            scored = predictions.len(),
            skipped,
            bot_percentage,
            latency_us = latency,
            "Scored batch"
        );

        BatchPrediction {
            bot_percentage,
            predictions,
            indices,
            skipped,
        }
    }

    pub fn stats(&self) -> InferenceStats {
        self.stats.snapshot()
    }

    fn score_with(&self, scorer: &dyn BotScorer, record: &ProfileRecord) -> Result<Prediction> {
        record.validate()?;
        let probability = scorer.bot_probability(record)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(DetectorError::ValidationError(format!(
                "scorer returned probability {} outside [0, 1]",
                probability
            )));
        }
        Ok(Prediction::from_probability(
            probability,
            self.config.classification_threshold,
        ))
    }
}
