//! Integration test: batch scoring and scorer replacement

mod common;

use common::{bot_record, genuine_record};
use instagram_bot_detector::error::Result;
use instagram_bot_detector::inference::{BotScorer, InferenceConfig, InferenceEngine};
use instagram_bot_detector::profile::ProfileRecord;
use std::sync::Arc;

/// Scores by following/follower ratio
struct RatioScorer;

impl BotScorer for RatioScorer {
    fn bot_probability(&self, record: &ProfileRecord) -> Result<f64> {
        let ratio = record.following_count as f64 / (record.follower_count as f64 + 1.0);
        Ok(ratio / (ratio + 1.0))
    }

    fn run_id(&self) -> Option<String> {
        Some("ratio".to_string())
    }
}

struct FixedScorer(f64);

impl BotScorer for FixedScorer {
    fn bot_probability(&self, _: &ProfileRecord) -> Result<f64> {
        Ok(self.0)
    }

    fn run_id(&self) -> Option<String> {
        Some(format!("fixed-{}", self.0))
    }
}

fn engine(min_parallel: usize) -> InferenceEngine {
    InferenceEngine::new(
        InferenceConfig::default().with_parallel_min_batch(min_parallel),
        Arc::new(RatioScorer),
    )
}

#[test]
fn test_empty_batch() {
    let batch = engine(256).predict_batch(&[]);
    assert_eq!(batch.bot_percentage, 0.0);
    assert!(batch.predictions.is_empty());
    assert_eq!(batch.skipped, 0);
}

#[test]
fn test_mixed_batch_percentage() {
    let mut records: Vec<ProfileRecord> = (0..30).map(bot_record).collect();
    records.extend((0..10).map(genuine_record));

    let batch = engine(256).predict_batch(&records);
    assert_eq!(batch.predictions.len(), 40);
    assert_eq!(batch.n_bots(), 30);
    assert!((batch.bot_percentage - 75.0).abs() < 1e-9);
}

#[test]
fn test_invalid_records_are_skipped_and_counted() {
    let mut records: Vec<ProfileRecord> = (0..4).map(bot_record).collect();
    let mut broken = genuine_record(0);
    broken.username_length = 0;
    records.insert(2, broken);

    let engine = engine(256);
    let batch = engine.predict_batch(&records);
    assert_eq!(batch.skipped, 1);
    assert_eq!(batch.indices, vec![0, 1, 3, 4]);
    assert_eq!(batch.bot_percentage, 100.0);

    let stats = engine.stats();
    assert_eq!(stats.total_predictions, 4);
    assert_eq!(stats.skipped_records, 1);
}

#[test]
fn test_parallel_and_sequential_agree() {
    let records: Vec<ProfileRecord> = (0..300)
        .map(|i| if i % 3 == 0 { bot_record(i) } else { genuine_record(i) })
        .collect();

    let sequential = engine(usize::MAX).predict_batch(&records);
    let parallel = engine(1).predict_batch(&records);
    assert_eq!(sequential, parallel);
}

#[test]
fn test_threshold_controls_verdict() {
    let strict = InferenceEngine::new(InferenceConfig::default().with_threshold(0.9), Arc::new(FixedScorer(0.7)));
    let lenient = InferenceEngine::new(InferenceConfig::default().with_threshold(0.5), Arc::new(FixedScorer(0.7)));
    let record = bot_record(1);

    assert!(!strict.predict_one(&record).unwrap().is_bot());
    assert!(lenient.predict_one(&record).unwrap().is_bot());
}

#[test]
fn test_swap_under_concurrent_batches() {
    let engine = Arc::new(InferenceEngine::new(InferenceConfig::default(), Arc::new(FixedScorer(0.1))));
    let records: Vec<ProfileRecord> = (0..50).map(genuine_record).collect();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let records = records.clone();
            std::thread::spawn(move || {
                (0..20)
                    .map(|_| engine.predict_batch(&records).bot_percentage)
                    .collect::<Vec<f64>>()
            })
        })
        .collect();

    let previous = engine.replace_scorer(Arc::new(FixedScorer(0.9)));
    assert_eq!(previous.run_id().as_deref(), Some("fixed-0.1"));

    for worker in workers {
        for pct in worker.join().unwrap() {
            // every batch sees exactly one scorer
            assert!(pct == 0.0 || pct == 100.0, "split batch: {}", pct);
        }
    }
    assert_eq!(engine.predict_batch(&records).bot_percentage, 100.0);
}
