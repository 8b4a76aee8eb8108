//! Bot detector CLI module
//!
//! Command-line interface for training, prediction and follower analysis.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::artifact::ArtifactPair;
use crate::collector::{AccountReport, FollowerAnalyzer, SnapshotSource};
use crate::inference::{InferenceConfig, InferenceEngine};
use crate::profile::ProfileRecord;
use crate::training::{ModelTrainer, ParamGrid, TrainerConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn alert(s: &str) -> ColoredString  { s.truecolor(235, 110, 100) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<20} {}", muted(key), val.white());
}

fn verdict(label: &str, is_bot: bool) -> ColoredString {
    if is_bot { alert(label) } else { ok(label) }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "bot-detector")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Detect automated Instagram accounts from profile signals")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a classifier on labeled bot and genuine corpora
    Train {
        /// JSON array of bot profiles
        #[arg(long)]
        bots: PathBuf,

        /// JSON array of genuine profiles
        #[arg(long)]
        genuine: PathBuf,

        /// JSON training config; absent keys keep their defaults
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Artifact output directory
        #[arg(short, long, env = "MODELS_DIR")]
        output: Option<PathBuf>,

        /// Use the small parameter grid
        #[arg(long)]
        quick: bool,

        /// Number of cross-validation folds
        #[arg(long)]
        cv_folds: Option<usize>,
    },

    /// Score profile records with a trained model
    Predict {
        /// JSON file holding one profile object or an array of them
        #[arg(short, long)]
        input: PathBuf,

        /// Artifact directory
        #[arg(short, long, env = "MODELS_DIR", default_value = "./models")]
        models: PathBuf,

        /// Bot probability threshold
        #[arg(long, default_value = "0.5")]
        threshold: f64,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Estimate the bot share among an account's followers
    Analyze {
        /// Account to analyze
        target: String,

        /// Snapshot file with follower lists and profiles
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Artifact directory
        #[arg(short, long, env = "MODELS_DIR", default_value = "./models")]
        models: PathBuf,

        /// Stop after this many followers
        #[arg(long)]
        max_followers: Option<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show metadata of a trained artifact pair
    Info {
        /// Artifact directory
        #[arg(short, long, env = "MODELS_DIR", default_value = "./models")]
        models: PathBuf,

        /// Number of top features to list
        #[arg(long, default_value = "10")]
        top: usize,
    },
}

// ─── Input loading ─────────────────────────────────────────────────────────────

/// Read one record or an array of records
pub fn load_records(path: &Path) -> anyhow::Result<Vec<ProfileRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;

    let records = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        other => vec![serde_json::from_value(other)?],
    };
    Ok(records)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    bots: &Path,
    genuine: &Path,
    config_path: Option<&Path>,
    output: Option<&Path>,
    quick: bool,
    cv_folds: Option<usize>,
) -> anyhow::Result<()> {
    section("Train");

    let mut config = match config_path {
        Some(path) => TrainerConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrainerConfig::default(),
    };
    if quick {
        config = config.with_grid(ParamGrid::quick());
    }
    if let Some(folds) = cv_folds {
        config = config.with_cv_folds(folds);
    }
    if let Some(dir) = output {
        config = config.with_artifact_dir(dir);
    }

    kv("Bot corpus", &bots.display().to_string());
    kv("Genuine corpus", &genuine.display().to_string());
    kv("Candidates", &config.grid.len().to_string());
    kv("CV folds", &config.cv_folds.to_string());
    println!();

    step_run("Training");
    let start = Instant::now();
    let outcome = ModelTrainer::new(config).train(bots, genuine)?;
    step_done(&format!("{:.2?}", start.elapsed()));

    section("Evaluation");
    kv("Accuracy", &format!("{:.4}", outcome.accuracy));
    kv("Best CV accuracy", &format!("{:.4}", outcome.best_cv_score));
    kv(
        "Best parameters",
        &format!(
            "n_estimators={} max_depth={} learning_rate={} subsample={} colsample_bytree={}",
            outcome.best_params.n_estimators,
            outcome.best_params.max_depth,
            outcome.best_params.learning_rate,
            outcome.best_params.subsample,
            outcome.best_params.colsample_bytree,
        ),
    );
    kv("Train / test", &format!("{} / {}", outcome.n_train, outcome.n_test));
    kv("SMOTE rows", &outcome.n_synthetic.to_string());
    println!();
    for line in outcome.report.to_string().lines() {
        println!("  {}", line);
    }

    if let Some(dir) = &outcome.artifact_dir {
        println!();
        println!("  {} {} {}", ok("✓"), "Saved".white(), dim(&dir.display().to_string()));
    }
    println!();
    Ok(())
}

pub fn cmd_predict(input: &Path, models: &Path, threshold: f64, json: bool) -> anyhow::Result<()> {
    let records = load_records(input)?;
    let engine = InferenceEngine::from_artifacts(
        InferenceConfig::new()
            .with_artifact_dir(models)
            .with_threshold(threshold),
    )?;

    let batch = engine.predict_batch(&records);

    if json {
        println!("{}", serde_json::to_string_pretty(&batch)?);
        return Ok(());
    }

    section("Predict");
    println!(
        "  {:<6} {:<14} {:>12} {:>12}",
        muted("#"), muted("Verdict"), muted("P(bot)"), muted("Confidence")
    );
    for (&i, p) in batch.indices.iter().zip(batch.predictions.iter()) {
        println!(
            "  {:<6} {:<14} {:>12.4} {:>12.4}",
            i,
            verdict(p.verdict(), p.is_bot()),
            p.bot_probability,
            p.confidence
        );
    }
    println!();
    kv("Bot percentage", &format!("{:.2}%", batch.bot_percentage));
    if batch.skipped > 0 {
        kv("Skipped", &batch.skipped.to_string());
    }
    println!();
    Ok(())
}

pub fn cmd_analyze(
    target: &str,
    snapshot: &Path,
    models: &Path,
    max_followers: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let source = SnapshotSource::from_json_file(snapshot)?;
    let engine = Arc::new(InferenceEngine::from_artifacts(
        InferenceConfig::new().with_artifact_dir(models),
    )?);

    let mut analyzer = FollowerAnalyzer::new(source, engine);
    if let Some(n) = max_followers {
        analyzer = analyzer.with_max_followers(n);
    }
    let report = analyzer.analyze(target)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_account_report(&report);
    Ok(())
}

fn print_account_report(report: &AccountReport) {
    section(&format!("Followers of @{}", report.target));
    println!(
        "  {:<28} {:<14} {:>10}",
        muted("Username"), muted("Verdict"), muted("P(bot)")
    );
    for f in &report.followers {
        println!(
            "  {:<28} {:<14} {:>10.4}",
            f.username,
            verdict(f.prediction.verdict(), f.prediction.is_bot()),
            f.prediction.bot_probability
        );
    }
    println!();
    kv("Bot percentage", &format!("{:.2}%", report.bot_percentage));
    kv(
        "Analyzed / listed",
        &format!("{} / {}", report.followers_analyzed, report.followers_listed),
    );
    if report.not_found + report.rate_limited + report.invalid + report.lookup_errors > 0 {
        kv(
            "Unscored",
            &format!(
                "not found {}, rate limited {}, invalid {}, errors {}",
                report.not_found, report.rate_limited, report.invalid, report.lookup_errors
            ),
        );
    }
    println!();
}

pub fn cmd_info(models: &Path, top: usize) -> anyhow::Result<()> {
    let pair = ArtifactPair::load(models)?;
    let metadata = pair.metadata();

    section("Model");
    kv("Directory", &models.display().to_string());
    kv("Run id", &metadata.run_id.to_string());
    kv("Created", &metadata.created_at.to_rfc3339());
    kv("Format version", &metadata.format_version.to_string());
    kv("Built by", &metadata.crate_version);
    kv("Vocabulary", &pair.layout().n_text().to_string());
    kv("Numeric columns", &pair.layout().numeric_columns().len().to_string());
    kv("Trees", &pair.model().n_trees().to_string());

    let features = pair.top_features(top);
    if !features.is_empty() {
        section("Top features");
        for (name, share) in features {
            println!("  {:<28} {:>8.4}", name, share);
        }
    }
    println!();
    Ok(())
}
