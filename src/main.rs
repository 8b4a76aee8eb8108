//! Bot detector - Main Entry Point

use clap::Parser;
use instagram_bot_detector::cli::{cmd_analyze, cmd_info, cmd_predict, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "instagram_bot_detector=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { bots, genuine, config, output, quick, cv_folds } => {
            cmd_train(&bots, &genuine, config.as_deref(), output.as_deref(), quick, cv_folds)?;
        }
        Commands::Predict { input, models, threshold, json } => {
            cmd_predict(&input, &models, threshold, json)?;
        }
        Commands::Analyze { target, snapshot, models, max_followers, json } => {
            cmd_analyze(&target, &snapshot, &models, max_followers, json)?;
        }
        Commands::Info { models, top } => {
            cmd_info(&models, top)?;
        }
    }

    Ok(())
}
