//! Kolosal benchmark - main entry point
//!
//! Compares GPU and CPU estimator pools under one pipeline search.

use clap::Parser;
use kolosal_bench::cli::{cmd_compare, cmd_generate, cmd_info, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kolosal_bench=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compare { args, pool, report } => {
            cmd_compare(&args, pool, report.as_deref())?;
        }
        Commands::Info { data, rows, label_column } => {
            cmd_info(&data, rows, label_column)?;
        }
        Commands::Generate { output, rows, features, classes, seed } => {
            cmd_generate(&output, rows, features, classes, seed)?;
        }
    }

    Ok(())
}
