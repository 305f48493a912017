use anyhow::Result;
use clap::Parser;
use tariff_sync::cli::{run, Cli, RunOutcome};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays clean for reports.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    match run(cli).await {
        Ok(RunOutcome::Completed) => {
            tracing::info!("CLI completed successfully");
            Ok(())
        }
        Ok(RunOutcome::Degraded { errors }) => {
            tracing::warn!(errors, "CLI completed with errors");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(error = %e, "CLI exited with error");
            Err(e)
        }
    }
}
