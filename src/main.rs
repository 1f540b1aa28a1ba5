//! Downloads the latest FFmpeg XCFramework bundles into a package directory.

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use xcframework_fetch::{
    Result,
    client::GitHubClient,
    env::{Config, FALLBACK_TOKEN_VAR, TOKEN_VAR},
    fetch_latest_frameworks,
};

/// Download the latest FFmpeg XCFramework bundle from GitHub Actions artifacts
#[derive(Debug, Parser)]
#[command(name = "fetch-xcframeworks", version)]
#[command(after_help = format!(
    "Set {TOKEN_VAR} (preferred) or {FALLBACK_TOKEN_VAR} to a token with actions:read scope."
))]
struct Cli {
    /// Directory receiving the .xcframework bundles. Its previous contents are removed
    #[arg(default_value = "xcframework")]
    destination: PathBuf,

    /// Do nothing if every expected bundle already exists in the destination
    #[arg(long)]
    skip_existing: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    debug!("{cli:?}");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!("{err:?}");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?;
    let client = GitHubClient::new(config.clone());
    fetch_latest_frameworks(&client, &config, &cli.destination, cli.skip_existing).await?;
    Ok(())
}
