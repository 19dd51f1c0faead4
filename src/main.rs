//! Command-line interface for sqltoelastic
//!
//! ```bash
//! sqltoelastic config.json
//! ```
//!
//! The single argument names a JSON configuration file; every key in it can
//! be overridden with a `SQLTOELASTIC_*` environment variable. The process
//! exits 0 only when extraction succeeded and every document was routed.

use clap::Parser;
use sqltoelastic::Config;

#[derive(Parser)]
#[command(name = "sqltoelastic")]
#[command(about = "Copy SQL query results into a date-partitioned Elasticsearch/OpenSearch index")]
struct Cli {
    /// Path to the JSON configuration file
    config: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    sqltoelastic::copy::copy_rows(&config).await?;
    Ok(())
}
