use clap::Parser;
use tracing_subscriber::EnvFilter;

use bootcamp_api::cli::{self, Cli};
use bootcamp_api::config::AppConfig;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    tracing::info!("Starting Bootcamp API in {:?} mode", config.environment);

    if let Err(e) = cli::run(cli, config).await {
        tracing::error!("fatal: {:#}", e);
        std::process::exit(1);
    }
}
