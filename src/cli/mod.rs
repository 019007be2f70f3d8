pub mod seed;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::app::{app, AppState};
use crate::config::{AppConfig, GeocoderProvider};
use crate::database::{DocumentStore, MemoryStore, PgStore, StoreError};
use crate::geo::{Geocoder, MapQuestGeocoder, StaticGeocoder};

#[derive(Parser)]
#[command(name = "bootcamp-api")]
#[command(about = "Bootcamp directory REST API server and data tools")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Import bootcamp and course fixtures into the database")]
    Seed {
        #[arg(long, help = "JSON array of bootcamp documents")]
        bootcamps: PathBuf,
        #[arg(long, help = "JSON array of course documents")]
        courses: Option<PathBuf>,
    },

    #[command(about = "Delete every bootcamp and course")]
    Purge,
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Seed { bootcamps, courses } => {
            let store = persistent_store(&config).await?;
            let geocoder = build_geocoder(&config)?;
            let result = seed::seed(store.as_ref(), geocoder.as_ref(), &bootcamps, courses.as_deref()).await;
            store.close().await;
            let summary = result?;
            println!("Imported {} bootcamps and {} courses", summary.bootcamps, summary.courses);
            Ok(())
        }
        Commands::Purge => {
            let store = persistent_store(&config).await?;
            let result = seed::purge(store.as_ref()).await;
            store.close().await;
            let removed = result?;
            println!("Deleted {} documents", removed);
            Ok(())
        }
    }
}

/// Postgres when `DATABASE_URL` is set, otherwise an empty in-memory store
pub async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    if config.database.url.is_none() {
        tracing::warn!("DATABASE_URL not set, using the in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = PgStore::connect(&config.database).await?;
    store.migrate().await?;
    Ok(Arc::new(store))
}

async fn persistent_store(config: &AppConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    if config.database.url.is_none() {
        return Err(StoreError::ConfigMissing("DATABASE_URL")).context("seed and purge need a database");
    }
    connect_store(config).await
}

pub fn build_geocoder(config: &AppConfig) -> anyhow::Result<Arc<dyn Geocoder>> {
    let geocoder: Arc<dyn Geocoder> = match config.geocoder.provider {
        GeocoderProvider::MapQuest => {
            let api_key = config.geocoder.api_key.clone().unwrap_or_default();
            Arc::new(MapQuestGeocoder::new(api_key, config.geocoder.base_url.clone())?)
        }
        GeocoderProvider::Static => match &config.geocoder.fixtures {
            Some(path) => Arc::new(StaticGeocoder::from_file(path)?),
            None => {
                tracing::warn!("static geocoder has no fixtures, every lookup will miss");
                Arc::new(StaticGeocoder::default())
            }
        },
    };
    Ok(geocoder)
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let store = connect_store(&config).await?;
    let geocoder = build_geocoder(&config)?;
    let bind_addr = config.bind_addr();

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Bootcamp API listening on http://{} ({:?})", bind_addr, config.environment);

    let state = AppState::new(store.clone(), geocoder, config);
    let served = axum::serve(listener, app(state)).with_graceful_shutdown(shutdown_signal()).await;

    store.close().await;
    served.context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
