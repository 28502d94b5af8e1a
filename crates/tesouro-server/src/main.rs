//! Tesouro rates server entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tesouro_config::{AppConfig, LogFormat, LoggingSettings};
use tesouro_engine::{Acquirer, AcquirerSettings, ScrapeGate, Shutdown, SnapshotStore, SortPriority};
use tesouro_ext_http::{BrowserClient, CsvBondSource, JsonBondSource};
use tesouro_server::{signal, Server};
use tesouro_traits::{BondSource, SourceKind};

/// Serve Tesouro Direto bond rates over HTTP.
#[derive(Parser)]
#[command(name = "tesouro-server", version, about)]
struct Args {
    /// TOML configuration file; environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of configuration
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging, args.verbose);

    info!("Tesouro Rates Server v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(SnapshotStore::new());
    let shutdown = Shutdown::new();
    tokio::spawn(signal::listen(shutdown.clone()));

    let acquirer_task = if config.scraper.enabled {
        let acquirer = build_acquirer(&config, store.clone())?;
        info!(
            source = %config.scraper.source,
            interval_minutes = config.scraper.interval_minutes,
            "Scraper enabled"
        );
        let shutdown = shutdown.clone();
        Some(tokio::spawn(async move { acquirer.run(shutdown).await }))
    } else {
        info!("Scraper disabled, serving an empty snapshot");
        None
    };

    let server = Server::new(config.server.clone(), store);
    let served = server.start(shutdown.clone()).await;

    // A server that failed to bind still has to stop the acquirer.
    shutdown.trigger();
    if let Some(task) = acquirer_task {
        task.await.context("Acquirer task panicked")?;
    }

    served.context("HTTP server failed")?;
    info!("App shutdown complete");
    Ok(())
}

fn init_tracing(logging: &LoggingSettings, verbose: bool) {
    let default_level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let (json, text) = match logging.format {
        LogFormat::Json => (Some(tracing_subscriber::fmt::layer().json()), None),
        LogFormat::Text => (None, Some(tracing_subscriber::fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

fn build_acquirer(config: &AppConfig, store: Arc<SnapshotStore>) -> anyhow::Result<Acquirer> {
    let scraper = &config.scraper;
    let client = BrowserClient::new(config.request_timeout()).context("Failed to build HTTP client")?;

    let source: Arc<dyn BondSource> = match scraper.source {
        SourceKind::Json => {
            let url = scraper
                .json_url
                .clone()
                .ok_or_else(|| anyhow!("URL_TESOURO is required for the JSON source"))?;
            Arc::new(JsonBondSource::new(client, url))
        }
        SourceKind::Csv => {
            let invest = scraper
                .invest_csv_url
                .clone()
                .ok_or_else(|| anyhow!("URL_INVEST_CSV is required for the CSV source"))?;
            let redeem = scraper
                .redeem_csv_url
                .clone()
                .ok_or_else(|| anyhow!("URL_REDEEM_CSV is required for the CSV source"))?;
            Arc::new(CsvBondSource::new(client, invest, redeem))
        }
    };

    let settings = AcquirerSettings {
        interval: config.interval(),
        gate: ScrapeGate::new(config.timezone()?, config.day_range(), config.hour_range()),
        sort_priority: SortPriority::new(scraper.sort_priority.iter()),
    };

    Ok(Acquirer::new(source, store, settings))
}
