//! Folio server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use folio_core::config::AppConfig;
use folio_gc::log_audit;
use folio_server::{AppState, create_router};
use std::net::SocketAddr;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Folio - content API with asset garbage collection
#[derive(Parser, Debug)]
#[command(name = "foliod")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "FOLIO_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Load configuration: the TOML file when it exists, overridden by
/// `FOLIO_`-prefixed environment variables (`FOLIO_GC__DRY_RUN=true`).
fn load_config(path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();
    if Path::new(path).exists() {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::info!(config_path = %path, "No config file found, using defaults and environment");
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("FOLIO_").split("__").ignore(&["config"]))
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Folio v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    folio_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let content =
        folio_content::from_config(&config.content).context("failed to initialize content store")?;
    content
        .health_check()
        .await
        .context("content store health check failed")?;
    tracing::info!(backend = content.backend_name(), "Content store connectivity verified");

    let assets =
        folio_storage::from_config(&config.assets).context("failed to initialize asset store")?;
    assets
        .health_check()
        .await
        .context("asset store health check failed")?;
    tracing::info!(backend = assets.backend_name(), "Asset store connectivity verified");

    let state = AppState::new(config.clone(), content, assets);

    if config.gc.audit_on_startup {
        let results = state.gc.audit().await;
        log_audit(&results);
    }

    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
