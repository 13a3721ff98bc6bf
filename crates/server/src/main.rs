//! menuboard server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use menuboard_core::config::AppConfig;
use menuboard_server::{AppState, create_router};
use menuboard_storage::Gallery;
use std::net::SocketAddr;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ENV_PREFIX: &str = "MENUBOARD_";
const CONFIG_ENV: &str = "MENUBOARD_CONFIG";

/// menuboard - restaurant site backend
#[derive(Parser, Debug)]
#[command(name = "menuboardd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "MENUBOARD_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Merge the optional TOML file with `MENUBOARD_` environment variables.
fn load_config(config_path: &str) -> Result<AppConfig> {
    let path = Path::new(config_path);
    let mut figment = Figment::new();
    let has_config_file = path.exists();

    if has_config_file {
        tracing::info!(config_path = %config_path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", config_path);
    }

    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with(ENV_PREFIX) && key != CONFIG_ENV);

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: menuboardd --config /path/to/config.toml\n  \
             2. Environment variables: MENUBOARD_AUTH__USERNAME=admin \
             MENUBOARD_AUTH__PASSWORD=secret menuboardd\n\n\
             See config/server.example.toml for example configuration.\n\
             Set MENUBOARD_CONFIG env var to specify a default config file path."
        );
    }

    let config: AppConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid configuration")?;
    Ok(config)
}

/// Probe every backend. An unreachable write backend aborts startup; read
/// backends only warn since resolution tolerates them being down.
async fn check_backends(gallery: &Gallery) -> Result<()> {
    for (idx, backend) in gallery.backends().iter().enumerate() {
        let result = backend.health_check().await;
        match result {
            Ok(()) => {
                tracing::info!(backend = backend.backend_name(), index = idx, "Backend reachable");
            }
            Err(e) if idx == gallery.writer_index() => {
                return Err(e).with_context(|| {
                    format!("write backend {} failed health check", backend.backend_name())
                });
            }
            Err(e) => {
                tracing::warn!(
                    backend = backend.backend_name(),
                    index = idx,
                    error = %e,
                    "Read backend unreachable; its images will be missing until it recovers"
                );
            }
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
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

    tracing::info!("menuboard v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    menuboard_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let gallery = menuboard_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    tracing::info!(
        backends = gallery.backends().len(),
        writer = gallery.writer().backend_name(),
        "Storage backends initialized"
    );

    check_backends(&gallery).await?;

    if config.auth.token_secret.is_none() {
        tracing::warn!("No auth.token_secret configured; sessions will not survive a restart");
    }

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;

    let state = AppState::new(config, gallery).context("failed to build application state")?;
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}
