// SPDX-License-Identifier: AGPL-3.0-only
// Minimal bootstrap; handlers and configuration reside in library modules.
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use visa_dashboard::config::resolve_config_path;
use visa_dashboard::{build_router, AppState, DashboardConfig, Overrides};
use vista::{SessionStore, Variant};

#[derive(Parser, Debug, Clone)]
#[command(name = "visa-dashboard", about = "Reactive visa statistics dashboard server")]
struct Cli {
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    debug: bool,

    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "CSV")]
    data: Option<PathBuf>,

    #[arg(long)]
    variant: Option<Variant>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.clone(), std::env::var("VD_CONFIG").ok());
    let mut config = DashboardConfig::load(&config_path)?;
    config.apply(Overrides {
        host: cli.host,
        port: cli.port,
        debug: cli.debug,
        data: cli.data,
        variant: cli.variant,
    });
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.default_filter())),
        )
        .with_target(false)
        .init();
    info!(config = %config_path.display(), variant = %config.data.variant, "visa-dashboard starting");

    let dashboard = config
        .data
        .variant
        .load(&config.data_path(), &config.schengen, &config.bluecard)?;
    let store = SessionStore::new(Arc::new(dashboard), config.sessions.max_sessions);
    let app = build_router(AppState { store }, config.server.body_limit_bytes);

    let addr = config.bind_addr(std::env::var("VD_HTTP_ADDR").ok().as_deref())?;
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            warn!(error=%e, %addr, "bind failed, using ephemeral");
            tokio::net::TcpListener::bind("127.0.0.1:0").await?
        }
    };
    let local = listener.local_addr()?;
    info!(%local, "dashboard listening");

    tokio::select! { _ = axum::serve(listener, app) => {} _ = tokio::signal::ctrl_c() => {} }
    info!("visa-dashboard shutting down");
    Ok(())
}
