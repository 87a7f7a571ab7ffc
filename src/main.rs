use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rentdesk::config::Config;
use rentdesk::oauth::GoogleUserInfo;
use rentdesk::AppState;

#[derive(Parser, Debug)]
#[command(name = "rentdesk")]
#[command(author, version, about = "Rental marketplace backend", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "rentdesk.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Override the listening port
    #[arg(short, long)]
    port: Option<u16>,

    /// Secret used to sign identity tokens
    #[arg(long, env = "RENTDESK_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Password for the bootstrap administrator
    #[arg(long, env = "RENTDESK_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(secret) = cli.jwt_secret {
        config.auth.jwt_secret = secret;
    }
    if let Some(password) = cli.admin_password {
        config.auth.admin_password = Some(password);
    }

    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting rentdesk v{}", env!("CARGO_PKG_VERSION"));

    std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
        format!(
            "Failed to create data directory: {}",
            config.server.data_dir.display()
        )
    })?;
    std::fs::create_dir_all(&config.uploads.root).with_context(|| {
        format!(
            "Failed to create upload directory: {}",
            config.uploads.root.display()
        )
    })?;

    let db = rentdesk::db::init(&config.server.data_dir).await?;

    let oracle = Arc::new(GoogleUserInfo::new(&config.oauth));
    let state = Arc::new(AppState::new(config.clone(), db, oracle));

    match &config.auth.admin_password {
        Some(password) => {
            let created = state
                .identity
                .ensure_admin(&config.auth.admin_email, password, &config.auth.admin_name)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create admin account: {}", e))?;
            if created {
                tracing::info!(email = %config.auth.admin_email, "Created admin account");
            }
        }
        None => tracing::info!("No admin password configured, skipping admin bootstrap"),
    }

    let app = rentdesk::api::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
