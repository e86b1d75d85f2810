#![forbid(unsafe_code)]

//! `incident-relay` — incident-response chat bot server binary.
//!
//! Bootstraps configuration, connects the database, starts the retention
//! purge task, and serves the webhook ingress until a shutdown signal.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use incident_relay::config::GlobalConfig;
use incident_relay::llm::Summarizer;
use incident_relay::persistence::{db, retention};
use incident_relay::slack::gateway::SlackGateway;
use incident_relay::state::AppState;
use incident_relay::webhook::server;
use incident_relay::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "incident-relay", about = "Incident-response chat bot server", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("incident-relay server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    config.load_credentials().await?;
    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Initialize database ─────────────────────────────
    let db = Arc::new(db::connect(&config.db_path).await?);
    info!("database connected");

    // ── Start retention service ─────────────────────────
    let ct = CancellationToken::new();
    let retention_handle = retention::spawn_retention_task(
        Arc::clone(&db),
        config.message_retention_days,
        ct.clone(),
    );
    info!("retention service started");

    // ── Build shared application state ──────────────────
    let slack = if config.slack.is_configured() {
        Some(Arc::new(SlackGateway::new(config.slack.bot_token.clone())?))
    } else {
        warn!("slack not configured; webhook endpoints will answer 503");
        None
    };

    let summarizer = match config.llm {
        Some(ref llm) => {
            info!(model = %llm.model, "summarizer configured");
            Some(Arc::new(Summarizer::new(llm)?))
        }
        None => None,
    };

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        db,
        slack,
        summarizer,
    });

    // ── Serve the webhook ingress ───────────────────────
    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|err| AppError::Io(format!("failed to bind {addr}: {err}")))?;
    info!(%addr, "webhook ingress listening");

    let app = server::router(Arc::clone(&state));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Io(format!("webhook server failed: {err}")))?;

    info!("shutdown signal received");
    ct.cancel();

    // ── Wait for background tasks ───────────────────────
    if let Err(err) = retention_handle.await {
        error!(%err, "retention task join failed");
    }
    info!("incident-relay shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
