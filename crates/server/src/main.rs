mod api;
mod auth;
mod bootstrap;
mod bot_service;
mod health;
mod pdf;
mod quotation;

use std::sync::Arc;

use agromaq_bot::runner::NoopBotTransport;
use agromaq_core::config::{AppConfig, LoadOptions};
use anyhow::Result;

fn init_logging(config: &AppConfig) {
    use agromaq_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    if let Some(runner) = app.bot_runner(Arc::new(NoopBotTransport)) {
        tracing::info!(
            event_name = "system.server.bot_transport_mode",
            transport_mode = "noop",
            token_configured = app.config.bot_transport_configured(),
            correlation_id = "bootstrap",
            "bot runner transport mode initialized"
        );
        tokio::spawn(async move {
            if let Err(error) = runner.start().await {
                tracing::error!(
                    event_name = "system.server.bot_stopped",
                    correlation_id = "bot",
                    error = %error,
                    "bot runner stopped unexpectedly"
                );
            }
        });
    }

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "agromaq-server listening"
    );

    axum::serve(listener, app.router()).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "agromaq-server stopping"
    );
    app.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "failed to listen for shutdown signal");
    }
}
