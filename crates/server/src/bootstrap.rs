use std::sync::Arc;

use agromaq_bot::commands::RouterSettings;
use agromaq_bot::events::command_dispatcher;
use agromaq_bot::runner::{BotTransport, PollingRunner, ReconnectPolicy};
use agromaq_core::clock::{Clock, SystemClock};
use agromaq_core::config::AppConfig;
use agromaq_core::cpq::catalog::CatalogDefinition;
use agromaq_db::repositories::{RepositoryError, SqlMachineRepository, SqlQuotationRepository};
use agromaq_db::{connect_with_config, migrations, seed_catalog, DbPool};
use axum::Router;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use crate::api::{self, AppState};
use crate::auth::AdminCredentials;
use crate::bot_service::QuotationBotService;
use crate::health;
use crate::pdf::{DocumentRenderer, PdfConverter, PdfError, WkhtmltopdfConverter};
use crate::quotation::QuotationService;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<QuotationService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("catalog seeding failed: {0}")]
    Seed(#[source] RepositoryError),
    #[error("document renderer could not be initialized: {0}")]
    Renderer(#[source] PdfError),
}

/// Connects, migrates and seeds, then wires the quotation service.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let catalog = Arc::new(CatalogDefinition::agromaq());
    let machines = Arc::new(SqlMachineRepository::new(db_pool.clone()));
    let seeded = seed_catalog(machines.as_ref(), &catalog).await.map_err(BootstrapError::Seed)?;
    info!(
        event_name = "system.bootstrap.catalog_ready",
        correlation_id = "bootstrap",
        inserted = seeded.inserted,
        total = seeded.total,
        "machine catalog ready"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let converter = WkhtmltopdfConverter::locate(config.document.wkhtmltopdf_path.as_deref())
        .map(|converter| Arc::new(converter) as Arc<dyn PdfConverter>);
    let renderer = DocumentRenderer::new(config.document.clone(), clock.clone())
        .map_err(BootstrapError::Renderer)?
        .with_converter(converter);

    let service = Arc::new(QuotationService::new(
        machines,
        Arc::new(SqlQuotationRepository::new(db_pool.clone())),
        Arc::new(renderer),
        catalog,
        clock,
    ));

    Ok(Application { config, db_pool, service })
}

impl Application {
    /// API routes plus `/health`.
    pub fn router(&self) -> Router {
        let state = AppState {
            service: self.service.clone(),
            admin: Arc::new(AdminCredentials::from_config(&self.config.admin)),
        };
        api::router(state).merge(health::router(self.db_pool.clone()))
    }

    /// A polling runner for the chat bot, or `None` when the bot is disabled.
    pub fn bot_runner(&self, transport: Arc<dyn BotTransport>) -> Option<PollingRunner> {
        if !self.config.bot.enabled {
            return None;
        }

        let settings = RouterSettings {
            admin_ids: self.config.bot.admin_ids.clone(),
            discount_percent: Decimal::from(self.config.bot.discount_percent),
        };
        let dispatcher =
            command_dispatcher(QuotationBotService::new(self.service.clone()), settings);
        Some(PollingRunner::new(transport, dispatcher, ReconnectPolicy::default()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use agromaq_bot::runner::NoopBotTransport;
    use agromaq_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::bootstrap::{bootstrap_with_config, BootstrapError};

    fn config(bot_enabled: bool) -> AppConfig {
        AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                admin_username: Some("admin".to_string()),
                admin_password: Some("secret".to_string()),
                bot_enabled: Some(bot_enabled),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("valid config")
    }

    #[tokio::test]
    async fn bootstrap_reports_unreachable_database() {
        let mut config = config(false);
        config.database.url = "sqlite:///nonexistent-agromaq-dir/agromaq.db".to_string();

        let result = bootstrap_with_config(config).await;

        assert!(matches!(result, Err(BootstrapError::DatabaseConnect(_))));
    }

    #[tokio::test]
    async fn bootstrap_migrates_seeds_and_serves_the_catalog() {
        let app = bootstrap_with_config(config(false))
            .await
            .expect("bootstrap should succeed with valid config");

        let (machine_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM machine")
            .fetch_one(&app.db_pool)
            .await
            .expect("machine table should exist after bootstrap");
        assert_eq!(machine_count, 25);

        let response = app
            .router()
            .oneshot(Request::get("/machines/ACO001").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let health = app
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(health.status(), StatusCode::OK);

        assert!(app.bot_runner(Arc::new(NoopBotTransport)).is_none());

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn enabled_bot_gets_a_runner() {
        let app = bootstrap_with_config(config(true)).await.expect("bootstrap");

        let runner = app.bot_runner(Arc::new(NoopBotTransport)).expect("runner");
        runner.start().await.expect("noop transport ends cleanly");

        app.db_pool.close().await;
    }
}
