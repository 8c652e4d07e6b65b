//! Webhook listener service.
//!
//! Loads configuration, prepares the record table and serves the webhook
//! endpoint until a shutdown signal arrives.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use listener_api::{AppState, Config};
use listener_core::{PostgresRecordStore, RecordStore};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

const DEFAULT_LOG_FILTER: &str = "info,webhook_listener=debug,listener_api=debug,tower_http=debug";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    init_tracing(&config.rust_log);

    info!(
        database_url = %config.database_url_masked(),
        table = %config.table_name,
        max_connections = config.database_max_connections,
        "Configuration loaded"
    );

    let table = config.table()?;
    let addr = config.parse_server_addr()?;

    let db_pool = create_database_pool(&config).await?;
    info!("Database connection pool established");

    let store = PostgresRecordStore::new(db_pool.clone(), table);
    store.health_check().await.context("Failed to verify database connection")?;
    store.repository().ensure_schema().await.context("Failed to prepare record table")?;
    info!(table = %config.table_name, "Record table ready");

    let state = AppState::with_store(Arc::new(store));
    let served = listener_api::start_server(state, config.http_settings(), addr).await;

    db_pool.close().await;
    info!("Database connections closed");

    served.context("HTTP server failed")?;
    info!("Webhook listener shutdown complete");
    Ok(())
}

/// Initializes tracing, falling back to the built-in filter when the
/// configured directive does not parse.
fn init_tracing(directive: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_new(directive)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

/// Creates the database connection pool with retry logic.
async fn create_database_pool(config: &Config) -> Result<sqlx::PgPool> {
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY: Duration = Duration::from_secs(2);

    let mut retries = 0;

    loop {
        match PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(config.database_acquire_timeout())
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) if retries < MAX_RETRIES => {
                retries += 1;
                warn!(
                    attempt = retries,
                    max_retries = MAX_RETRIES,
                    error = %e,
                    "Database connection failed, retrying"
                );
                tokio::time::sleep(RETRY_DELAY).await;
            },
            Err(e) => {
                return Err(e).context("Failed to create database connection pool after retries");
            },
        }
    }
}
