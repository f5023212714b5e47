//! # Server Bootstrap
//!
//! Wires configuration, optional persistence, the sweep task, and the
//! router into a running server. The CLI's `serve` command calls into
//! here; tests build [`crate::app`] directly instead.

use thiserror::Error;

use crate::state::{AppConfig, AppState};

/// Failures while bringing the server up.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Database connection or migration failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Could not bind or serve on the configured port.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read configuration from the environment.
///
/// - `HAVEN_PORT` — listen port (default 8080).
/// - `HAVEN_AUTH_TOKEN` — shared auth secret; unset enables the demo
///   header profile.
/// - `HAVEN_SWEEP_INTERVAL_SECS` — overdue sweep cadence (default 3600).
pub fn config_from_env() -> AppConfig {
    let mut config = AppConfig::default();
    if let Ok(port) = std::env::var("HAVEN_PORT") {
        if let Ok(port) = port.parse() {
            config.port = port;
        }
    }
    if let Ok(token) = std::env::var("HAVEN_AUTH_TOKEN") {
        if !token.is_empty() {
            config.auth_token = Some(crate::auth::SecretString::new(token));
        }
    }
    if let Ok(interval) = std::env::var("HAVEN_SWEEP_INTERVAL_SECS") {
        if let Ok(interval) = interval.parse() {
            config.sweep_interval_secs = interval;
        }
    }
    config
}

/// Build state (connecting and hydrating when `DATABASE_URL` is set),
/// spawn the sweep task, and serve until shutdown.
pub async fn run(config: AppConfig) -> Result<(), BootstrapError> {
    let pool = crate::db::init_pool().await?;

    let state = AppState::with_config(config.clone(), pool);
    if let Some(pool) = state.db_pool.clone() {
        let (applications, leases, payments, notifications) =
            crate::db::load_state(&pool).await?;
        state.hydrate(applications, leases, payments, notifications);
    }

    crate::sweep::spawn_sweeper(state.clone(), config.sweep_interval_secs);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "haven-api listening");
    axum::serve(listener, crate::app(state)).await?;
    Ok(())
}
