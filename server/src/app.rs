//! Application lifecycle: connect the stores, serve, shut down.
//!
//! Every client is constructed here and handed to the gateways explicitly;
//! there are no process-wide singletons.

use crate::config::Config;
use crate::metrics::MetricsError;
use crate::server::{AppState, build_router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use youthgroup_core::YouthGroupError;
use youthgroup_core::environment::SystemClock;
use youthgroup_core::stores::RelationalStore;
use youthgroup_mongo::MongoDocumentStore;
use youthgroup_postgres::PostgresStore;
use youthgroup_redis::RedisCheckInStore;

/// Startup and serving errors.
#[derive(Error, Debug)]
pub enum StartupError {
    /// A store could not be reached
    #[error("Store error: {0}")]
    Store(#[from] YouthGroupError),

    /// Binding or serving failed
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),

    /// Metrics exporter could not be installed
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),
}

/// The running application: configuration, the relational pool owner and
/// the shared handler state.
pub struct YouthGroupApp {
    config: Config,
    postgres: PostgresStore,
    state: AppState,
}

impl YouthGroupApp {
    /// Connects PostgreSQL, MongoDB and Redis and builds the handler state.
    ///
    /// Schema capabilities are detected once, while connecting to
    /// PostgreSQL.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::Store`] if any store is unreachable.
    pub async fn connect(
        config: Config,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, StartupError> {
        let postgres = PostgresStore::connect(&config.postgres.pool_settings()).await?;
        let documents =
            MongoDocumentStore::connect(&config.mongo.uri, &config.mongo.database).await?;
        let checkins = RedisCheckInStore::new(&config.redis.url).await?;

        tracing::info!(
            volunteer_registrations = postgres.capabilities().registration_volunteer,
            "Schema capabilities detected"
        );

        let mut state = AppState::new(
            Arc::new(postgres.clone()),
            Arc::new(documents),
            Arc::new(checkins),
            Arc::new(SystemClock),
        );
        if let Some(handle) = metrics {
            state = state.with_metrics(handle);
        }

        Ok(Self {
            config,
            postgres,
            state,
        })
    }

    /// Serves HTTP until Ctrl-C or SIGTERM, then drains in-flight requests
    /// for at most the configured shutdown timeout and closes the pool.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::Io`] if the address cannot be bound or the
    /// server fails.
    pub async fn serve(self) -> Result<(), StartupError> {
        let addr = self.config.server.bind_addr();
        let router = build_router(self.state, &self.config.server.cors_allowed_origins);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "Youth group API listening");

        let (stopping_tx, mut stopping_rx) = tokio::sync::watch::channel(false);
        let server = axum::serve(listener, router).with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = stopping_tx.send(true);
        });

        let timeout = Duration::from_secs(self.config.server.shutdown_timeout);
        let drain_deadline = async move {
            let _ = stopping_rx.changed().await;
            tokio::time::sleep(timeout).await;
        };

        tokio::select! {
            result = server.into_future() => result?,
            () = drain_deadline => {
                tracing::warn!(
                    timeout_secs = timeout.as_secs(),
                    "Shutdown timeout elapsed, dropping open connections"
                );
            }
        }

        self.postgres.close().await;
        tracing::info!("Shutdown complete");
        Ok(())
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C, shutting down gracefully"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down gracefully"),
    }
}
