//! Youth group API server.
//!
//! # Usage
//!
//! ```bash
//! # Start PostgreSQL, MongoDB and Redis, then:
//! cargo run -p youthgroup-server
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use youthgroup_server::{Config, YouthGroupApp, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "youthgroup_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting youth group API server...");

    let config = Config::from_env();
    tracing::info!(
        postgres_max_connections = config.postgres.max_connections,
        mongo_database = %config.mongo.database,
        port = config.server.port,
        "Configuration loaded"
    );

    let metrics_handle = if config.server.metrics_enabled {
        Some(metrics::install_recorder()?)
    } else {
        None
    };

    let app = YouthGroupApp::connect(config, metrics_handle).await?;
    tracing::info!("Connected to PostgreSQL, MongoDB and Redis");

    app.serve().await?;
    Ok(())
}
