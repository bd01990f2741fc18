mod rest;

use axum::{routing::get, Router};
use common::config::{load_dotenv, Config};
use common::{db, metrics};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    load_dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env("0.0.0.0:5005") {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting device dashboard API");
    info!("HTTP server: {}", config.http_addr);
    info!("Database: {}", config.database_display());
    info!("Anomaly grouping: {:?}", config.grouping);

    metrics::init_metrics();

    let pool = match db::make_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(rest::AppState {
            pool: pool.clone(),
            grouping: config.grouping,
        }));

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", config.http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", config.http_addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("HTTP server error: {}", e);
    }

    info!("Shutting down");
    pool.close().await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
