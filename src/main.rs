use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod engine;
mod error;
mod features;
mod model;
mod routes;
mod types;

use crate::config::Config;
use engine::PredictionService;
use error::AppError;
use model::LogisticModel;
use routes::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stress_engine=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // The model is loaded before the listener binds; a missing artifact stops startup here.
    let (config, engine) = bootstrap()?;

    let metrics = if config.metrics_enabled {
        Some(PrometheusBuilder::new().install_recorder()?)
    } else {
        None
    };

    let app = routes::router(AppContext { engine, metrics }, &config.cors_origins);

    let addr: SocketAddr = config.bind_addr.parse()?;
    info!("Starting Student Stress Level Predictor on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn bootstrap() -> Result<(Config, PredictionService<LogisticModel>), AppError> {
    let config = Config::load()?;
    info!("Loaded configuration: {:?}", config);

    let model = LogisticModel::load(&config.model_path)?;
    Ok((config, PredictionService::new(model)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Shutdown signal received, starting graceful shutdown");
}
