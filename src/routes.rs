use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use std::{sync::Arc, time::Instant};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{
    engine::PredictionService,
    error::AppError,
    model::{Classifier, ModelInfo},
    types::{PredictResponse, StudentProfile},
};

pub struct AppContext<C: Classifier> {
    pub engine: PredictionService<C>,
    pub metrics: Option<PrometheusHandle>,
}

pub type AppState<C> = Arc<AppContext<C>>;

pub fn router<C: Classifier>(context: AppContext<C>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/predict", post(predict::<C>))
        .route("/model", get(model_info::<C>))
        .route("/metrics", get(metrics_handler::<C>))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(context))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to Student Stress Level Predictor API" }))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn predict<C: Classifier>(
    State(state): State<AppState<C>>,
    payload: Result<Json<StudentProfile>, JsonRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    let start = Instant::now();

    let Json(profile) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    profile.validate()?;

    let response = state.engine.predict(&profile)?;

    metrics::counter!("predictions_total", "stress_level" => response.stress_level.as_str())
        .increment(1);
    metrics::histogram!("prediction_duration_ms").record(start.elapsed().as_secs_f64() * 1000.0);

    Ok(Json(response))
}

pub async fn model_info<C: Classifier>(State(state): State<AppState<C>>) -> Json<ModelInfo> {
    Json(state.engine.model_info().clone())
}

pub async fn metrics_handler<C: Classifier>(State(state): State<AppState<C>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder is disabled").into_response(),
    }
}
