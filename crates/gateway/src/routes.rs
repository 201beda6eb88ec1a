use crate::error::{PredictError, internal_error_response};
use crate::format::{Detection, format_detections};
use crate::source;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use image::DynamicImage;
use inference::ModelState;
use serde::Serialize;
use std::any::Any;
use std::time::Instant;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

pub const SERVICE_DESCRIPTION: &str = "YOLO Object Detection API";

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_image_bytes;

    Router::new()
        .route("/", get(health))
        .route("/test", get(test))
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    message: String,
    model_loaded: bool,
    model_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_error: Option<String>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_state = state.loader.state();

    let message = match &model_state {
        ModelState::NotLoaded => "Model loads on the first prediction request".to_string(),
        ModelState::Loaded(_) => format!("Model {} is ready", state.loader.identifier()),
        ModelState::Failed(_) => "Model failed to load; predictions are unavailable".to_string(),
    };
    let model_error = match &model_state {
        ModelState::Failed(e) => Some(e.reason().to_string()),
        _ => None,
    };

    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_DESCRIPTION,
        message,
        model_loaded: matches!(model_state, ModelState::Loaded(_)),
        model_status: model_state.as_str(),
        model_error,
    })
}

#[derive(Serialize)]
struct TestResponse {
    status: &'static str,
    message: &'static str,
    endpoints: [&'static str; 3],
}

async fn test() -> Json<TestResponse> {
    Json(TestResponse {
        status: "ok",
        message: "API is responding",
        endpoints: ["/", "/test", "/predict"],
    })
}

async fn predict(State(state): State<AppState>, request: Request) -> Response {
    tracing::info!("Received prediction request");
    let start = Instant::now();

    match run_prediction(&state, request).await {
        Ok(detections) => {
            tracing::info!(
                count = detections.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Returning detections"
            );
            state
                .metrics
                .record("ok", start.elapsed(), detections.len());
            (StatusCode::OK, Json(detections)).into_response()
        }
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                tracing::error!(stage = e.stage(), status = status.as_u16(), error = %e, "Prediction failed");
            } else {
                tracing::warn!(stage = e.stage(), status = status.as_u16(), error = %e, "Prediction rejected");
            }
            state.metrics.record(e.stage(), start.elapsed(), 0);
            e.into_response()
        }
    }
}

/// Resolve, decode, load, detect, format. The model is only touched once the
/// request carries a decodable image.
async fn run_prediction(state: &AppState, request: Request) -> Result<Vec<Detection>, PredictError> {
    let bytes = source::resolve(request, state, &state.fetcher, state.max_image_bytes).await?;

    let image = tokio::task::spawn_blocking(move || decode(&bytes)).await??;

    let detector = state
        .loader
        .ensure_ready()
        .await
        .map_err(PredictError::ModelUnavailable)?;

    let results = {
        let detector = detector.clone();
        tokio::task::spawn_blocking(move || detector.detect(&image))
            .await?
            .map_err(|e| PredictError::DetectionFailed(format!("{:#}", e)))?
    };

    Ok(format_detections(&results, detector.labels()))
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, PredictError> {
    let image =
        image::load_from_memory(bytes).map_err(|e| PredictError::DecodeFailed(e.to_string()))?;
    tracing::debug!(
        width = image.width(),
        height = image.height(),
        "Image decoded"
    );
    Ok(image)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Request handler panicked");

    internal_error_response()
}
