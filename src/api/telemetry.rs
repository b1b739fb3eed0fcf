use crate::telemetry::{EmitOutcome, TelemetryFeed};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Shared state for the telemetry ingestion API
#[derive(Clone)]
pub struct TelemetryAppState {
    pub feed: Arc<TelemetryFeed>,
}

/// Incoming speed reading
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SampleRequest {
    asset_id: String,
    speed: f64,
}

/// Ingestion result. `delivered: false` means no observer is registered for
/// the asset — a vehicle without an active rental is a normal state.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SampleResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_id: Option<String>,
    asset_id: String,
    delivered: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create API router with the telemetry ingestion endpoint
pub fn create_telemetry_router(state: TelemetryAppState) -> Router {
    Router::new()
        .route("/api/telemetry", post(ingest_sample))
        .with_state(Arc::new(state))
}

/// POST /api/telemetry - Offer one speed sample
async fn ingest_sample(
    State(state): State<Arc<TelemetryAppState>>,
    Json(request): Json<SampleRequest>,
) -> Response {
    if request.asset_id.is_empty() {
        return bad_request("assetId is required");
    }
    if !request.speed.is_finite() || request.speed < 0.0 {
        return bad_request("speed must be a finite non-negative number");
    }

    info!(
        asset_id = %request.asset_id,
        speed = request.speed,
        "Ingesting speed sample"
    );

    match state.feed.emit(&request.asset_id, request.speed) {
        EmitOutcome::Accepted(sample_id) => (
            StatusCode::ACCEPTED,
            Json(SampleResponse {
                sample_id: Some(sample_id),
                asset_id: request.asset_id,
                delivered: true,
            }),
        )
            .into_response(),
        EmitOutcome::NoObserver => (
            StatusCode::ACCEPTED,
            Json(SampleResponse {
                sample_id: None,
                asset_id: request.asset_id,
                delivered: false,
            }),
        )
            .into_response(),
        EmitOutcome::QueueFull => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "telemetry queue full, sample dropped".to_string(),
            }),
        )
            .into_response(),
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
