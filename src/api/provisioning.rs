use crate::agreement::{Agreement, AgreementStore};
use crate::directory::InMemoryTokenDirectory;
use crate::monitor::SpeedMonitor;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// State for the provisioning API.
#[derive(Clone)]
pub struct ProvisioningAppState {
    pub store: Arc<AgreementStore>,
    pub directory: Arc<InMemoryTokenDirectory>,
    pub monitor: Arc<SpeedMonitor>,
    /// Required bearer token for mutating routes. None = unrestricted.
    pub admin_token: Option<String>,
}

/// Full-set reload body
#[derive(Deserialize)]
struct ReloadRequest {
    agreements: Vec<Agreement>,
}

#[derive(Serialize)]
struct ReloadResponse {
    loaded: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest {
    device_token: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn create_provisioning_router(state: ProvisioningAppState) -> Router {
    Router::new()
        .route(
            "/api/agreements",
            get(list_agreements).put(reload_agreements),
        )
        .route(
            "/api/tokens/:customer_id",
            put(register_token).delete(remove_token),
        )
        .with_state(Arc::new(state))
}

/// GET /api/agreements — current agreement set.
async fn list_agreements(State(state): State<Arc<ProvisioningAppState>>) -> Response {
    Json(state.store.all()).into_response()
}

/// PUT /api/agreements — replace the full agreement set and re-sync the
/// monitor's feed subscriptions. Requires FLEETWATCH_ADMIN_TOKEN bearer.
async fn reload_agreements(
    State(state): State<Arc<ProvisioningAppState>>,
    headers: HeaderMap,
    Json(request): Json<ReloadRequest>,
) -> Response {
    if !validate_admin_token(&headers, &state.admin_token) {
        return unauthorized();
    }

    match state.store.reload(request.agreements) {
        Ok(loaded) => {
            state.monitor.sync(&state.store.asset_ids());
            info!(loaded = loaded, "Agreement set reloaded via API");
            Json(ReloadResponse { loaded }).into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// PUT /api/tokens/:customer_id — register a device token.
async fn register_token(
    State(state): State<Arc<ProvisioningAppState>>,
    Path(customer_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<TokenRequest>,
) -> Response {
    if !validate_admin_token(&headers, &state.admin_token) {
        return unauthorized();
    }

    if request.device_token.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "deviceToken is required".to_string(),
            }),
        )
            .into_response();
    }

    state.directory.register(&customer_id, &request.device_token);
    StatusCode::NO_CONTENT.into_response()
}

/// DELETE /api/tokens/:customer_id — remove a device token.
async fn remove_token(
    State(state): State<Arc<ProvisioningAppState>>,
    Path(customer_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !validate_admin_token(&headers, &state.admin_token) {
        return unauthorized();
    }

    if state.directory.remove(&customer_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("no device token registered for '{}'", customer_id),
            }),
        )
            .into_response()
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Unauthorized".to_string(),
        }),
    )
        .into_response()
}

/// Returns true if the bearer token in `Authorization` matches the expected
/// admin token. Returns true (no restriction) when `expected` is None.
fn validate_admin_token(headers: &HeaderMap, expected: &Option<String>) -> bool {
    let Some(expected_token) = expected else {
        // No admin token configured → mutations unrestricted (dev mode)
        return true;
    };

    let Some(auth_header) = headers.get("Authorization") else {
        return false;
    };
    let Ok(value) = auth_header.to_str() else {
        return false;
    };
    let Some(token) = value.strip_prefix("Bearer ") else {
        return false;
    };

    token == expected_token
}
