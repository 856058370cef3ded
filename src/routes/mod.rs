pub mod collections;
pub mod documents;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use crate::app::AppState;
use crate::auth::extract_auth_from_header;
use crate::models::api::{AuthContext, HealthResponse};

/// Response messages shared across handlers.
pub mod messages {
    pub const NOT_FOUND: &str = "Not found";
    pub const FILE_EXISTS: &str = "A document with this file already exists";
    pub const NAME_TAG_TAKEN: &str = "This name is already in use";
    pub const EMPTY_COLLECTION: &str = "Collection has no documents";
}

/// Resolve the caller's auth context from the Authorization header.
pub(crate) fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthContext, (StatusCode, String)> {
    extract_auth_from_header(
        headers.get("authorization").and_then(|v| v.to_str().ok()),
        &state.settings.jwt_secret_key,
        &state.settings.jwt_algorithm,
        state.settings.bypass_auth_mode,
        &state.settings.dev_user_id,
    )
}

/// Build all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(collections::routes())
        .merge(documents::routes())
        .with_state(state)
}

/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        environment: state.settings.environment.clone(),
    })
}
