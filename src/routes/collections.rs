use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{error, info};

use super::{authenticate, messages};
use crate::app::AppState;
use crate::auth::require_admin;
use crate::models::api::{CollectionForm, CollectionResponse};

/// Collection management routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/collections", get(list_collections))
        .route("/api/v1/collections/create", post(create_collection))
        .route(
            "/api/v1/collections/{key}",
            get(get_collection_by_key)
                .put(update_collection_by_key)
                .delete(delete_collection_by_key),
        )
}

/// GET /api/v1/collections - List all collections.
async fn list_collections(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<CollectionResponse>>, (StatusCode, String)> {
    authenticate(&state, &headers)?;

    let collections = state.collections.list().await.map_err(|e| {
        error!("Collection list error: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Database error: {e}"))
    })?;

    Ok(Json(collections.into_iter().map(Into::into).collect()))
}

/// POST /api/v1/collections/create - Create a collection (admin only).
async fn create_collection(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(form): Json<CollectionForm>,
) -> Result<Json<CollectionResponse>, (StatusCode, String)> {
    let auth = authenticate(&state, &headers)?;
    require_admin(&auth)?;

    match state.collections.insert(&auth.user_id, &form).await {
        Ok(collection) => {
            info!("Created collection {} (key={})", collection.name, collection.key);
            Ok(Json(collection.into()))
        }
        Err(e) => {
            error!("Collection insert error: {e}");
            Err((StatusCode::BAD_REQUEST, messages::FILE_EXISTS.to_string()))
        }
    }
}

/// GET /api/v1/collections/:key - Fetch one collection by key.
async fn get_collection_by_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Json<CollectionResponse>, (StatusCode, String)> {
    authenticate(&state, &headers)?;

    let collection = state.collections.get_by_key(&key).await.map_err(|e| {
        error!("Collection get error: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Database error: {e}"))
    })?;

    collection
        .map(|c| Json(c.into()))
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, messages::NOT_FOUND.to_string()))
}

/// PUT /api/v1/collections/:key - Update a collection by key (admin only).
async fn update_collection_by_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Json(form): Json<CollectionForm>,
) -> Result<Json<CollectionResponse>, (StatusCode, String)> {
    let auth = authenticate(&state, &headers)?;
    require_admin(&auth)?;

    match state.collections.update_by_key(&key, &form).await {
        Ok(collection) => Ok(Json(collection.into())),
        Err(e) => {
            error!("Collection update error: {e}");
            Err((StatusCode::BAD_REQUEST, messages::NAME_TAG_TAKEN.to_string()))
        }
    }
}

/// DELETE /api/v1/collections/:key - Delete a collection by key (admin only).
/// Deleting a missing key still reports true.
async fn delete_collection_by_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Json<bool>, (StatusCode, String)> {
    let auth = authenticate(&state, &headers)?;
    require_admin(&auth)?;

    match state.collections.delete_by_key(&key).await {
        Ok(()) => Ok(Json(true)),
        Err(e) => {
            error!("Collection delete error: {e}");
            Ok(Json(false))
        }
    }
}
