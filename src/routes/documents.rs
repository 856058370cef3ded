use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info};

use super::{authenticate, messages};
use crate::app::AppState;
use crate::auth::require_admin;
use crate::database::StoreError;
use crate::models::api::{
    DocumentForm, DocumentResponse, DocumentUpdateForm, TagDocumentForm, UploadResponse,
};

/// Document management routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/documents", get(list_documents))
        .route("/api/v1/documents/create", post(create_document))
        .route("/api/v1/documents/upload", post(upload_document))
        .route("/api/v1/documents/download/{collection}", get(download_by_collection))
        .route("/api/v1/documents/files", get(get_documents_by_paths))
        .route("/api/v1/documents/name/{name}", get(get_document_by_name))
        .route("/api/v1/documents/collection/{collection}", post(get_documents_by_collection))
        .route("/api/v1/documents/name/{name}/tags", post(tag_document_by_name))
        .route("/api/v1/documents/name/{name}/update", post(update_document_by_name))
        .route("/api/v1/documents/name/{name}/delete", delete(delete_document_by_name))
        .route("/api/v1/documents/delete", delete(delete_all_documents))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default)]
    collection: Option<String>,
}

/// GET /api/v1/documents - List documents, optionally filtered by
/// collection label.
async fn list_documents(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<DocumentResponse>>, (StatusCode, String)> {
    authenticate(&state, &headers)?;

    let docs = match params.collection.as_deref() {
        Some(collection) => state.documents.get_by_collection(collection).await,
        None => state.documents.list().await,
    }
    .map_err(|e| {
        error!("Document list error: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Database error: {e}"))
    })?;

    Ok(Json(docs.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/documents/download/:collection - Stream the file of the
/// collection's first (and logically only) document.
async fn download_by_collection(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(collection): Path<String>,
) -> Result<(HeaderMap, Vec<u8>), (StatusCode, String)> {
    authenticate(&state, &headers)?;

    let docs = state
        .documents
        .get_by_collection_name(&collection)
        .await
        .map_err(|e| {
            error!("Document lookup error: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Database error: {e}"))
        })?;

    let Some(doc) = docs.into_iter().next() else {
        return Err((StatusCode::BAD_REQUEST, messages::EMPTY_COLLECTION.to_string()));
    };

    let file_path = state.uploads.file_location(&doc);
    let bytes = state.uploads.read(&file_path).await.map_err(|e| {
        error!("File read error for {}: {e}", file_path.display());
        (StatusCode::NOT_FOUND, messages::NOT_FOUND.to_string())
    })?;

    let download_name = doc.original_filename.as_deref().unwrap_or(&doc.filename);
    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    response_headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{download_name}\"")).map_err(
            |_| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Invalid download filename".to_string(),
                )
            },
        )?,
    );

    Ok((response_headers, bytes))
}

#[derive(Debug, Deserialize)]
struct FilesParams {
    /// JSON-encoded array of stored paths.
    filenames: String,
}

/// GET /api/v1/documents/files - Documents whose stored path is in the
/// given list.
async fn get_documents_by_paths(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<FilesParams>,
) -> Result<Json<Vec<DocumentResponse>>, (StatusCode, String)> {
    authenticate(&state, &headers)?;

    let paths: Vec<String> = serde_json::from_str(&params.filenames).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid filenames parameter: {e}"),
        )
    })?;

    let docs = state.documents.get_by_paths(&paths).await.map_err(|e| {
        error!("Document lookup error: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Database error: {e}"))
    })?;

    Ok(Json(docs.into_iter().map(Into::into).collect()))
}

/// POST /api/v1/documents/create - Create a document (admin only). The
/// name-uniqueness pre-check happens here; the store's own constraint is
/// the backstop.
async fn create_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(form): Json<DocumentForm>,
) -> Result<Json<DocumentResponse>, (StatusCode, String)> {
    let auth = authenticate(&state, &headers)?;
    require_admin(&auth)?;

    let existing = state.documents.get_by_name(&form.name).await.map_err(|e| {
        error!("Document lookup error: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Database error: {e}"))
    })?;
    if existing.is_some() {
        return Err((StatusCode::BAD_REQUEST, messages::NAME_TAG_TAKEN.to_string()));
    }

    match state.documents.insert(&auth.user_id, &form).await {
        Ok(doc) => {
            info!("Created document {}", doc.name);
            Ok(Json(doc.into()))
        }
        Err(e) => {
            error!("Document insert error: {e}");
            Err((StatusCode::BAD_REQUEST, messages::FILE_EXISTS.to_string()))
        }
    }
}

/// POST /api/v1/documents/upload - Stage and store an uploaded file (admin
/// only). Returns the placement descriptor; registering the document record
/// is a separate create call.
async fn upload_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, (StatusCode, String)> {
    let auth = authenticate(&state, &headers)?;
    require_admin(&auth)?;

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut original_filename: Option<String> = None;
    let mut collection: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart field: {e}"),
        )
    })? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "file" => {
                original_filename = field.file_name().map(|s| s.to_string());
                file_bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| {
                            (StatusCode::BAD_REQUEST, format!("Failed to read file: {e}"))
                        })?
                        .to_vec(),
                );
            }
            "collection" => {
                let text = field.text().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read collection field: {e}"),
                    )
                })?;
                if !text.is_empty() {
                    collection = Some(text);
                }
            }
            _ => {}
        }
    }

    let data = file_bytes
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "No file provided".to_string()))?;
    let original = original_filename.unwrap_or_else(|| "upload".to_string());

    let staged = state.uploads.stage_upload(&original, collection.as_deref());
    state.uploads.write(&staged, &data).await.map_err(|e| {
        error!("Upload write error: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Storage error: {e}"))
    })?;

    info!("Stored upload {} ({} bytes)", staged.file_path.display(), data.len());

    Ok(Json(UploadResponse {
        file_path: staged.file_path.display().to_string(),
        filename: staged.filename,
        path: staged.dir.display().to_string(),
        collection: staged.collection,
        original_filename: staged.original_filename,
    }))
}

/// GET /api/v1/documents/name/:name - Fetch one document by name.
async fn get_document_by_name(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<DocumentResponse>, (StatusCode, String)> {
    authenticate(&state, &headers)?;

    let doc = state.documents.get_by_name(&name).await.map_err(|e| {
        error!("Document get error: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Database error: {e}"))
    })?;

    doc.map(|d| Json(d.into()))
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, messages::NOT_FOUND.to_string()))
}

/// POST /api/v1/documents/collection/:collection - Documents carrying the
/// given collection label.
async fn get_documents_by_collection(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(collection): Path<String>,
) -> Result<Json<Vec<DocumentResponse>>, (StatusCode, String)> {
    authenticate(&state, &headers)?;

    let docs = state.documents.get_by_collection(&collection).await.map_err(|e| {
        error!("Document lookup error: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Database error: {e}"))
    })?;

    if docs.is_empty() {
        return Err((StatusCode::BAD_REQUEST, messages::EMPTY_COLLECTION.to_string()));
    }

    Ok(Json(docs.into_iter().map(Into::into).collect()))
}

/// POST /api/v1/documents/name/:name/tags - Merge a tags list into the
/// document's content under the "tags" key. The body's `name` selects the
/// document.
async fn tag_document_by_name(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(form): Json<TagDocumentForm>,
) -> Result<Json<DocumentResponse>, (StatusCode, String)> {
    authenticate(&state, &headers)?;

    let mut partial = Map::new();
    partial.insert("tags".to_string(), Value::Array(form.tags));

    match state.documents.merge_content_by_name(&form.name, &partial).await {
        Ok(doc) => Ok(Json(doc.into())),
        Err(StoreError::NotFound) => {
            Err((StatusCode::UNAUTHORIZED, messages::NOT_FOUND.to_string()))
        }
        Err(e) => {
            error!("Document tag error: {e}");
            Err((StatusCode::UNAUTHORIZED, messages::NOT_FOUND.to_string()))
        }
    }
}

/// POST /api/v1/documents/name/:name/update - Update title/name by current
/// name (admin only).
async fn update_document_by_name(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(form): Json<DocumentUpdateForm>,
) -> Result<Json<DocumentResponse>, (StatusCode, String)> {
    let auth = authenticate(&state, &headers)?;
    require_admin(&auth)?;

    match state.documents.update_by_name(&name, &form).await {
        Ok(doc) => Ok(Json(doc.into())),
        Err(e) => {
            error!("Document update error: {e}");
            Err((StatusCode::BAD_REQUEST, messages::NAME_TAG_TAKEN.to_string()))
        }
    }
}

/// DELETE /api/v1/documents/name/:name/delete - Delete one document by name
/// (admin only). Deleting a missing name still reports true.
async fn delete_document_by_name(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<bool>, (StatusCode, String)> {
    let auth = authenticate(&state, &headers)?;
    require_admin(&auth)?;

    match state.documents.delete_by_name(&name).await {
        Ok(()) => Ok(Json(true)),
        Err(e) => {
            error!("Document delete error: {e}");
            Ok(Json(false))
        }
    }
}

/// DELETE /api/v1/documents/delete - Delete every document (admin only).
async fn delete_all_documents(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<bool>, (StatusCode, String)> {
    let auth = authenticate(&state, &headers)?;
    require_admin(&auth)?;

    match state.documents.delete_all().await {
        Ok(()) => Ok(Json(true)),
        Err(e) => {
            error!("Document delete-all error: {e}");
            Ok(Json(false))
        }
    }
}
