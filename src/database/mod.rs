pub mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::api::{
    Collection, CollectionForm, Document, DocumentForm, DocumentUpdateForm,
};

/// Store-level failure kinds. Handlers translate these into the fixed
/// external status mapping; the kind itself never crosses the HTTP boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no matching row")]
    NotFound,
    #[error("unique constraint violated")]
    Conflict,
    #[error(transparent)]
    Backend(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error() {
            if db.is_unique_violation() {
                return StoreError::Conflict;
            }
        }
        StoreError::Backend(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations for collections.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Insert a new collection with a fresh unique key and server-side
    /// `user_id`/`timestamp` stamping.
    async fn insert(&self, user_id: &str, form: &CollectionForm) -> StoreResult<Collection>;

    /// First row matching `name`, if any. Absence is not an error.
    async fn get_by_name(&self, name: &str) -> StoreResult<Option<Collection>>;

    async fn get_by_key(&self, key: &str) -> StoreResult<Option<Collection>>;

    /// Every row; order incidental.
    async fn list(&self) -> StoreResult<Vec<Collection>>;

    /// Rewrite `name`/`title` and timestamp for the row matching `name`,
    /// then re-read by the (possibly new) name.
    async fn update_by_name(&self, name: &str, form: &CollectionForm) -> StoreResult<Collection>;

    /// Rewrite `name`/`title`/`content` and timestamp, keyed by `key`.
    async fn update_by_key(&self, key: &str, form: &CollectionForm) -> StoreResult<Collection>;

    /// Shallow-merge `partial` over the current content blob and rewrite
    /// content + timestamp.
    async fn merge_content_by_name(
        &self,
        name: &str,
        partial: &Map<String, Value>,
    ) -> StoreResult<Collection>;

    /// Remove matching rows. Removing zero rows is still success.
    async fn delete_by_name(&self, name: &str) -> StoreResult<()>;

    async fn delete_by_key(&self, key: &str) -> StoreResult<()>;
}

/// Persistence operations for documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, user_id: &str, form: &DocumentForm) -> StoreResult<Document>;

    async fn get_by_name(&self, name: &str) -> StoreResult<Option<Document>>;

    async fn list(&self) -> StoreResult<Vec<Document>>;

    /// Rows whose `path` column is one of the supplied paths.
    async fn get_by_paths(&self, paths: &[String]) -> StoreResult<Vec<Document>>;

    /// Rows matching the unique `collection_name`. At most one row
    /// logically, returned as a sequence for caller convenience.
    async fn get_by_collection_name(&self, collection_name: &str) -> StoreResult<Vec<Document>>;

    /// Rows matching the free-form `collection` label; may be several.
    async fn get_by_collection(&self, collection: &str) -> StoreResult<Vec<Document>>;

    async fn update_by_name(
        &self,
        name: &str,
        form: &DocumentUpdateForm,
    ) -> StoreResult<Document>;

    async fn merge_content_by_name(
        &self,
        name: &str,
        partial: &Map<String, Value>,
    ) -> StoreResult<Document>;

    async fn delete_by_name(&self, name: &str) -> StoreResult<()>;

    /// Unconditionally remove every row.
    async fn delete_all(&self) -> StoreResult<()>;
}

/// Shallow-merge `partial` over a stored content blob and re-serialize.
/// Absent, empty, or unparseable current content reads as `{}`; keys in
/// `partial` win over existing keys.
pub fn merge_content(current: Option<&str>, partial: &Map<String, Value>) -> String {
    let mut merged: Map<String, Value> = current
        .filter(|s| !s.is_empty())
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default();
    for (k, v) in partial {
        merged.insert(k.clone(), v.clone());
    }
    Value::Object(merged).to_string()
}
