use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ──────────────────────────── Collections ────────────────────────────

/// A collection row. `id` is the surrogate key assigned by the store and is
/// never exposed in responses; `key` is the stable external reference.
#[derive(Debug, Clone)]
pub struct Collection {
    pub id: i32,
    pub name: String,
    pub key: String,
    pub title: String,
    pub content: Option<String>,
    pub user_id: String,
    pub timestamp: i64,
}

/// Body for collection create and update. `content`, when present, is a
/// serialized JSON-object blob.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionForm {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CollectionResponse {
    pub name: String,
    pub title: String,
    pub key: String,
    pub content: Option<Map<String, Value>>,
    pub user_id: String,
    pub timestamp: i64,
}

impl From<Collection> for CollectionResponse {
    fn from(c: Collection) -> Self {
        Self {
            name: c.name,
            title: c.title,
            key: c.key,
            content: c.content.as_deref().map(|raw| parse_content(Some(raw))),
            user_id: c.user_id,
            timestamp: c.timestamp,
        }
    }
}

// ──────────────────────────── Documents ────────────────────────────

/// A document row: metadata for one stored file, optionally associated with
/// a collection label. `name` and `collection_name` are unique.
#[derive(Debug, Clone)]
pub struct Document {
    pub collection_name: String,
    pub name: String,
    pub title: String,
    pub filename: String,
    pub original_filename: Option<String>,
    pub content: Option<String>,
    pub user_id: String,
    pub collection: Option<String>,
    pub path: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentForm {
    pub collection_name: String,
    pub name: String,
    pub title: String,
    pub filename: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub original_filename: Option<String>,
}

/// Narrow update: only `name` and `title` are rewritable by name.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentUpdateForm {
    pub name: String,
    pub title: String,
}

/// Body for the tags endpoint. The `name` field selects the document.
#[derive(Debug, Deserialize)]
pub struct TagDocumentForm {
    pub name: String,
    pub tags: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub collection_name: String,
    pub name: String,
    pub title: String,
    pub filename: String,
    pub original_filename: Option<String>,
    pub content: Map<String, Value>,
    pub user_id: String,
    pub timestamp: i64,
    pub collection: Option<String>,
    pub path: Option<String>,
}

impl From<Document> for DocumentResponse {
    fn from(d: Document) -> Self {
        Self {
            collection_name: d.collection_name,
            name: d.name,
            title: d.title,
            filename: d.filename,
            original_filename: d.original_filename,
            content: parse_content(d.content.as_deref()),
            user_id: d.user_id,
            timestamp: d.timestamp,
            collection: d.collection,
            path: d.path,
        }
    }
}

/// Descriptor returned by the upload endpoint after staging a file.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_path: String,
    pub filename: String,
    pub path: String,
    pub collection: Option<String>,
    pub original_filename: String,
}

/// Parse a stored content blob into a JSON object for responses. Absent,
/// empty, and unparseable blobs all read as `{}`.
pub fn parse_content(raw: Option<&str>) -> Map<String, Value> {
    raw.filter(|s| !s.is_empty())
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

// ──────────────────────────── Auth ────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: String,
    pub role: String,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

// ──────────────────────────── Health ────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub environment: String,
}
