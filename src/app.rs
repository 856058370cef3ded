use std::sync::Arc;

use crate::config::Settings;
use crate::database::{CollectionStore, DocumentStore};
use crate::storage::UploadDir;

/// Shared application state passed to all route handlers.
pub struct AppState {
    pub settings: Settings,
    pub collections: Arc<dyn CollectionStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub uploads: UploadDir,
}
