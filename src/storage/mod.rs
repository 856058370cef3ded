pub mod uploads;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {path}")]
    NotFound { path: String },
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub use uploads::{StagedUpload, UploadDir};
