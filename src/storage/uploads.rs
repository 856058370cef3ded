use std::path::{Path, PathBuf};
use tokio::fs;

use super::StorageError;
use crate::models::api::Document;

/// Root directory for uploaded file content. One subdirectory per
/// collection label, `default` for unlabelled uploads.
#[derive(Debug, Clone)]
pub struct UploadDir {
    base: PathBuf,
}

/// Filesystem placement computed for one upload.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub file_path: PathBuf,
    pub filename: String,
    pub dir: PathBuf,
    pub collection: Option<String>,
    pub original_filename: String,
}

impl UploadDir {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        // Ensure directory exists (best-effort at construction time).
        std::fs::create_dir_all(&base).ok();
        Self { base }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// `{base}/{label or "default"}`, created best-effort. Creation failure
    /// is ignored here; a later file write surfaces it.
    pub fn collection_dir(&self, collection: Option<&str>) -> PathBuf {
        let dir = self.base.join(collection.unwrap_or("default"));
        std::fs::create_dir_all(&dir).ok();
        dir
    }

    /// Compute the on-disk placement for an uploaded file: a fresh random
    /// token prefixed to the space-sanitized original name, basename-stripped
    /// so directory components in the original name cannot escape the
    /// resolved directory.
    pub fn stage_upload(&self, original_filename: &str, collection: Option<&str>) -> StagedUpload {
        let dir = self.collection_dir(collection);
        let unsanitized =
            format!("{}_{}", uuid::Uuid::new_v4(), original_filename.replace(' ', "_"));
        let filename = Path::new(&unsanitized)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or(unsanitized);
        StagedUpload {
            file_path: dir.join(&filename),
            filename,
            dir,
            collection: collection.map(|c| c.to_string()),
            original_filename: original_filename.to_string(),
        }
    }

    /// Resolve where a document's file lives: an explicit `path` always
    /// wins; otherwise the location is derived from `collection`/`filename`.
    pub fn file_location(&self, doc: &Document) -> PathBuf {
        if let Some(path) = &doc.path {
            return PathBuf::from(path);
        }
        if let Some(collection) = &doc.collection {
            return self.base.join(collection).join(&doc.filename);
        }
        self.base.join(&doc.filename)
    }

    /// Second-to-last segment of a stored path. Assumes the fixed two-level
    /// `{base}/{collection}/{filename}` convention.
    pub fn collection_from_path(path: &str) -> Option<String> {
        let split: Vec<&str> = path.split('/').collect();
        if split.len() < 2 {
            return None;
        }
        Some(split[split.len() - 2].to_string())
    }

    /// Write staged upload content to disk.
    pub async fn write(&self, staged: &StagedUpload, data: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = staged.file_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&staged.file_path, data).await?;
        Ok(())
    }

    /// Read a stored file back.
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        if !path.exists() {
            return Err(StorageError::NotFound {
                path: path.display().to_string(),
            });
        }
        Ok(fs::read(path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(filename: &str, collection: Option<&str>, path: Option<&str>) -> Document {
        Document {
            collection_name: "c1".to_string(),
            name: "doc".to_string(),
            title: "Doc".to_string(),
            filename: filename.to_string(),
            original_filename: None,
            content: None,
            user_id: "u1".to_string(),
            collection: collection.map(|s| s.to_string()),
            path: path.map(|s| s.to_string()),
            timestamp: 0,
        }
    }

    #[test]
    fn test_collection_dir_default() {
        let tmp = TempDir::new().unwrap();
        let uploads = UploadDir::new(tmp.path());
        let dir = uploads.collection_dir(None);
        assert_eq!(dir, tmp.path().join("default"));
        assert!(dir.is_dir());
    }

    #[test]
    fn test_collection_dir_labelled() {
        let tmp = TempDir::new().unwrap();
        let uploads = UploadDir::new(tmp.path());
        let dir = uploads.collection_dir(Some("notes"));
        assert_eq!(dir, tmp.path().join("notes"));
        assert!(dir.is_dir());
    }

    #[test]
    fn test_stage_upload_sanitizes_spaces() {
        let tmp = TempDir::new().unwrap();
        let uploads = UploadDir::new(tmp.path());
        let staged = uploads.stage_upload("my file.txt", Some("notes"));
        assert!(staged.filename.ends_with("my_file.txt"));
        assert!(!staged.filename.contains(' '));
        assert!(staged.file_path.starts_with(tmp.path().join("notes")));
        assert_eq!(staged.original_filename, "my file.txt");
    }

    #[test]
    fn test_stage_upload_unique_per_call() {
        let tmp = TempDir::new().unwrap();
        let uploads = UploadDir::new(tmp.path());
        let a = uploads.stage_upload("file.txt", None);
        let b = uploads.stage_upload("file.txt", None);
        assert_ne!(a.filename, b.filename);
    }

    #[test]
    fn test_stage_upload_strips_path_components() {
        let tmp = TempDir::new().unwrap();
        let uploads = UploadDir::new(tmp.path());
        let staged = uploads.stage_upload("../../etc/passwd", Some("notes"));
        assert!(!staged.filename.contains('/'));
        assert_eq!(staged.file_path.parent(), Some(tmp.path().join("notes").as_path()));
    }

    #[test]
    fn test_file_location_explicit_path_wins() {
        let tmp = TempDir::new().unwrap();
        let uploads = UploadDir::new(tmp.path());
        let d = doc("f.txt", Some("notes"), Some("/elsewhere/f.txt"));
        assert_eq!(uploads.file_location(&d), PathBuf::from("/elsewhere/f.txt"));
    }

    #[test]
    fn test_file_location_derived_from_collection() {
        let tmp = TempDir::new().unwrap();
        let uploads = UploadDir::new(tmp.path());
        let d = doc("f.txt", Some("notes"), None);
        assert_eq!(uploads.file_location(&d), tmp.path().join("notes").join("f.txt"));
    }

    #[test]
    fn test_file_location_base_fallback() {
        let tmp = TempDir::new().unwrap();
        let uploads = UploadDir::new(tmp.path());
        let d = doc("f.txt", None, None);
        assert_eq!(uploads.file_location(&d), tmp.path().join("f.txt"));
    }

    #[test]
    fn test_collection_from_path() {
        assert_eq!(
            UploadDir::collection_from_path("uploads/notes/f.txt"),
            Some("notes".to_string())
        );
        assert_eq!(UploadDir::collection_from_path("f.txt"), None);
    }

    #[tokio::test]
    async fn test_write_and_read_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let uploads = UploadDir::new(tmp.path());
        let staged = uploads.stage_upload("data.bin", Some("notes"));

        uploads.write(&staged, b"hello").await.unwrap();
        let read = uploads.read(&staged.file_path).await.unwrap();
        assert_eq!(read, b"hello");
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let uploads = UploadDir::new(tmp.path());
        let result = uploads.read(&tmp.path().join("missing.txt")).await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }
}
