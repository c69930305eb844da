//! Storage for file bytes referenced by file messages.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use courier_database::{FileRef, MediaKind};
use tokio::fs;
use tracing::info;

use crate::types::{ChatError, ChatResult};
use crate::utils::validation::MAX_FILE_NAME_LEN;

/// Accepts raw bytes and hands back a reference that can be put into a file message.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, file_name: &str, content_type: &str, bytes: Bytes) -> ChatResult<FileRef>;

    /// Bytes previously stored under `key` (the last URL segment handed out by `put`).
    async fn get(&self, key: &str) -> ChatResult<Option<Bytes>>;
}

/// Writes blobs into a directory and addresses them below a public base URL.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Unique on-disk name that keeps a readable, path-safe tail of the original.
    fn stored_name(file_name: &str) -> String {
        let base = Path::new(file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("blob");

        let sanitized: String = base
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .take(64)
            .collect();

        format!("{}-{}", cuid2::cuid(), sanitized.trim_start_matches('.'))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, file_name: &str, content_type: &str, bytes: Bytes) -> ChatResult<FileRef> {
        if file_name.trim().is_empty() {
            return Err(ChatError::validation("File name cannot be empty"));
        }
        if file_name.chars().count() > MAX_FILE_NAME_LEN {
            return Err(ChatError::validation(format!(
                "File name too long (max {MAX_FILE_NAME_LEN} characters)"
            )));
        }
        if bytes.is_empty() {
            return Err(ChatError::validation("File is empty"));
        }

        fs::create_dir_all(&self.root).await?;

        let stored_name = Self::stored_name(file_name);
        fs::write(self.root.join(&stored_name), &bytes).await?;

        let media_kind = MediaKind::from_mime(content_type);
        info!(
            file = %stored_name,
            size = bytes.len(),
            media_kind = media_kind.as_str(),
            "stored blob"
        );

        Ok(FileRef {
            name: file_name.to_string(),
            url: format!("{}/{}", self.public_base_url, stored_name),
            media_kind,
        })
    }

    async fn get(&self, key: &str) -> ChatResult<Option<Bytes>> {
        if key.is_empty() || key.starts_with('.') || key.contains(['/', '\\']) {
            return Ok(None);
        }

        match fs::read(self.root.join(key)).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn put_writes_bytes_and_builds_public_url() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path().join("blobs"), "https://cdn.example/blobs/");

        let file = store
            .put("holiday photo.jpg", "image/jpeg", Bytes::from_static(b"\xff\xd8\xff"))
            .await
            .unwrap();

        assert_eq!(file.name, "holiday photo.jpg");
        assert_eq!(file.media_kind, MediaKind::Image);
        let stored_name = file
            .url
            .strip_prefix("https://cdn.example/blobs/")
            .unwrap()
            .to_string();
        assert!(stored_name.ends_with("holiday_photo.jpg"));

        let on_disk = std::fs::read(store.root().join(stored_name)).unwrap();
        assert_eq!(on_disk, b"\xff\xd8\xff");
    }

    #[tokio::test]
    async fn get_returns_stored_bytes_and_ignores_unsafe_keys() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://localhost/blobs");

        let file = store
            .put("notes.txt", "text/plain", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        let key = file.url.rsplit('/').next().unwrap();

        assert_eq!(store.get(key).await.unwrap(), Some(Bytes::from_static(b"hello")));
        assert_eq!(store.get("missing.txt").await.unwrap(), None);
        assert_eq!(store.get("../secret").await.unwrap(), None);
        assert_eq!(store.get(".hidden").await.unwrap(), None);
    }

    #[tokio::test]
    async fn path_components_never_escape_the_root() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://localhost/blobs");

        let file = store
            .put("../../etc/passwd", "text/plain", Bytes::from_static(b"x"))
            .await
            .unwrap();

        assert!(!file.url.contains(".."));
        assert_eq!(file.media_kind, MediaKind::Document);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn rejects_empty_uploads() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://localhost/blobs");

        assert!(matches!(
            store.put("a.txt", "text/plain", Bytes::new()).await,
            Err(ChatError::Validation { .. })
        ));
        assert!(matches!(
            store.put(" ", "text/plain", Bytes::from_static(b"x")).await,
            Err(ChatError::Validation { .. })
        ));
    }
}
