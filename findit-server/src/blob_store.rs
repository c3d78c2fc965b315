use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use uuid::Uuid;

use findit_core::{BlobStore, StoredBlob};

/// Key prefix for submitted photos
const IMAGE_PREFIX: &str = "imagenes";

/// Photos stored on local disk and served back under `/blobs/`
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn locator_for(&self, key: &str) -> String {
        format!("{}/blobs/{}", self.public_base_url, key)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, bytes: Vec<u8>) -> Result<StoredBlob> {
        let key = format!("{}/{}.jpg", IMAGE_PREFIX, Uuid::new_v4());
        let path = self.path_for(&key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::debug!("Stored blob {}", key);
        Ok(StoredBlob {
            locator: self.locator_for(&key),
            key,
        })
    }

    async fn delete(&self, blob: &StoredBlob) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(&blob.key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Blob {} was already gone", blob.key);
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to delete blob {}", blob.key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> LocalBlobStore {
        let root = std::env::temp_dir().join(format!("findit-blobs-{}", Uuid::new_v4()));
        LocalBlobStore::new(root, "http://localhost:8080/")
    }

    #[tokio::test]
    async fn test_upload_then_delete() {
        let store = temp_store();

        let blob = store.upload(vec![0xFF, 0xD8, 0xFF]).await.unwrap();
        assert!(blob.key.starts_with("imagenes/"));
        assert!(blob.key.ends_with(".jpg"));
        assert_eq!(blob.locator, format!("http://localhost:8080/blobs/{}", blob.key));

        let stored = tokio::fs::read(store.root().join(&blob.key)).await.unwrap();
        assert_eq!(stored, vec![0xFF, 0xD8, 0xFF]);

        store.delete(&blob).await.unwrap();
        assert!(!store.root().join(&blob.key).exists());

        // Deleting twice is not an error
        store.delete(&blob).await.unwrap();

        let _ = tokio::fs::remove_dir_all(store.root()).await;
    }

    #[tokio::test]
    async fn test_every_upload_gets_a_fresh_key() {
        let store = temp_store();
        let first = store.upload(vec![1]).await.unwrap();
        let second = store.upload(vec![1]).await.unwrap();
        assert_ne!(first.key, second.key);

        let _ = tokio::fs::remove_dir_all(store.root()).await;
    }
}
