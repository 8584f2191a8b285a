//! Local artifact store
//!
//! Downloads final audio artifacts so queue entries can reference local files.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::StoreError;

/// Persists a remote artifact and returns its local reference
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn persist(&self, remote_ref: &str, suggested_name: &str) -> Result<String, StoreError>;
}

/// Stores artifacts under `<root>/artifacts/`
pub struct FsArtifactStore {
    dir: PathBuf,
    http_client: reqwest::Client,
}

impl FsArtifactStore {
    /// `root` is the resolved root folder; the artifacts directory is created lazily
    pub fn new(root: &Path, http_client: reqwest::Client) -> Self {
        Self {
            dir: root.join("artifacts"),
            http_client,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Target path for a suggested file name
    pub fn path_for(&self, suggested_name: &str) -> PathBuf {
        self.dir.join(sanitize_file_name(suggested_name))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, StoreError> {
        let download_error = |e: reqwest::Error| StoreError::Download {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(download_error)?
            .error_for_status()
            .map_err(download_error)?;

        let bytes = response.bytes().await.map_err(download_error)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn persist(&self, remote_ref: &str, suggested_name: &str) -> Result<String, StoreError> {
        let target = self.path_for(suggested_name);
        tokio::fs::create_dir_all(&self.dir).await?;

        let bytes = match remote_ref.strip_prefix("file://") {
            Some(local) => tokio::fs::read(local).await?,
            None => self.download(remote_ref).await?,
        };

        let tmp = target.with_extension("part");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &target).await?;

        let local_ref = tokio::fs::canonicalize(&target)
            .await?
            .to_string_lossy()
            .into_owned();

        debug!(remote_ref = remote_ref, bytes = bytes.len(), "Artifact downloaded");
        info!(local_ref = %local_ref, "Artifact persisted");
        Ok(local_ref)
    }
}

/// Replace path separators and other unsafe characters
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();

    match cleaned.trim_matches('.') {
        "" => "artifact".to_string(),
        _ => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("suno_abc.mp3"), "suno_abc.mp3");
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("a\\b:c"), "a_b_c");
        assert_eq!(sanitize_file_name(".."), "artifact");
        assert_eq!(sanitize_file_name("  "), "artifact");
    }

    #[tokio::test]
    async fn test_persist_local_file_reference() {
        let root = TempDir::new().unwrap();
        let source = root.path().join("source.mp3");
        std::fs::write(&source, b"ID3 fake audio").unwrap();

        let store = FsArtifactStore::new(root.path(), reqwest::Client::new());
        let local_ref = store
            .persist(&format!("file://{}", source.display()), "suno/job-1.mp3")
            .await
            .unwrap();

        let stored = PathBuf::from(&local_ref);
        assert!(stored.is_absolute());
        assert_eq!(stored.file_name().unwrap(), "suno_job-1.mp3");
        assert_eq!(std::fs::read(&stored).unwrap(), b"ID3 fake audio");
    }

    #[tokio::test]
    async fn test_persist_missing_local_file_fails() {
        let root = TempDir::new().unwrap();
        let store = FsArtifactStore::new(root.path(), reqwest::Client::new());

        let result = store.persist("file:///definitely/not/here.mp3", "x.mp3").await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }
}
