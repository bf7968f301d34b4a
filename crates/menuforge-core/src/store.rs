//! Artifact persistence
//!
//! The hosting/persistence collaborator: accepts a final artifact for
//! storage so the end user's browser can load it for editing and export.
//! Everything past that point runs inside the artifact's own embedded
//! markers and is outside this core.

use menuforge_model::Artifact;
use std::path::{Path, PathBuf};

/// Accepts artifacts for storage
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist one artifact, returning where it landed
    ///
    /// # Errors
    /// Returns [`StoreError`] on write failure
    async fn persist(&self, artifact: &Artifact) -> Result<PathBuf, StoreError>;
}

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Filesystem store with version-suffixed naming
///
/// Existing files are never overwritten: `menu.html`, then `menu_v2.html`,
/// `menu_v3.html`, and so on.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
    base_name: String,
}

impl FsArtifactStore {
    /// Create a store rooted at `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            base_name: "menu".to_string(),
        }
    }

    /// With a base file name (without extension)
    #[inline]
    #[must_use]
    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = base_name.into();
        self
    }

    async fn next_free_path(&self) -> Result<PathBuf, StoreError> {
        let first = self.dir.join(format!("{}.html", self.base_name));
        if !tokio::fs::try_exists(&first).await? {
            return Ok(first);
        }
        let mut version: u64 = 2;
        loop {
            let candidate = self.dir.join(format!("{}_v{version}.html", self.base_name));
            if !tokio::fs::try_exists(&candidate).await? {
                return Ok(candidate);
            }
            version += 1;
        }
    }
}

#[async_trait::async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn persist(&self, artifact: &Artifact) -> Result<PathBuf, StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.next_free_path().await?;
        tokio::fs::write(&path, artifact.content()).await?;
        tracing::info!(
            path = %path.display(),
            version = artifact.version(),
            hash = %artifact.hash().short(),
            "artifact persisted"
        );
        Ok(path)
    }
}

impl AsRef<Path> for FsArtifactStore {
    fn as_ref(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use menuforge_model::Manifest;

    fn artifact(version: u64) -> Artifact {
        Artifact::new(
            version,
            format!("<html>v{version}</html>"),
            Manifest::new(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn persists_with_version_suffixed_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        let first = store.persist(&artifact(1)).await.unwrap();
        let second = store.persist(&artifact(2)).await.unwrap();
        let third = store.persist(&artifact(3)).await.unwrap();

        assert!(first.ends_with("menu.html"));
        assert!(second.ends_with("menu_v2.html"));
        assert!(third.ends_with("menu_v3.html"));

        let kept = std::fs::read_to_string(&first).unwrap();
        assert_eq!(kept, "<html>v1</html>");
    }

    #[tokio::test]
    async fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out/artifacts");
        let store = FsArtifactStore::new(&nested).with_base_name("grill");

        let path = store.persist(&artifact(1)).await.unwrap();
        assert!(path.ends_with("grill.html"));
        assert!(nested.exists());
    }
}
