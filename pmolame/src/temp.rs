use std::{
    io,
    path::{Path, PathBuf},
};

use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::LameError;

/// Uniquely named scratch file owned by one conversion.
///
/// Removed by [`remove`](Self::remove); if that never happens the file is
/// deleted synchronously on drop.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    removed: bool,
}

impl TempArtifact {
    /// Allocates `<root>/<kind>/<uuid><suffix>`, creating the directory.
    /// The file itself is not created.
    pub async fn allocate(root: &Path, kind: &str, suffix: &str) -> Result<Self, LameError> {
        let dir = root.join(kind);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}{}", Uuid::new_v4(), suffix));
        debug!(path = %path.display(), "Allocated temporary artifact");
        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, data: &[u8]) -> Result<(), LameError> {
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }

    pub async fn read(&self) -> Result<Bytes, LameError> {
        let metadata = tokio::fs::metadata(&self.path).await?;
        if !metadata.is_file() {
            return Err(LameError::UnexpectedOutputFormat);
        }
        let data = tokio::fs::read(&self.path).await?;
        Ok(Bytes::from(data))
    }

    /// Deletes the file; a missing file is not an error.
    pub async fn remove(mut self) {
        self.removed = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "Removed temporary artifact"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to remove temporary artifact")
            }
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if !self.removed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allocate_write_read_remove() {
        let root = tempfile::tempdir().unwrap();
        let artifact = TempArtifact::allocate(root.path(), "raw", ".mp3").await.unwrap();
        assert!(artifact.path().starts_with(root.path().join("raw")));
        assert_eq!(artifact.path().extension().and_then(|e| e.to_str()), Some("mp3"));
        assert!(!artifact.path().exists());

        artifact.write(b"payload").await.unwrap();
        assert_eq!(artifact.read().await.unwrap().as_ref(), b"payload");

        let path = artifact.path().to_path_buf();
        artifact.remove().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let a = TempArtifact::allocate(root.path(), "encoded", "").await.unwrap();
        let b = TempArtifact::allocate(root.path(), "encoded", "").await.unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_drop_removes_file() {
        let root = tempfile::tempdir().unwrap();
        let artifact = TempArtifact::allocate(root.path(), "raw", "").await.unwrap();
        artifact.write(b"x").await.unwrap();
        let path = artifact.path().to_path_buf();
        drop(artifact);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_reading_a_directory_is_unexpected_format() {
        let root = tempfile::tempdir().unwrap();
        let artifact = TempArtifact::allocate(root.path(), "encoded", "").await.unwrap();
        tokio::fs::create_dir_all(artifact.path()).await.unwrap();
        assert!(matches!(
            artifact.read().await,
            Err(LameError::UnexpectedOutputFormat)
        ));
        tokio::fs::remove_dir(artifact.path()).await.unwrap();
    }
}
