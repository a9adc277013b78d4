//! Directory-backed photo library.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use meme_core::{CapturedImage, MediaLibrary, MemeError, MemeResult, PermissionStatus, SavedAsset};

/// Saves exported memes as PNG files under a root directory, one
/// sub-directory per album.
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: PathBuf,
}

impl DirectoryLibrary {
    /// Create a library rooted at `root`. Nothing is created until
    /// permission is requested.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Library root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn album_dir(&self, album: Option<&str>) -> PathBuf {
        match album {
            Some(album) => self.root.join(album),
            None => self.root.clone(),
        }
    }

    #[allow(clippy::cast_possible_truncation)] // Timestamps won't exceed u64 for billions of years
    fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[async_trait]
impl MediaLibrary for DirectoryLibrary {
    async fn request_permission(&self) -> PermissionStatus {
        match tokio::fs::create_dir_all(&self.root).await {
            Ok(()) => PermissionStatus::Granted,
            Err(e) => {
                tracing::warn!("Library root {} unavailable: {e}", self.root.display());
                PermissionStatus::Denied
            }
        }
    }

    async fn save_image(
        &self,
        image: &CapturedImage,
        album: Option<&str>,
    ) -> MemeResult<SavedAsset> {
        let dir = self.album_dir(album);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| MemeError::SaveFailed(format!("{}: {e}", dir.display())))?;

        let stamp = Self::timestamp_ms();
        let mut path = dir.join(format!("meme-{stamp}.png"));
        let mut attempt = 1;
        while tokio::fs::try_exists(&path).await.unwrap_or(false) {
            path = dir.join(format!("meme-{stamp}-{attempt}.png"));
            attempt += 1;
        }

        tokio::fs::write(&path, &image.data)
            .await
            .map_err(|e| MemeError::SaveFailed(format!("{}: {e}", path.display())))?;
        tracing::debug!("Wrote {} bytes to {}", image.data.len(), path.display());

        Ok(SavedAsset {
            id: path.display().to_string(),
            album: album.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> CapturedImage {
        CapturedImage {
            width: 1,
            height: 1,
            data: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[tokio::test]
    async fn test_saves_into_album() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let library = DirectoryLibrary::new(dir.path().join("photos"));

        assert_eq!(library.request_permission().await, PermissionStatus::Granted);
        let first = library
            .save_image(&png(), Some("MemeGene"))
            .await
            .expect("should save");
        let second = library
            .save_image(&png(), Some("MemeGene"))
            .await
            .expect("should save");

        assert_ne!(first.id, second.id);
        assert_eq!(first.album.as_deref(), Some("MemeGene"));
        let path = PathBuf::from(&first.id);
        assert!(path.starts_with(dir.path().join("photos").join("MemeGene")));
        assert_eq!(std::fs::read(&path).expect("should read"), png().data);
    }

    #[tokio::test]
    async fn test_permission_denied_when_root_is_a_file() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").expect("should write");

        let library = DirectoryLibrary::new(blocker.join("photos"));
        assert_eq!(library.request_permission().await, PermissionStatus::Denied);
        let result = library.save_image(&png(), None).await;
        assert!(matches!(result, Err(MemeError::SaveFailed(_))));
    }
}
