//! Image files on disk.
//!
//! Uploaded images are written under the configured upload directory with a
//! random name and referenced by a public path such as `/uploads/<name>`.
//! Thumbnails are never generated here, but a `thumb_<name>` file in the
//! thumbnail directory is removed together with its image.

use crate::infra::{config::UploadConfig, error::ApiResult};
use bytes::Bytes;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::instrument;
use uuid::Uuid;

/// An image received in an upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageUpload {
    /// The client's file name. Only its extension is kept.
    pub file_name: String,
    /// The file contents.
    pub data: Bytes,
}

/// Anything that can store image files.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores an image and returns its public path.
    async fn save(&self, upload: &ImageUpload) -> ApiResult<String>;

    /// Removes the image behind a public path, and its thumbnail.
    ///
    /// Paths this store did not hand out are ignored.
    async fn delete(&self, photo_path: &str) -> ApiResult<()>;
}

/// Stores images in local directories.
#[derive(Clone, Debug)]
pub struct DiskImageStore {
    upload_dir: PathBuf,
    thumbnail_dir: PathBuf,
    public_prefix: String,
}

impl DiskImageStore {
    /// Creates a new store.
    pub fn new(
        upload_dir: impl Into<PathBuf>,
        thumbnail_dir: impl Into<PathBuf>,
        public_prefix: impl Into<String>,
    ) -> Self {
        let public_prefix: String = public_prefix.into();
        Self {
            upload_dir: upload_dir.into(),
            thumbnail_dir: thumbnail_dir.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Creates a store from configuration.
    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(
            &config.directory,
            &config.thumbnail_directory,
            &config.public_prefix,
        )
    }

    /// The directory images are written to.
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// The URL prefix of stored paths.
    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// The bare file name behind a public path, if the path is one of ours.
    fn file_name_of<'a>(&self, photo_path: &'a str) -> Option<&'a str> {
        let name = photo_path
            .strip_prefix(self.public_prefix.as_str())?
            .strip_prefix('/')?;
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        valid.then_some(name)
    }
}

/// The lowercased extension of a client file name, with its dot.
fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Removes a file, treating a missing file as already removed.
async fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[async_trait::async_trait]
impl ImageStore for DiskImageStore {
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name, size = upload.data.len()))]
    async fn save(&self, upload: &ImageUpload) -> ApiResult<String> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let file_name = format!(
            "{}{}",
            Uuid::new_v4().simple(),
            extension_of(&upload.file_name)
        );
        tokio::fs::write(self.upload_dir.join(&file_name), &upload.data).await?;
        tracing::info!("Stored image {}", file_name);
        Ok(format!("{}/{}", self.public_prefix, file_name))
    }

    #[instrument(skip(self))]
    async fn delete(&self, photo_path: &str) -> ApiResult<()> {
        let Some(file_name) = self.file_name_of(photo_path) else {
            tracing::warn!("Not an uploaded image, leaving it alone");
            return Ok(());
        };
        let removed = remove_if_exists(&self.upload_dir.join(file_name)).await?;
        remove_if_exists(&self.thumbnail_dir.join(format!("thumb_{file_name}"))).await?;
        if removed {
            tracing::info!("Deleted image {}", file_name);
        } else {
            tracing::debug!("Image {} was already gone", file_name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, DiskImageStore) {
        let root = tempfile::tempdir().unwrap();
        let store = DiskImageStore::new(
            root.path().join("uploads"),
            root.path().join("thumbs"),
            "/uploads/",
        );
        (root, store)
    }

    fn upload(name: &str) -> ImageUpload {
        ImageUpload {
            file_name: name.to_string(),
            data: Bytes::from_static(b"not really a png"),
        }
    }

    #[test]
    fn extensions_are_sanitized() {
        assert_eq!(".png", extension_of("cat.PNG"));
        assert_eq!(".jpeg", extension_of("my.holiday.jpeg"));
        assert_eq!("", extension_of("no_extension"));
        assert_eq!("", extension_of("evil.p/ng"));
    }

    #[test]
    fn only_our_paths_resolve_to_files() {
        let (_dir, store) = temp_store();
        assert_eq!(Some("a.png"), store.file_name_of("/uploads/a.png"));
        assert_eq!(None, store.file_name_of("/elsewhere/a.png"));
        assert_eq!(None, store.file_name_of("/uploads/../secret"));
        assert_eq!(None, store.file_name_of("/uploads/"));
        assert_eq!(None, store.file_name_of("/uploadsa.png"));
    }

    #[tokio::test]
    async fn save_writes_a_randomly_named_file() {
        let (_dir, store) = temp_store();
        let path = store.save(&upload("lamp.png")).await.unwrap();

        assert!(path.starts_with("/uploads/"));
        assert!(path.ends_with(".png"));
        let name = store.file_name_of(&path).unwrap();
        assert_eq!(32 + ".png".len(), name.len());
        let written = tokio::fs::read(store.upload_dir().join(name)).await.unwrap();
        assert_eq!(b"not really a png".to_vec(), written);

        let other = store.save(&upload("lamp.png")).await.unwrap();
        assert_ne!(path, other);
    }

    #[tokio::test]
    async fn delete_removes_image_and_thumbnail() {
        let (_dir, store) = temp_store();
        let path = store.save(&upload("lamp.png")).await.unwrap();
        let name = store.file_name_of(&path).unwrap().to_string();
        tokio::fs::create_dir_all(&store.thumbnail_dir).await.unwrap();
        let thumb = store.thumbnail_dir.join(format!("thumb_{name}"));
        tokio::fs::write(&thumb, b"thumb").await.unwrap();

        store.delete(&path).await.unwrap();

        assert!(!store.upload_dir().join(&name).exists());
        assert!(!thumb.exists());
    }

    #[tokio::test]
    async fn deleting_a_missing_or_foreign_file_is_ok() {
        let (_dir, store) = temp_store();
        store.delete("/uploads/gone.png").await.unwrap();
        store.delete("https://example.com/a.png").await.unwrap();
    }

    #[tokio::test]
    async fn saved_files_go_away_with_the_scratch_directory() {
        let (dir, store) = temp_store();
        let path = store.save(&upload("lamp.png")).await.unwrap();
        let file = store.upload_dir().join(store.file_name_of(&path).unwrap());
        assert!(file.exists());

        drop(dir);

        assert!(!file.exists());
        assert!(!store.upload_dir().exists());
    }
}
