//! Local filesystem image store.
//!
//! Files are sharded by their SHA-256 digest (`ab/cd/<digest16>-<upload id>.<ext>`)
//! under a root directory, and the API serves that directory under
//! `url_prefix`. Every upload gets its own file.

use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use uuid::Uuid;

use super::{ImageStore, ImageUpload, MediaError, StoredImage, extension_for};

#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
    url_prefix: String,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative_path(digest: &str, ext: &str) -> String {
        let upload_id = Uuid::now_v7().simple();
        format!("{}/{}/{}-{upload_id}.{ext}", &digest[0..2], &digest[2..4], &digest[..16])
    }

    /// Resolve a public id to a path under the root, refusing anything that
    /// could escape it.
    fn resolve(&self, public_id: &str) -> Option<PathBuf> {
        let rel = Path::new(public_id);
        let safe = !public_id.is_empty()
            && rel.components().all(|c| matches!(c, Component::Normal(_)));
        safe.then(|| self.root.join(rel))
    }
}

#[async_trait::async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(&self, upload: ImageUpload) -> Result<StoredImage, MediaError> {
        let mime = upload.check()?;
        let digest = hex::encode(Sha256::digest(&upload.bytes));
        let public_id = Self::relative_path(&digest, extension_for(&mime));
        let target = self.root.join(&public_id);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, &upload.bytes).await?;
        tracing::debug!(path = %target.display(), bytes = upload.bytes.len(), "stored image");

        Ok(StoredImage {
            url: format!("{}/{}", self.url_prefix, public_id),
            public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let Some(path) = self.resolve(public_id) else {
            return Err(MediaError::Rejected(format!("invalid image id: {public_id}")));
        };
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
