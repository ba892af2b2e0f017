use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use uuid::Uuid;

use super::{ImageStore, ImageUpload, MediaError, StoredImage};

/// Keeps uploaded images in a map. Urls take the form `memory://<id>`.
#[derive(Debug, Default)]
pub struct InMemoryImageStore {
    inner: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, public_id: &str) -> bool {
        self.inner
            .read()
            .map(|map| map.contains_key(public_id))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl ImageStore for InMemoryImageStore {
    async fn upload(&self, upload: ImageUpload) -> Result<StoredImage, MediaError> {
        upload.check()?;
        let public_id = Uuid::now_v7().simple().to_string();
        let mut map = self
            .inner
            .write()
            .map_err(|_| MediaError::Provider("image map lock poisoned".to_string()))?;
        map.insert(public_id.clone(), upload.bytes);
        Ok(StoredImage {
            url: format!("memory://{public_id}"),
            public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| MediaError::Provider("image map lock poisoned".to_string()))?;
        map.remove(public_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_destroy() {
        let store = InMemoryImageStore::new();
        let stored = store
            .upload(ImageUpload {
                bytes: Bytes::from_static(b"GIF89a"),
                content_type: "image/gif".to_string(),
                file_name: Some("cat.gif".to_string()),
            })
            .await
            .unwrap();

        assert!(stored.url.starts_with("memory://"));
        assert!(store.contains(&stored.public_id));

        store.destroy(&stored.public_id).await.unwrap();
        assert!(store.is_empty());
        store.destroy("never-existed").await.unwrap();
    }
}
