//! Image storage port and adapters.
//!
//! Listings hold an image URL plus an opaque provider id; the id is what
//! [`ImageStore::destroy`] needs when an image is replaced or its listing is
//! deleted.

use bytes::Bytes;
use thiserror::Error;

use petconnect_listings::ImageRef;

pub mod cloudinary;
pub mod in_memory;
pub mod local;

pub use cloudinary::CloudinaryImageStore;
pub use in_memory::InMemoryImageStore;
pub use local::LocalImageStore;

/// Image subtypes accepted for upload.
pub const ACCEPTED_IMAGE_SUBTYPES: &[&str] = &["jpeg", "png", "gif", "webp"];

#[derive(Debug, Error)]
pub enum MediaError {
    /// The upload itself is unacceptable (caller error).
    #[error("{0}")]
    Rejected(String),

    #[error("image storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("image provider error: {0}")]
    Provider(String),
}

/// A raw image as received from a client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Bytes,
    pub content_type: String,
    pub file_name: Option<String>,
}

impl ImageUpload {
    /// Parse and check the declared content type, returning the parsed mime.
    pub fn check(&self) -> Result<mime::Mime, MediaError> {
        if self.bytes.is_empty() {
            return Err(MediaError::Rejected("Uploaded image is empty".to_string()));
        }
        let parsed: mime::Mime = self
            .content_type
            .parse()
            .map_err(|_| MediaError::Rejected(format!("Unsupported image type: {}", self.content_type)))?;
        if parsed.type_() != mime::IMAGE || !ACCEPTED_IMAGE_SUBTYPES.contains(&parsed.subtype().as_str()) {
            return Err(MediaError::Rejected(format!(
                "Unsupported image type: {}",
                parsed.essence_str()
            )));
        }
        Ok(parsed)
    }
}

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub url: String,
    pub public_id: String,
}

impl From<StoredImage> for ImageRef {
    fn from(stored: StoredImage) -> Self {
        ImageRef {
            url: stored.url,
            public_id: Some(stored.public_id),
        }
    }
}

#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, upload: ImageUpload) -> Result<StoredImage, MediaError>;

    /// Remove a stored image. Unknown ids are not an error.
    async fn destroy(&self, public_id: &str) -> Result<(), MediaError>;
}

/// File extension for an accepted image mime.
pub(crate) fn extension_for(mime: &mime::Mime) -> &'static str {
    match mime.subtype().as_str() {
        "png" => "png",
        "gif" => "gif",
        "webp" => "webp",
        _ => "jpg",
    }
}
