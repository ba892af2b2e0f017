//! Infrastructure layer: persistence, image storage, configuration.

pub mod config;
pub mod media;
pub mod store;

pub use config::{AppConfig, ConfigError, MediaConfig};
pub use media::{ImageStore, ImageUpload, MediaError, StoredImage};
pub use store::{CommentStore, ListingStore, StoreError};
