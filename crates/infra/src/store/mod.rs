//! Persistence ports for listings and comments.
//!
//! Services talk to `Arc<dyn ListingStore>` / `Arc<dyn CommentStore>`; the
//! in-memory adapter backs tests and local development, the Postgres adapter
//! backs deployments.

use thiserror::Error;

use petconnect_comments::Comment;
use petconnect_core::{CommentId, PetId, UserId};
use petconnect_listings::{ListingFilter, OwnerScope, PetListing};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store lock poisoned")]
    Poisoned,
}

#[async_trait::async_trait]
pub trait ListingStore: Send + Sync {
    async fn insert(&self, listing: PetListing) -> Result<(), StoreError>;

    async fn get(&self, id: PetId) -> Result<Option<PetListing>, StoreError>;

    /// Overwrite an existing listing. Returns `false` if it no longer exists.
    async fn save(&self, listing: PetListing) -> Result<bool, StoreError>;

    async fn delete(&self, id: PetId) -> Result<bool, StoreError>;

    /// Unresolved listings matching `filter`, newest first, capped at
    /// [`petconnect_listings::LISTING_PAGE_LIMIT`].
    async fn search(&self, filter: &ListingFilter) -> Result<Vec<PetListing>, StoreError>;

    /// All listings owned by `owner` within `scope`, newest first.
    async fn list_by_owner(
        &self,
        owner: UserId,
        scope: OwnerScope,
    ) -> Result<Vec<PetListing>, StoreError>;

    /// Atomically bump the view counter, returning the updated listing.
    async fn increment_views(&self, id: PetId) -> Result<Option<PetListing>, StoreError>;

    /// Atomically bump the share counter, returning the new count.
    async fn increment_shares(&self, id: PetId) -> Result<Option<u64>, StoreError>;
}

#[async_trait::async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert(&self, comment: Comment) -> Result<(), StoreError>;

    async fn get(&self, id: CommentId) -> Result<Option<Comment>, StoreError>;

    async fn delete(&self, id: CommentId) -> Result<bool, StoreError>;

    /// Comments on a listing, newest first.
    async fn list_for_pet(&self, pet_id: PetId) -> Result<Vec<Comment>, StoreError>;

    /// Remove every comment on a listing, returning how many were removed.
    async fn delete_for_pet(&self, pet_id: PetId) -> Result<u64, StoreError>;
}
