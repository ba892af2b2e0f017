//! Application services: listing and comment use cases over the store and
//! image ports.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use secrecy::ExposeSecret;

use petconnect_auth::authorize_owner;
use petconnect_comments::Comment;
use petconnect_core::{CommentId, Entity, PetId, UserId};
use petconnect_infra::media::{CloudinaryImageStore, InMemoryImageStore, LocalImageStore};
use petconnect_infra::store::{InMemoryStore, PostgresStore};
use petconnect_infra::{
    AppConfig, CommentStore, ImageStore, ImageUpload, ListingStore, MediaConfig,
};
use petconnect_listings::{ImageRef, ListingFilter, ListingPatch, NewListing, OwnerScope, PetListing};

use crate::app::errors::ServiceError;
use crate::context::PrincipalContext;

pub struct AppServices {
    listings: Arc<dyn ListingStore>,
    comments: Arc<dyn CommentStore>,
    images: Arc<dyn ImageStore>,
}

impl AppServices {
    pub fn new(
        listings: Arc<dyn ListingStore>,
        comments: Arc<dyn CommentStore>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            listings,
            comments,
            images,
        }
    }

    /// Fully in-memory wiring for tests and local development.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryStore::<PetListing>::new()),
            Arc::new(InMemoryStore::<Comment>::new()),
            Arc::new(InMemoryImageStore::new()),
        )
    }

    /// Wire stores and image backend from configuration.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let images = build_image_store(&config.media);

        match &config.database_url {
            Some(url) => {
                let store = PostgresStore::connect(url.expose_secret())
                    .await
                    .context("failed to connect to postgres")?;
                store
                    .bootstrap_schema()
                    .await
                    .context("failed to apply database schema")?;
                let store = Arc::new(store);
                tracing::info!("using postgres stores");
                Ok(Self::new(store.clone(), store, images))
            }
            None => {
                tracing::info!("using in-memory stores");
                Ok(Self::new(
                    Arc::new(InMemoryStore::<PetListing>::new()),
                    Arc::new(InMemoryStore::<Comment>::new()),
                    images,
                ))
            }
        }
    }

    // -------------------------
    // Listings
    // -------------------------

    pub async fn list_pets(&self, filter: &ListingFilter) -> Result<Vec<PetListing>, ServiceError> {
        Ok(self.listings.search(filter).await?)
    }

    pub async fn my_posts(&self, owner: UserId, scope: OwnerScope) -> Result<Vec<PetListing>, ServiceError> {
        Ok(self.listings.list_by_owner(owner, scope).await?)
    }

    /// Fetch a listing, counting the read as a view.
    pub async fn view_pet(&self, id: PetId) -> Result<PetListing, ServiceError> {
        self.listings
            .increment_views(id)
            .await?
            .ok_or(ServiceError::NotFound("Pet"))
    }

    pub async fn create_pet(
        &self,
        principal: &PrincipalContext,
        draft: NewListing,
        image: Option<ImageUpload>,
    ) -> Result<PetListing, ServiceError> {
        draft.validate()?;
        let image = image.ok_or_else(|| ServiceError::Validation("Please upload an image".to_string()))?;

        let stored = self.images.upload(image).await?;
        let public_id = stored.public_id.clone();

        let listing = match PetListing::create(
            PetId::new(),
            principal.user_id(),
            principal.display_name(),
            draft,
            ImageRef::from(stored),
            Utc::now(),
        ) {
            Ok(listing) => listing,
            Err(e) => {
                self.discard_upload(&public_id).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.listings.insert(listing.clone()).await {
            self.discard_upload(&public_id).await;
            return Err(e.into());
        }

        tracing::info!(pet_id = %listing.id(), owner = %principal.user_id(), "pet listing created");
        Ok(listing)
    }

    /// Partial update by the owner, optionally replacing the image.
    ///
    /// The previous image is destroyed before the record is saved; a failure
    /// there aborts the update and discards the new upload.
    pub async fn update_pet(
        &self,
        id: PetId,
        principal: &PrincipalContext,
        patch: ListingPatch,
        image: Option<ImageUpload>,
    ) -> Result<PetListing, ServiceError> {
        let mut listing = self.listings.get(id).await?.ok_or(ServiceError::NotFound("Pet"))?;
        authorize_owner(principal.user_id(), listing.owner_id())?;

        listing.apply_patch(patch)?;

        let mut uploaded = None;
        if let Some(image) = image {
            let stored = self.images.upload(image).await?;
            uploaded = Some(stored.public_id.clone());

            let previous = listing.replace_image(ImageRef::from(stored));
            if let Some(old_id) = previous.public_id {
                if let Err(e) = self.images.destroy(&old_id).await {
                    self.discard_upload_opt(uploaded.as_deref()).await;
                    return Err(e.into());
                }
            }
        }

        match self.listings.save(listing.clone()).await {
            Ok(true) => {
                tracing::info!(pet_id = %id, "pet listing updated");
                // Counters may have moved while the update was in flight.
                Ok(self.listings.get(id).await?.unwrap_or(listing))
            }
            Ok(false) => {
                self.discard_upload_opt(uploaded.as_deref()).await;
                Err(ServiceError::NotFound("Pet"))
            }
            Err(e) => {
                self.discard_upload_opt(uploaded.as_deref()).await;
                Err(e.into())
            }
        }
    }

    /// Delete by the owner, together with its image and comments.
    pub async fn delete_pet(&self, id: PetId, requester: UserId) -> Result<(), ServiceError> {
        let listing = self.listings.get(id).await?.ok_or(ServiceError::NotFound("Pet"))?;
        authorize_owner(requester, listing.owner_id())?;

        if let Some(public_id) = &listing.image().public_id {
            self.images.destroy(public_id).await?;
        }
        let removed = self.comments.delete_for_pet(id).await?;
        if !self.listings.delete(id).await? {
            return Err(ServiceError::NotFound("Pet"));
        }

        tracing::info!(pet_id = %id, comments_removed = removed, "pet listing deleted");
        Ok(())
    }

    /// Bump the share counter and return the new count.
    pub async fn share_pet(&self, id: PetId) -> Result<u64, ServiceError> {
        self.listings
            .increment_shares(id)
            .await?
            .ok_or(ServiceError::NotFound("Pet"))
    }

    // -------------------------
    // Comments
    // -------------------------

    pub async fn add_comment(
        &self,
        principal: &PrincipalContext,
        pet_id: PetId,
        text: &str,
    ) -> Result<Comment, ServiceError> {
        let comment = Comment::new(
            CommentId::new(),
            pet_id,
            principal.user_id(),
            principal.display_name(),
            text,
            Utc::now(),
        )?;

        if self.listings.get(pet_id).await?.is_none() {
            return Err(ServiceError::NotFound("Pet"));
        }
        self.comments.insert(comment.clone()).await?;

        // The listing may have been deleted between the check and the insert.
        if self.listings.get(pet_id).await?.is_none() {
            self.comments.delete(comment.id).await?;
            return Err(ServiceError::NotFound("Pet"));
        }
        Ok(comment)
    }

    pub async fn list_comments(&self, pet_id: PetId) -> Result<Vec<Comment>, ServiceError> {
        Ok(self.comments.list_for_pet(pet_id).await?)
    }

    pub async fn delete_comment(&self, id: CommentId, requester: UserId) -> Result<(), ServiceError> {
        let comment = self.comments.get(id).await?.ok_or(ServiceError::NotFound("Comment"))?;
        authorize_owner(requester, comment.author_id)?;

        if !self.comments.delete(id).await? {
            return Err(ServiceError::NotFound("Comment"));
        }
        Ok(())
    }

    async fn discard_upload(&self, public_id: &str) {
        if let Err(e) = self.images.destroy(public_id).await {
            tracing::warn!(public_id, error = %e, "failed to discard orphaned upload");
        }
    }

    async fn discard_upload_opt(&self, public_id: Option<&str>) {
        if let Some(public_id) = public_id {
            self.discard_upload(public_id).await;
        }
    }
}

pub fn build_image_store(media: &MediaConfig) -> Arc<dyn ImageStore> {
    match media {
        MediaConfig::Memory => {
            tracing::warn!("IMAGE_STORE=memory; uploaded images are not persisted");
            Arc::new(InMemoryImageStore::new())
        }
        MediaConfig::Local { root, url_prefix } => {
            tracing::info!(root = %root.display(), "storing images on local disk");
            Arc::new(LocalImageStore::new(root.clone(), url_prefix.clone()))
        }
        MediaConfig::Cloudinary {
            cloud_name,
            api_key,
            api_secret,
            folder,
        } => {
            tracing::info!(cloud_name = %cloud_name, "storing images on cloudinary");
            Arc::new(CloudinaryImageStore::new(
                cloud_name.clone(),
                api_key.clone(),
                api_secret.expose_secret().to_string().into(),
                folder.clone(),
            ))
        }
    }
}
