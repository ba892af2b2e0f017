use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use petconnect_comments::Comment;
use petconnect_core::{CommentId, Entity, PetId, UserId};
use petconnect_listings::{ListingFilter, OwnerScope, PetListing};

use super::{CommentStore, ListingStore, StoreError};

/// In-memory entity store for tests/dev, keyed by the entity's id.
#[derive(Debug)]
pub struct InMemoryStore<V: Entity> {
    inner: RwLock<HashMap<V::Id, V>>,
}

impl<V: Entity> InMemoryStore<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<V::Id, V>>, StoreError> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<V::Id, V>>, StoreError> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl<V: Entity> Default for InMemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Entity + Clone> InMemoryStore<V> {
    fn get_cloned(&self, id: &V::Id) -> Result<Option<V>, StoreError> {
        Ok(self.read()?.get(id).cloned())
    }

    fn put(&self, value: V) -> Result<(), StoreError> {
        let id = *value.id();
        self.write()?.insert(id, value);
        Ok(())
    }

    fn remove(&self, id: &V::Id) -> Result<bool, StoreError> {
        Ok(self.write()?.remove(id).is_some())
    }

    fn collect_where(&self, pred: impl Fn(&V) -> bool) -> Result<Vec<V>, StoreError> {
        Ok(self.read()?.values().filter(|v| pred(v)).cloned().collect())
    }
}

#[async_trait::async_trait]
impl ListingStore for InMemoryStore<PetListing> {
    async fn insert(&self, listing: PetListing) -> Result<(), StoreError> {
        self.put(listing)
    }

    async fn get(&self, id: PetId) -> Result<Option<PetListing>, StoreError> {
        self.get_cloned(&id)
    }

    async fn save(&self, mut listing: PetListing) -> Result<bool, StoreError> {
        let mut map = self.write()?;
        match map.get_mut(listing.id()) {
            Some(slot) => {
                listing.carry_tracked_fields(slot);
                *slot = listing;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: PetId) -> Result<bool, StoreError> {
        self.remove(&id)
    }

    async fn search(&self, filter: &ListingFilter) -> Result<Vec<PetListing>, StoreError> {
        let hits = self.collect_where(|l| filter.matches(l))?;
        Ok(filter.select(hits))
    }

    async fn list_by_owner(
        &self,
        owner: UserId,
        scope: OwnerScope,
    ) -> Result<Vec<PetListing>, StoreError> {
        let mut mine = self.collect_where(|l| l.owner_id() == owner && scope.includes(l))?;
        petconnect_listings::newest_first(&mut mine);
        Ok(mine)
    }

    async fn increment_views(&self, id: PetId) -> Result<Option<PetListing>, StoreError> {
        let mut map = self.write()?;
        Ok(map.get_mut(&id).map(|listing| {
            listing.record_view();
            listing.clone()
        }))
    }

    async fn increment_shares(&self, id: PetId) -> Result<Option<u64>, StoreError> {
        let mut map = self.write()?;
        Ok(map.get_mut(&id).map(PetListing::record_share))
    }
}

#[async_trait::async_trait]
impl CommentStore for InMemoryStore<Comment> {
    async fn insert(&self, comment: Comment) -> Result<(), StoreError> {
        self.put(comment)
    }

    async fn get(&self, id: CommentId) -> Result<Option<Comment>, StoreError> {
        self.get_cloned(&id)
    }

    async fn delete(&self, id: CommentId) -> Result<bool, StoreError> {
        self.remove(&id)
    }

    async fn list_for_pet(&self, pet_id: PetId) -> Result<Vec<Comment>, StoreError> {
        let mut comments = self.collect_where(|c| c.pet_id == pet_id)?;
        petconnect_comments::newest_first(&mut comments);
        Ok(comments)
    }

    async fn delete_for_pet(&self, pet_id: PetId) -> Result<u64, StoreError> {
        let mut map = self.write()?;
        let before = map.len();
        map.retain(|_, c| c.pet_id != pet_id);
        Ok((before - map.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use petconnect_listings::{ImageRef, ListingPatch, ListingStatus, NewListing, Species};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn listing(owner: UserId, name: &str, minutes: i64) -> PetListing {
        let draft = NewListing {
            name: name.to_string(),
            species: Species::Cat,
            breed: None,
            status: ListingStatus::Found,
            description: "Grey tabby, very friendly".to_string(),
            location: "Bus stop".to_string(),
            city: "Pune".to_string(),
            contact: "555-0199".to_string(),
            last_seen_date: None,
        };
        let image = ImageRef {
            url: "memory://x".to_string(),
            public_id: Some("x".to_string()),
        };
        PetListing::create(PetId::new(), owner, "Owner", draft, image, t0() + Duration::minutes(minutes))
            .unwrap()
    }

    #[tokio::test]
    async fn views_and_shares_increment_by_one() {
        let store = InMemoryStore::<PetListing>::new();
        let l = listing(UserId::new(), "Misty", 0);
        let id = *l.id();
        ListingStore::insert(&store, l).await.unwrap();

        let first = store.increment_views(id).await.unwrap().unwrap();
        let second = store.increment_views(id).await.unwrap().unwrap();
        assert_eq!(first.views(), 1);
        assert_eq!(second.views(), 2);

        assert_eq!(store.increment_shares(id).await.unwrap(), Some(1));
        assert_eq!(store.increment_shares(id).await.unwrap(), Some(2));
        assert_eq!(store.increment_shares(PetId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_reports_missing_listing() {
        let store = InMemoryStore::<PetListing>::new();
        let l = listing(UserId::new(), "Ghost", 0);
        assert!(!store.save(l).await.unwrap());
    }

    #[tokio::test]
    async fn save_keeps_views_recorded_after_the_read() {
        let store = InMemoryStore::<PetListing>::new();
        let l = listing(UserId::new(), "Misty", 0);
        let id = *l.id();
        ListingStore::insert(&store, l).await.unwrap();

        let mut edited = ListingStore::get(&store, id).await.unwrap().unwrap();
        for _ in 0..3 {
            store.increment_views(id).await.unwrap();
        }
        store.increment_shares(id).await.unwrap();
        edited
            .apply_patch(ListingPatch {
                city: Some("Nashik".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(store.save(edited).await.unwrap());

        let stored = ListingStore::get(&store, id).await.unwrap().unwrap();
        assert_eq!(stored.city(), "Nashik");
        assert_eq!(stored.views(), 3);
        assert_eq!(stored.shares(), 1);
        assert_eq!(store.increment_views(id).await.unwrap().unwrap().views(), 4);
    }

    #[tokio::test]
    async fn list_by_owner_respects_scope_and_order() {
        let store = InMemoryStore::<PetListing>::new();
        let me = UserId::new();
        let mut done = listing(me, "Done", 0);
        done.apply_patch(ListingPatch {
            is_resolved: Some(true),
            ..Default::default()
        })
        .unwrap();
        ListingStore::insert(&store, done).await.unwrap();
        ListingStore::insert(&store, listing(me, "Newer", 5)).await.unwrap();
        ListingStore::insert(&store, listing(UserId::new(), "Theirs", 9)).await.unwrap();

        let all: Vec<String> = store
            .list_by_owner(me, OwnerScope::All)
            .await
            .unwrap()
            .iter()
            .map(|l| l.name().to_string())
            .collect();
        assert_eq!(all, vec!["Newer", "Done"]);

        let active = store.list_by_owner(me, OwnerScope::Active).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name(), "Newer");
    }

    #[tokio::test]
    async fn comments_are_listed_newest_first_and_removed_per_pet() {
        let store = InMemoryStore::<Comment>::new();
        let pet = PetId::new();
        let other = PetId::new();
        for (i, text) in ["first", "second"].iter().enumerate() {
            let c = Comment::new(CommentId::new(), pet, UserId::new(), "A", text, t0() + Duration::minutes(i as i64))
                .unwrap();
            CommentStore::insert(&store, c).await.unwrap();
        }
        let elsewhere = Comment::new(CommentId::new(), other, UserId::new(), "B", "hi", t0()).unwrap();
        CommentStore::insert(&store, elsewhere).await.unwrap();

        let texts: Vec<String> = store
            .list_for_pet(pet)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, vec!["second", "first"]);

        assert_eq!(store.delete_for_pet(pet).await.unwrap(), 2);
        assert!(store.list_for_pet(pet).await.unwrap().is_empty());
        assert_eq!(store.list_for_pet(other).await.unwrap().len(), 1);
    }
}
