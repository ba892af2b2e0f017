//! Postgres-backed listing and comment stores.
//!
//! Filtering happens in SQL. Free-text filters become `ILIKE` patterns with
//! `%`, `_` and `\` escaped, so user input never acts as a wildcard. Counter
//! bumps are single `UPDATE ... RETURNING` statements.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use petconnect_comments::Comment;
use petconnect_core::{CommentId, Entity, PetId, UserId};
use petconnect_listings::{
    ImageRef, LISTING_PAGE_LIMIT, ListingFilter, ListingParts, OwnerScope, PetListing,
};

use super::{CommentStore, ListingStore, StoreError};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const LISTING_COLUMNS: &str = "id, owner_id, owner_name, name, species, breed, status, \
     description, location, city, contact, image_url, image_public_id, last_seen_date, \
     views, shares, is_resolved, created_at";

const COMMENT_COLUMNS: &str = "id, pet_id, author_id, author_name, text, created_at";

/// Listing and comment store over one connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn bootstrap_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("bootstrap_schema", e))?;
        tracing::info!("database schema ready");
        Ok(())
    }
}

#[async_trait::async_trait]
impl ListingStore for PostgresStore {
    #[instrument(skip(self, listing), fields(pet_id = %listing.id()), err)]
    async fn insert(&self, listing: PetListing) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO pets (
                id, owner_id, owner_name, name, species, breed, status,
                description, location, city, contact, image_url, image_public_id,
                last_seen_date, views, shares, is_resolved, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(listing.id().as_uuid())
        .bind(listing.owner_id().as_uuid())
        .bind(listing.owner_name())
        .bind(listing.name())
        .bind(listing.species().as_str())
        .bind(listing.breed())
        .bind(listing.status().as_str())
        .bind(listing.description())
        .bind(listing.location())
        .bind(listing.city())
        .bind(listing.contact())
        .bind(&listing.image().url)
        .bind(listing.image().public_id.as_deref())
        .bind(listing.last_seen_date())
        .bind(to_db_count(listing.views()))
        .bind(to_db_count(listing.shares()))
        .bind(listing.is_resolved())
        .bind(listing.created_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_pet", e))?;
        Ok(())
    }

    async fn get(&self, id: PetId) -> Result<Option<PetListing>, StoreError> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM pets WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_pet", e))?;
        row.as_ref().map(listing_from_row).transpose()
    }

    #[instrument(skip(self, listing), fields(pet_id = %listing.id()), err)]
    async fn save(&self, listing: PetListing) -> Result<bool, StoreError> {
        // owner_id, views, shares and created_at are never rewritten here.
        let result = sqlx::query(
            r#"
            UPDATE pets SET
                name = $2, species = $3, breed = $4, status = $5, description = $6,
                location = $7, city = $8, contact = $9, image_url = $10,
                image_public_id = $11, last_seen_date = $12, is_resolved = $13
            WHERE id = $1
            "#,
        )
        .bind(listing.id().as_uuid())
        .bind(listing.name())
        .bind(listing.species().as_str())
        .bind(listing.breed())
        .bind(listing.status().as_str())
        .bind(listing.description())
        .bind(listing.location())
        .bind(listing.city())
        .bind(listing.contact())
        .bind(&listing.image().url)
        .bind(listing.image().public_id.as_deref())
        .bind(listing.last_seen_date())
        .bind(listing.is_resolved())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_pet", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: PetId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM pets WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_pet", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn search(&self, filter: &ListingFilter) -> Result<Vec<PetListing>, StoreError> {
        let sql = format!(
            r#"
            SELECT {LISTING_COLUMNS} FROM pets
            WHERE is_resolved = FALSE
              AND ($1::text IS NULL OR city ILIKE $1 ESCAPE '\')
              AND ($2::text IS NULL OR species = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::text IS NULL
                   OR name ILIKE $4 ESCAPE '\'
                   OR description ILIKE $4 ESCAPE '\'
                   OR breed ILIKE $4 ESCAPE '\')
            ORDER BY created_at DESC, id DESC
            LIMIT $5
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(filter.city.as_deref().map(contains_pattern))
            .bind(filter.species.map(|s| s.as_str()))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.search.as_deref().map(contains_pattern))
            .bind(LISTING_PAGE_LIMIT as i64)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("search_pets", e))?;
        rows.iter().map(listing_from_row).collect()
    }

    async fn list_by_owner(
        &self,
        owner: UserId,
        scope: OwnerScope,
    ) -> Result<Vec<PetListing>, StoreError> {
        let sql = format!(
            "SELECT {LISTING_COLUMNS} FROM pets \
             WHERE owner_id = $1 AND ($2::boolean IS NULL OR is_resolved = $2) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(owner.as_uuid())
            .bind(resolved_flag(scope))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_pets_by_owner", e))?;
        rows.iter().map(listing_from_row).collect()
    }

    async fn increment_views(&self, id: PetId) -> Result<Option<PetListing>, StoreError> {
        let sql = format!("UPDATE pets SET views = views + 1 WHERE id = $1 RETURNING {LISTING_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("increment_views", e))?;
        row.as_ref().map(listing_from_row).transpose()
    }

    async fn increment_shares(&self, id: PetId) -> Result<Option<u64>, StoreError> {
        let row = sqlx::query("UPDATE pets SET shares = shares + 1 WHERE id = $1 RETURNING shares")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("increment_shares", e))?;
        row.map(|r| {
            r.try_get::<i64, _>("shares")
                .map(from_db_count)
                .map_err(|e| StoreError::Corrupt(format!("pets.shares: {e}")))
        })
        .transpose()
    }
}

#[async_trait::async_trait]
impl CommentStore for PostgresStore {
    async fn insert(&self, comment: Comment) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, pet_id, author_id, author_name, text, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(comment.id.as_uuid())
        .bind(comment.pet_id.as_uuid())
        .bind(comment.author_id.as_uuid())
        .bind(&comment.author_name)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_comment", e))?;
        Ok(())
    }

    async fn get(&self, id: CommentId) -> Result<Option<Comment>, StoreError> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_comment", e))?;
        row.as_ref().map(comment_from_row).transpose()
    }

    async fn delete(&self, id: CommentId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_comment", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_for_pet(&self, pet_id: PetId) -> Result<Vec<Comment>, StoreError> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE pet_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(pet_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_comments", e))?;
        rows.iter().map(comment_from_row).collect()
    }

    async fn delete_for_pet(&self, pet_id: PetId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE pet_id = $1")
            .bind(pet_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_comments_for_pet", e))?;
        Ok(result.rows_affected())
    }
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    let message = match err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => format!("{} (code {})", db_err.message(), code),
            None => db_err.message().to_string(),
        },
        sqlx::Error::PoolClosed => "connection pool closed".to_string(),
        other => other.to_string(),
    };
    StoreError::Database { operation, message }
}

fn corrupt(column: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{column}: {err}"))
}

fn listing_from_row(row: &PgRow) -> Result<PetListing, StoreError> {
    let col = |name: &'static str| move |e: sqlx::Error| corrupt(name, e);

    let species: String = row.try_get("species").map_err(col("species"))?;
    let status: String = row.try_get("status").map_err(col("status"))?;
    let views: i64 = row.try_get("views").map_err(col("views"))?;
    let shares: i64 = row.try_get("shares").map_err(col("shares"))?;

    Ok(PetListing::restore(ListingParts {
        id: PetId::from_uuid(row.try_get::<Uuid, _>("id").map_err(col("id"))?),
        owner_id: UserId::from_uuid(row.try_get::<Uuid, _>("owner_id").map_err(col("owner_id"))?),
        owner_name: row.try_get("owner_name").map_err(col("owner_name"))?,
        name: row.try_get("name").map_err(col("name"))?,
        species: species.parse().map_err(|e| corrupt("species", e))?,
        breed: row.try_get("breed").map_err(col("breed"))?,
        status: status.parse().map_err(|e| corrupt("status", e))?,
        description: row.try_get("description").map_err(col("description"))?,
        location: row.try_get("location").map_err(col("location"))?,
        city: row.try_get("city").map_err(col("city"))?,
        contact: row.try_get("contact").map_err(col("contact"))?,
        image: ImageRef {
            url: row.try_get("image_url").map_err(col("image_url"))?,
            public_id: row.try_get("image_public_id").map_err(col("image_public_id"))?,
        },
        last_seen_date: row
            .try_get::<DateTime<Utc>, _>("last_seen_date")
            .map_err(col("last_seen_date"))?,
        views: from_db_count(views),
        shares: from_db_count(shares),
        is_resolved: row.try_get("is_resolved").map_err(col("is_resolved"))?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(col("created_at"))?,
    }))
}

fn comment_from_row(row: &PgRow) -> Result<Comment, StoreError> {
    let col = |name: &'static str| move |e: sqlx::Error| corrupt(name, e);

    Ok(Comment {
        id: CommentId::from_uuid(row.try_get::<Uuid, _>("id").map_err(col("id"))?),
        pet_id: PetId::from_uuid(row.try_get::<Uuid, _>("pet_id").map_err(col("pet_id"))?),
        author_id: UserId::from_uuid(row.try_get::<Uuid, _>("author_id").map_err(col("author_id"))?),
        author_name: row.try_get("author_name").map_err(col("author_name"))?,
        text: row.try_get("text").map_err(col("text"))?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(col("created_at"))?,
    })
}

/// `%needle%` with LIKE metacharacters escaped by `\`.
fn contains_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

fn resolved_flag(scope: OwnerScope) -> Option<bool> {
    match scope {
        OwnerScope::All => None,
        OwnerScope::Active => Some(false),
        OwnerScope::Resolved => Some(true),
    }
}

fn to_db_count(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn from_db_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_pattern_escapes_like_metacharacters() {
        assert_eq!(contains_pattern("mumbai"), "%mumbai%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }

    #[test]
    fn owner_scope_maps_to_resolved_flag() {
        assert_eq!(resolved_flag(OwnerScope::All), None);
        assert_eq!(resolved_flag(OwnerScope::Active), Some(false));
        assert_eq!(resolved_flag(OwnerScope::Resolved), Some(true));
    }

    #[test]
    fn counters_clamp_at_the_boundaries() {
        assert_eq!(from_db_count(-3), 0);
        assert_eq!(from_db_count(42), 42);
        assert_eq!(to_db_count(u64::MAX), i64::MAX);
    }
}
