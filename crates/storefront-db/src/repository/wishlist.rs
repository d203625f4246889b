//! # Wishlist Repository
//!
//! Database operations for wishlists.
//!
//! A wishlist is a plain set of (user, product) pairs under the table's
//! composite primary key. Adding an existing pair is a conflict, not an
//! increment; that is the difference between this table and `cart_lines`.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbError;
use storefront_core::{StoreError, StoreResult, WishlistEntry, WishlistItem};

/// Repository for wishlist database operations.
#[derive(Debug, Clone)]
pub struct WishlistRepository {
    pool: SqlitePool,
}

impl WishlistRepository {
    /// Creates a new WishlistRepository.
    pub fn new(pool: SqlitePool) -> Self {
        WishlistRepository { pool }
    }

    /// Adds a product to a user's wishlist.
    ///
    /// `ON CONFLICT DO NOTHING RETURNING` comes back empty when the pair
    /// already exists, which is how the duplicate turns into a 409 without
    /// a separate existence read.
    ///
    /// ## Returns
    /// * `Err(StoreError::NotFound)` - Product doesn't exist
    /// * `Err(StoreError::Conflict)` - Product already on the wishlist
    pub async fn add(&self, user_id: &str, product_id: &str) -> StoreResult<WishlistEntry> {
        self.check_product_exists(product_id).await?;

        debug!(user_id = %user_id, product_id = %product_id, "Adding wishlist entry");

        let inserted = sqlx::query_as::<_, WishlistEntry>(
            r#"
            INSERT INTO wishlist (user_id, product_id, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, product_id) DO NOTHING
            RETURNING user_id, product_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        inserted.ok_or_else(|| {
            StoreError::Conflict("Product already in wishlist".to_string())
        })
    }

    /// Gets a user's wishlist joined with product title, price and cover
    /// image, most recently added first.
    pub async fn get(&self, user_id: &str) -> StoreResult<Vec<WishlistItem>> {
        let items = sqlx::query_as::<_, WishlistItem>(
            r#"
            SELECT w.product_id,
                   p.title,
                   p.price_cents,
                   json_extract(p.images, '$[0]') AS image,
                   w.created_at AS added_at
            FROM wishlist w
            INNER JOIN products p ON p.id = w.product_id
            WHERE w.user_id = ?1
            ORDER BY w.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(items)
    }

    /// Removes a product from a user's wishlist.
    ///
    /// ## Returns
    /// * `Err(StoreError::NotFound)` - Pair isn't on the wishlist
    pub async fn remove(&self, user_id: &str, product_id: &str) -> StoreResult<()> {
        debug!(user_id = %user_id, product_id = %product_id, "Removing wishlist entry");

        let result = sqlx::query(
            "DELETE FROM wishlist WHERE user_id = ?1 AND product_id = ?2",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Wishlist item", product_id));
        }

        Ok(())
    }

    async fn check_product_exists(&self, product_id: &str) -> StoreResult<()> {
        let found: Option<String> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;

        if found.is_none() {
            return Err(StoreError::not_found("Product", product_id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
