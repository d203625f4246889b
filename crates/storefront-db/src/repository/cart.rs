//! # Cart Repository
//!
//! Per-user cart lines, keyed (user_id, product_id). `add` increments a
//! line, `set_quantity` overwrites it, `remove` deletes it.
//!
//! ## Atomic Upsert
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Add-To-Cart Strategy                                 │
//! │                                                                         │
//! │  ❌ WRONG: read-then-write (lost update under two tabs)                │
//! │     SELECT quantity ... ; if present: UPDATE quantity = <computed>     │
//! │                                                                         │
//! │  ✅ CORRECT: one upsert statement                                      │
//! │     INSERT INTO cart_lines ...                                         │
//! │     ON CONFLICT(user_id, product_id)                                   │
//! │     DO UPDATE SET quantity = quantity + excluded.quantity              │
//! │                                                                         │
//! │  Why?                                                                   │
//! │  Tab A: add 2 ──┐                                                      │
//! │  Tab B: add 3 ──┴──► both increments land: quantity 5, never 2 or 3   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbError;
use storefront_core::validation::validate_quantity;
use storefront_core::{CartItem, CartLine, StoreError, StoreResult};

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Adds a product to a user's cart.
    ///
    /// Repeat adds for the same product increment the existing line in one
    /// statement; two concurrent adds both land.
    ///
    /// ## Returns
    /// * `Ok(CartLine)` - The line after the add (accumulated quantity)
    /// * `Err(StoreError::Validation)` - Quantity not positive
    /// * `Err(StoreError::NotFound)` - Product doesn't exist
    pub async fn add(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> StoreResult<CartLine> {
        validate_quantity(quantity)?;
        self.check_product_exists(product_id).await?;

        let now = Utc::now();

        debug!(user_id = %user_id, product_id = %product_id, quantity, "Adding to cart");

        let line = sqlx::query_as::<_, CartLine>(
            r#"
            INSERT INTO cart_lines (user_id, product_id, quantity, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT(user_id, product_id) DO UPDATE SET
                quantity = quantity + excluded.quantity,
                updated_at = excluded.updated_at
            RETURNING user_id, product_id, quantity, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(line)
    }

    /// Sets a cart line's quantity to an absolute value (the quantity
    /// stepper on the cart page edits the line directly).
    ///
    /// Never inserts: stepping a line that was removed in another tab is
    /// NotFound, not a resurrection.
    ///
    /// ## Returns
    /// * `Ok(CartLine)` - The line after the write
    /// * `Err(StoreError::Validation)` - Quantity not positive
    /// * `Err(StoreError::NotFound)` - No such line
    pub async fn set_quantity(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> StoreResult<CartLine> {
        validate_quantity(quantity)?;

        debug!(user_id = %user_id, product_id = %product_id, quantity, "Setting cart quantity");

        let line = sqlx::query_as::<_, CartLine>(
            r#"
            UPDATE cart_lines SET
                quantity = ?3,
                updated_at = ?4
            WHERE user_id = ?1 AND product_id = ?2
            RETURNING user_id, product_id, quantity, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        line.ok_or_else(|| StoreError::not_found("Cart item", product_id))
    }

    /// Gets a user's cart joined with product title, current price and
    /// cover image. Lines whose product has been deleted don't appear.
    pub async fn get(&self, user_id: &str) -> StoreResult<Vec<CartItem>> {
        let items = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT cl.product_id,
                   p.title,
                   p.price_cents,
                   cl.quantity,
                   json_extract(p.images, '$[0]') AS image
            FROM cart_lines cl
            INNER JOIN products p ON p.id = cl.product_id
            WHERE cl.user_id = ?1
            ORDER BY cl.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(items)
    }

    /// Removes one product line from a user's cart.
    ///
    /// ## Returns
    /// * `Err(StoreError::NotFound)` - No such line
    pub async fn remove(&self, user_id: &str, product_id: &str) -> StoreResult<()> {
        debug!(user_id = %user_id, product_id = %product_id, "Removing from cart");

        let result = sqlx::query(
            "DELETE FROM cart_lines WHERE user_id = ?1 AND product_id = ?2",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Cart item", product_id));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use storefront_core::NewProduct;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// Inserts a users row under a fixed id so cart lines can reference it;
    /// these tests only need the foreign key to resolve.
    async fn seed_user_row(db: &Database, user_id: &str) {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
            VALUES (?1, ?1, ?1 || '@example.com', 'hash', 'user', ?2, ?2)
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(db.pool())
        .await
        .unwrap();
    }

    async fn seed_product(db: &Database, title: &str, price_cents: i64) -> String {
        db.products()
            .create(NewProduct {
                title: title.to_string(),
                description: String::new(),
                price_cents,
                category_id: None,
                stock: 10,
                images: vec![
                    format!("https://cdn.example.com/{title}-1.jpg"),
                    format!("https://cdn.example.com/{title}-2.jpg"),
                ],
                rating: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_repeat_add_accumulates_one_line() {
        let db = test_db().await;
        seed_user_row(&db, "u-1").await;
        let product_id = seed_product(&db, "Mug", 1099).await;
        let repo = db.carts();

        repo.add("u-1", &product_id, 2).await.unwrap();
        let line = repo.add("u-1", &product_id, 3).await.unwrap();

        assert_eq!(line.quantity, 5);

        let cart = repo.get("u-1").await.unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_quantity() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Mug", 1099).await;
        let repo = db.carts();

        assert!(matches!(
            repo.add("u-1", &product_id, 0).await,
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            repo.add("u-1", &product_id, -2).await,
            Err(StoreError::Validation(_))
        ));
        assert!(repo.get("u-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_missing_product_fails() {
        let db = test_db().await;
        let repo = db.carts();

        let err = repo.add("u-1", "ghost", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_set_quantity_overwrites_line() {
        let db = test_db().await;
        seed_user_row(&db, "u-1").await;
        let product_id = seed_product(&db, "Mug", 1099).await;
        let repo = db.carts();

        repo.add("u-1", &product_id, 2).await.unwrap();
        let line = repo.set_quantity("u-1", &product_id, 7).await.unwrap();
        assert_eq!(line.quantity, 7);

        // Stepping down overwrites too; nothing accumulates.
        let line = repo.set_quantity("u-1", &product_id, 1).await.unwrap();
        assert_eq!(line.quantity, 1);

        let cart = repo.get("u-1").await.unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_set_quantity_rejects_bad_quantity() {
        let db = test_db().await;
        seed_user_row(&db, "u-1").await;
        let product_id = seed_product(&db, "Mug", 1099).await;
        let repo = db.carts();

        repo.add("u-1", &product_id, 2).await.unwrap();
        assert!(matches!(
            repo.set_quantity("u-1", &product_id, 0).await,
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            repo.set_quantity("u-1", &product_id, -3).await,
            Err(StoreError::Validation(_))
        ));

        // Rejected writes leave the line alone.
        assert_eq!(repo.get("u-1").await.unwrap()[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_set_quantity_missing_line_fails() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Mug", 1099).await;
        let repo = db.carts();

        let err = repo.set_quantity("u-1", &product_id, 3).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(err.status_code(), 404);
        assert!(repo.get("u-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_joins_product_summary() {
        let db = test_db().await;
        seed_user_row(&db, "u-1").await;
        seed_user_row(&db, "u-other").await;
        let mug = seed_product(&db, "Mug", 1099).await;
        let boot = seed_product(&db, "Boot", 8999).await;
        let repo = db.carts();

        repo.add("u-1", &mug, 2).await.unwrap();
        repo.add("u-1", &boot, 1).await.unwrap();
        repo.add("u-other", &mug, 7).await.unwrap();

        let cart = repo.get("u-1").await.unwrap();
        assert_eq!(cart.len(), 2);

        let mug_item = cart.iter().find(|i| i.product_id == mug).unwrap();
        assert_eq!(mug_item.title, "Mug");
        assert_eq!(mug_item.price_cents, 1099);
        assert_eq!(
            mug_item.image.as_deref(),
            Some("https://cdn.example.com/Mug-1.jpg")
        );
        assert_eq!(mug_item.line_total().cents(), 2198);
    }

    #[tokio::test]
    async fn test_remove_line() {
        let db = test_db().await;
        seed_user_row(&db, "u-1").await;
        let product_id = seed_product(&db, "Mug", 1099).await;
        let repo = db.carts();

        repo.add("u-1", &product_id, 1).await.unwrap();
        repo.remove("u-1", &product_id).await.unwrap();

        assert!(repo.get("u-1").await.unwrap().is_empty());
        assert!(matches!(
            repo.remove("u-1", &product_id).await,
            Err(StoreError::NotFound { .. })
        ));
    }
}
