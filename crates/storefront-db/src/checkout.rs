//! # Checkout Service
//!
//! Turns a cart into an order.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Checkout Pipeline                               │
//! │                                                                         │
//! │   Everything runs inside ONE transaction:                               │
//! │                                                                         │
//! │     read cart_lines ──▶ resolve current prices ──▶ snapshot lines       │
//! │                 (a product that vanished is dropped and warned)         │
//! │     INSERT INTO orders ...        (status Pending, payment Unpaid)      │
//! │     DELETE FROM cart_lines ...                                          │
//! │                                                                         │
//! │   The pipeline commits or rolls back as one unit. A failed checkout     │
//! │   leaves the cart exactly as it was, and a concurrently added line      │
//! │   is never cleared without being ordered: it lands either before        │
//! │   the snapshot read or after the commit.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DbError;
use storefront_core::query::placeholder_list;
use storefront_core::{order_total, Order, OrderLine, OrderStatus, StoreError, StoreResult};

/// Raw cart row checkout consumes. Only the pair key and quantity matter;
/// prices come from the products table at this moment, not from the cart.
#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    product_id: String,
    quantity: i64,
}

/// Converts carts into orders.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    pool: SqlitePool,
}

impl CheckoutService {
    /// Creates a new CheckoutService.
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutService { pool }
    }

    /// Checks out a user's cart.
    ///
    /// Everything below shares a single transaction:
    ///
    /// 1. Reads the cart; an empty cart fails with `EmptyCart`.
    /// 2. Resolves each line's product to its current price. A line whose
    ///    product no longer exists is dropped with a warning; if no line
    ///    survives, the checkout fails with `EmptyCart` too.
    /// 3. Writes one `Pending`/`Unpaid` order with the price snapshots and
    ///    clears the cart.
    ///
    /// A cart line added while the checkout runs is either part of the
    /// snapshot or arrives after the commit; the clearing DELETE never
    /// removes a line the order doesn't contain.
    ///
    /// ## Returns
    /// The persisted order.
    pub async fn checkout(&self, user_id: &str) -> StoreResult<Order> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let rows = sqlx::query_as::<_, CartRow>(
            r#"
            SELECT product_id, quantity
            FROM cart_lines
            WHERE user_id = ?1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if rows.is_empty() {
            return Err(StoreError::EmptyCart);
        }

        let ids: Vec<String> = rows.iter().map(|r| r.product_id.clone()).collect();
        let sql = format!(
            "SELECT id, price_cents FROM products WHERE id IN ({})",
            placeholder_list(ids.len())
        );
        let mut lookup = sqlx::query_as::<_, (String, i64)>(&sql);
        for id in &ids {
            lookup = lookup.bind(id);
        }
        let prices: Vec<(String, i64)> = lookup
            .fetch_all(&mut *tx)
            .await
            .map_err(DbError::from)?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            match prices.iter().find(|(id, _)| *id == row.product_id) {
                Some((_, price_cents)) => lines.push(OrderLine {
                    product_id: row.product_id,
                    quantity: row.quantity,
                    price_cents: *price_cents,
                }),
                None => warn!(
                    user_id = %user_id,
                    product_id = %row.product_id,
                    "Cart line references a product that no longer exists, dropping it"
                ),
            }
        }

        if lines.is_empty() {
            return Err(StoreError::EmptyCart);
        }

        let order = Order {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            total_cents: order_total(&lines).cents(),
            lines,
            status: OrderStatus::Pending,
            payment_status: "Unpaid".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let lines_json = serde_json::to_string(&order.lines).map_err(DbError::from)?;

        debug!(
            user_id = %user_id,
            order_id = %order.id,
            total_cents = order.total_cents,
            lines = order.lines.len(),
            "Checking out cart"
        );

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, lines, total_cents,
                status, payment_status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(&lines_json)
        .bind(order.total_cents)
        .bind(order.status)
        .bind(&order.payment_status)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        sqlx::query("DELETE FROM cart_lines WHERE user_id = ?1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        Ok(order)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use storefront_core::{NewProduct, NewUser, Role};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_user(db: &Database) -> String {
        db.users()
            .create(NewUser {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
                address: None,
                phone: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_product(db: &Database, title: &str, price_cents: i64) -> String {
        db.products()
            .create(NewProduct {
                title: title.to_string(),
                description: String::new(),
                price_cents,
                category_id: None,
                stock: 10,
                images: Vec::new(),
                rating: None,
            })
            .await
            .unwrap()
            .id
    }

    /// Slips a cart row past the foreign keys. The in-memory pool holds a
    /// single connection, so the pragma stays in force for the insert.
    async fn insert_dangling_line(db: &Database, user_id: &str, product_id: &str) {
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query(
            r#"
            INSERT INTO cart_lines (user_id, product_id, quantity, created_at, updated_at)
            VALUES (?1, ?2, 1, ?3, ?3)
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(Utc::now())
        .execute(db.pool())
        .await
        .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(db.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_cart_fails() {
        let db = test_db().await;
        let user = seed_user(&db).await;

        let err = db.checkout().checkout(&user).await.unwrap_err();
        assert!(matches!(err, StoreError::EmptyCart));
        assert_eq!(err.status_code(), 400);
        assert!(db.orders().list_for_user(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_totals_and_clears_cart() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let mug = seed_product(&db, "Mug", 50).await;
        let coaster = seed_product(&db, "Coaster", 30).await;

        db.carts().add(&user, &mug, 2).await.unwrap();
        db.carts().add(&user, &coaster, 1).await.unwrap();

        let order = db.checkout().checkout(&user).await.unwrap();
        assert_eq!(order.total_cents, 130);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, "Unpaid");
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[0].product_id, mug);
        assert_eq!(order.lines[0].quantity, 2);
        assert_eq!(order.lines[0].price_cents, 50);

        // Cart is gone, the order is persisted, and it is the only one.
        assert!(db.carts().get(&user).await.unwrap().is_empty());
        let persisted = db.orders().get(&order.id).await.unwrap().unwrap();
        assert_eq!(persisted.total_cents, 130);
        assert_eq!(db.orders().list_for_user(&user).await.unwrap().len(), 1);

        // Checking out again is an empty-cart failure.
        assert!(matches!(
            db.checkout().checkout(&user).await,
            Err(StoreError::EmptyCart)
        ));
    }

    #[tokio::test]
    async fn test_vanished_product_line_is_dropped() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let mug = seed_product(&db, "Mug", 100).await;

        db.carts().add(&user, &mug, 1).await.unwrap();
        insert_dangling_line(&db, &user, "ghost").await;

        let order = db.checkout().checkout(&user).await.unwrap();
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].product_id, mug);
        assert_eq!(order.total_cents, 100);
        assert!(db.carts().get(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_survives_fails_and_keeps_cart() {
        let db = test_db().await;
        let user = seed_user(&db).await;

        insert_dangling_line(&db, &user, "ghost").await;

        let err = db.checkout().checkout(&user).await.unwrap_err();
        assert!(matches!(err, StoreError::EmptyCart));

        // The failed checkout kept the row in place.
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cart_lines WHERE user_id = ?1")
                .bind(&user)
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_checkout_only_clears_that_users_cart() {
        let db = test_db().await;
        let ada = seed_user(&db).await;
        let bob = db
            .users()
            .create(NewUser {
                name: "Bob".to_string(),
                email: "bob@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
                address: None,
                phone: None,
            })
            .await
            .unwrap()
            .id;
        let mug = seed_product(&db, "Mug", 100).await;

        db.carts().add(&ada, &mug, 1).await.unwrap();
        db.carts().add(&bob, &mug, 4).await.unwrap();

        db.checkout().checkout(&ada).await.unwrap();

        // Only the checked-out cart is cleared.
        assert!(db.carts().get(&ada).await.unwrap().is_empty());
        let bobs = db.carts().get(&bob).await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].quantity, 4);
    }

    #[tokio::test]
    async fn test_checkout_uses_current_prices() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let mug = seed_product(&db, "Mug", 100).await;

        db.carts().add(&user, &mug, 1).await.unwrap();

        // Reprice between add-to-cart and checkout; the order sees the
        // price at checkout time.
        db.products()
            .update(
                &mug,
                storefront_core::ProductPatch {
                    price_cents: Some(250),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let order = db.checkout().checkout(&user).await.unwrap();
        assert_eq!(order.total_cents, 250);
        assert_eq!(order.lines[0].price_cents, 250);
    }
}
