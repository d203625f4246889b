//! # Order Repository
//!
//! Database operations for orders and the status lifecycle.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create() → Order { status: Pending, lines frozen }             │
//! │         (checkout creates orders the same way, from the cart)          │
//! │                                                                         │
//! │  2. SHIP                                                               │
//! │     └── update_status("Shipped") → guarded on the read status          │
//! │                                                                         │
//! │  3. DELIVER                                                            │
//! │     └── update_status("Delivered") → terminal                          │
//! │                                                                         │
//! │  X. CANCEL (from Pending or Shipped)                                   │
//! │     └── update_status("Cancelled") → terminal                          │
//! │                                                                         │
//! │  Every write path goes through OrderStatus::parse + transition_to.     │
//! │  Unknown text and illegal edges fail before the UPDATE runs.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use storefront_core::error::ValidationError;
use storefront_core::query::placeholder_list;
use storefront_core::validation::validate_quantity;
use storefront_core::{
    order_total, NewOrderLine, Order, OrderLine, OrderPatch, OrderStatus, OrderSummary,
    StoreError, StoreResult,
};

/// Raw orders row. `lines` is a JSON array column and needs decoding
/// before the row becomes an [`Order`].
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    user_id: String,
    lines: String,
    total_cents: i64,
    status: OrderStatus,
    payment_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> DbResult<Self> {
        let lines: Vec<OrderLine> = serde_json::from_str(&row.lines)?;
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            lines,
            total_cents: row.total_cents,
            status: row.status,
            payment_status: row.payment_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Creates an order directly from requested lines (admin path).
    ///
    /// ## Snapshot Pattern
    /// Current product prices are resolved and frozen into the order lines;
    /// later repricing never changes what this order says was paid. The
    /// existence checks, the price lookup and the insert share one
    /// transaction, so the snapshot cannot straddle a concurrent catalog
    /// write.
    ///
    /// ## Returns
    /// * `Err(StoreError::Validation)` - No lines, or a non-positive quantity
    /// * `Err(StoreError::NotFound)` - User or any product id doesn't exist
    pub async fn create(&self, user_id: &str, lines: &[NewOrderLine]) -> StoreResult<Order> {
        if lines.is_empty() {
            return Err(ValidationError::Required {
                field: "lines".to_string(),
            }
            .into());
        }
        for line in lines {
            validate_quantity(line.quantity)?;
        }

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let user: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::from)?;
        if user.is_none() {
            return Err(StoreError::not_found("User", user_id));
        }

        // Every requested product must exist; one price lookup for them all.
        let ids: Vec<String> = lines.iter().map(|l| l.product_id.clone()).collect();
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

        let mut snapshots = Vec::with_capacity(lines.len());
        for line in lines {
            let price_cents = prices
                .iter()
                .find(|(id, _)| *id == line.product_id)
                .map(|(_, price)| *price)
                .ok_or_else(|| StoreError::not_found("Product", &line.product_id))?;
            snapshots.push(OrderLine {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                price_cents,
            });
        }

        let order = Order {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            total_cents: order_total(&snapshots).cents(),
            lines: snapshots,
            status: OrderStatus::Pending,
            payment_status: "Unpaid".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let lines_json = serde_json::to_string(&order.lines).map_err(DbError::from)?;

        debug!(id = %order.id, total_cents = order.total_cents, "Inserting order");

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

        tx.commit().await.map_err(DbError::from)?;

        Ok(order)
    }

    /// Gets an order by its ID.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, lines, total_cents,
                   status, payment_status, created_at, updated_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        row.map(|r| Order::try_from(r).map_err(StoreError::from))
            .transpose()
    }

    /// Lists all orders joined with customer name/email, newest first
    /// (back-office view).
    pub async fn list(&self) -> StoreResult<Vec<OrderSummary>> {
        let summaries = sqlx::query_as::<_, OrderSummary>(
            r#"
            SELECT o.id, o.user_id,
                   u.name  AS customer_name,
                   u.email AS customer_email,
                   o.total_cents, o.status, o.payment_status, o.created_at
            FROM orders o
            INNER JOIN users u ON u.id = o.user_id
            ORDER BY o.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(summaries)
    }

    /// Lists one user's orders, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, lines, total_cents,
                   status, payment_status, created_at, updated_at
            FROM orders
            WHERE user_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        rows.into_iter()
            .map(|r| Order::try_from(r).map_err(StoreError::from))
            .collect()
    }

    /// Moves an order to a new status.
    ///
    /// ## Validation Order
    /// 1. `OrderStatus::parse` - unknown text fails before any I/O
    /// 2. read the current status - missing order fails with NotFound
    /// 3. `transition_to` - illegal edge fails with InvalidTransition
    /// 4. guarded UPDATE (`WHERE id = ? AND status = ?`) - a concurrent
    ///    transition between read and write loses cleanly
    ///
    /// Repeating the current status is a no-op success.
    pub async fn update_status(&self, id: &str, status_text: &str) -> StoreResult<Order> {
        let next = OrderStatus::parse(status_text)?;

        let current = self
            .get(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Order", id))?;
        current.status.transition_to(next)?;

        debug!(id = %id, from = %current.status, to = %next, "Updating order status");

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = ?3,
                updated_at = ?4
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(current.status)
        .bind(next)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Order", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Order", id))
    }

    /// Partially updates an order (status and/or payment status).
    ///
    /// A present status goes through exactly the same parse + transition +
    /// guarded-write path as [`Self::update_status`]; there is no side door.
    pub async fn update(&self, id: &str, patch: OrderPatch) -> StoreResult<Order> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Order", id))?;

        let next_status = match patch.status.as_deref() {
            Some(text) => {
                let next = OrderStatus::parse(text)?;
                current.status.transition_to(next)?;
                Some(next)
            }
            None => None,
        };

        debug!(id = %id, "Updating order");

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = COALESCE(?3, status),
                payment_status = COALESCE(?4, payment_status),
                updated_at = ?5
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(current.status)
        .bind(next_status)
        .bind(&patch.payment_status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Order", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Order", id))
    }

    /// Deletes an order.
    ///
    /// ## Returns
    /// * `Err(StoreError::NotFound)` - Order doesn't exist
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        debug!(id = %id, "Deleting order");

        let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Order", id));
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
    use storefront_core::{NewProduct, NewUser, ProductPatch, Role};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_user(db: &Database, email: &str) -> String {
        db.users()
            .create(NewUser {
                name: "Ada".to_string(),
                email: email.to_string(),
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

    #[tokio::test]
    async fn test_create_freezes_prices() {
        let db = test_db().await;
        let user = seed_user(&db, "ada@example.com").await;
        let product = seed_product(&db, "Mug", 100).await;
        let repo = db.orders();

        let order = repo
            .create(
                &user,
                &[NewOrderLine {
                    product_id: product.clone(),
                    quantity: 1,
                }],
            )
            .await
            .unwrap();
        assert_eq!(order.total_cents, 100);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, "Unpaid");

        // Reprice the product; the order keeps its snapshot.
        db.products()
            .update(
                &product,
                ProductPatch {
                    price_cents: Some(200),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let reread = repo.get(&order.id).await.unwrap().unwrap();
        assert_eq!(reread.total_cents, 100);
        assert_eq!(reread.lines[0].price_cents, 100);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let db = test_db().await;
        let user = seed_user(&db, "ada@example.com").await;
        let product = seed_product(&db, "Mug", 100).await;
        let repo = db.orders();

        assert!(matches!(
            repo.create(&user, &[]).await,
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            repo.create(
                &user,
                &[NewOrderLine {
                    product_id: product.clone(),
                    quantity: 0,
                }],
            )
            .await,
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            repo.create(
                &user,
                &[NewOrderLine {
                    product_id: "ghost".to_string(),
                    quantity: 1,
                }],
            )
            .await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            repo.create(
                "no-such-user",
                &[NewOrderLine {
                    product_id: product,
                    quantity: 1,
                }],
            )
            .await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_status_forward_path() {
        let db = test_db().await;
        let user = seed_user(&db, "ada@example.com").await;
        let product = seed_product(&db, "Mug", 100).await;
        let repo = db.orders();

        let order = repo
            .create(
                &user,
                &[NewOrderLine {
                    product_id: product,
                    quantity: 1,
                }],
            )
            .await
            .unwrap();

        let shipped = repo.update_status(&order.id, "Shipped").await.unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);

        let delivered = repo.update_status(&order.id, "Delivered").await.unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_status_unknown_text_fails_before_io() {
        let db = test_db().await;
        let user = seed_user(&db, "ada@example.com").await;
        let product = seed_product(&db, "Mug", 100).await;
        let repo = db.orders();

        let order = repo
            .create(
                &user,
                &[NewOrderLine {
                    product_id: product,
                    quantity: 1,
                }],
            )
            .await
            .unwrap();

        let err = repo.update_status(&order.id, "Bogus").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidStatus(_)));
        assert_eq!(err.status_code(), 400);

        let reread = repo.get(&order.id).await.unwrap().unwrap();
        assert_eq!(reread.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_status_illegal_edge_fails() {
        let db = test_db().await;
        let user = seed_user(&db, "ada@example.com").await;
        let product = seed_product(&db, "Mug", 100).await;
        let repo = db.orders();

        let order = repo
            .create(
                &user,
                &[NewOrderLine {
                    product_id: product,
                    quantity: 1,
                }],
            )
            .await
            .unwrap();

        // Skipping Shipped is not an edge.
        let err = repo.update_status(&order.id, "Delivered").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        // Terminal states accept nothing new.
        repo.update_status(&order.id, "Cancelled").await.unwrap();
        let err = repo.update_status(&order.id, "Shipped").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_status_repeat_is_noop_success() {
        let db = test_db().await;
        let user = seed_user(&db, "ada@example.com").await;
        let product = seed_product(&db, "Mug", 100).await;
        let repo = db.orders();

        let order = repo
            .create(
                &user,
                &[NewOrderLine {
                    product_id: product,
                    quantity: 1,
                }],
            )
            .await
            .unwrap();

        let unchanged = repo.update_status(&order.id, "Pending").await.unwrap();
        assert_eq!(unchanged.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_cancellation_edges() {
        let db = test_db().await;
        let user = seed_user(&db, "ada@example.com").await;
        let product = seed_product(&db, "Mug", 100).await;
        let repo = db.orders();

        let from_pending = repo
            .create(
                &user,
                &[NewOrderLine {
                    product_id: product.clone(),
                    quantity: 1,
                }],
            )
            .await
            .unwrap();
        repo.update_status(&from_pending.id, "Cancelled")
            .await
            .unwrap();

        let from_shipped = repo
            .create(
                &user,
                &[NewOrderLine {
                    product_id: product.clone(),
                    quantity: 1,
                }],
            )
            .await
            .unwrap();
        repo.update_status(&from_shipped.id, "Shipped").await.unwrap();
        repo.update_status(&from_shipped.id, "Cancelled")
            .await
            .unwrap();

        let delivered = repo
            .create(
                &user,
                &[NewOrderLine {
                    product_id: product,
                    quantity: 1,
                }],
            )
            .await
            .unwrap();
        repo.update_status(&delivered.id, "Shipped").await.unwrap();
        repo.update_status(&delivered.id, "Delivered").await.unwrap();
        assert!(matches!(
            repo.update_status(&delivered.id, "Cancelled").await,
            Err(StoreError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_patch_payment_and_status() {
        let db = test_db().await;
        let user = seed_user(&db, "ada@example.com").await;
        let product = seed_product(&db, "Mug", 100).await;
        let repo = db.orders();

        let order = repo
            .create(
                &user,
                &[NewOrderLine {
                    product_id: product,
                    quantity: 1,
                }],
            )
            .await
            .unwrap();

        // Payment-only patch leaves the status alone.
        let paid = repo
            .update(
                &order.id,
                OrderPatch {
                    status: None,
                    payment_status: Some("Paid".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(paid.payment_status, "Paid");
        assert_eq!(paid.status, OrderStatus::Pending);

        // The patch status path enforces the same lifecycle.
        assert!(matches!(
            repo.update(
                &order.id,
                OrderPatch {
                    status: Some("Bogus".to_string()),
                    payment_status: None,
                },
            )
            .await,
            Err(StoreError::InvalidStatus(_))
        ));

        let shipped = repo
            .update(
                &order.id,
                OrderPatch {
                    status: Some("Shipped".to_string()),
                    payment_status: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert_eq!(shipped.payment_status, "Paid");
    }

    #[tokio::test]
    async fn test_list_joins_customer_newest_first() {
        let db = test_db().await;
        let ada = seed_user(&db, "ada@example.com").await;
        let bob = seed_user(&db, "bob@example.com").await;
        let product = seed_product(&db, "Mug", 100).await;
        let repo = db.orders();

        let first = repo
            .create(
                &ada,
                &[NewOrderLine {
                    product_id: product.clone(),
                    quantity: 1,
                }],
            )
            .await
            .unwrap();
        let second = repo
            .create(
                &bob,
                &[NewOrderLine {
                    product_id: product,
                    quantity: 2,
                }],
            )
            .await
            .unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[0].customer_email, "bob@example.com");
        assert_eq!(all[1].id, first.id);
        assert_eq!(all[1].customer_name, "Ada");

        let adas = repo.list_for_user(&ada).await.unwrap();
        assert_eq!(adas.len(), 1);
        assert_eq!(adas[0].id, first.id);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = test_db().await;
        let user = seed_user(&db, "ada@example.com").await;
        let product = seed_product(&db, "Mug", 100).await;
        let repo = db.orders();

        let order = repo
            .create(
                &user,
                &[NewOrderLine {
                    product_id: product,
                    quantity: 1,
                }],
            )
            .await
            .unwrap();

        repo.delete(&order.id).await.unwrap();
        assert!(repo.get(&order.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&order.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }
}
