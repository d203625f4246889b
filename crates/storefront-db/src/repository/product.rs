//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Key Operations
//! - Filtered listing driven by the query composer
//! - CRUD operations
//! - Bulk import in one statement
//!
//! ## Filtered Listing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 How a Filtered Listing Runs                             │
//! │                                                                         │
//! │  Client sends: search=boot & minPrice=1000 & maxPrice=9999 & page=2    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ProductFilter::compose()  (storefront-core, pure)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────┐           │
//! │  │ WHERE 1=1                                               │           │
//! │  │   AND (title LIKE ?1 OR description LIKE ?1)            │           │
//! │  │   AND price_cents BETWEEN ?2 AND ?3                     │           │
//! │  │ ORDER BY id ASC LIMIT ?4 OFFSET ?5                      │           │
//! │  └─────────────────────────────────────────────────────────┘           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  list_filtered() binds params positionally ← THIS MODULE               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Results: page 2 of matching products                                  │
//! │                                                                         │
//! │  The clause text never contains client data; only placeholders.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use storefront_core::query::{placeholder_groups, ProductFilter, SqlParam};
use storefront_core::validation::{validate_price_cents, validate_rating, validate_title};
use storefront_core::{
    NewProduct, Product, ProductPatch, ProductWithCategory, StoreError, StoreResult,
};

/// Raw products row. `images` is a JSON array column and needs decoding
/// before the row becomes a [`Product`].
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    title: String,
    description: String,
    price_cents: i64,
    category_id: Option<String>,
    stock: i64,
    images: String,
    rating: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        let images: Vec<String> = serde_json::from_str(&row.images)?;
        Ok(Product {
            id: row.id,
            title: row.title,
            description: row.description,
            price_cents: row.price_cents,
            category_id: row.category_id,
            stock: row.stock,
            images,
            rating: row.rating,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Products row joined with its category name (admin listing).
#[derive(Debug, sqlx::FromRow)]
struct ProductListRow {
    id: String,
    title: String,
    description: String,
    price_cents: i64,
    category_id: Option<String>,
    stock: i64,
    images: String,
    rating: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    category_name: Option<String>,
}

impl TryFrom<ProductListRow> for ProductWithCategory {
    type Error = DbError;

    fn try_from(row: ProductListRow) -> DbResult<Self> {
        let images: Vec<String> = serde_json::from_str(&row.images)?;
        Ok(ProductWithCategory {
            product: Product {
                id: row.id,
                title: row.title,
                description: row.description,
                price_cents: row.price_cents,
                category_id: row.category_id,
                stock: row.stock,
                images,
                rating: row.rating,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            category_name: row.category_name,
        })
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// // Filtered listing
/// let results = repo.list_filtered(&filter).await?;
///
/// // Get by ID
/// let product = repo.get("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product.
    ///
    /// ## Validation
    /// - title required, price non-negative, rating within 0-5
    /// - a referenced category must exist (checked before the insert so the
    ///   caller sees NotFound instead of a raw constraint failure)
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with generated id and timestamps
    pub async fn create(&self, new: NewProduct) -> StoreResult<Product> {
        validate_title(&new.title)?;
        validate_price_cents(new.price_cents)?;
        if let Some(rating) = new.rating {
            validate_rating(rating)?;
        }

        if let Some(category_id) = new.category_id.as_deref() {
            self.check_category_exists(category_id).await?;
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let images_json = serde_json::to_string(&new.images).map_err(DbError::from)?;

        debug!(id = %id, title = %new.title, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, title, description, price_cents, category_id,
                stock, images, rating, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.price_cents)
        .bind(&new.category_id)
        .bind(new.stock)
        .bind(&images_json)
        .bind(new.rating)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(Product {
            id,
            title: new.title,
            description: new.description,
            price_cents: new.price_cents,
            category_id: new.category_id,
            stock: new.stock,
            images: new.images,
            rating: new.rating,
            created_at: now,
            updated_at: now,
        })
    }

    /// Creates many products in one multi-row statement.
    ///
    /// ## How It Works
    /// The `VALUES` groups come from [`placeholder_groups`], so placeholder
    /// count is always columns × rows and the whole import is a single
    /// atomic statement.
    ///
    /// ## Validation
    /// Every row is validated before any I/O; one bad row fails the whole
    /// batch.
    pub async fn bulk_create(&self, items: Vec<NewProduct>) -> StoreResult<Vec<Product>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        for item in &items {
            validate_title(&item.title)?;
            validate_price_cents(item.price_cents)?;
            if let Some(rating) = item.rating {
                validate_rating(rating)?;
            }
        }

        // Referenced categories must exist before the insert hits the FK.
        let mut category_ids: Vec<&str> = items
            .iter()
            .filter_map(|i| i.category_id.as_deref())
            .collect();
        category_ids.sort_unstable();
        category_ids.dedup();
        for category_id in category_ids {
            self.check_category_exists(category_id).await?;
        }

        let now = Utc::now();
        let mut products = Vec::with_capacity(items.len());
        for item in items {
            let images_json = serde_json::to_string(&item.images).map_err(DbError::from)?;
            products.push((
                Product {
                    id: Uuid::new_v4().to_string(),
                    title: item.title,
                    description: item.description,
                    price_cents: item.price_cents,
                    category_id: item.category_id,
                    stock: item.stock,
                    images: item.images,
                    rating: item.rating,
                    created_at: now,
                    updated_at: now,
                },
                images_json,
            ));
        }

        let sql = format!(
            "INSERT INTO products (
                id, title, description, price_cents, category_id,
                stock, images, rating, created_at, updated_at
            ) VALUES {}",
            placeholder_groups(10, products.len())
        );

        debug!(rows = products.len(), "Bulk-inserting products");

        let mut query = sqlx::query(&sql);
        for (product, images_json) in &products {
            query = query
                .bind(&product.id)
                .bind(&product.title)
                .bind(&product.description)
                .bind(product.price_cents)
                .bind(&product.category_id)
                .bind(product.stock)
                .bind(images_json)
                .bind(product.rating)
                .bind(product.created_at)
                .bind(product.updated_at);
        }
        query
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(products.into_iter().map(|(p, _)| p).collect())
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get(&self, id: &str) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, title, description, price_cents, category_id,
                   stock, images, rating, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        row.map(|r| Product::try_from(r).map_err(StoreError::from))
            .transpose()
    }

    /// Lists all products joined with their category names, id ascending.
    ///
    /// ## Usage
    /// Back-office catalog table. Storefront listings go through
    /// [`Self::list_filtered`] instead.
    pub async fn list(&self) -> StoreResult<Vec<ProductWithCategory>> {
        let rows = sqlx::query_as::<_, ProductListRow>(
            r#"
            SELECT p.id, p.title, p.description, p.price_cents, p.category_id,
                   p.stock, p.images, p.rating, p.created_at, p.updated_at,
                   c.name AS category_name
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            ORDER BY p.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        rows.into_iter()
            .map(|r| ProductWithCategory::try_from(r).map_err(StoreError::from))
            .collect()
    }

    /// Lists products matching a composed filter.
    ///
    /// ## How It Works
    /// 1. [`ProductFilter::compose`] builds the clause + parameter list (pure)
    /// 2. Parameters are bound positionally, in the order composed
    /// 3. Ordering and pagination are already part of the clause
    pub async fn list_filtered(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let composed = filter.compose();

        debug!(clause = %composed.clause, params = composed.params.len(), "Filtered listing");

        let sql = format!(
            "SELECT id, title, description, price_cents, category_id,
                    stock, images, rating, created_at, updated_at
             FROM products {}",
            composed.clause
        );

        let mut query = sqlx::query_as::<_, ProductRow>(&sql);
        for param in composed.params {
            query = match param {
                SqlParam::Text(s) => query.bind(s),
                SqlParam::Int(i) => query.bind(i),
                SqlParam::Real(f) => query.bind(f),
            };
        }

        let rows = query.fetch_all(&self.pool).await.map_err(DbError::from)?;

        debug!(count = rows.len(), "Filtered listing returned products");

        rows.into_iter()
            .map(|r| Product::try_from(r).map_err(StoreError::from))
            .collect()
    }

    /// Partially updates a product. Absent fields keep their stored value
    /// (COALESCE semantics).
    ///
    /// ## Returns
    /// * `Ok(Product)` - The updated row
    /// * `Err(StoreError::NotFound)` - Product doesn't exist
    pub async fn update(&self, id: &str, patch: ProductPatch) -> StoreResult<Product> {
        if let Some(title) = patch.title.as_deref() {
            validate_title(title)?;
        }
        if let Some(price) = patch.price_cents {
            validate_price_cents(price)?;
        }
        if let Some(rating) = patch.rating {
            validate_rating(rating)?;
        }
        if let Some(category_id) = patch.category_id.as_deref() {
            self.check_category_exists(category_id).await?;
        }

        let images_json = match &patch.images {
            Some(images) => Some(serde_json::to_string(images).map_err(DbError::from)?),
            None => None,
        };
        let now = Utc::now();

        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                title = COALESCE(?2, title),
                description = COALESCE(?3, description),
                price_cents = COALESCE(?4, price_cents),
                category_id = COALESCE(?5, category_id),
                stock = COALESCE(?6, stock),
                images = COALESCE(?7, images),
                rating = COALESCE(?8, rating),
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.price_cents)
        .bind(&patch.category_id)
        .bind(patch.stock)
        .bind(&images_json)
        .bind(patch.rating)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Product", id))
    }

    /// Deletes a product.
    ///
    /// Hard delete: cart and wishlist lines cascade away; existing orders
    /// keep their own price/quantity snapshots and are unaffected.
    ///
    /// ## Returns
    /// * `Err(StoreError::NotFound)` - Product doesn't exist
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts total products (for diagnostics and seed guards).
    pub async fn count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(count)
    }

    async fn check_category_exists(&self, category_id: &str) -> StoreResult<()> {
        let found: Option<String> = sqlx::query_scalar(
            "SELECT id FROM categories WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        if found.is_none() {
            return Err(StoreError::not_found("Category", category_id));
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
    use storefront_core::query::Page;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_product(title: &str, price_cents: i64) -> NewProduct {
        NewProduct {
            title: title.to_string(),
            description: String::new(),
            price_cents,
            category_id: None,
            stock: 10,
            images: Vec::new(),
            rating: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let repo = db.products();

        let mut new = new_product("Trail Running Shoe", 5499);
        new.images = vec!["https://cdn.example.com/shoe-1.jpg".to_string()];
        new.rating = Some(4.5);

        let created = repo.create(new).await.unwrap();
        let fetched = repo.get(&created.id).await.unwrap().unwrap();

        assert_eq!(fetched.title, "Trail Running Shoe");
        assert_eq!(fetched.price_cents, 5499);
        assert_eq!(fetched.images, vec!["https://cdn.example.com/shoe-1.jpg"]);
        assert_eq!(fetched.rating, Some(4.5));
    }

    #[tokio::test]
    async fn test_create_validates_before_insert() {
        let db = test_db().await;
        let repo = db.products();

        assert!(matches!(
            repo.create(new_product("", 100)).await,
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            repo.create(new_product("Mug", -1)).await,
            Err(StoreError::Validation(_))
        ));

        let mut bad_rating = new_product("Mug", 100);
        bad_rating.rating = Some(9.0);
        assert!(matches!(
            repo.create(bad_rating).await,
            Err(StoreError::Validation(_))
        ));

        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_with_missing_category_fails() {
        let db = test_db().await;
        let repo = db.products();

        let mut new = new_product("Mug", 100);
        new.category_id = Some("no-such-category".to_string());

        assert!(matches!(
            repo.create(new).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_joins_category_name() {
        let db = test_db().await;
        let category = db.categories().create("Footwear", None).await.unwrap();

        let mut new = new_product("Boot", 8999);
        new.category_id = Some(category.id.clone());
        db.products().create(new).await.unwrap();
        db.products()
            .create(new_product("Uncategorized Mug", 500))
            .await
            .unwrap();

        let listing = db.products().list().await.unwrap();
        assert_eq!(listing.len(), 2);

        let boot = listing
            .iter()
            .find(|p| p.product.title == "Boot")
            .unwrap();
        assert_eq!(boot.category_name.as_deref(), Some("Footwear"));

        let mug = listing
            .iter()
            .find(|p| p.product.title == "Uncategorized Mug")
            .unwrap();
        assert_eq!(mug.category_name, None);
    }

    #[tokio::test]
    async fn test_list_filtered_by_search_and_price() {
        let db = test_db().await;
        let repo = db.products();

        repo.create(new_product("Trail Boot", 8999)).await.unwrap();
        repo.create(new_product("City Boot", 4999)).await.unwrap();
        let mut described = new_product("Plain Sneaker", 2999);
        described.description = "lightweight boot alternative".to_string();
        repo.create(described).await.unwrap();
        repo.create(new_product("Coffee Mug", 1099)).await.unwrap();

        // Search matches title OR description, case-insensitively.
        let boots = repo
            .list_filtered(&ProductFilter {
                search: Some("BOOT".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(boots.len(), 3);

        // Price range narrows it down.
        let mid = repo
            .list_filtered(&ProductFilter {
                search: Some("boot".to_string()),
                min_price_cents: Some(4000),
                max_price_cents: Some(9000),
                ..Default::default()
            })
            .await
            .unwrap();
        let titles: Vec<&str> = mid.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(mid.len(), 2);
        assert!(titles.contains(&"Trail Boot"));
        assert!(titles.contains(&"City Boot"));
    }

    #[tokio::test]
    async fn test_list_filtered_by_category_and_rating() {
        let db = test_db().await;
        let footwear = db.categories().create("Footwear", None).await.unwrap();

        let mut rated = new_product("Boot", 8999);
        rated.category_id = Some(footwear.id.clone());
        rated.rating = Some(4.7);
        db.products().create(rated).await.unwrap();

        let mut low = new_product("Slipper", 1999);
        low.category_id = Some(footwear.id.clone());
        low.rating = Some(2.1);
        db.products().create(low).await.unwrap();

        db.products().create(new_product("Mug", 500)).await.unwrap();

        let filtered = db
            .products()
            .list_filtered(&ProductFilter {
                category_id: Some(footwear.id.clone()),
                min_rating: Some(4.0),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Boot");
    }

    #[tokio::test]
    async fn test_list_filtered_pagination() {
        let db = test_db().await;
        let repo = db.products();

        for i in 0..5 {
            repo.create(new_product(&format!("Item {i}"), 100))
                .await
                .unwrap();
        }

        let page1 = repo
            .list_filtered(&ProductFilter {
                page: Page::new(1, 2),
                ..Default::default()
            })
            .await
            .unwrap();
        let page3 = repo
            .list_filtered(&ProductFilter {
                page: Page::new(3, 2),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page1.len(), 2);
        assert_eq!(page3.len(), 1);
        // Deterministic id ordering means pages never overlap.
        assert!(page1.iter().all(|p| p.id != page3[0].id));
    }

    #[tokio::test]
    async fn test_update_partial() {
        let db = test_db().await;
        let repo = db.products();

        let created = repo.create(new_product("Mug", 1099)).await.unwrap();

        let updated = repo
            .update(
                &created.id,
                ProductPatch {
                    price_cents: Some(1299),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.price_cents, 1299);
        assert_eq!(updated.title, "Mug");

        assert!(matches!(
            repo.update("missing", ProductPatch::default()).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = test_db().await;
        let repo = db.products();

        let created = repo.create(new_product("Mug", 1099)).await.unwrap();
        repo.delete(&created.id).await.unwrap();

        assert!(repo.get(&created.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&created.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_bulk_create() {
        let db = test_db().await;
        let repo = db.products();

        let items = vec![
            new_product("A", 100),
            new_product("B", 200),
            new_product("C", 300),
        ];
        let created = repo.bulk_create(items).await.unwrap();

        assert_eq!(created.len(), 3);
        assert_eq!(repo.count().await.unwrap(), 3);

        // One bad row rejects the whole batch before any I/O.
        let bad = vec![new_product("D", 400), new_product("", 500)];
        assert!(matches!(
            repo.bulk_create(bad).await,
            Err(StoreError::Validation(_))
        ));
        assert_eq!(repo.count().await.unwrap(), 3);
    }
}
