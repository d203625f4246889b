//! # Category Repository
//!
//! Database operations for the category tree.
//!
//! ## Tree Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Category Tree Rules                                │
//! │                                                                         │
//! │  Footwear (parent_id = NULL)                                           │
//! │  ├── Boots     (parent_id = Footwear)                                  │
//! │  └── Sneakers  (parent_id = Footwear)                                  │
//! │                                                                         │
//! │  • parent_id may point at any OTHER category                           │
//! │  • parent_id = own id is rejected before any I/O                       │
//! │  • names are unique (UNIQUE index → Conflict on duplicates)            │
//! │                                                                         │
//! │  Delete is SOFT: deleted_at is set, the row stays. Products that       │
//! │  reference the category keep resolving; reads exclude deleted rows.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;
use storefront_core::validation::{validate_category_name, validate_parent_ref};
use storefront_core::{Category, StoreError, StoreResult};

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Creates a category.
    ///
    /// ## Returns
    /// * `Ok(Category)` - Inserted category
    /// * `Err(StoreError::Conflict)` - Name already exists
    /// * `Err(StoreError::NotFound)` - Parent doesn't exist
    pub async fn create(&self, name: &str, parent_id: Option<&str>) -> StoreResult<Category> {
        validate_category_name(name)?;

        if let Some(parent) = parent_id {
            self.check_exists(parent).await?;
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, name = %name, "Inserting category");

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, parent_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(parent_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(Category {
            id,
            name: name.to_string(),
            parent_id: parent_id.map(String::from),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Gets a category by its ID. Soft-deleted categories read as absent.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, parent_id, deleted_at, created_at, updated_at
            FROM categories
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(category)
    }

    /// Lists live categories, name ascending.
    pub async fn list(&self) -> StoreResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, parent_id, deleted_at, created_at, updated_at
            FROM categories
            WHERE deleted_at IS NULL
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(categories)
    }

    /// Partially updates a category.
    ///
    /// ## Validation Order
    /// The self-parent check runs before any I/O: `parent_id = id` can never
    /// reach the database.
    ///
    /// ## Returns
    /// * `Ok(Category)` - The updated row
    /// * `Err(StoreError::Validation)` - Self-parent or bad name
    /// * `Err(StoreError::Conflict)` - New name already exists
    /// * `Err(StoreError::NotFound)` - Category or new parent doesn't exist
    pub async fn update(
        &self,
        id: &str,
        name: Option<&str>,
        parent_id: Option<&str>,
    ) -> StoreResult<Category> {
        validate_parent_ref(id, parent_id)?;
        if let Some(name) = name {
            validate_category_name(name)?;
        }
        if let Some(parent) = parent_id {
            self.check_exists(parent).await?;
        }

        let now = Utc::now();

        debug!(id = %id, "Updating category");

        let result = sqlx::query(
            r#"
            UPDATE categories SET
                name = COALESCE(?2, name),
                parent_id = COALESCE(?3, parent_id),
                updated_at = ?4
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(parent_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Category", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Category", id))
    }

    /// Soft-deletes a category.
    ///
    /// ## Why Soft Delete?
    /// - Products still reference this category
    /// - Can be restored if deleted by mistake
    ///
    /// ## Returns
    /// * `Err(StoreError::NotFound)` - Category doesn't exist (or already deleted)
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let now = Utc::now();

        debug!(id = %id, "Soft-deleting category");

        let result = sqlx::query(
            r#"
            UPDATE categories SET
                deleted_at = ?2,
                updated_at = ?2
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Category", id));
        }

        Ok(())
    }

    async fn check_exists(&self, id: &str) -> StoreResult<()> {
        let found: Option<String> =
            sqlx::query_scalar("SELECT id FROM categories WHERE id = ?1 AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(DbError::from)?;

        if found.is_none() {
            return Err(StoreError::not_found("Category", id));
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

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let repo = db.categories();

        let parent = repo.create("Footwear", None).await.unwrap();
        let child = repo.create("Boots", Some(&parent.id)).await.unwrap();

        let fetched = repo.get(&child.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Boots");
        assert_eq!(fetched.parent_id.as_deref(), Some(parent.id.as_str()));
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let db = test_db().await;
        let repo = db.categories();

        repo.create("Footwear", None).await.unwrap();
        let err = repo.create("Footwear", None).await.unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.to_string(), "Category name already exists");
    }

    #[tokio::test]
    async fn test_create_with_missing_parent_fails() {
        let db = test_db().await;
        let repo = db.categories();

        assert!(matches!(
            repo.create("Boots", Some("ghost")).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_self_parent_rejected_before_io() {
        let db = test_db().await;
        let repo = db.categories();

        let category = repo.create("Footwear", None).await.unwrap();
        let err = repo
            .update(&category.id, None, Some(&category.id))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(err.status_code(), 400);

        // Row untouched.
        let fetched = repo.get(&category.id).await.unwrap().unwrap();
        assert_eq!(fetched.parent_id, None);
    }

    #[tokio::test]
    async fn test_update_renames() {
        let db = test_db().await;
        let repo = db.categories();

        let category = repo.create("Footware", None).await.unwrap();
        let updated = repo
            .update(&category.id, Some("Footwear"), None)
            .await
            .unwrap();

        assert_eq!(updated.name, "Footwear");

        assert!(matches!(
            repo.update("missing", Some("X"), None).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_category() {
        let db = test_db().await;
        let repo = db.categories();

        let category = repo.create("Seasonal", None).await.unwrap();
        repo.create("Evergreen", None).await.unwrap();

        repo.delete(&category.id).await.unwrap();

        assert!(repo.get(&category.id).await.unwrap().is_none());
        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Evergreen"]);

        // Second delete reads as absent.
        assert!(matches!(
            repo.delete(&category.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }
}
