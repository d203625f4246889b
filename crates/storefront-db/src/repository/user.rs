//! # User Repository
//!
//! Database operations for accounts.
//!
//! ## Passwords
//! This crate never sees a plaintext password. Hashing and verification
//! happen in the auth layer; rows store whatever opaque hash arrives in
//! [`NewUser::password_hash`], and [`User`] refuses to serialize it back out.
//!
//! ## Email Normalization
//! Emails are validated, trimmed and lowercased on the way in, so the
//! UNIQUE index on `users.email` is effectively case-insensitive and
//! login lookups can normalize the same way.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;
use storefront_core::error::ValidationError;
use storefront_core::validation::{validate_email, validate_user_name};
use storefront_core::{NewUser, StoreError, StoreResult, User, UserPatch};

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates a user.
    ///
    /// ## Returns
    /// * `Err(StoreError::Validation)` - Bad name, email or empty hash
    /// * `Err(StoreError::Conflict)` - Email already registered
    pub async fn create(&self, new: NewUser) -> StoreResult<User> {
        validate_user_name(&new.name)?;
        let email = validate_email(&new.email)?;
        if new.password_hash.is_empty() {
            return Err(ValidationError::Required {
                field: "password_hash".to_string(),
            }
            .into());
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            email,
            password_hash: new.password_hash,
            role: new.role,
            address: new.address,
            phone: new.phone,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        debug!(id = %user.id, email = %user.email, "Creating user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, email, password_hash, role,
                address, phone, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(&user.address)
        .bind(&user.phone)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(user)
    }

    /// Gets a user by ID.
    pub async fn get(&self, id: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role,
                   address, phone, created_at, updated_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(user)
    }

    /// Gets a user by email (login lookup).
    ///
    /// The input is normalized the same way [`Self::create`] normalizes
    /// before storing.
    pub async fn get_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let normalized = email.trim().to_lowercase();

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role,
                   address, phone, created_at, updated_at
            FROM users
            WHERE email = ?1
            "#,
        )
        .bind(normalized)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(user)
    }

    /// Lists all users alphabetically (back-office view).
    pub async fn list(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role,
                   address, phone, created_at, updated_at
            FROM users
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(users)
    }

    /// Partially updates a user. Absent fields keep their stored value.
    ///
    /// ## Returns
    /// * `Err(StoreError::NotFound)` - User doesn't exist
    /// * `Err(StoreError::Conflict)` - New email already registered
    pub async fn update(&self, id: &str, patch: UserPatch) -> StoreResult<User> {
        if let Some(name) = &patch.name {
            validate_user_name(name)?;
        }
        let email = match patch.email.as_deref() {
            Some(raw) => Some(validate_email(raw)?),
            None => None,
        };
        if matches!(patch.password_hash.as_deref(), Some("")) {
            return Err(ValidationError::Required {
                field: "password_hash".to_string(),
            }
            .into());
        }

        debug!(id = %id, "Updating user");

        let result = sqlx::query(
            r#"
            UPDATE users SET
                name = COALESCE(?2, name),
                email = COALESCE(?3, email),
                password_hash = COALESCE(?4, password_hash),
                role = COALESCE(?5, role),
                address = COALESCE(?6, address),
                phone = COALESCE(?7, phone),
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&email)
        .bind(&patch.password_hash)
        .bind(patch.role)
        .bind(&patch.address)
        .bind(&patch.phone)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("User", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found("User", id))
    }

    /// Deletes a user. Cart lines and wishlist entries cascade away;
    /// orders do not, because they are financial records.
    ///
    /// ## Returns
    /// * `Err(StoreError::NotFound)` - User doesn't exist
    /// * `Err(StoreError::Conflict)` - User still has orders
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        debug!(id = %id, "Deleting user");

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await;

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                let db_err = DbError::from(e);
                if matches!(db_err, DbError::ForeignKeyViolation { .. }) {
                    return Err(StoreError::Conflict(
                        "User has existing orders".to_string(),
                    ));
                }
                return Err(db_err.into());
            }
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("User", id));
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
    use storefront_core::{NewOrderLine, NewProduct, Role};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ada Lovelace".to_string(),
            email: email.to_string(),
            password_hash: "argon2-hash".to_string(),
            role: Role::User,
            address: None,
            phone: None,
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_email() {
        let db = test_db().await;
        let repo = db.users();

        let user = repo.create(new_user("  ADA@Example.COM ")).await.unwrap();
        assert_eq!(user.email, "ada@example.com");

        // Lookup normalizes the same way.
        let found = repo.get_by_email("Ada@EXAMPLE.com").await.unwrap();
        assert_eq!(found.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let db = test_db().await;
        let repo = db.users();

        assert!(matches!(
            repo.create(new_user("not-an-email")).await,
            Err(StoreError::Validation(_))
        ));

        let mut no_hash = new_user("ada@example.com");
        no_hash.password_hash = String::new();
        assert!(matches!(
            repo.create(no_hash).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let db = test_db().await;
        let repo = db.users();

        repo.create(new_user("ada@example.com")).await.unwrap();
        let err = repo
            .create(new_user("ADA@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.client_message(), "Email already exists");
    }

    #[tokio::test]
    async fn test_update_patch() {
        let db = test_db().await;
        let repo = db.users();

        let user = repo.create(new_user("ada@example.com")).await.unwrap();
        let updated = repo
            .update(
                &user.id,
                UserPatch {
                    address: Some("12 Analytical Way".to_string()),
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.address.as_deref(), Some("12 Analytical Way"));
        assert_eq!(updated.role, Role::Admin);
        // Untouched fields survive.
        assert_eq!(updated.email, "ada@example.com");
        assert_eq!(updated.name, "Ada Lovelace");

        assert!(matches!(
            repo.update(&user.id, UserPatch {
                email: Some("broken@".to_string()),
                ..Default::default()
            })
            .await,
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            repo.update("ghost", UserPatch::default()).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_cascades_cart_not_orders() {
        let db = test_db().await;
        let user = db.users().create(new_user("ada@example.com")).await.unwrap();
        let product = db
            .products()
            .create(NewProduct {
                title: "Mug".to_string(),
                description: String::new(),
                price_cents: 100,
                category_id: None,
                stock: 5,
                images: Vec::new(),
                rating: None,
            })
            .await
            .unwrap();

        db.carts().add(&user.id, &product.id, 1).await.unwrap();
        db.wishlists().add(&user.id, &product.id).await.unwrap();
        db.users().delete(&user.id).await.unwrap();

        assert!(db.carts().get(&user.id).await.unwrap().is_empty());
        assert!(db.wishlists().get(&user.id).await.unwrap().is_empty());

        // A user with orders is a financial record and cannot be deleted.
        let buyer = db.users().create(new_user("bob@example.com")).await.unwrap();
        db.orders()
            .create(
                &buyer.id,
                &[NewOrderLine {
                    product_id: product.id,
                    quantity: 1,
                }],
            )
            .await
            .unwrap();
        assert!(matches!(
            db.users().delete(&buyer.id).await,
            Err(StoreError::Conflict(_))
        ));

        assert!(matches!(
            db.users().delete("ghost").await,
            Err(StoreError::NotFound { .. })
        ));
    }
}
