//! # Error Types
//!
//! Domain-specific error types for storefront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  storefront-core errors (this file)                                    │
//! │  ├── StoreError       - Domain errors with HTTP status mapping         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  storefront-db errors (separate crate)                                 │
//! │  └── DbError          - Database classification, folds into StoreError │
//! │                                                                         │
//! │  Flow: ValidationError → StoreError → { status_code, ErrorBody }       │
//! │                                        consumed by the HTTP layer      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (entity name, ID, etc.)
//! 3. Errors are enum variants, never String
//! 4. Storage detail is logged internally and never leaked to clients

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use crate::types::OrderStatus;

// =============================================================================
// Store Error
// =============================================================================

/// Domain errors for every storefront operation.
///
/// Each variant maps to exactly one HTTP status code via [`StoreError::status_code`],
/// and to a client-safe message via [`StoreError::client_message`]. The HTTP
/// layer itself lives outside this workspace; it only consumes these two.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Input validation failed before any persistence call.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique-constraint style conflict (duplicate email, duplicate
    /// category name, duplicate wishlist pair).
    #[error("{0}")]
    Conflict(String),

    /// Checkout was attempted on a cart with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// An order status string that is not a known status.
    #[error("Invalid order status: {0}")]
    InvalidStatus(String),

    /// A known status that is not reachable from the current one.
    #[error("Order is {from}, cannot move to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// No authenticated principal (from the external auth collaborator).
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but not allowed to perform the operation.
    #[error("Forbidden")]
    Forbidden,

    /// Opaque underlying storage failure. Detail is for logs only.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl StoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// The HTTP status code this error maps to.
    ///
    /// ## Mapping
    /// ```text
    /// Validation / EmptyCart / InvalidStatus / InvalidTransition → 400
    /// Unauthorized                                               → 401
    /// Forbidden                                                  → 403
    /// NotFound                                                   → 404
    /// Conflict                                                   → 409
    /// Storage                                                    → 500
    /// ```
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Validation(_)
            | StoreError::EmptyCart
            | StoreError::InvalidStatus(_)
            | StoreError::InvalidTransition { .. } => 400,
            StoreError::Unauthorized => 401,
            StoreError::Forbidden => 403,
            StoreError::NotFound { .. } => 404,
            StoreError::Conflict(_) => 409,
            StoreError::Storage(_) => 500,
        }
    }

    /// The message safe to send to a client.
    ///
    /// Storage errors carry internal detail (SQL text, constraint names) that
    /// must stay in the logs, so they collapse to a generic message here.
    pub fn client_message(&self) -> String {
        match self {
            StoreError::Storage(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

// =============================================================================
// Error Body
// =============================================================================

/// The structured payload every failed request serializes to.
///
/// ## Example
/// ```json
/// { "message": "Cart is empty" }
/// ```
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ErrorBody {
    pub message: String,
}

impl From<&StoreError> for ErrorBody {
    fn from(err: &StoreError) -> Self {
        ErrorBody {
            message: err.client_message(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any I/O runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A self-referential field points back at its own record
    /// (a category set as its own parent).
    #[error("{field} must not reference the record itself")]
    SelfReference { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
