//! # storefront-core: Pure Business Logic for the Storefront
//!
//! This crate is the **heart** of the storefront. It contains all business
//! logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Storefront Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web Client (React)                           │   │
//! │  │    Catalog UI ──► Cart UI ──► Checkout UI ──► Orders UI        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ REST/JSON                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    API Handlers                                 │   │
//! │  │    list_products, add_to_cart, checkout, update_status, etc.   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ storefront-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   query   │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │  Filter   │  │   rules   │  │   │
//! │  │   │   Order   │  │  totals   │  │ Composer  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 storefront-db (Database Layer)                  │   │
//! │  │         SQLite queries, migrations, repositories, checkout      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Order, User, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`query`] - Filtered-listing query composer and placeholder builders
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::money::Money;
//! use storefront_core::query::ProductFilter;
//!
//! // Create money from cents (never from floats!)
//! let price = Money::from_cents(1099); // $10.99
//! assert_eq!(price.multiply_quantity(3).cents(), 3297);
//!
//! // Compose a filtered listing query
//! let q = ProductFilter {
//!     category_id: Some("cat-1".into()),
//!     ..Default::default()
//! }
//! .compose();
//! assert!(q.clause.starts_with("WHERE 1=1 AND category_id = ?1"));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod query;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use storefront_core::Money` instead of
// `use storefront_core::money::Money`

pub use error::{ErrorBody, StoreError, StoreResult, ValidationError};
pub use money::Money;
pub use query::{ComposedQuery, Page, ProductFilter, SqlParam};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default page number for listings.
///
/// ## Why a constant?
/// The fallback lives in one place: query-string parsing, the `Page` type
/// and the client pager all agree on where listing starts.
pub const DEFAULT_PAGE: i64 = 1;

/// Default page size for listings.
///
/// ## Business Reason
/// Ten products per page matches the client grid. Anything unparseable or
/// below 1 falls back here instead of erroring.
pub const DEFAULT_PAGE_SIZE: i64 = 10;
