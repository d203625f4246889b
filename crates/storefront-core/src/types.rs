//! # Domain Types
//!
//! Core domain types used throughout the storefront.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Order       │   │      User       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  title          │   │  lines (frozen) │   │  email (unique) │       │
//! │  │  price_cents    │   │  total_cents    │   │  role           │       │
//! │  │  rating         │   │  status         │   │  password_hash  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Category      │   │   OrderStatus   │   │    CartLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  name (unique)  │   │  Pending        │   │  (user,product) │       │
//! │  │  parent_id      │   │  Shipped        │   │  quantity       │       │
//! │  │  (not self!)    │   │  Delivered      │   │  upsert target  │       │
//! │  └─────────────────┘   │  Cancelled      │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual Shapes: Entity vs View
//! Entities mirror table rows (`Product`, `CartLine`). Views are the joined
//! shapes the client renders (`CartItem` = cart line + product summary,
//! `OrderSummary` = order + customer name/email).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{StoreError, StoreResult};
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product available in the storefront catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display title shown in listings and product pages.
    pub title: String,

    /// Longer description, searched together with the title.
    pub description: String,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Category this product belongs to, if any.
    pub category_id: Option<String>,

    /// Units on hand. Informational; checkout does not decrement it.
    pub stock: i64,

    /// Ordered image URLs. The first entry is the cover image.
    pub images: Vec<String>,

    /// Average rating, 0.0-5.0 inclusive, absent until first review.
    pub rating: Option<f64>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the cover image URL, if the product has any images.
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Fields accepted when creating a product (admin operation).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

/// Partial update for a product. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub rating: Option<f64>,
}

/// A product joined with its category name, as shown in admin listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductWithCategory {
    pub product: Product,
    pub category_name: Option<String>,
}

// =============================================================================
// Category
// =============================================================================

/// A catalog category. Self-referential tree: `parent_id` points at another
/// category and must never point at the category itself.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,

    /// Unique display name.
    pub name: String,

    /// Optional parent category.
    pub parent_id: Option<String>,

    /// Soft-delete marker. Deleted categories stay on disk so historical
    /// references keep resolving.
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Cart
// =============================================================================

/// One (user, product) cart row. Repeat adds increment `quantity` in place.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartLine {
    pub user_id: String,
    pub product_id: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A cart line joined with the product summary the client renders.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartItem {
    pub product_id: String,
    pub title: String,
    /// Current unit price. The order snapshot is taken at checkout, not here.
    pub price_cents: i64,
    pub quantity: i64,
    /// Cover image URL, if the product has one.
    pub image: Option<String>,
}

impl CartItem {
    /// Line total at the current unit price.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.price_cents).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle of an order.
///
/// ## Transitions
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │   Pending ──► Shipped ──► Delivered (terminal)                          │
/// │      │           │                                                      │
/// │      └───────────┴──────► Cancelled (terminal)                          │
/// │                                                                         │
/// │   Repeating the current status is a no-op success.                      │
/// │   No backward edges.                                                    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// Every write path goes through this one enum; there is no unvalidated
/// status column anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum OrderStatus {
    /// Order placed, not yet handed to the carrier.
    Pending,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer. Terminal.
    Delivered,
    /// Called off before delivery. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// All known statuses, in lifecycle order.
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// The canonical column/display text for this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Parses client-supplied status text.
    ///
    /// Unknown text fails with [`StoreError::InvalidStatus`] before any I/O.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::types::OrderStatus;
    ///
    /// assert_eq!(OrderStatus::parse("Shipped").unwrap(), OrderStatus::Shipped);
    /// assert!(OrderStatus::parse("Bogus").is_err());
    /// ```
    pub fn parse(s: &str) -> StoreResult<Self> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Shipped" => Ok(OrderStatus::Shipped),
            "Delivered" => Ok(OrderStatus::Delivered),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(StoreError::InvalidStatus(other.to_string())),
        }
    }

    /// Whether `next` is reachable from this status.
    ///
    /// Repeating the current status is allowed (idempotent no-op).
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Shipped)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
                | (OrderStatus::Shipped, OrderStatus::Cancelled)
        )
    }

    /// Checks the transition, failing with [`StoreError::InvalidTransition`]
    /// when the edge does not exist.
    pub fn transition_to(self, next: OrderStatus) -> StoreResult<OrderStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StoreError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Terminal statuses accept no further transition.
    pub const fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order
// =============================================================================

/// One line of an order: the product reference plus the price frozen at
/// order-creation time.
///
/// ## Snapshot Pattern
/// `price_cents` here is decoupled from the live product price. Repricing a
/// product later must never change what an existing order says was paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in cents at the moment the order was created (frozen).
    pub price_cents: i64,
}

impl OrderLine {
    /// Line total at the frozen unit price.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.price_cents).multiply_quantity(self.quantity)
    }
}

/// Sums line totals into an order total.
///
/// ## Example
/// ```rust
/// use storefront_core::types::{order_total, OrderLine};
///
/// let lines = vec![
///     OrderLine { product_id: "a".into(), quantity: 2, price_cents: 50 },
///     OrderLine { product_id: "b".into(), quantity: 1, price_cents: 30 },
/// ];
/// assert_eq!(order_total(&lines).cents(), 130);
/// ```
pub fn order_total(lines: &[OrderLine]) -> Money {
    lines.iter().map(OrderLine::line_total).sum()
}

/// A persisted order. Lines are immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    /// Frozen `{product_id, quantity, price_cents}` snapshots.
    pub lines: Vec<OrderLine>,
    /// Σ line price × quantity, computed when the order was created.
    pub total_cents: i64,
    pub status: OrderStatus,
    /// Free text, e.g. "Unpaid" / "Paid".
    pub payment_status: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the order total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// An order joined with customer name/email for back-office listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderSummary {
    pub id: String,
    pub user_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub payment_status: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// One requested line when an order is created directly (admin operation).
/// The current product price is resolved and frozen server-side.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrderLine {
    pub product_id: String,
    pub quantity: i64,
}

/// Partial update for an order. A present `status` goes through
/// [`OrderStatus::parse`] and the transition check like every other write.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderPatch {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
}

// =============================================================================
// User & Roles
// =============================================================================

/// Access role. Stored lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Back-office access: catalog, orders, users.
    Admin,
    /// Regular customer.
    User,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// A registered account.
///
/// `password_hash` is produced and verified by the external auth
/// collaborator; it is never serialized out of this type.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub name: String,
    /// Stored lowercase; unique.
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: Role,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted at registration. The hash arrives pre-computed.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[ts(skip)]
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Partial update for a user. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    #[ts(skip)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

// =============================================================================
// Principal
// =============================================================================

/// The already-authenticated identity handed over by the auth middleware.
///
/// Token verification happens outside this workspace; by the time a request
/// reaches the core it carries a `Principal`, and role checks are the only
/// authorization logic left here.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
}

impl Principal {
    /// Fails with [`StoreError::Forbidden`] unless the principal is an admin.
    pub fn require_admin(&self) -> StoreResult<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(StoreError::Forbidden)
        }
    }

    /// Fails with [`StoreError::Forbidden`] unless the principal owns the
    /// resource or is an admin.
    pub fn require_self_or_admin(&self, owner_id: &str) -> StoreResult<()> {
        if self.user_id == owner_id || self.role == Role::Admin {
            Ok(())
        } else {
            Err(StoreError::Forbidden)
        }
    }
}

// =============================================================================
// Wishlist
// =============================================================================

/// One (user, product) wishlist row. Duplicate adds are rejected.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct WishlistEntry {
    pub user_id: String,
    pub product_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A wishlist entry joined with the product summary the client renders.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct WishlistItem {
    pub product_id: String,
    pub title: String,
    pub price_cents: i64,
    pub image: Option<String>,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
