//! # Repository Module
//!
//! Database repository implementations for the storefront.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  API Handler                                                           │
//! │       │                                                                 │
//! │       │  db.products().list_filtered(&filter)                          │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── list_filtered(&self, filter)                                      │
//! │  ├── get(&self, id)                                                    │
//! │  ├── create(&self, new)                                                │
//! │  └── update(&self, id, patch)                                          │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • Easy to test (in-memory database per test)                          │
//! │  • SQL is isolated in one place                                        │
//! │  • Can swap database implementations                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog CRUD, filtered listing, bulk import
//! - [`category::CategoryRepository`] - Category tree with soft delete
//! - [`cart::CartRepository`] - Per-user cart lines (atomic upsert)
//! - [`order::OrderRepository`] - Orders and the status lifecycle
//! - [`user::UserRepository`] - Accounts and roles
//! - [`wishlist::WishlistRepository`] - Per-user wishlist

pub mod cart;
pub mod category;
pub mod order;
pub mod product;
pub mod user;
pub mod wishlist;
