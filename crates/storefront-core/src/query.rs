//! # Query Composer
//!
//! Builds the parameterized `WHERE`/`ORDER BY`/`LIMIT` tail for filtered
//! product listings. Pure string + parameter-list construction; the database
//! crate binds the parameters and runs the query.
//!
//! ## Composition Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Filters are applied in one fixed order, each claiming the next         │
//! │  unused placeholder position:                                           │
//! │                                                                         │
//! │    1. search       →  AND (title LIKE ?n OR description LIKE ?n)       │
//! │    2. category     →  AND category_id = ?n                             │
//! │    3. price range  →  AND price_cents BETWEEN ?n AND ?n+1              │
//! │       (both bounds or nothing; a partial range is ignored)             │
//! │    4. min rating   →  AND rating >= ?n                                 │
//! │    5. pagination   →  ORDER BY id ASC LIMIT ?n OFFSET ?n+1  (always)   │
//! │                                                                         │
//! │  Absent filters contribute zero clauses and zero parameters.           │
//! │  Placeholders are numbered (?1, ?2, ...) so the search text binds      │
//! │  once even though its position appears twice.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use storefront_core::query::{ProductFilter, SqlParam};
//!
//! let filter = ProductFilter {
//!     search: Some("shoe".into()),
//!     min_price_cents: Some(1000),
//!     max_price_cents: Some(5000),
//!     ..Default::default()
//! };
//! let q = filter.compose();
//!
//! assert_eq!(
//!     q.clause,
//!     "WHERE 1=1 AND (title LIKE ?1 OR description LIKE ?1) \
//!      AND price_cents BETWEEN ?2 AND ?3 \
//!      ORDER BY id ASC LIMIT ?4 OFFSET ?5"
//! );
//! assert_eq!(q.params[0], SqlParam::Text("%shoe%".into()));
//! ```

use crate::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE};

// =============================================================================
// Parameters
// =============================================================================

/// A single positional SQL parameter.
///
/// The composer never splices values into the query text; everything the
/// client supplies travels through this list and gets bound by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
    Real(f64),
}

/// The composed query tail: clause text plus the matching parameter list.
///
/// `params[i]` binds placeholder `?i+1`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedQuery {
    pub clause: String,
    pub params: Vec<SqlParam>,
}

// =============================================================================
// Pagination
// =============================================================================

/// A validated page request.
///
/// Fields are private so every `Page` in the system went through the same
/// fallback rules: anything below 1 (or unparseable) becomes the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: i64,
    size: i64,
}

impl Page {
    /// Builds a page from already-numeric inputs. Each value falls back to
    /// its default independently when below 1.
    pub fn new(number: i64, size: i64) -> Self {
        Self {
            number: if number < 1 { DEFAULT_PAGE } else { number },
            size: if size < 1 { DEFAULT_PAGE_SIZE } else { size },
        }
    }

    /// Parses raw query-string text. Absent or non-numeric values fall back
    /// to the defaults (page 1, size 10) rather than erroring.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::query::Page;
    ///
    /// assert_eq!(Page::parse(Some("3"), Some("25")), Page::new(3, 25));
    /// assert_eq!(Page::parse(Some("abc"), None), Page::default());
    /// ```
    pub fn parse(page: Option<&str>, page_size: Option<&str>) -> Self {
        let number = page
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_PAGE);
        let size = page_size
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self::new(number, size)
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    /// Row cap for the query.
    pub fn limit(&self) -> i64 {
        self.size
    }

    /// Rows skipped before the first returned row.
    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.size
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: DEFAULT_PAGE,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

// =============================================================================
// Product Filter
// =============================================================================

/// Optional filters for a product listing. Every field is independent;
/// `Default` means "no filters, first page of ten".
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring match against title OR description.
    /// An empty string counts as absent.
    pub search: Option<String>,
    pub category_id: Option<String>,
    /// Lower price bound. Only applied when `max_price_cents` is also set.
    pub min_price_cents: Option<i64>,
    /// Upper price bound. Only applied when `min_price_cents` is also set.
    pub max_price_cents: Option<i64>,
    /// Keep products rated at least this value.
    pub min_rating: Option<f64>,
    pub page: Page,
}

impl ProductFilter {
    /// Composes the `WHERE ... ORDER BY ... LIMIT ... OFFSET ...` tail for
    /// this filter set.
    ///
    /// The clause always starts at `WHERE 1=1` so filter clauses can append
    /// uniformly, and always ends with deterministic ordering + pagination.
    pub fn compose(&self) -> ComposedQuery {
        let mut clause = String::from("WHERE 1=1");
        let mut params: Vec<SqlParam> = Vec::new();

        if let Some(search) = self.search.as_deref() {
            if !search.is_empty() {
                params.push(SqlParam::Text(format!("%{search}%")));
                let n = params.len();
                clause.push_str(&format!(
                    " AND (title LIKE ?{n} OR description LIKE ?{n})"
                ));
            }
        }

        if let Some(category_id) = self.category_id.as_deref() {
            if !category_id.is_empty() {
                params.push(SqlParam::Text(category_id.to_string()));
                let n = params.len();
                clause.push_str(&format!(" AND category_id = ?{n}"));
            }
        }

        // Both bounds or nothing. A partial range is ignored.
        if let (Some(min), Some(max)) = (self.min_price_cents, self.max_price_cents) {
            params.push(SqlParam::Int(min));
            let lo = params.len();
            params.push(SqlParam::Int(max));
            let hi = params.len();
            clause.push_str(&format!(" AND price_cents BETWEEN ?{lo} AND ?{hi}"));
        }

        if let Some(rating) = self.min_rating {
            params.push(SqlParam::Real(rating));
            let n = params.len();
            clause.push_str(&format!(" AND rating >= ?{n}"));
        }

        // Pagination claims the last two positions, always.
        params.push(SqlParam::Int(self.page.limit()));
        let l = params.len();
        params.push(SqlParam::Int(self.page.offset()));
        let o = params.len();
        clause.push_str(&format!(" ORDER BY id ASC LIMIT ?{l} OFFSET ?{o}"));

        ComposedQuery { clause, params }
    }
}

// =============================================================================
// Placeholder Builders
// =============================================================================

/// Builds a flat numbered placeholder list: `?1, ?2, ?3`.
///
/// Used for `IN (...)` membership checks.
pub fn placeholder_list(count: usize) -> String {
    let mut out = String::new();
    for i in 1..=count {
        if i > 1 {
            out.push_str(", ");
        }
        out.push('?');
        out.push_str(&i.to_string());
    }
    out
}

/// Builds numbered placeholder groups for a multi-row `VALUES` insert:
/// `(?1, ?2), (?3, ?4)` for 2 columns × 2 rows.
///
/// Placeholder count is always `columns * rows`, matching the flattened
/// bind list.
pub fn placeholder_groups(columns: usize, rows: usize) -> String {
    if columns == 0 || rows == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut n = 1;
    for row in 0..rows {
        if row > 0 {
            out.push_str(", ");
        }
        out.push('(');
        for col in 0..columns {
            if col > 0 {
                out.push_str(", ");
            }
            out.push('?');
            out.push_str(&n.to_string());
            n += 1;
        }
        out.push(')');
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================
