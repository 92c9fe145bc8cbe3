//! # Domain Types
//!
//! Core domain types used throughout Till POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog                     Coupons                Ledger              │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌──────────────────────┐  │
//! │  │    Product      │   │     Coupon      │   │     Transaction      │  │
//! │  │  ─────────────  │   │  ─────────────  │   │  ──────────────────  │  │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)           │  │
//! │  │  name           │   │  name (unique)  │   │  total_cents         │  │
//! │  │  price_cents    │   │  percentage     │   │  discount_cents      │  │
//! │  │  inventory ≥ 0  │   │  expiration_date│   │  coupon              │  │
//! │  │  category_id ───┼─┐ └─────────────────┘   │  transaction_date    │  │
//! │  └─────────────────┘ │                       └──────────┬───────────┘  │
//! │  ┌─────────────────┐ │                                  │ 1..*         │
//! │  │    Category     │◄┘                       ┌──────────▼───────────┐  │
//! │  │  id, name       │                         │  TransactionContent  │  │
//! │  └─────────────────┘                         │  line_no, price,     │  │
//! │                                              │  quantity, product_id│  │
//! │                                              └──────────────────────┘  │
//! │                                                                         │
//! │  Sale = Transaction + its contents in line order                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Percentage
// =============================================================================

/// A whole-number percentage in `0..=100`.
///
/// ## Example
/// ```rust
/// use till_core::types::Percentage;
///
/// assert_eq!(Percentage::new(15).unwrap().value(), 15);
/// assert!(Percentage::new(101).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Percentage(u8);

impl Percentage {
    pub const MAX: u8 = 100;

    /// Creates a percentage, rejecting values above 100.
    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if value > Self::MAX {
            return Err(ValidationError::OutOfRange {
                field: "percentage".to_string(),
                min: 0,
                max: Self::MAX as i64,
            });
        }
        Ok(Percentage(value))
    }

    #[inline]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Percentage {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        let narrowed = u8::try_from(value).map_err(|_| ValidationError::OutOfRange {
            field: "percentage".to_string(),
            min: 0,
            max: Self::MAX as i64,
        })?;
        Percentage::new(narrowed)
    }
}

impl From<Percentage> for i64 {
    fn from(pct: Percentage) -> Self {
        pct.0 as i64
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    /// Display name (at most 60 characters).
    pub name: String,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// The Sale Engine only reads `name` and `price_cents` and only writes
/// `inventory`. Everything else belongs to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, used in stock errors.
    pub name: String,

    /// Current catalog price in cents. Sales record their own unit price.
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub inventory: i64,

    pub category_id: String,
}

impl Product {
    /// Checks that `quantity` units can be taken from stock.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::types::Product;
    ///
    /// let product = Product {
    ///     id: "p-1".into(),
    ///     name: "Cola 330ml".into(),
    ///     price_cents: 150,
    ///     inventory: 2,
    ///     category_id: "c-1".into(),
    /// };
    /// assert!(product.check_stock(2).is_ok());
    /// assert!(product.check_stock(3).is_err());
    /// ```
    pub fn check_stock(&self, quantity: i64) -> CoreResult<()> {
        if quantity > self.inventory {
            return Err(CoreError::InsufficientStock {
                product: self.name.clone(),
                available: self.inventory,
                requested: quantity,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// A reusable percentage-off coupon, valid through the end of its
/// expiration day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: String,

    /// Unique, case-sensitive code (at most 30 characters).
    pub name: String,

    #[cfg_attr(feature = "sqlx", sqlx(try_from = "i64"))]
    pub percentage: Percentage,

    /// Last calendar day on which the coupon is accepted.
    pub expiration_date: NaiveDate,
}

impl Coupon {
    /// Day-granularity expiry check.
    ///
    /// ## Expiry Boundary
    /// ```text
    /// expiration_date = 2024-01-01 (reference timezone)
    ///
    ///   2024-01-01T00:00:00  ✅ valid
    ///   2024-01-01T23:59:59  ✅ valid   (still inside the expiration day)
    ///   2024-01-02T00:00:00  ❌ expired (now > endOfDay(expiration_date))
    /// ```
    ///
    /// `now` must already be expressed in the reference timezone; its
    /// calendar date is what gets compared.
    pub fn is_expired_at(&self, now: DateTime<FixedOffset>) -> bool {
        now.date_naive() > self.expiration_date
    }

    /// Returns `CouponExpired` when the coupon can no longer be applied.
    pub fn ensure_valid_at(&self, now: DateTime<FixedOffset>) -> CoreResult<()> {
        if self.is_expired_at(now) {
            return Err(CoreError::CouponExpired(self.name.clone()));
        }
        Ok(())
    }
}

// =============================================================================
// Transaction (ledger header)
// =============================================================================

/// A committed sale header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    /// Amount charged, after discount.
    pub total_cents: i64,
    /// Absolute discount amount (0 without coupon).
    pub discount_cents: i64,
    /// Name of the applied coupon, if any.
    pub coupon: Option<String>,
    pub transaction_date: DateTime<Utc>,
}

// =============================================================================
// Transaction Content (ledger line)
// =============================================================================

/// One sold line. `price_cents` is the unit price at sale time and does not
/// follow later catalog price changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct TransactionContent {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    /// 0-based position in the order the caller supplied the lines.
    pub line_no: i64,
    pub price_cents: i64,
    pub quantity: i64,
}

// =============================================================================
// Sale (header + lines)
// =============================================================================

/// A ledger entry as returned to callers: the header with its contents
/// attached in line order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub contents: Vec<TransactionContent>,
}

// =============================================================================
// Sale Line (caller input)
// =============================================================================

/// A caller-supplied line of a new sale.
///
/// The unit price comes from the caller, not the live catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl SaleLine {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        SaleLine {
            product_id: product_id.into(),
            quantity,
            unit_price_cents,
        }
    }

    /// `unit_price × quantity`, `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        Money::from_cents(self.unit_price_cents).checked_mul_quantity(self.quantity)
    }
}

// =============================================================================
// Header Policy
// =============================================================================

/// What a reversal does with the transaction header once its contents are
/// restocked and deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderPolicy {
    /// Delete the header together with its contents.
    #[default]
    Delete,
    /// Keep the header (original totals) and delete only the contents.
    Retain,
}

impl FromStr for HeaderPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delete" => Ok(HeaderPolicy::Delete),
            "retain" => Ok(HeaderPolicy::Retain),
            other => Err(ValidationError::InvalidFormat {
                field: "header_policy".to_string(),
                reason: format!("expected 'delete' or 'retain', got '{other}'"),
            }),
        }
    }
}

impl fmt::Display for HeaderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderPolicy::Delete => write!(f, "delete"),
            HeaderPolicy::Retain => write!(f, "retain"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
