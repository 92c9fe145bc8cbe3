//! # Validation Module
//!
//! Input validation for Till POS. Everything in here runs before the Sale
//! Engine opens its atomic scope, so a rejected request never takes the
//! store's write lock.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI command                                                  │
//! │  └── JSON deserialization of sale lines                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Sale Engine entry (THIS MODULE)                              │
//! │  ├── non-empty lines, quantity, price, coupon code                     │
//! │  └── date filter parsing                                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (inventory >= 0), CHECK (percentage BETWEEN 0 AND 100)      │
//! │  ├── UNIQUE coupon name                                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::types::SaleLine;
//! use till_core::validation::{validate_coupon_name, validate_sale_lines};
//!
//! validate_sale_lines(&[SaleLine::new("p-1", 2, 150)]).unwrap();
//! validate_coupon_name("SAVE10").unwrap();
//! ```

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::clock::DayRange;
use crate::error::ValidationError;
use crate::types::SaleLine;
use crate::{MAX_CATEGORY_NAME_LEN, MAX_COUPON_NAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a coupon code.
///
/// ## Rules
/// - Must not be empty
/// - At most 30 characters
///
/// Matching is exact and case-sensitive, so the code is not normalized here.
pub fn validate_coupon_name(name: &str) -> ValidationResult<()> {
    validate_name("coupon", name, MAX_COUPON_NAME_LEN)
}

/// Validates a category name (1 to 60 characters).
pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    validate_name("category", name, MAX_CATEGORY_NAME_LEN)
}

/// Validates a product name.
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Cola 330ml").is_ok());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name, 200)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity. Must be positive; stock bounds it later.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a stock level.
pub fn validate_inventory(units: i64) -> ValidationResult<()> {
    if units < 0 {
        return Err(ValidationError::OutOfRange {
            field: "inventory".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Sale Validators
// =============================================================================

/// Validates the lines of a new sale.
///
/// ## Rules
/// - At least one line
/// - Every line names a product
/// - Every quantity passes [`validate_quantity`]
/// - Every unit price passes [`validate_price_cents`]
///
/// Product existence and stock are checked later, inside the atomic scope.
pub fn validate_sale_lines(lines: &[SaleLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    for line in lines {
        if line.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "productId".to_string(),
            });
        }
        validate_quantity(line.quantity)?;
        validate_price_cents(line.unit_price_cents)?;
    }

    Ok(())
}

// =============================================================================
// Date Filter
// =============================================================================

/// Parses a listing date filter into the calendar date it names.
///
/// Accepts `YYYY-MM-DD`, or an RFC 3339 datetime whose calendar date in the
/// reference timezone (`offset`) is used.
///
/// ## Example
/// ```rust
/// use chrono::{FixedOffset, NaiveDate};
/// use till_core::validation::parse_date_filter;
///
/// let utc = FixedOffset::east_opt(0).unwrap();
/// assert_eq!(
///     parse_date_filter("2024-01-01", utc).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
/// );
/// assert!(parse_date_filter("yesterday", utc).is_err());
/// ```
pub fn parse_date_filter(input: &str, offset: FixedOffset) -> ValidationResult<NaiveDate> {
    let input = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(input)
        .map(|instant| instant.with_timezone(&offset).date_naive())
        .map_err(|_| ValidationError::InvalidFormat {
            field: "date".to_string(),
            reason: format!("'{input}' is not a valid ISO-8601 date"),
        })
}

/// Parses a date filter and returns the UTC range covering that day.
pub fn date_filter_range(input: &str, offset: FixedOffset) -> ValidationResult<DayRange> {
    let date = parse_date_filter(input, offset)?;

    DayRange::for_date(date, offset).ok_or_else(|| ValidationError::InvalidFormat {
        field: "date".to_string(),
        reason: format!("'{input}' is outside the supported date range"),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
