//! # Coupon Repository (Coupon Validator)
//!
//! Coupon storage and the apply-time check.
//!
//! ## Apply Flow
//! ```text
//! apply("SAVE10", now)
//!      │
//!      ▼
//! SELECT … WHERE name = 'SAVE10'       (exact, case-sensitive)
//!      │
//!      ├── no row          → CouponNotFound("SAVE10")
//!      │
//!      ├── now's date in the reference timezone > expiration_date
//!      │                   → CouponExpired("SAVE10")
//!      │
//!      └── otherwise       → Ok(coupon)
//! ```
//!
//! Applying never mutates the coupon; coupons are reusable until they expire.

use chrono::{DateTime, FixedOffset, NaiveDate};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use till_core::validation::validate_coupon_name;
use till_core::{Coupon, CoreError, Percentage};

use crate::error::{DbError, DbResult, SaleResult};

// =============================================================================
// Executor-generic operations
// =============================================================================

/// Looks a coupon up by its exact name.
pub async fn find_by_name<'e, E>(executor: E, name: &str) -> DbResult<Option<Coupon>>
where
    E: SqliteExecutor<'e>,
{
    // SQLite's default BINARY collation keeps `=` case-sensitive
    let coupon = sqlx::query_as::<_, Coupon>(
        "SELECT id, name, percentage, expiration_date FROM coupons WHERE name = ?1",
    )
    .bind(name)
    .fetch_optional(executor)
    .await?;

    Ok(coupon)
}

/// Resolves a coupon for use at `now`.
///
/// ## Returns
/// * `Ok(Coupon)` - Coupon exists and its expiration day is not over
/// * `Err(CoreError::CouponNotFound)` - No coupon with that name
/// * `Err(CoreError::CouponExpired)` - Past the end of its expiration day
pub async fn apply<'e, E>(executor: E, name: &str, now: DateTime<FixedOffset>) -> SaleResult<Coupon>
where
    E: SqliteExecutor<'e>,
{
    let coupon = find_by_name(executor, name)
        .await?
        .ok_or_else(|| CoreError::CouponNotFound(name.to_string()))?;

    coupon.ensure_valid_at(now)?;

    debug!(coupon = %coupon.name, percentage = %coupon.percentage, "Coupon applied");
    Ok(coupon)
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Creates a coupon.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - A coupon with this name exists
    pub async fn create(
        &self,
        name: &str,
        percentage: Percentage,
        expiration_date: NaiveDate,
    ) -> DbResult<Coupon> {
        let name = name.trim();
        validate_coupon_name(name)?;

        let coupon = Coupon {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            percentage,
            expiration_date,
        };

        debug!(name = %coupon.name, %expiration_date, "Inserting coupon");

        sqlx::query(
            r#"
            INSERT INTO coupons (id, name, percentage, expiration_date)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&coupon.id)
        .bind(&coupon.name)
        .bind(i64::from(coupon.percentage))
        .bind(coupon.expiration_date)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, name),
            other => other,
        })?;

        Ok(coupon)
    }

    pub async fn find_by_name(&self, name: &str) -> DbResult<Option<Coupon>> {
        find_by_name(&self.pool, name).await
    }

    /// Resolves a coupon outside any sale (the caller-facing apply check).
    pub async fn apply(&self, name: &str, now: DateTime<FixedOffset>) -> SaleResult<Coupon> {
        apply(&self.pool, name, now).await
    }

    pub async fn list(&self) -> DbResult<Vec<Coupon>> {
        let coupons = sqlx::query_as::<_, Coupon>(
            "SELECT id, name, percentage, expiration_date FROM coupons ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(coupons)
    }
}
