//! # Sale Engine
//!
//! Atomic creation and reversal of sales, plus the read-only query layer.
//!
//! ## Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_sale(lines, coupon?)                                            │
//! │                                                                         │
//! │  validate lines / coupon code            ── InvalidInput, no lock taken │
//! │       │                                                                 │
//! │  BEGIN IMMEDIATE ─────────────────────────────────────────────────┐    │
//! │       │  coupon::apply(name, now)        ── NotFound | Expired     │    │
//! │       │  price_sale(lines, coupon)       ── raw, discount, total   │    │
//! │       │  INSERT transactions header                                │    │
//! │       │  for each line, in caller order:                           │    │
//! │       │     SELECT product               ── NotFound(productId)    │    │
//! │       │     check_stock(quantity)        ── InsufficientStock      │    │
//! │       │     UPDATE inventory (guarded)                             │    │
//! │       │     INSERT transaction_contents                            │    │
//! │  COMMIT ◄─────────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! │  Any Err drops the sqlx transaction uncommitted: header, lines and      │
//! │  every inventory change of the attempt are rolled back together.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! `BEGIN IMMEDIATE` takes SQLite's write lock before the first read, so two
//! sales never interleave their read-check-write of the same product. The
//! second one waits (busy timeout), then reads the first one's committed
//! inventory. Isolation comes from the store; the engine holds no locks.
//!
//! ## Reverse
//! Restock every line, delete every line and, under [`HeaderPolicy::Delete`],
//! the header, all inside one `BEGIN IMMEDIATE` scope.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use till_core::pricing::price_sale;
use till_core::validation::{date_filter_range, validate_coupon_name, validate_sale_lines};
use till_core::{
    Clock, Coupon, CoreError, HeaderPolicy, Money, Sale, SaleLine, Transaction,
    TransactionContent, ValidationError,
};

use crate::error::{SaleError, SaleResult};
use crate::repository::{coupon, ledger, product};

/// Statement that opens every write scope.
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

// =============================================================================
// Receipts
// =============================================================================

/// Acknowledgement of a committed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub transaction_id: String,
    pub total: Money,
    pub discount: Money,
    pub coupon: Option<String>,
    pub line_count: usize,
    pub message: String,
}

/// Acknowledgement of a committed reversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReversalReceipt {
    pub transaction_id: String,
    /// Content rows restocked and deleted.
    pub restocked_lines: usize,
    pub header_deleted: bool,
    pub message: String,
}

// =============================================================================
// Engine
// =============================================================================

/// Creates, reverses and reads sales.
///
/// Cheap to clone: a pool handle and a shared clock.
#[derive(Clone)]
pub struct SaleEngine {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SaleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaleEngine")
            .field("pool", &self.pool)
            .field("now", &self.clock.now())
            .finish()
    }
}

impl SaleEngine {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        SaleEngine { pool, clock }
    }

    // -------------------------------------------------------------------------
    // Create
    // -------------------------------------------------------------------------

    /// Records a sale atomically.
    ///
    /// ## Arguments
    /// * `lines` - Product, quantity and unit price per line, in caller order
    /// * `coupon_code` - Optional coupon name (exact match)
    ///
    /// ## Returns
    /// * `Ok(SaleReceipt)` - Header, lines and inventory changes committed
    /// * `Err(SaleError)` - Nothing was written; `kind()` tells the caller why
    ///
    /// ## Example
    /// ```rust,ignore
    /// let receipt = db
    ///     .sales()
    ///     .create_sale(&[SaleLine::new(&cola.id, 3, 1000)], Some("SAVE10"))
    ///     .await?;
    /// assert_eq!(receipt.total.cents(), 2700);
    /// ```
    pub async fn create_sale(
        &self,
        lines: &[SaleLine],
        coupon_code: Option<&str>,
    ) -> SaleResult<SaleReceipt> {
        validate_sale_lines(lines)?;
        if let Some(name) = coupon_code {
            validate_coupon_name(name)?;
        }

        let result = self.create_in_scope(lines, coupon_code).await;

        match &result {
            Ok(receipt) => info!(
                transaction_id = %receipt.transaction_id,
                total = receipt.total.cents(),
                discount = receipt.discount.cents(),
                lines = receipt.line_count,
                "Sale committed"
            ),
            Err(err) if err.is_internal() => error!(error = %err, "Sale failed, rolled back"),
            Err(err) => warn!(kind = ?err.kind(), error = %err, "Sale rejected, rolled back"),
        }

        result
    }

    async fn create_in_scope(
        &self,
        lines: &[SaleLine],
        coupon_code: Option<&str>,
    ) -> SaleResult<SaleReceipt> {
        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;
        let now = self.clock.now();

        let coupon: Option<Coupon> = match coupon_code {
            Some(name) => Some(coupon::apply(&mut *tx, name, now).await?),
            None => None,
        };
        let totals = price_sale(lines, coupon.as_ref())?;

        let header = Transaction {
            id: Uuid::new_v4().to_string(),
            total_cents: totals.total.cents(),
            discount_cents: totals.discount.cents(),
            coupon: totals.coupon.clone(),
            transaction_date: now.with_timezone(&Utc),
        };
        ledger::insert_transaction(&mut *tx, &header).await?;

        for (line_no, line) in lines.iter().enumerate() {
            let product = product::find_by_id(&mut *tx, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            product.check_stock(line.quantity)?;

            let remaining = product.inventory - line.quantity;
            product::save_inventory(&mut *tx, &product.id, product.inventory, remaining).await?;

            let content = TransactionContent {
                id: Uuid::new_v4().to_string(),
                transaction_id: header.id.clone(),
                product_id: product.id.clone(),
                line_no: line_no as i64,
                price_cents: line.unit_price_cents,
                quantity: line.quantity,
            };
            ledger::insert_content(&mut *tx, &content).await?;

            debug!(
                transaction_id = %header.id,
                line_no,
                product_id = %product.id,
                quantity = line.quantity,
                remaining,
                "Line recorded"
            );
        }

        tx.commit().await?;

        Ok(SaleReceipt {
            transaction_id: header.id,
            total: totals.total,
            discount: totals.discount,
            coupon: totals.coupon,
            line_count: lines.len(),
            message: "Sale recorded successfully".to_string(),
        })
    }

    // -------------------------------------------------------------------------
    // Reverse
    // -------------------------------------------------------------------------

    /// Reverses a sale atomically: restocks every line and deletes the lines,
    /// and the header too under [`HeaderPolicy::Delete`].
    ///
    /// ## Returns
    /// * `Err(CoreError::TransactionNotFound)` - No such transaction
    /// * `Err(CoreError::ProductNotFound)` - A line references a missing
    ///   product; nothing is restocked
    pub async fn reverse_sale(
        &self,
        transaction_id: &str,
        policy: HeaderPolicy,
    ) -> SaleResult<ReversalReceipt> {
        if transaction_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "id".to_string(),
            }
            .into());
        }

        let result = self.reverse_in_scope(transaction_id, policy).await;

        match &result {
            Ok(receipt) => info!(
                transaction_id = %receipt.transaction_id,
                restocked_lines = receipt.restocked_lines,
                header_deleted = receipt.header_deleted,
                "Sale reversed"
            ),
            Err(err) if err.is_internal() => {
                error!(transaction_id = %transaction_id, error = %err, "Reversal failed, rolled back")
            }
            Err(err) => {
                warn!(transaction_id = %transaction_id, kind = ?err.kind(), error = %err, "Reversal rejected")
            }
        }

        result
    }

    async fn reverse_in_scope(
        &self,
        transaction_id: &str,
        policy: HeaderPolicy,
    ) -> SaleResult<ReversalReceipt> {
        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;

        let header = ledger::find_transaction(&mut *tx, transaction_id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;
        let contents = ledger::contents_for(&mut *tx, &header.id).await?;

        for content in &contents {
            let product = product::find_by_id(&mut *tx, &content.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(content.product_id.clone()))?;

            let restocked = product
                .inventory
                .checked_add(content.quantity)
                .ok_or_else(|| ValidationError::OutOfRange {
                    field: "inventory".to_string(),
                    min: 0,
                    max: i64::MAX,
                })?;
            product::save_inventory(&mut *tx, &product.id, product.inventory, restocked).await?;
            ledger::delete_content(&mut *tx, &content.id).await?;

            debug!(
                transaction_id = %header.id,
                line_no = content.line_no,
                product_id = %product.id,
                quantity = content.quantity,
                restocked,
                "Line restocked"
            );
        }

        let header_deleted = match policy {
            HeaderPolicy::Delete => ledger::delete_transaction(&mut *tx, &header.id).await? > 0,
            HeaderPolicy::Retain => false,
        };

        tx.commit().await?;

        Ok(ReversalReceipt {
            transaction_id: header.id,
            restocked_lines: contents.len(),
            header_deleted,
            message: "Sale reversed successfully".to_string(),
        })
    }

    // -------------------------------------------------------------------------
    // Query layer
    // -------------------------------------------------------------------------

    /// Lists sales, optionally restricted to one calendar day.
    ///
    /// ## Arguments
    /// * `date` - `YYYY-MM-DD` or an RFC 3339 datetime, read in the clock's
    ///   timezone. The whole day is included. A blank filter lists everything.
    ///
    /// ## Returns
    /// Sales ordered by date, each with its lines attached.
    pub async fn list_sales(&self, date: Option<&str>) -> SaleResult<Vec<Sale>> {
        let range = date
            .map(str::trim)
            .filter(|input| !input.is_empty())
            .map(|input| date_filter_range(input, self.clock.offset()))
            .transpose()?;

        let mut tx = self.pool.begin().await?;
        let sales = ledger::load_sales(&mut *tx, range).await?;
        tx.commit().await?;

        Ok(sales)
    }

    /// Loads one sale with its lines.
    pub async fn get_sale(&self, transaction_id: &str) -> SaleResult<Sale> {
        let mut tx = self.pool.begin().await?;
        let sale = ledger::load_sale(&mut *tx, transaction_id).await?;
        tx.commit().await?;

        sale.ok_or_else(|| SaleError::from(CoreError::TransactionNotFound(transaction_id.to_string())))
    }

    /// Checks a coupon against the engine clock without selling anything.
    pub async fn apply_coupon(&self, name: &str) -> SaleResult<Coupon> {
        validate_coupon_name(name)?;
        coupon::apply(&self.pool, name, self.clock.now()).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use chrono::{DateTime, NaiveDate, TimeZone};
    use till_core::{ErrorKind, FixedClock, Percentage, Product};

    struct Fixture {
        db: Database,
        engine: SaleEngine,
        cola: Product,
        chips: Product,
    }

    fn clock_at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> Arc<dyn Clock> {
        Arc::new(FixedClock::utc(Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()))
    }

    async fn fixture_at(clock: Arc<dyn Clock>) -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let category = db.categories().create("Shop").await.unwrap();
        let cola = db
            .products()
            .create("Cola 330ml", 1000, 5, &category.id)
            .await
            .unwrap();
        let chips = db
            .products()
            .create("Chips", 250, 10, &category.id)
            .await
            .unwrap();
        db.coupons()
            .create(
                "SAVE10",
                Percentage::new(10).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            )
            .await
            .unwrap();

        let engine = db.sales_with_clock(clock);
        Fixture {
            db,
            engine,
            cola,
            chips,
        }
    }

    async fn fixture() -> Fixture {
        fixture_at(clock_at(2024, 1, 1, 12, 0, 0)).await
    }

    async fn inventory(f: &Fixture, product: &Product) -> i64 {
        f.db.products().inventory(&product.id).await.unwrap()
    }

    // -------------------------------------------------------------------------
    // Create
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_decrements_inventory_and_records_ledger() {
        let f = fixture().await;

        let receipt = f
            .engine
            .create_sale(&[SaleLine::new(&f.cola.id, 3, 1000)], None)
            .await
            .unwrap();

        assert_eq!(receipt.total.cents(), 3000);
        assert!(receipt.discount.is_zero());
        assert_eq!(receipt.coupon, None);
        assert_eq!(receipt.line_count, 1);
        assert_eq!(inventory(&f, &f.cola).await, 2);

        let sale = f.engine.get_sale(&receipt.transaction_id).await.unwrap();
        assert_eq!(sale.transaction.total_cents, 3000);
        assert_eq!(sale.transaction.discount_cents, 0);
        assert_eq!(
            sale.transaction.transaction_date,
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(sale.contents.len(), 1);
        assert_eq!(sale.contents[0].quantity, 3);
        assert_eq!(sale.contents[0].price_cents, 1000);
    }

    #[tokio::test]
    async fn test_receipt_json_shape() {
        let f = fixture().await;

        let receipt = f
            .engine
            .create_sale(&[SaleLine::new(&f.cola.id, 3, 1000)], None)
            .await
            .unwrap();

        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["transactionId"], receipt.transaction_id.as_str());
        assert_eq!(json["total"], 3000);
        assert_eq!(json["discount"], 0);
        assert_eq!(json["lineCount"], 1);
        assert!(json["coupon"].is_null());
    }

    #[tokio::test]
    async fn test_second_sale_beyond_remaining_stock_fails() {
        let f = fixture().await;

        f.engine
            .create_sale(&[SaleLine::new(&f.cola.id, 3, 1000)], None)
            .await
            .unwrap();

        let err = f
            .engine
            .create_sale(&[SaleLine::new(&f.cola.id, 3, 1000)], None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert!(matches!(
            err,
            SaleError::Domain(CoreError::InsufficientStock { available: 2, requested: 3, .. })
        ));
        assert_eq!(inventory(&f, &f.cola).await, 2);
        assert_eq!(f.db.ledger().count_transactions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failure_on_later_line_rolls_back_earlier_lines() {
        let f = fixture().await;

        let err = f
            .engine
            .create_sale(
                &[
                    SaleLine::new(&f.chips.id, 4, 250),
                    SaleLine::new(&f.cola.id, 6, 1000),
                ],
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(inventory(&f, &f.chips).await, 10);
        assert_eq!(inventory(&f, &f.cola).await, 5);
        assert_eq!(f.db.ledger().count_transactions().await.unwrap(), 0);
        assert_eq!(f.db.ledger().count_contents().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_product_rolls_back() {
        let f = fixture().await;
        let missing = Uuid::new_v4().to_string();

        let err = f
            .engine
            .create_sale(
                &[
                    SaleLine::new(&f.chips.id, 1, 250),
                    SaleLine::new(&missing, 1, 100),
                ],
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(&err, SaleError::Domain(CoreError::ProductNotFound(id)) if *id == missing));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(inventory(&f, &f.chips).await, 10);
        assert_eq!(f.db.ledger().count_transactions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_same_product_on_two_lines_sees_own_decrement() {
        let f = fixture().await;

        let receipt = f
            .engine
            .create_sale(
                &[
                    SaleLine::new(&f.cola.id, 3, 1000),
                    SaleLine::new(&f.cola.id, 2, 900),
                ],
                None,
            )
            .await
            .unwrap();
        assert_eq!(receipt.total.cents(), 4800);
        assert_eq!(inventory(&f, &f.cola).await, 0);

        // 3 + 3 > 5 must fail even though each line alone fits
        let f = fixture().await;
        let err = f
            .engine
            .create_sale(
                &[
                    SaleLine::new(&f.cola.id, 3, 1000),
                    SaleLine::new(&f.cola.id, 3, 1000),
                ],
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(inventory(&f, &f.cola).await, 5);
    }

    #[tokio::test]
    async fn test_uses_caller_price_not_catalog_price() {
        let f = fixture().await;

        let receipt = f
            .engine
            .create_sale(&[SaleLine::new(&f.cola.id, 2, 777)], None)
            .await
            .unwrap();
        assert_eq!(receipt.total.cents(), 1554);

        let sale = f.engine.get_sale(&receipt.transaction_id).await.unwrap();
        assert_eq!(sale.contents[0].price_cents, 777);
    }

    #[tokio::test]
    async fn test_invalid_input_rejected_before_scope() {
        let f = fixture().await;

        let err = f.engine.create_sale(&[], None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = f
            .engine
            .create_sale(&[SaleLine::new(&f.cola.id, 0, 1000)], None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = f
            .engine
            .create_sale(&[SaleLine::new(&f.cola.id, 1, 1000)], Some(""))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        assert_eq!(inventory(&f, &f.cola).await, 5);
    }

    #[tokio::test]
    async fn test_large_quantity_and_many_lines() {
        let f = fixture().await;
        let category = f.db.categories().create("Bulk").await.unwrap();
        let nails = f
            .db
            .products()
            .create("Nails", 1, 5000, &category.id)
            .await
            .unwrap();

        let receipt = f
            .engine
            .create_sale(&[SaleLine::new(&nails.id, 1000, 1)], None)
            .await
            .unwrap();
        assert_eq!(receipt.total.cents(), 1000);
        assert_eq!(inventory(&f, &nails).await, 4000);

        let lines: Vec<SaleLine> = (0..101).map(|_| SaleLine::new(&nails.id, 1, 1)).collect();
        let receipt = f.engine.create_sale(&lines, None).await.unwrap();
        assert_eq!(receipt.line_count, 101);
        assert_eq!(inventory(&f, &nails).await, 3899);

        let sale = f.engine.get_sale(&receipt.transaction_id).await.unwrap();
        assert_eq!(sale.contents.len(), 101);
    }

    // -------------------------------------------------------------------------
    // Coupons
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_coupon_valid_until_end_of_expiration_day() {
        let f = fixture_at(clock_at(2024, 1, 1, 23, 59, 0)).await;

        let receipt = f
            .engine
            .create_sale(&[SaleLine::new(&f.cola.id, 1, 10_000)], Some("SAVE10"))
            .await
            .unwrap();

        assert_eq!(receipt.discount.cents(), 1_000);
        assert_eq!(receipt.total.cents(), 9_000);
        assert_eq!(receipt.coupon.as_deref(), Some("SAVE10"));

        let sale = f.engine.get_sale(&receipt.transaction_id).await.unwrap();
        assert_eq!(sale.transaction.coupon.as_deref(), Some("SAVE10"));
        assert_eq!(sale.transaction.discount_cents, 1_000);
    }

    #[tokio::test]
    async fn test_expired_coupon_rejects_whole_sale() {
        let f = fixture_at(clock_at(2024, 1, 2, 0, 0, 1)).await;

        let err = f
            .engine
            .create_sale(&[SaleLine::new(&f.cola.id, 1, 10_000)], Some("SAVE10"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Expired);
        assert_eq!(inventory(&f, &f.cola).await, 5);
        assert_eq!(f.db.ledger().count_transactions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_coupon_is_not_found() {
        let f = fixture().await;

        let err = f
            .engine
            .create_sale(&[SaleLine::new(&f.cola.id, 1, 100)], Some("NOPE"))
            .await
            .unwrap_err();

        assert!(matches!(&err, SaleError::Domain(CoreError::CouponNotFound(name)) if name == "NOPE"));
        assert_eq!(inventory(&f, &f.cola).await, 5);
    }

    #[tokio::test]
    async fn test_coupon_discount_rounds_half_up() {
        let f = fixture().await;
        f.db.coupons()
            .create(
                "FIFTEEN",
                Percentage::new(15).unwrap(),
                NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            )
            .await
            .unwrap();

        let receipt = f
            .engine
            .create_sale(&[SaleLine::new(&f.chips.id, 1, 999)], Some("FIFTEEN"))
            .await
            .unwrap();

        assert_eq!(receipt.discount.cents(), 150);
        assert_eq!(receipt.total.cents(), 849);
    }

    #[tokio::test]
    async fn test_apply_coupon_uses_engine_clock() {
        let valid = fixture_at(clock_at(2024, 1, 1, 23, 59, 59)).await;
        let coupon = valid.engine.apply_coupon("SAVE10").await.unwrap();
        assert_eq!(coupon.percentage.value(), 10);

        let expired = fixture_at(clock_at(2024, 1, 2, 0, 0, 0)).await;
        let err = expired.engine.apply_coupon("SAVE10").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Expired);
    }

    // -------------------------------------------------------------------------
    // Reverse
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_reverse_restores_inventory_and_deletes_ledger() {
        let f = fixture().await;

        let receipt = f
            .engine
            .create_sale(
                &[
                    SaleLine::new(&f.cola.id, 3, 1000),
                    SaleLine::new(&f.chips.id, 4, 250),
                ],
                None,
            )
            .await
            .unwrap();
        assert_eq!(inventory(&f, &f.cola).await, 2);
        assert_eq!(inventory(&f, &f.chips).await, 6);

        let reversal = f
            .engine
            .reverse_sale(&receipt.transaction_id, HeaderPolicy::Delete)
            .await
            .unwrap();

        assert_eq!(reversal.restocked_lines, 2);
        assert!(reversal.header_deleted);
        assert_eq!(inventory(&f, &f.cola).await, 5);
        assert_eq!(inventory(&f, &f.chips).await, 10);
        assert_eq!(f.db.ledger().count_contents().await.unwrap(), 0);

        let err = f.engine.get_sale(&receipt.transaction_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_reverse_with_retained_header() {
        let f = fixture().await;

        let receipt = f
            .engine
            .create_sale(&[SaleLine::new(&f.cola.id, 2, 1000)], None)
            .await
            .unwrap();

        let reversal = f
            .engine
            .reverse_sale(&receipt.transaction_id, HeaderPolicy::Retain)
            .await
            .unwrap();
        assert!(!reversal.header_deleted);
        assert_eq!(inventory(&f, &f.cola).await, 5);

        let sale = f.engine.get_sale(&receipt.transaction_id).await.unwrap();
        assert_eq!(sale.transaction.total_cents, 2000);
        assert!(sale.contents.is_empty());

        // Nothing left to restock the second time
        let again = f
            .engine
            .reverse_sale(&receipt.transaction_id, HeaderPolicy::Retain)
            .await
            .unwrap();
        assert_eq!(again.restocked_lines, 0);
        assert_eq!(inventory(&f, &f.cola).await, 5);
    }

    #[tokio::test]
    async fn test_reverse_unknown_transaction() {
        let f = fixture().await;

        let err = f
            .engine
            .reverse_sale(&Uuid::new_v4().to_string(), HeaderPolicy::Delete)
            .await
            .unwrap_err();
        assert!(matches!(err, SaleError::Domain(CoreError::TransactionNotFound(_))));

        let err = f.engine.reverse_sale("  ", HeaderPolicy::Delete).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_reverse_with_dangling_product_changes_nothing() {
        let f = fixture().await;

        let receipt = f
            .engine
            .create_sale(
                &[
                    SaleLine::new(&f.chips.id, 2, 250),
                    SaleLine::new(&f.cola.id, 1, 1000),
                ],
                None,
            )
            .await
            .unwrap();

        // Simulate a broken reference behind the schema's back
        let mut conn = f.db.pool().acquire().await.unwrap();
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(&f.cola.id)
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await
            .unwrap();
        drop(conn);

        let err = f
            .engine
            .reverse_sale(&receipt.transaction_id, HeaderPolicy::Delete)
            .await
            .unwrap_err();
        assert!(matches!(&err, SaleError::Domain(CoreError::ProductNotFound(id)) if *id == f.cola.id));

        // First line's restock was rolled back with the rest
        assert_eq!(inventory(&f, &f.chips).await, 8);
        let sale = f.engine.get_sale(&receipt.transaction_id).await.unwrap();
        assert_eq!(sale.contents.len(), 2);
    }

    // -------------------------------------------------------------------------
    // Query layer
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_list_sales_by_date() {
        let f = fixture_at(clock_at(2024, 1, 1, 9, 30, 0)).await;
        f.engine
            .create_sale(&[SaleLine::new(&f.cola.id, 1, 1000)], None)
            .await
            .unwrap();

        let next_day = f.db.sales_with_clock(clock_at(2024, 1, 2, 0, 0, 0));
        next_day
            .create_sale(&[SaleLine::new(&f.chips.id, 1, 250)], None)
            .await
            .unwrap();

        let jan_1 = f.engine.list_sales(Some("2024-01-01")).await.unwrap();
        assert_eq!(jan_1.len(), 1);
        assert_eq!(jan_1[0].contents[0].product_id, f.cola.id);

        let jan_2 = f.engine.list_sales(Some("2024-01-02")).await.unwrap();
        assert_eq!(jan_2.len(), 1);
        assert_eq!(jan_2[0].contents[0].product_id, f.chips.id);

        let all = f.engine.list_sales(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].transaction.transaction_date < all[1].transaction.transaction_date);

        assert!(f.engine.list_sales(Some("2024-02-01")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_sales_rejects_bad_date() {
        let f = fixture().await;
        let err = f.engine.list_sales(Some("not-a-date")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_list_sales_blank_date_lists_everything() {
        let f = fixture().await;
        f.engine
            .create_sale(&[SaleLine::new(&f.cola.id, 1, 1000)], None)
            .await
            .unwrap();

        assert_eq!(f.engine.list_sales(Some("")).await.unwrap().len(), 1);
        assert_eq!(f.engine.list_sales(Some("   ")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_sales_uses_clock_timezone() {
        // 2024-01-02T03:00Z is still Jan 1st in UTC-5
        let est = chrono::FixedOffset::west_opt(5 * 3600).unwrap();
        let instant: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 1, 2, 3, 0, 0).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(instant.with_timezone(&est)));

        let f = fixture_at(clock).await;
        f.engine
            .create_sale(&[SaleLine::new(&f.cola.id, 1, 1000)], None)
            .await
            .unwrap();

        assert_eq!(f.engine.list_sales(Some("2024-01-01")).await.unwrap().len(), 1);
        assert!(f.engine.list_sales(Some("2024-01-02")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_internal_errors_are_classified() {
        let f = fixture().await;
        f.db.close().await;

        let err = f
            .engine
            .create_sale(&[SaleLine::new(&f.cola.id, 1, 1000)], None)
            .await
            .unwrap_err();
        assert!(err.is_internal());
        assert!(matches!(err, SaleError::Storage(DbError::ConnectionFailed(_))));
    }

    // -------------------------------------------------------------------------
    // Concurrency (file-backed, several connections)
    // -------------------------------------------------------------------------

    async fn file_fixture(dir: &tempfile::TempDir, stock: i64) -> (Database, Product) {
        let config = DbConfig::new(dir.path().join("till.db")).max_connections(8);
        let db = Database::new(config).await.unwrap();
        let category = db.categories().create("Shop").await.unwrap();
        let product = db
            .products()
            .create("Cola 330ml", 1000, stock, &category.id)
            .await
            .unwrap();
        (db, product)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let (db, cola) = file_fixture(&dir, 5).await;

        let mut handles = Vec::new();
        for _ in 0..2 {
            let engine = db.sales();
            let lines = vec![SaleLine::new(&cola.id, 3, 1000)];
            handles.push(tokio::spawn(async move {
                engine.create_sale(&lines, None).await
            }));
        }

        let mut committed = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => committed += 1,
                Err(err) => {
                    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
                    rejected += 1;
                }
            }
        }

        assert_eq!((committed, rejected), (1, 1));
        assert_eq!(db.products().inventory(&cola.id).await.unwrap(), 2);
        assert_eq!(db.ledger().count_transactions().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_concurrent_single_unit_sales() {
        let dir = tempfile::tempdir().unwrap();
        let (db, cola) = file_fixture(&dir, 5).await;

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let engine = db.sales();
                let lines = vec![SaleLine::new(&cola.id, 1, 1000)];
                tokio::spawn(async move { engine.create_sale(&lines, None).await })
            })
            .collect();

        let mut committed = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                committed += 1;
            }
        }

        assert_eq!(committed, 5);
        assert_eq!(db.products().inventory(&cola.id).await.unwrap(), 0);
        assert_eq!(db.ledger().count_contents().await.unwrap(), 5);
    }
}
