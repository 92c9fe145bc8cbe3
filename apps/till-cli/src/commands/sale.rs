//! # Sale Commands
//!
//! The caller-facing operations. Each one validates its arguments, hands
//! them to the Sale Engine and returns a serializable response.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::DbState;
use till_core::{HeaderPolicy, Percentage, Sale, SaleLine};
use till_db::{ReversalReceipt, SaleReceipt};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSalesResponse {
    /// The date filter as given, if any.
    pub date: Option<String>,
    pub count: usize,
    pub sales: Vec<Sale>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponResponse {
    pub name: String,
    pub percentage: Percentage,
    pub expiration_date: NaiveDate,
    pub valid: bool,
}

/// Parses the `--lines` JSON array.
///
/// ## Example
/// ```text
/// [{"productId":"8c0e…","quantity":3,"unitPriceCents":1000}]
/// ```
pub fn parse_lines(raw: &str) -> Result<Vec<SaleLine>, ApiError> {
    serde_json::from_str(raw).map_err(|e| ApiError::validation(format!("Invalid lines: {e}")))
}

pub async fn create_sale(
    db: &DbState,
    lines: &[SaleLine],
    coupon: Option<&str>,
) -> Result<SaleReceipt, ApiError> {
    debug!(lines = lines.len(), coupon = ?coupon, "create_sale command");

    Ok(db.sales().create_sale(lines, coupon).await?)
}

pub async fn list_sales(db: &DbState, date: Option<&str>) -> Result<ListSalesResponse, ApiError> {
    debug!(date = ?date, "list_sales command");

    let sales = db.sales().list_sales(date).await?;
    Ok(ListSalesResponse {
        date: date.map(str::to_string),
        count: sales.len(),
        sales,
    })
}

pub async fn get_sale(db: &DbState, id: &str) -> Result<Sale, ApiError> {
    debug!(id = %id, "get_sale command");

    Ok(db.sales().get_sale(id).await?)
}

pub async fn delete_sale(
    db: &DbState,
    id: &str,
    policy: HeaderPolicy,
) -> Result<ReversalReceipt, ApiError> {
    debug!(id = %id, %policy, "delete_sale command");

    Ok(db.sales().reverse_sale(id, policy).await?)
}

pub async fn apply_coupon(db: &DbState, name: &str) -> Result<CouponResponse, ApiError> {
    debug!(name = %name, "apply_coupon command");

    let coupon = db.sales().apply_coupon(name).await?;
    Ok(CouponResponse {
        name: coupon.name,
        percentage: coupon.percentage,
        expiration_date: coupon.expiration_date,
        valid: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use till_core::FixedClock;
    use till_db::{Database, DbConfig};

    async fn setup() -> (DbState, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let category = db.categories().create("Shop").await.unwrap();
        let product = db
            .products()
            .create("Cola 330ml", 1000, 5, &category.id)
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

        let clock = FixedClock::utc(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
        (DbState::with_clock(db, Arc::new(clock)), product.id)
    }

    #[test]
    fn test_parse_lines() {
        let lines =
            parse_lines(r#"[{"productId":"p-1","quantity":2,"unitPriceCents":150}]"#).unwrap();
        assert_eq!(lines, vec![SaleLine::new("p-1", 2, 150)]);

        let err = parse_lines(r#"[{"productId":"p-1"}]"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_create_get_list_delete() {
        let (db, product_id) = setup().await;

        let receipt = create_sale(&db, &[SaleLine::new(&product_id, 3, 1000)], Some("SAVE10"))
            .await
            .unwrap();
        assert_eq!(receipt.total.cents(), 2700);

        let sale = get_sale(&db, &receipt.transaction_id).await.unwrap();
        assert_eq!(sale.contents.len(), 1);

        let listed = list_sales(&db, Some("2024-01-01")).await.unwrap();
        assert_eq!(listed.count, 1);

        let reversal = delete_sale(&db, &receipt.transaction_id, HeaderPolicy::Delete)
            .await
            .unwrap();
        assert!(reversal.header_deleted);
        assert_eq!(db.inner().products().inventory(&product_id).await.unwrap(), 5);

        let err = get_sale(&db, &receipt.transaction_id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_apply_coupon_response() {
        let (db, _) = setup().await;

        let coupon = apply_coupon(&db, "SAVE10").await.unwrap();
        assert!(coupon.valid);
        assert_eq!(coupon.percentage.value(), 10);

        let err = apply_coupon(&db, "MISSING").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_insufficient_stock_reaches_caller() {
        let (db, product_id) = setup().await;

        let err = create_sale(&db, &[SaleLine::new(&product_id, 6, 1000)], None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
    }
}
