//! # Ledger Repository
//!
//! Persisted sale headers (`transactions`) and their lines
//! (`transaction_contents`).
//!
//! ## Tables
//! ```text
//! transactions                      transaction_contents
//! ┌──────────────────┐              ┌──────────────────────────┐
//! │ id               │◄─────────────│ transaction_id (CASCADE) │
//! │ total_cents      │        1..*  │ line_no                  │
//! │ discount_cents   │              │ product_id  (RESTRICT)   │
//! │ coupon           │              │ price_cents, quantity    │
//! │ transaction_date │              └──────────────────────────┘
//! └──────────────────┘
//! ```
//!
//! Single-statement writes are executor-generic so the Sale Engine can run
//! them inside its scope. Multi-statement reads take a `&mut SqliteConnection`
//! so they can be pointed at an open transaction for a consistent snapshot.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use till_core::{DayRange, Sale, Transaction, TransactionContent};

use crate::error::DbResult;

// =============================================================================
// Writes
// =============================================================================

pub async fn insert_transaction<'e, E>(executor: E, header: &Transaction) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO transactions (id, total_cents, discount_cents, coupon, transaction_date)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&header.id)
    .bind(header.total_cents)
    .bind(header.discount_cents)
    .bind(&header.coupon)
    .bind(header.transaction_date)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn insert_content<'e, E>(executor: E, content: &TransactionContent) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO transaction_contents
            (id, transaction_id, product_id, line_no, price_cents, quantity)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&content.id)
    .bind(&content.transaction_id)
    .bind(&content.product_id)
    .bind(content.line_no)
    .bind(content.price_cents)
    .bind(content.quantity)
    .execute(executor)
    .await?;

    Ok(())
}

/// Deletes one content row. Returns rows affected.
pub async fn delete_content<'e, E>(executor: E, content_id: &str) -> DbResult<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM transaction_contents WHERE id = ?1")
        .bind(content_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Deletes a header (its remaining contents cascade). Returns rows affected.
pub async fn delete_transaction<'e, E>(executor: E, id: &str) -> DbResult<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM transactions WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Reads
// =============================================================================

pub async fn find_transaction<'e, E>(executor: E, id: &str) -> DbResult<Option<Transaction>>
where
    E: SqliteExecutor<'e>,
{
    let header = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT id, total_cents, discount_cents, coupon, transaction_date
        FROM transactions
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(header)
}

/// Contents of one transaction in line order.
pub async fn contents_for<'e, E>(executor: E, transaction_id: &str) -> DbResult<Vec<TransactionContent>>
where
    E: SqliteExecutor<'e>,
{
    let contents = sqlx::query_as::<_, TransactionContent>(
        r#"
        SELECT id, transaction_id, product_id, line_no, price_cents, quantity
        FROM transaction_contents
        WHERE transaction_id = ?1
        ORDER BY line_no
        "#,
    )
    .bind(transaction_id)
    .fetch_all(executor)
    .await?;

    Ok(contents)
}

/// Loads one sale (header + contents).
pub async fn load_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let Some(transaction) = find_transaction(&mut *conn, id).await? else {
        return Ok(None);
    };
    let contents = contents_for(&mut *conn, id).await?;

    Ok(Some(Sale {
        transaction,
        contents,
    }))
}

/// Loads every sale whose `transaction_date` falls in `range` (all sales when
/// `None`), ordered by date then id, contents attached in line order.
///
/// Two queries regardless of result size: headers, then all matching
/// contents grouped in memory.
pub async fn load_sales(conn: &mut SqliteConnection, range: Option<DayRange>) -> DbResult<Vec<Sale>> {
    let (start, end): (Option<DateTime<Utc>>, Option<DateTime<Utc>>) = match range {
        Some(range) => (Some(range.start), Some(range.end)),
        None => (None, None),
    };

    let headers = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT id, total_cents, discount_cents, coupon, transaction_date
        FROM transactions
        WHERE ?1 IS NULL OR (transaction_date >= ?1 AND transaction_date < ?2)
        ORDER BY transaction_date, id
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(&mut *conn)
    .await?;

    let contents = sqlx::query_as::<_, TransactionContent>(
        r#"
        SELECT c.id, c.transaction_id, c.product_id, c.line_no, c.price_cents, c.quantity
        FROM transaction_contents c
        JOIN transactions t ON t.id = c.transaction_id
        WHERE ?1 IS NULL OR (t.transaction_date >= ?1 AND t.transaction_date < ?2)
        ORDER BY c.transaction_id, c.line_no
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_transaction: HashMap<String, Vec<TransactionContent>> = HashMap::new();
    for content in contents {
        by_transaction
            .entry(content.transaction_id.clone())
            .or_default()
            .push(content);
    }

    let sales: Vec<Sale> = headers
        .into_iter()
        .map(|transaction| {
            let contents = by_transaction.remove(&transaction.id).unwrap_or_default();
            Sale {
                transaction,
                contents,
            }
        })
        .collect();

    debug!(count = sales.len(), filtered = range.is_some(), "Loaded sales");
    Ok(sales)
}

// =============================================================================
// Repository
// =============================================================================

/// Read access to the ledger outside a sale scope.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Loads one sale from a single read snapshot.
    pub async fn get_sale(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut tx = self.pool.begin().await?;
        let sale = load_sale(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(sale)
    }

    /// Lists sales from a single read snapshot.
    pub async fn list_sales(&self, range: Option<DayRange>) -> DbResult<Vec<Sale>> {
        let mut tx = self.pool.begin().await?;
        let sales = load_sales(&mut *tx, range).await?;
        tx.commit().await?;
        Ok(sales)
    }

    pub async fn count_transactions(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_contents(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transaction_contents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
