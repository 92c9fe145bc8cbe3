//! # Product Repository (Catalog Store)
//!
//! Database operations for products.
//!
//! The Sale Engine reaches the catalog through the free functions in this
//! module. They are generic over [`SqliteExecutor`], so the same lookup or
//! inventory write runs against the pool or against an open atomic scope:
//!
//! ```text
//! product::find_by_id(&pool, id)        ← plain read
//! product::find_by_id(&mut *tx, id)     ← read inside BEGIN IMMEDIATE scope,
//!                                          sees the scope's own writes
//! ```
//!
//! ## Guarded Inventory Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE products SET inventory = :new                                   │
//! │  WHERE id = :id AND inventory = :read                                   │
//! │                                                                         │
//! │  1 row  → the value we checked is the value we replaced                 │
//! │  0 rows → someone changed it since we read it: abort the scope          │
//! │                                                                         │
//! │  Under the scope's write lock the 0-row case does not happen.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use till_core::validation::{validate_inventory, validate_price_cents, validate_product_name};
use till_core::Product;

use crate::error::{DbError, DbResult};

// =============================================================================
// Executor-generic operations
// =============================================================================

/// Loads a product by id.
pub async fn find_by_id<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
where
    E: SqliteExecutor<'e>,
{
    let product = sqlx::query_as::<_, Product>(
        "SELECT id, name, price_cents, inventory, category_id FROM products WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(product)
}

/// Replaces a product's inventory, provided it still holds `expected`.
///
/// ## Returns
/// * `Ok(())` - Inventory is now `new_inventory`
/// * `Err(DbError::TransactionFailed)` - Row missing or changed since read
pub async fn save_inventory<'e, E>(
    executor: E,
    id: &str,
    expected: i64,
    new_inventory: i64,
) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %id, expected, new_inventory, "Saving inventory");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET inventory = ?3
        WHERE id = ?1 AND inventory = ?2
        "#,
    )
    .bind(id)
    .bind(expected)
    .bind(new_inventory)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::TransactionFailed(format!(
            "inventory of product {id} changed during sale"
        )));
    }

    Ok(())
}

/// Inserts a product row as given.
pub async fn insert<'e, E>(executor: E, product: &Product) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO products (id, name, price_cents, inventory, category_id)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(product.price_cents)
    .bind(product.inventory)
    .bind(&product.category_id)
    .execute(executor)
    .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog reads and writes outside a sale.
///
/// ## Usage
/// ```rust,ignore
/// let product = db.products().create("Cola 330ml", 150, 24, &category.id).await?;
/// let found = db.products().get_by_id(&product.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product with a fresh id.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - Category doesn't exist
    /// * `Err(DbError::Validation)` - Name, price or inventory invalid
    pub async fn create(
        &self,
        name: &str,
        price_cents: i64,
        inventory: i64,
        category_id: &str,
    ) -> DbResult<Product> {
        validate_product_name(name)
            .and_then(|_| validate_price_cents(price_cents))
            .and_then(|_| validate_inventory(inventory))?;

        let product = Product {
            id: generate_product_id(),
            name: name.trim().to_string(),
            price_cents,
            inventory,
            category_id: category_id.to_string(),
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");
        insert(&self.pool, &product).await?;

        Ok(product)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        find_by_id(&self.pool, id).await
    }

    /// Lists products ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, price_cents, inventory, category_id FROM products ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Current inventory of a product.
    pub async fn inventory(&self, id: &str) -> DbResult<i64> {
        find_by_id(&self.pool, id)
            .await?
            .map(|p| p.inventory)
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}
