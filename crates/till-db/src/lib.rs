//! # till-db: Database Layer and Sale Engine for Till POS
//!
//! SQLite storage through sqlx, the catalog/coupon/ledger repositories and
//! the Sale Engine that ties them together inside one atomic scope.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Data Flow                               │
//! │                                                                         │
//! │  till-cli command (sale create …)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     till-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  SaleEngine   │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │───►│  (engine.rs)  │    │  (embedded)  │  │   │
//! │  │   │               │    │       │       │    │              │  │   │
//! │  │   │ SqlitePool    │    │       ▼       │    │ 0001_init    │  │   │
//! │  │   │ Connection    │    │ Repositories  │    │              │  │   │
//! │  │   │ Management    │    │ product, coupon, ledger, category│  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL)                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage errors and the Sale Engine's error
//! - [`repository`] - Catalog, category, coupon and ledger access
//! - [`engine`] - Atomic create/reverse and the query layer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_core::SaleLine;
//! use till_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("till.db")).await?;
//!
//! let receipt = db
//!     .sales()
//!     .create_sale(&[SaleLine::new(product_id, 3, 1000)], None)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::{ReversalReceipt, SaleEngine, SaleReceipt};
pub use error::{DbError, DbResult, SaleError, SaleResult};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::coupon::CouponRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::product::ProductRepository;
