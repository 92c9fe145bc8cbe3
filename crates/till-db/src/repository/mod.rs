//! # Repository Module
//!
//! Database access for Till POS, one module per table group.
//!
//! ## Two Ways In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Outside a sale                     Inside the Sale Engine scope        │
//! │  ───────────────                    ────────────────────────────        │
//! │  db.products().get_by_id(id)        product::find_by_id(&mut *tx, id)   │
//! │  db.coupons().apply(name, now)      coupon::apply(&mut *tx, name, now)  │
//! │  db.ledger().list_sales(range)      ledger::insert_content(&mut *tx, …) │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  &SqlitePool                        &mut SqliteConnection (open tx)     │
//! │                                                                         │
//! │  Both paths run the same free functions, generic over SqliteExecutor.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog and guarded inventory writes
//! - [`CategoryRepository`](category::CategoryRepository) - Product grouping
//! - [`CouponRepository`](coupon::CouponRepository) - Coupons and the expiry check
//! - [`LedgerRepository`](ledger::LedgerRepository) - Transactions and their contents

pub mod category;
pub mod coupon;
pub mod ledger;
pub mod product;
