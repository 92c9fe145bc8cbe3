//! # Database State
//!
//! Holds the open `Database` and the Sale Engine built on it.
//!
//! `Database` wraps a thread-safe `SqlitePool` and `SaleEngine` clones are
//! cheap, so commands share this by reference without locking.

use std::sync::Arc;

use till_core::{Clock, SystemClock};
use till_db::{Database, SaleEngine};

#[derive(Debug)]
pub struct DbState {
    db: Database,
    engine: SaleEngine,
}

impl DbState {
    /// Wraps a database, reading time from the system clock.
    pub fn new(db: Database) -> Self {
        DbState::with_clock(db, Arc::new(SystemClock))
    }

    /// Wraps a database with an explicit clock.
    pub fn with_clock(db: Database, clock: Arc<dyn Clock>) -> Self {
        let engine = db.sales_with_clock(clock);
        DbState { db, engine }
    }

    pub fn inner(&self) -> &Database {
        &self.db
    }

    pub fn sales(&self) -> &SaleEngine {
        &self.engine
    }
}
