//! # State Module
//!
//! Process-wide state for the CLI, split by concern.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  main.rs                                                                │
//! │    AppConfig::load()  ──► DbConfig ──► Database::new ──► DbState        │
//! │                                                                         │
//! │  ┌──────────────────────────┐       ┌──────────────────────────────┐   │
//! │  │        DbState           │       │         AppConfig            │   │
//! │  │                          │       │                              │   │
//! │  │  Database (SQLite pool)  │       │  [database] path, pool size  │   │
//! │  │  SaleEngine (+ clock)    │       │  [sales] header_policy       │   │
//! │  └──────────────────────────┘       └──────────────────────────────┘   │
//! │                                                                         │
//! │  Both are read-only once built; commands borrow them.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;

pub use config::{AppConfig, ConfigError, DatabaseSection, SalesSection};
pub use db::DbState;
