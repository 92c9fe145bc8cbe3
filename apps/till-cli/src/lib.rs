//! # Till CLI Library
//!
//! Startup and dispatch for the `till` command-line front end.
//!
//! ## Module Organization
//! ```text
//! till_cli/
//! ├── lib.rs          ◄─── You are here (startup & run)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Database + Sale Engine
//! │   └── config.rs   ◄─── AppConfig (file + env)
//! ├── commands/
//! │   ├── mod.rs      ◄─── Argument parsing, dispatch
//! │   └── sale.rs     ◄─── Sale commands
//! └── error.rs        ◄─── API error type for commands
//! ```

pub mod commands;
pub mod error;
pub mod state;

use tracing::info;
use tracing_subscriber::EnvFilter;

use commands::Command;
use error::ApiError;
use state::{AppConfig, DbState};
use till_db::Database;

/// Runs one command end to end.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Command Startup                                   │
/// │                                                                         │
/// │  1. Parse Arguments ─────────────────────────────────────────────────► │
/// │     • Rejected before anything is opened                               │
/// │                                                                         │
/// │  2. Load Configuration ──────────────────────────────────────────────► │
/// │     • Defaults → till.toml → TILL_* env                                │
/// │                                                                         │
/// │  3. Connect to Database ─────────────────────────────────────────────► │
/// │     • SQLite with WAL mode, busy timeout                               │
/// │     • Run pending migrations                                           │
/// │                                                                         │
/// │  4. Execute ─────────────────────────────────────────────────────────► │
/// │     • Sale Engine call, JSON response                                  │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(args: &[String]) -> Result<serde_json::Value, ApiError> {
    let command = Command::parse(args)?;
    if command == Command::Help {
        return Ok(serde_json::Value::String(commands::USAGE.to_string()));
    }

    let config = AppConfig::load()?;
    let db_config = config.db_config()?;
    info!(path = %db_config.database_path.display(), "Opening database");

    let db = Database::new(db_config).await?;
    let state = DbState::new(db);

    let result = commands::execute(command, &state, &config).await;
    state.inner().close().await;
    result
}

/// Initializes the tracing subscriber.
///
/// Logs go to stderr so stdout carries only JSON.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=till_db=trace` - Show trace for the database crate only
/// - Default: INFO, DEBUG for till crates, WARN for sqlx
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,till=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
