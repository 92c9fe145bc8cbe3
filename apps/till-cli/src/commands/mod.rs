//! # Commands Module
//!
//! Argument parsing and dispatch for the `till` binary.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (parsing, dispatch)
//! └── sale.rs     ◄─── create, list, get, delete, apply-coupon
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  till delete 4f1c… --retain-header                                      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Command::parse(args)   ── bad arguments ──► ApiError(VALIDATION_ERROR) │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Command::Delete { id, policy: Some(Retain) }                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  execute(command, &DbState, &AppConfig)                                 │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  sale::delete_sale(db, id, policy) ──► serde_json::Value ──► stdout     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod sale;

use serde::Serialize;
use till_core::{HeaderPolicy, SaleLine};

use crate::error::ApiError;
use crate::state::{AppConfig, DbState};

pub const USAGE: &str = "\
Till POS

Usage: till <COMMAND>

Commands:
  create --lines <JSON> [--coupon <NAME>]   Record a sale
  list [--date <YYYY-MM-DD>]                List sales, optionally for one day
  get <ID>                                  Show one sale with its lines
  delete <ID> [--retain-header]             Reverse a sale and restock
  apply-coupon <NAME>                       Check a coupon without selling
  help                                      Show this message

Environment:
  TILL_CONFIG, TILL_DB_PATH, TILL_MAX_CONNECTIONS, TILL_HEADER_POLICY, RUST_LOG";

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create {
        lines: Vec<SaleLine>,
        coupon: Option<String>,
    },
    List {
        date: Option<String>,
    },
    Get {
        id: String,
    },
    Delete {
        id: String,
        /// `Some` when overridden on the command line.
        policy: Option<HeaderPolicy>,
    },
    ApplyCoupon {
        name: String,
    },
    Help,
}

impl Command {
    /// Parses arguments (without the program name).
    pub fn parse(args: &[String]) -> Result<Command, ApiError> {
        let Some((name, rest)) = args.split_first() else {
            return Ok(Command::Help);
        };

        match name.as_str() {
            "create" => {
                let mut lines = None;
                let mut coupon = None;
                let mut i = 0;
                while i < rest.len() {
                    match rest[i].as_str() {
                        "--lines" | "-l" => {
                            lines = Some(sale::parse_lines(value_of(rest, i)?)?);
                            i += 1;
                        }
                        "--coupon" | "-c" => {
                            coupon = Some(value_of(rest, i)?.to_string());
                            i += 1;
                        }
                        other => return Err(unexpected(other)),
                    }
                    i += 1;
                }

                let lines = lines.ok_or_else(|| ApiError::validation("--lines is required"))?;
                Ok(Command::Create { lines, coupon })
            }

            "list" => {
                let mut date = None;
                let mut i = 0;
                while i < rest.len() {
                    match rest[i].as_str() {
                        "--date" | "-d" => {
                            date = Some(value_of(rest, i)?.to_string());
                            i += 1;
                        }
                        other => return Err(unexpected(other)),
                    }
                    i += 1;
                }
                Ok(Command::List { date })
            }

            "get" => match rest {
                [id] => Ok(Command::Get { id: id.clone() }),
                _ => Err(ApiError::validation("Usage: till get <ID>")),
            },

            "delete" => {
                let mut id = None;
                let mut policy = None;
                for arg in rest {
                    match arg.as_str() {
                        "--retain-header" => policy = Some(HeaderPolicy::Retain),
                        "--delete-header" => policy = Some(HeaderPolicy::Delete),
                        flag if flag.starts_with('-') => return Err(unexpected(flag)),
                        value if id.is_none() => id = Some(value.to_string()),
                        other => return Err(unexpected(other)),
                    }
                }

                let id = id.ok_or_else(|| ApiError::validation("Usage: till delete <ID>"))?;
                Ok(Command::Delete { id, policy })
            }

            "apply-coupon" => match rest {
                [name] => Ok(Command::ApplyCoupon { name: name.clone() }),
                _ => Err(ApiError::validation("Usage: till apply-coupon <NAME>")),
            },

            "help" | "--help" | "-h" => Ok(Command::Help),

            other => Err(ApiError::validation(format!("Unknown command '{other}'"))),
        }
    }
}

fn value_of(args: &[String], flag_at: usize) -> Result<&str, ApiError> {
    args.get(flag_at + 1)
        .map(String::as_str)
        .ok_or_else(|| ApiError::validation(format!("{} needs a value", args[flag_at])))
}

fn unexpected(arg: &str) -> ApiError {
    ApiError::validation(format!("Unexpected argument '{arg}'"))
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!(error = %e, "Response serialization failed");
        ApiError::internal()
    })
}

/// Runs a parsed command and returns its JSON response.
pub async fn execute(
    command: Command,
    db: &DbState,
    config: &AppConfig,
) -> Result<serde_json::Value, ApiError> {
    match command {
        Command::Create { lines, coupon } => {
            to_json(&sale::create_sale(db, &lines, coupon.as_deref()).await?)
        }
        Command::List { date } => to_json(&sale::list_sales(db, date.as_deref()).await?),
        Command::Get { id } => to_json(&sale::get_sale(db, &id).await?),
        Command::Delete { id, policy } => {
            let policy = policy.unwrap_or(config.sales.header_policy);
            to_json(&sale::delete_sale(db, &id, policy).await?)
        }
        Command::ApplyCoupon { name } => to_json(&sale::apply_coupon(db, &name).await?),
        Command::Help => Ok(serde_json::Value::String(USAGE.to_string())),
    }
}
