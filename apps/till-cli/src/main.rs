//! # Till CLI Entry Point
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  till <command> [args]                                                  │
//! │                                                                         │
//! │  main.rs ────► logging, runtime, exit status                           │
//! │  lib.rs ─────► config, database, dispatch                              │
//! │                                                                         │
//! │  success: JSON on stdout, exit 0                                        │
//! │  failure: ApiError JSON on stdout, exit 1                               │
//! │  logs:    stderr                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    till_cli::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match till_cli::run(&args).await {
        Ok(serde_json::Value::String(text)) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Ok(value) => {
            print_json(&value);
            ExitCode::SUCCESS
        }
        Err(err) => {
            match serde_json::to_value(&err) {
                Ok(value) => print_json(&value),
                Err(_) => eprintln!("{err}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("Failed to render output: {e}"),
    }
}
