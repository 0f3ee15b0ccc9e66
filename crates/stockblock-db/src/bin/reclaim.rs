//! # Reclaim Sweep
//!
//! Runs one reclaim sweep and exits. Meant to be invoked by an external
//! scheduler (cron, systemd timer, Kubernetes CronJob).
//!
//! ## Usage
//! ```bash
//! STOCKBLOCK_DB_PATH=./stockblock.db cargo run -p stockblock-db --bin reclaim
//!
//! # Sweep as of a fixed instant (RFC 3339)
//! cargo run -p stockblock-db --bin reclaim -- --now 2026-01-01T00:00:00Z
//! ```
//!
//! Exits non-zero on an unknown argument or a `--now` without a valid value,
//! before touching the database. Also exits non-zero if the sweep fails;
//! nothing is committed in that case, so the next scheduled run simply
//! retries.

use std::env;

use chrono::{DateTime, Utc};
use stockblock_core::ReclaimRequest;
use stockblock_db::{Database, Settings};
use thiserror::Error;
use tracing::{error, info};

const HELP: &str = "\
Stockblock Reclaim Sweep

Usage: reclaim [OPTIONS]

Options:
  --now <RFC3339>    Sweep as of this instant (default: current time)
  -h, --help         Show this help message

Environment: STOCKBLOCK_DB_PATH, STOCKBLOCK_DB_MAX_CONNECTIONS,
             STOCKBLOCK_DB_BUSY_TIMEOUT_MS";

/// What the command line asked for.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Sweep { now: Option<DateTime<Utc>> },
    Help,
}

#[derive(Debug, Error)]
enum ArgsError {
    #[error("{0} requires a value")]
    MissingValue(&'static str),

    #[error("Invalid --now timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Unknown argument '{0}' (see --help)")]
    UnknownArgument(String),
}

/// Parses the arguments after the program name.
fn parse_args(args: &[String]) -> Result<Command, ArgsError> {
    let mut now = None;
    let mut args = args.iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--now" => {
                let value = args.next().ok_or(ArgsError::MissingValue("--now"))?;
                let parsed = DateTime::parse_from_rfc3339(value).map_err(|source| {
                    ArgsError::InvalidTimestamp {
                        value: value.clone(),
                        source,
                    }
                })?;
                now = Some(parsed.with_timezone(&Utc));
            }
            "--help" | "-h" => return Ok(Command::Help),
            other => return Err(ArgsError::UnknownArgument(other.to_string())),
        }
    }

    Ok(Command::Sweep { now })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    stockblock_db::init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let now = match parse_args(&args) {
        Ok(Command::Sweep { now }) => now,
        Ok(Command::Help) => {
            println!("{HELP}");
            return Ok(());
        }
        Err(e) => {
            error!(error = %e, "Invalid arguments");
            return Err(e.into());
        }
    };

    let settings = Settings::from_env()?;
    let db = Database::new(settings.db).await?;
    let engine = db.engine(settings.reservation);

    let result = engine.reclaim(&ReclaimRequest { now }).await;
    db.close().await;

    match result {
        Ok(response) => {
            info!(reclaimed = response.reclaimed_count, "Reclaim finished");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, retryable = e.is_retryable(), "Reclaim failed");
            Err(e.into())
        }
    }
}
