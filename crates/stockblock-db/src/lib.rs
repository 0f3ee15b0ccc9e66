//! # stockblock-db: Storage and Reservation Engine
//!
//! This crate owns the item ledger and block store in SQLite (via sqlx) and
//! the engine that changes them transactionally.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockblock Data Flow                             │
//! │                                                                         │
//! │  Caller (HTTP handler, CLI, scheduler)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 stockblock-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌───────────────┐   ┌──────────────┐     │   │
//! │  │   │ReservationEng.│   │  Repositories │   │  Migrations  │     │   │
//! │  │   │  (engine.rs)  │──►│   item.rs     │   │  (embedded)  │     │   │
//! │  │   │ create/promote│   │   block.rs    │   │ 001_init.sql │     │   │
//! │  │   │ reclaim       │   └───────┬───────┘   └──────────────┘     │   │
//! │  │   └───────┬───────┘           │                                 │   │
//! │  │           │ rules             ▼                                 │   │
//! │  │           ▼             Database (pool.rs)                      │   │
//! │  │     stockblock-core     SqlitePool                              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`engine`] - The three block operations
//! - [`repository`] - Item ledger and block store
//! - [`migrations`] - Embedded database migrations
//! - [`config`] - Environment-driven settings
//! - [`error`] - Database and engine error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockblock_db::{Database, DbConfig};
//! use stockblock_core::{NewItem, ReservationConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/stockblock.db")).await?;
//! let item = db.items().create(&NewItem { /* .. */ }).await?;
//!
//! let engine = db.engine(ReservationConfig::default());
//! let created = engine.create_temporary_block(&item.id, 3).await?;
//! engine.promote_to_permanent(&created.block_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, Settings};
pub use engine::ReservationEngine;
pub use error::{DbError, DbResult, EngineError, EngineResult};
pub use pool::{Database, DbConfig};

pub use repository::{BlockRepository, ItemRepository};

/// Installs the global tracing subscriber for binaries.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockblock=debug,sqlx=warn"));

    // Ignore the error if a subscriber is already installed (tests).
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
