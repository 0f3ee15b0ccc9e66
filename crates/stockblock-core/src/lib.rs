//! # stockblock-core: Pure Reservation Logic
//!
//! This crate holds the rules of inventory blocking as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockblock Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Callers (HTTP layer, CLI, scheduler)                   │   │
//! │  │    create block ──► promote block ──► reclaim sweep             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              stockblock-db (ReservationEngine)                  │   │
//! │  │         transactions, row locks, ledger + block store           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ asks                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ stockblock-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌─────────────┐  ┌───────────┐  ┌──────────┐  │   │
//! │  │   │   types   │  │ reservation │  │ validation│  │  clock   │  │   │
//! │  │   │ Item      │  │ grant_block │  │ item rules│  │ System   │  │   │
//! │  │   │ Block     │  │ promotable? │  │ quantity  │  │ Manual   │  │   │
//! │  │   └───────────┘  └─────────────┘  └───────────┘  └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Item, Block, BlockState and the operation request/response shapes
//! - [`reservation`] - Grant, promotion and reclamation decisions
//! - [`validation`] - Input validation
//! - [`clock`] - Injectable source of "now"
//! - [`error`] - Domain error types and the caller-facing [`ErrorKind`]
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use stockblock_core::reservation::grant_block;
//! use stockblock_core::{CoreError, Item};
//!
//! let now = Utc::now();
//! let item = Item {
//!     id: "item-1".into(),
//!     name: "Widget".into(),
//!     category: "widgets".into(),
//!     price_cents: 499,
//!     quantity: 5,
//!     created_at: now,
//!     updated_at: now,
//! };
//!
//! let grant = grant_block(&item, 3, now, Duration::hours(1)).unwrap();
//! assert_eq!(grant.remaining_quantity, 2);
//!
//! let err = grant_block(&item, 6, now, Duration::hours(1)).unwrap_err();
//! assert!(matches!(err, CoreError::InsufficientQuantity { available: 5, .. }));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod error;
pub mod reservation;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use reservation::{BlockGrant, ReservationConfig};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default lifetime of a temporary block, in seconds (one hour).
pub const DEFAULT_RESERVATION_WINDOW_SECS: i64 = 3600;
