//! # Error Types
//!
//! Domain-specific error types for stockblock-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockblock-core errors (this file)                                    │
//! │  ├── CoreError        - Reservation rule violations                    │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Caller-facing taxonomy                         │
//! │                                                                         │
//! │  stockblock-db errors (separate crate)                                 │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── EngineError      - CoreError | Unavailable(DbError)               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every rejection is an expected, recoverable condition. Variants carry the
//! ids and quantities a caller needs to react (e.g. "only 3 left").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification of every error the reservation engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Item or block absent.
    NotFound,
    /// Non-positive or otherwise malformed input.
    Validation,
    /// Request conflicts with current state (stock, permanence, expiry).
    Conflict,
    /// Storage failure. Nothing was committed; retrying from scratch is safe.
    Unavailable,
}

// =============================================================================
// Core Error
// =============================================================================

/// Reservation rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// No item with this id.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// No block with this id. Also what a reclaimed block looks like.
    #[error("Block not found: {0}")]
    BlockNotFound(String),

    /// Requested block quantity is zero or negative.
    #[error("Invalid quantity {requested}: must be a positive integer")]
    InvalidQuantity { requested: i64 },

    /// The item does not have enough unreserved quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Block request (qty: 5)
    ///      │
    ///      ▼
    /// Lock item, re-read: available=3
    ///      │
    ///      ▼
    /// InsufficientQuantity { available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Caller shows: "Only 3 left"
    /// ```
    #[error("Insufficient quantity for item {item_id}: available {available}, requested {requested}")]
    InsufficientQuantity {
        item_id: String,
        available: i64,
        requested: i64,
    },

    /// The block was already promoted; no state change happened.
    #[error("Block {0} is already permanent")]
    AlreadyPermanent(String),

    /// The block's expiry has passed, whether or not a sweep deleted it yet.
    #[error("Block {block_id} expired at {expired_at}")]
    BlockExpired {
        block_id: String,
        expired_at: DateTime<Utc>,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns the caller-facing classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ItemNotFound(_) | CoreError::BlockNotFound(_) => ErrorKind::NotFound,
            CoreError::InvalidQuantity { .. } | CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::InsufficientQuantity { .. }
            | CoreError::AlreadyPermanent(_)
            | CoreError::BlockExpired { .. } => ErrorKind::Conflict,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors for item fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
