//! # Domain Types
//!
//! Core domain types used throughout Stockblock.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐  1      * ┌─────────────────┐                     │
//! │  │      Item       │◄──────────│      Block      │                     │
//! │  │  ─────────────  │           │  ─────────────  │                     │
//! │  │  id (UUID)      │           │  id (UUID)      │                     │
//! │  │  name           │           │  item_id (FK)   │                     │
//! │  │  category       │           │  quantity > 0   │                     │
//! │  │  price_cents    │           │  is_permanent   │                     │
//! │  │  quantity >= 0  │           │  expires_at?    │                     │
//! │  └─────────────────┘           └─────────────────┘                     │
//! │                                                                         │
//! │  item.quantity + Σ active block.quantity == total stock                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Block Lifecycle
//! ```text
//!   create ──► ActiveTemporary ──promote──► Permanent   (terminal)
//!                    │
//!                    │ expires_at <= now
//!                    ▼
//!                 Expired ──reclaim──► (row deleted)    (terminal)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Item
// =============================================================================

/// A stock-keeping entity with a countable available quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Category label (descriptive only).
    pub category: String,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Quantity currently NOT withheld by any block. Never negative.
    pub quantity: i64,

    /// When the item was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the item (usually its quantity) last changed.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Checks whether `requested` units can be withheld right now.
    #[inline]
    pub fn can_block(&self, requested: i64) -> bool {
        requested > 0 && self.quantity >= requested
    }
}

/// Input for creating an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub category: String,
    pub price_cents: i64,
    /// Initial total stock.
    pub quantity: i64,
}

// =============================================================================
// Block
// =============================================================================

/// A reservation withholding quantity from one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning item.
    pub item_id: String,

    /// Quantity withheld from the item. Always positive.
    pub quantity: i64,

    /// Whether the block was promoted to a permanent allocation.
    pub is_permanent: bool,

    /// Expiry instant. `Some` while temporary, `None` once permanent.
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,

    /// When the block was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Block {
    /// Derives the lifecycle state of this block as of `now`.
    ///
    /// The boundary is inclusive: a block whose expiry equals `now` is
    /// already expired.
    pub fn state_at(&self, now: DateTime<Utc>) -> BlockState {
        if self.is_permanent {
            return BlockState::Permanent;
        }

        match self.expires_at {
            Some(expires_at) if expires_at <= now => BlockState::Expired,
            Some(_) => BlockState::ActiveTemporary,
            // A temporary block without expiry cannot be produced by the
            // engine and the schema rejects it; treat it as already expired
            // so it can never be promoted.
            None => BlockState::Expired,
        }
    }

    /// Shorthand for `state_at(now) == BlockState::Expired`.
    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == BlockState::Expired
    }
}

/// Lifecycle state of a block that still has a row.
///
/// `Reclaimed` is not represented: a reclaimed block has no row, and lookups
/// report it as not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BlockState {
    /// Temporary with a future expiry.
    ActiveTemporary,
    /// Temporary, expiry passed, waiting for the next sweep.
    Expired,
    /// Promoted; never expires and never reclaimed.
    Permanent,
}

// =============================================================================
// Operation Shapes
// =============================================================================

/// Request: withhold `quantity` units of `item_id` for one reservation window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlockRequest {
    pub item_id: String,
    pub quantity: i64,
}

/// Response to a successful [`CreateBlockRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlockResponse {
    pub block_id: String,
    pub quantity_blocked: i64,
    /// Item quantity left unreserved after this block.
    pub remaining_quantity: i64,
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
}

/// Request: make a temporary block permanent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PromoteBlockRequest {
    pub block_id: String,
}

/// Response to a successful [`PromoteBlockRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PromoteBlockResponse {
    pub block_id: String,
    pub quantity: i64,
    pub item_id: String,
}

/// Request: run one reclaim sweep. `now` defaults to the engine clock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReclaimRequest {
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub now: Option<DateTime<Utc>>,
}

/// Result of one reclaim sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReclaimResponse {
    pub reclaimed_count: u64,
}

// =============================================================================
// Unit Tests
// =============================================================================
