//! # Reservation Rules
//!
//! The decisions behind the three engine operations, as pure functions of
//! the rows read under lock and the current instant.
//!
//! ## Where These Run
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stockblock-db engine (one transaction)                                │
//! │                                                                         │
//! │  lock + read item ──► grant_block(item, qty, now, window)  ← HERE      │
//! │                            │                                            │
//! │                            ├── Err → drop transaction (rollback)        │
//! │                            └── Ok(grant) → write quantity, insert block │
//! │                                                                         │
//! │  lock + read block ─► check_promotable(block, now)          ← HERE      │
//! │                                                                         │
//! │  lock expired blocks ► restorations(blocks)                 ← HERE      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keeping the rules here means the boundary cases (exact-fit grants,
//! `expires_at == now`) are tested without a database.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, CoreResult};
use crate::types::{Block, BlockState, Item};
use crate::validation::validate_block_quantity;
use crate::DEFAULT_RESERVATION_WINDOW_SECS;

// =============================================================================
// Configuration
// =============================================================================

/// Tunables for temporary blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationConfig {
    /// How long a temporary block lives before it may be reclaimed.
    /// Default: 1 hour.
    pub reservation_window: Duration,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        ReservationConfig {
            reservation_window: Duration::seconds(DEFAULT_RESERVATION_WINDOW_SECS),
        }
    }
}

impl ReservationConfig {
    /// Sets the reservation window.
    pub fn reservation_window(mut self, window: Duration) -> Self {
        self.reservation_window = window;
        self
    }
}

// =============================================================================
// Create
// =============================================================================

/// The outcome of an accepted block request, before it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockGrant {
    pub item_id: String,
    pub quantity: i64,
    /// The item's quantity once the grant is applied.
    pub remaining_quantity: i64,
    pub expires_at: DateTime<Utc>,
}

/// Decides whether `requested` units of `item` can be withheld.
///
/// `item` must have been read after its lock was taken. Grants are all or
/// nothing: there is no partial grant when stock is short.
pub fn grant_block(
    item: &Item,
    requested: i64,
    now: DateTime<Utc>,
    window: Duration,
) -> CoreResult<BlockGrant> {
    validate_block_quantity(requested)?;

    if !item.can_block(requested) {
        return Err(CoreError::InsufficientQuantity {
            item_id: item.id.clone(),
            available: item.quantity,
            requested,
        });
    }

    Ok(BlockGrant {
        item_id: item.id.clone(),
        quantity: requested,
        remaining_quantity: item.quantity - requested,
        expires_at: now + window,
    })
}

// =============================================================================
// Promote
// =============================================================================

/// Decides whether `block` may be promoted at `now`.
///
/// Expiry is judged from `expires_at`, not from whether a sweep has deleted
/// the row yet.
pub fn check_promotable(block: &Block, now: DateTime<Utc>) -> CoreResult<()> {
    match block.state_at(now) {
        BlockState::ActiveTemporary => Ok(()),
        BlockState::Permanent => Err(CoreError::AlreadyPermanent(block.id.clone())),
        BlockState::Expired => Err(CoreError::BlockExpired {
            block_id: block.id.clone(),
            expired_at: block.expires_at.unwrap_or(now),
        }),
    }
}

// =============================================================================
// Reclaim
// =============================================================================

/// Sums the quantity to hand back to each item for a batch of expired blocks.
///
/// Keyed by item id in ascending order, which is also the order the engine
/// locks items in.
pub fn restorations(expired: &[Block]) -> BTreeMap<String, i64> {
    let mut totals = BTreeMap::new();
    for block in expired {
        *totals.entry(block.item_id.clone()).or_insert(0) += block.quantity;
    }
    totals
}

// =============================================================================
// Unit Tests
// =============================================================================
