//! # Reservation Engine
//!
//! The three operations that move quantity between an item and its blocks.
//! Each runs in exactly one transaction.
//!
//! ## Transaction Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_temporary_block(item_id, qty)                                  │
//! │    BEGIN                                                               │
//! │    lock + read item ──► grant_block ──► set_quantity ──► insert block  │
//! │    COMMIT                                                              │
//! │                                                                         │
//! │  promote_to_permanent(block_id)                                        │
//! │    BEGIN                                                               │
//! │    lock + read block ──► check_promotable ──► set_permanent            │
//! │    COMMIT                                                              │
//! │                                                                         │
//! │  reclaim_expired(now)                                                  │
//! │    BEGIN                                                               │
//! │    lock expired blocks ──► per item (sorted): lock, add back           │
//! │                        ──► delete blocks                               │
//! │    COMMIT                                                              │
//! │                                                                         │
//! │  Any error: the transaction is dropped and rolled back. No partial     │
//! │  effect is ever visible.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The rows each decision depends on, and the clock reading it is judged
//! against, are read only after their lock is held. Two concurrent requests
//! for the last units of an item cannot both see them as available, and a
//! block that expires while a promotion waits for the lock is rejected.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, EngineResult};
use crate::repository::{BlockRepository, ItemRepository};
use stockblock_core::reservation::{check_promotable, grant_block, restorations};
use stockblock_core::validation::validate_block_quantity;
use stockblock_core::{
    Clock, CoreError, CreateBlockRequest, CreateBlockResponse, PromoteBlockRequest,
    PromoteBlockResponse, ReclaimRequest, ReclaimResponse, ReservationConfig, SystemClock,
};

/// Executes block operations against the item ledger and block store.
///
/// Cheap to clone; clones share the pool and clock.
///
/// ## Usage
/// ```rust,ignore
/// let engine = db.engine(ReservationConfig::default());
///
/// let created = engine.create_temporary_block(&item_id, 3).await?;
/// engine.promote_to_permanent(&created.block_id).await?;
///
/// // periodically, from a scheduler
/// engine.reclaim_expired_now().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ReservationEngine {
    pool: SqlitePool,
    config: ReservationConfig,
    clock: Arc<dyn Clock>,
}

impl ReservationEngine {
    /// Creates an engine on the wall clock.
    pub fn new(pool: SqlitePool, config: ReservationConfig) -> Self {
        ReservationEngine::with_clock(pool, config, Arc::new(SystemClock))
    }

    /// Creates an engine reading "now" from `clock`.
    pub fn with_clock(pool: SqlitePool, config: ReservationConfig, clock: Arc<dyn Clock>) -> Self {
        ReservationEngine {
            pool,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &ReservationConfig {
        &self.config
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Withholds `quantity` units of an item for one reservation window.
    ///
    /// ## Errors
    /// * `InvalidQuantity` - `quantity <= 0` (checked before any I/O)
    /// * `ItemNotFound` - no such item
    /// * `InsufficientQuantity` - fewer than `quantity` units available
    /// * `Unavailable` - storage failure; nothing changed
    pub async fn create_temporary_block(
        &self,
        item_id: &str,
        quantity: i64,
    ) -> EngineResult<CreateBlockResponse> {
        validate_block_quantity(quantity)?;

        let mut tx = self.pool.begin().await?;

        let item = ItemRepository::get_for_update(&mut tx, item_id)
            .await?
            .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))?;

        // Read after the lock is held; the wait may have taken up to busy_timeout.
        let now = self.clock.now();

        let grant = match grant_block(&item, quantity, now, self.config.reservation_window) {
            Ok(grant) => grant,
            Err(err) => {
                warn!(
                    item_id = %item_id,
                    requested = quantity,
                    available = item.quantity,
                    "Block request rejected"
                );
                return Err(err.into());
            }
        };

        ItemRepository::set_quantity(&mut tx, &item.id, grant.remaining_quantity, now).await?;
        let block =
            BlockRepository::insert(&mut tx, &item.id, grant.quantity, grant.expires_at, now)
                .await?;

        tx.commit().await?;

        info!(
            block_id = %block.id,
            item_id = %item.id,
            quantity = grant.quantity,
            remaining = grant.remaining_quantity,
            expires_at = %grant.expires_at,
            "Temporary block created"
        );

        Ok(CreateBlockResponse {
            block_id: block.id,
            quantity_blocked: grant.quantity,
            remaining_quantity: grant.remaining_quantity,
            expires_at: grant.expires_at,
        })
    }

    /// Request-shaped form of [`create_temporary_block`](Self::create_temporary_block).
    pub async fn create(&self, request: &CreateBlockRequest) -> EngineResult<CreateBlockResponse> {
        self.create_temporary_block(&request.item_id, request.quantity)
            .await
    }

    // =========================================================================
    // Promote
    // =========================================================================

    /// Makes a temporary block permanent. Item quantity is not touched.
    ///
    /// ## Errors
    /// * `BlockNotFound` - no such block, or it was already reclaimed
    /// * `AlreadyPermanent` - promoted before; nothing changes
    /// * `BlockExpired` - `expires_at <= now`, even if no sweep has run yet
    /// * `Unavailable` - storage failure; nothing changed
    pub async fn promote_to_permanent(&self, block_id: &str) -> EngineResult<PromoteBlockResponse> {
        let mut tx = self.pool.begin().await?;

        let block = BlockRepository::get_for_update(&mut tx, block_id)
            .await?
            .ok_or_else(|| CoreError::BlockNotFound(block_id.to_string()))?;

        let now = self.clock.now();

        if let Err(err) = check_promotable(&block, now) {
            warn!(block_id = %block_id, reason = %err, "Promotion rejected");
            return Err(err.into());
        }

        BlockRepository::set_permanent(&mut tx, &block.id).await?;

        tx.commit().await?;

        info!(
            block_id = %block.id,
            item_id = %block.item_id,
            quantity = block.quantity,
            "Block promoted to permanent"
        );

        Ok(PromoteBlockResponse {
            block_id: block.id,
            quantity: block.quantity,
            item_id: block.item_id,
        })
    }

    /// Request-shaped form of [`promote_to_permanent`](Self::promote_to_permanent).
    pub async fn promote(&self, request: &PromoteBlockRequest) -> EngineResult<PromoteBlockResponse> {
        self.promote_to_permanent(&request.block_id).await
    }

    // =========================================================================
    // Reclaim
    // =========================================================================

    /// Returns the quantity of every temporary block with `expires_at <= now`
    /// to its item and deletes those blocks, all in one transaction.
    ///
    /// Idempotent: a second sweep at the same `now` reclaims nothing.
    /// Permanent blocks are never touched.
    pub async fn reclaim_expired(&self, now: DateTime<Utc>) -> EngineResult<ReclaimResponse> {
        let mut tx = self.pool.begin().await?;

        let expired = BlockRepository::select_expired_for_update(&mut tx, now).await?;
        if expired.is_empty() {
            tx.commit().await?;
            debug!(now = %now, "No expired blocks to reclaim");
            return Ok(ReclaimResponse { reclaimed_count: 0 });
        }

        // Items are locked in ascending id order.
        for (item_id, amount) in restorations(&expired) {
            let item = ItemRepository::get_for_update(&mut tx, &item_id)
                .await?
                .ok_or_else(|| DbError::not_found("Item", item_id.as_str()))?;

            ItemRepository::set_quantity(&mut tx, &item_id, item.quantity + amount, now).await?;
            debug!(item_id = %item_id, restored = amount, "Quantity returned to item");
        }

        let ids: Vec<String> = expired.iter().map(|block| block.id.clone()).collect();
        let deleted = BlockRepository::delete_many(&mut tx, &ids).await?;
        if deleted != ids.len() as u64 {
            return Err(DbError::TransactionFailed(format!(
                "expected to delete {} expired blocks, deleted {}",
                ids.len(),
                deleted
            ))
            .into());
        }

        tx.commit().await?;

        for block in &expired {
            warn!(
                block_id = %block.id,
                item_id = %block.item_id,
                quantity = block.quantity,
                "Reclaimed expired block"
            );
        }
        info!(reclaimed = deleted, now = %now, "Reclaim sweep complete");

        Ok(ReclaimResponse {
            reclaimed_count: deleted,
        })
    }

    /// Runs one sweep at the engine clock's current instant.
    pub async fn reclaim_expired_now(&self) -> EngineResult<ReclaimResponse> {
        self.reclaim_expired(self.clock.now()).await
    }

    /// Request-shaped form of [`reclaim_expired`](Self::reclaim_expired).
    pub async fn reclaim(&self, request: &ReclaimRequest) -> EngineResult<ReclaimResponse> {
        let now = request.now.unwrap_or_else(|| self.clock.now());
        self.reclaim_expired(now).await
    }
}
