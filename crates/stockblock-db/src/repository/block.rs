//! # Block Repository
//!
//! The block store: reservations against one item each.
//!
//! ## Row Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  is_permanent │ expires_at        │ meaning                             │
//! │  ─────────────┼───────────────────┼──────────────────────────────────── │
//! │       0       │ future            │ active temporary block              │
//! │       0       │ <= now            │ expired, waiting for a sweep        │
//! │       1       │ NULL              │ permanent allocation                │
//! │  (no row)     │                   │ reclaimed, or never existed         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every existing row, temporary or permanent, still withholds its quantity
//! from the owning item.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockblock_core::Block;

/// Bound parameters per `DELETE ... IN (...)` statement.
const DELETE_CHUNK_SIZE: usize = 500;

/// Repository for block database operations.
#[derive(Debug, Clone)]
pub struct BlockRepository {
    pool: SqlitePool,
}

impl BlockRepository {
    /// Creates a new BlockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BlockRepository { pool }
    }

    /// Gets a block by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Block))` - Block exists (any state)
    /// * `Ok(None)` - Never existed, or already reclaimed
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Block>> {
        let block = sqlx::query_as::<_, Block>(
            r#"
            SELECT id, item_id, quantity, is_permanent, expires_at, created_at
            FROM blocks
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(block)
    }

    /// Lists every block held against an item, oldest first.
    pub async fn list_for_item(&self, item_id: &str) -> DbResult<Vec<Block>> {
        let blocks = sqlx::query_as::<_, Block>(
            r#"
            SELECT id, item_id, quantity, is_permanent, expires_at, created_at
            FROM blocks
            WHERE item_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(blocks)
    }

    /// Total quantity withheld from an item by all of its blocks.
    pub async fn withheld_quantity(&self, item_id: &str) -> DbResult<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM blocks WHERE item_id = ?1")
                .bind(item_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(total)
    }

    /// Counts temporary blocks whose expiry is at or before `now`.
    ///
    /// These are what the next sweep at `now` would reclaim.
    pub async fn count_expired(&self, now: DateTime<Utc>) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM blocks WHERE is_permanent = 0 AND expires_at <= ?1",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================

    /// Inserts a temporary block and returns it.
    pub(crate) async fn insert(
        conn: &mut SqliteConnection,
        item_id: &str,
        quantity: i64,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DbResult<Block> {
        let block = Block {
            id: generate_block_id(),
            item_id: item_id.to_string(),
            quantity,
            is_permanent: false,
            expires_at: Some(expires_at),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO blocks (id, item_id, quantity, is_permanent, expires_at, created_at)
            VALUES (?1, ?2, ?3, 0, ?4, ?5)
            "#,
        )
        .bind(&block.id)
        .bind(&block.item_id)
        .bind(block.quantity)
        .bind(block.expires_at)
        .bind(block.created_at)
        .execute(&mut *conn)
        .await?;

        debug!(block_id = %block.id, item_id = %item_id, quantity, "Block inserted");
        Ok(block)
    }

    /// Locks the block and reads it.
    pub(crate) async fn get_for_update(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Block>> {
        let block = sqlx::query_as::<_, Block>(
            r#"
            UPDATE blocks
            SET is_permanent = is_permanent
            WHERE id = ?1
            RETURNING id, item_id, quantity, is_permanent, expires_at, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(block)
    }

    /// Marks a temporary block permanent and clears its expiry.
    ///
    /// Only matches rows that are still temporary.
    pub(crate) async fn set_permanent(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE blocks
            SET is_permanent = 1, expires_at = NULL
            WHERE id = ?1 AND is_permanent = 0
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Temporary block", id));
        }

        Ok(())
    }

    /// Locks and returns every temporary block with `expires_at <= now`.
    pub(crate) async fn select_expired_for_update(
        conn: &mut SqliteConnection,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<Block>> {
        let blocks = sqlx::query_as::<_, Block>(
            r#"
            UPDATE blocks
            SET quantity = quantity
            WHERE is_permanent = 0 AND expires_at <= ?1
            RETURNING id, item_id, quantity, is_permanent, expires_at, created_at
            "#,
        )
        .bind(now)
        .fetch_all(&mut *conn)
        .await?;

        Ok(blocks)
    }

    /// Deletes blocks by id. Returns the number of rows removed.
    pub(crate) async fn delete_many(conn: &mut SqliteConnection, ids: &[String]) -> DbResult<u64> {
        let mut deleted = 0;

        for chunk in ids.chunks(DELETE_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("DELETE FROM blocks WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");

            deleted += builder.build().execute(&mut *conn).await?.rows_affected();
        }

        Ok(deleted)
    }
}

/// Generates a new block ID.
pub fn generate_block_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
