//! # Item Repository
//!
//! The item ledger: one row per item, whose `quantity` is the amount not
//! withheld by any block.
//!
//! ## Key Operations
//! - Create and read items (pool-level)
//! - Lock-and-read, and quantity writes (transaction-scoped, engine only)

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockblock_core::validation::validate_new_item;
use stockblock_core::{Item, NewItem};

/// Repository for item database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ItemRepository::new(pool);
///
/// let item = repo.create(&NewItem { .. }).await?;
/// let same = repo.get_by_id(&item.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Validates and inserts a new item with a fresh id.
    ///
    /// The initial `quantity` is the item's total stock; no blocks exist yet.
    pub async fn create(&self, new_item: &NewItem) -> DbResult<Item> {
        validate_new_item(new_item)?;

        let now = Utc::now();
        let item = Item {
            id: generate_item_id(),
            name: new_item.name.trim().to_string(),
            category: new_item.category.trim().to_string(),
            price_cents: new_item.price_cents,
            quantity: new_item.quantity,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO items (id, name, category, price_cents, quantity, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.category)
        .bind(item.price_cents)
        .bind(item.quantity)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(item_id = %item.id, quantity = item.quantity, "Item created");
        Ok(item)
    }

    /// Gets an item by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Item))` - Item found
    /// * `Ok(None)` - Item not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, category, price_cents, quantity, created_at, updated_at
            FROM items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists items ordered by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, category, price_cents, quantity, created_at, updated_at
            FROM items
            ORDER BY name, id
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Counts all items.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================

    /// Locks the item and reads it.
    ///
    /// Takes the write lock with a no-op update so the returned quantity
    /// cannot change until the surrounding transaction ends.
    pub(crate) async fn get_for_update(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items
            SET quantity = quantity
            WHERE id = ?1
            RETURNING id, name, category, price_cents, quantity, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(item)
    }

    /// Overwrites the item's available quantity.
    ///
    /// The caller must hold the item's lock in the same transaction. A
    /// negative value is rejected by the schema.
    pub(crate) async fn set_quantity(
        conn: &mut SqliteConnection,
        id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET quantity = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        Ok(())
    }
}

/// Generates a new item ID.
pub fn generate_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
