//! Concurrent engine calls against a file-backed store with a multi-connection pool.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::{Sqlite, Transaction};
use stockblock_core::{Clock, CoreError, ErrorKind, ManualClock, NewItem, ReservationConfig};
use stockblock_db::{Database, DbConfig, EngineError, ReservationEngine};
use tempfile::TempDir;

async fn file_db(max_connections: u32, busy_timeout: Duration) -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("stockblock.db"))
        .max_connections(max_connections)
        .busy_timeout(busy_timeout);
    let db = Database::new(config).await.unwrap();
    (dir, db)
}

async fn item_with(db: &Database, quantity: i64) -> String {
    db.items()
        .create(&NewItem {
            name: "Limited Edition".to_string(),
            category: "collectibles".to_string(),
            price_cents: 9900,
            quantity,
        })
        .await
        .unwrap()
        .id
}

async fn quantity_of(db: &Database, item_id: &str) -> i64 {
    db.items().get_by_id(item_id).await.unwrap().unwrap().quantity
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

fn engine_on(db: &Database, clock: &ManualClock) -> ReservationEngine {
    db.engine_with_clock(ReservationConfig::default(), Arc::new(clock.clone()))
}

/// Takes the database write lock from a second connection and keeps it until
/// the returned transaction is rolled back.
async fn hold_write_lock(db: &Database, item_id: &str) -> Transaction<'static, Sqlite> {
    let mut holder = db.pool().begin().await.unwrap();
    sqlx::query("UPDATE items SET quantity = quantity WHERE id = ?1")
        .bind(item_id)
        .execute(&mut *holder)
        .await
        .unwrap();
    holder
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_requests_for_last_units() {
    let (_dir, db) = file_db(4, Duration::from_secs(5)).await;
    let item_id = item_with(&db, 5).await;
    let engine = db.engine(ReservationConfig::default());

    let spawn = |engine: ReservationEngine, item_id: String| {
        tokio::spawn(async move { engine.create_temporary_block(&item_id, 3).await })
    };
    let first = spawn(engine.clone(), item_id.clone());
    let second = spawn(engine.clone(), item_id.clone());

    let results = vec![first.await.unwrap(), second.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let failure = results.into_iter().find_map(Result::err).unwrap();
    match failure {
        EngineError::Rejected(CoreError::InsufficientQuantity {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, 2);
            assert_eq!(requested, 3);
        }
        other => panic!("expected InsufficientQuantity, got {other:?}"),
    }

    assert_eq!(quantity_of(&db, &item_id).await, 2);
    assert_eq!(db.blocks().withheld_quantity(&item_id).await.unwrap(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_single_unit_requests_never_oversell() {
    let (_dir, db) = file_db(4, Duration::from_secs(10)).await;
    let item_id = item_with(&db, 5).await;
    let engine = db.engine(ReservationConfig::default());

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let engine = engine.clone();
            let item_id = item_id.clone();
            tokio::spawn(async move { engine.create_temporary_block(&item_id, 1).await })
        })
        .collect();

    let mut granted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::Conflict),
        }
    }

    assert_eq!(granted, 5);
    assert_eq!(quantity_of(&db, &item_id).await, 0);
    assert_eq!(db.blocks().withheld_quantity(&item_id).await.unwrap(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_lock_timeout_is_unavailable_and_changes_nothing() {
    let (_dir, db) = file_db(2, Duration::from_millis(100)).await;
    let item_id = item_with(&db, 5).await;
    let engine = db.engine(ReservationConfig::default());

    let holder = hold_write_lock(&db, &item_id).await;

    let err = engine.create_temporary_block(&item_id, 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(err.is_retryable());

    holder.rollback().await.unwrap();

    assert_eq!(quantity_of(&db, &item_id).await, 5);
    assert!(db.blocks().list_for_item(&item_id).await.unwrap().is_empty());

    // Retrying from scratch succeeds once the lock is released.
    let created = engine.create_temporary_block(&item_id, 1).await.unwrap();
    assert_eq!(created.remaining_quantity, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_block_expiring_while_promotion_waits_is_rejected() {
    let (_dir, db) = file_db(2, Duration::from_secs(5)).await;
    let item_id = item_with(&db, 5).await;
    let clock = ManualClock::new(start());
    let engine = engine_on(&db, &clock);

    let created = engine.create_temporary_block(&item_id, 2).await.unwrap();
    clock.set(created.expires_at - chrono::Duration::seconds(1));

    let holder = hold_write_lock(&db, &item_id).await;
    let promotion = {
        let engine = engine.clone();
        let block_id = created.block_id.clone();
        tokio::spawn(async move { engine.promote_to_permanent(&block_id).await })
    };

    // The block expires while the promotion is still queued behind the holder.
    tokio::time::sleep(Duration::from_millis(200)).await;
    clock.set(created.expires_at + chrono::Duration::seconds(2));
    holder.rollback().await.unwrap();

    match promotion.await.unwrap() {
        Err(EngineError::Rejected(CoreError::BlockExpired {
            block_id,
            expired_at,
        })) => {
            assert_eq!(block_id, created.block_id);
            assert_eq!(expired_at, created.expires_at);
        }
        other => panic!("expected BlockExpired, got {other:?}"),
    }

    let stored = db.blocks().get_by_id(&created.block_id).await.unwrap().unwrap();
    assert!(!stored.is_permanent);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reservation_window_starts_when_the_lock_is_acquired() {
    let (_dir, db) = file_db(2, Duration::from_secs(5)).await;
    let item_id = item_with(&db, 5).await;
    let clock = ManualClock::new(start());
    let engine = engine_on(&db, &clock);

    let holder = hold_write_lock(&db, &item_id).await;
    let creation = {
        let engine = engine.clone();
        let item_id = item_id.clone();
        tokio::spawn(async move { engine.create_temporary_block(&item_id, 1).await })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    clock.advance(chrono::Duration::minutes(10));
    holder.rollback().await.unwrap();

    let created = creation.await.unwrap().unwrap();
    let window = ReservationConfig::default().reservation_window;
    assert_eq!(created.expires_at, clock.now() + window);
    assert_eq!(created.expires_at, start() + chrono::Duration::minutes(10) + window);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reclaim_alongside_new_blocks_keeps_stock_balanced() {
    const TOTAL: i64 = 20;

    let (_dir, db) = file_db(4, Duration::from_secs(10)).await;
    let item_id = item_with(&db, TOTAL).await;
    let clock = ManualClock::new(start());
    let engine = engine_on(&db, &clock);

    for _ in 0..3 {
        engine.create_temporary_block(&item_id, 2).await.unwrap();
    }
    assert_eq!(quantity_of(&db, &item_id).await, 14);

    clock.advance(ReservationConfig::default().reservation_window + chrono::Duration::seconds(1));

    let sweep = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.reclaim_expired_now().await })
    };
    let creations: Vec<_> = (0..6)
        .map(|_| {
            let engine = engine.clone();
            let item_id = item_id.clone();
            tokio::spawn(async move { engine.create_temporary_block(&item_id, 3).await })
        })
        .collect();

    let mut granted = 0;
    for handle in creations {
        match handle.await.unwrap() {
            Ok(created) => {
                assert!(created.remaining_quantity >= 0);
                granted += 3;
            }
            Err(err) => assert!(
                matches!(err, EngineError::Rejected(CoreError::InsufficientQuantity { .. })),
                "unexpected error: {err:?}"
            ),
        }
    }
    assert_eq!(sweep.await.unwrap().unwrap().reclaimed_count, 3);

    let quantity = quantity_of(&db, &item_id).await;
    let withheld = db.blocks().withheld_quantity(&item_id).await.unwrap();
    assert!(quantity >= 0);
    assert_eq!(withheld, granted);
    assert_eq!(quantity + withheld, TOTAL);
    assert_eq!(db.blocks().count_expired(clock.now()).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_promotion_racing_reclaim_never_makes_expired_block_permanent() {
    let (_dir, db) = file_db(4, Duration::from_secs(10)).await;
    let item_id = item_with(&db, 8).await;
    let clock = ManualClock::new(start());
    let engine = engine_on(&db, &clock);

    let mut block_ids = Vec::new();
    for _ in 0..4 {
        block_ids.push(engine.create_temporary_block(&item_id, 2).await.unwrap().block_id);
    }
    clock.advance(ReservationConfig::default().reservation_window);

    let promotions: Vec<_> = block_ids
        .iter()
        .cloned()
        .map(|block_id| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.promote_to_permanent(&block_id).await })
        })
        .collect();
    let sweep = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.reclaim_expired_now().await })
    };

    for handle in promotions {
        match handle.await.unwrap() {
            Err(EngineError::Rejected(
                CoreError::BlockExpired { .. } | CoreError::BlockNotFound(_),
            )) => {}
            other => panic!("expected BlockExpired or BlockNotFound, got {other:?}"),
        }
    }
    assert_eq!(sweep.await.unwrap().unwrap().reclaimed_count, 4);

    assert!(db.blocks().list_for_item(&item_id).await.unwrap().is_empty());
    assert_eq!(quantity_of(&db, &item_id).await, 8);
}
