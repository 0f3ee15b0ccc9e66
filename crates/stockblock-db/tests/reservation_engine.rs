//! End-to-end behaviour of the reservation engine against a real SQLite store.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use stockblock_core::{
    BlockState, Clock, CoreError, CreateBlockRequest, ErrorKind, Item, ManualClock, NewItem,
    PromoteBlockRequest, ReclaimRequest, ReservationConfig,
};
use stockblock_db::{Database, DbConfig, EngineError, ReservationEngine};

struct Fixture {
    db: Database,
    engine: ReservationEngine,
    clock: ManualClock,
}

async fn fixture() -> Fixture {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap());
    let engine = db.engine_with_clock(ReservationConfig::default(), Arc::new(clock.clone()));
    Fixture { db, engine, clock }
}

async fn item_with(db: &Database, quantity: i64) -> Item {
    db.items()
        .create(&NewItem {
            name: "Widget".to_string(),
            category: "tools".to_string(),
            price_cents: 1500,
            quantity,
        })
        .await
        .unwrap()
}

async fn quantity_of(db: &Database, item_id: &str) -> i64 {
    db.items().get_by_id(item_id).await.unwrap().unwrap().quantity
}

/// `quantity + withheld` for the item.
async fn total_stock(db: &Database, item_id: &str) -> i64 {
    quantity_of(db, item_id).await + db.blocks().withheld_quantity(item_id).await.unwrap()
}

fn rejection(err: EngineError) -> CoreError {
    match err {
        EngineError::Rejected(core) => core,
        other => panic!("expected a rejection, got {other:?}"),
    }
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_create_withholds_quantity_for_one_hour() {
    let f = fixture().await;
    let item = item_with(&f.db, 20).await;

    let created = f.engine.create_temporary_block(&item.id, 5).await.unwrap();

    assert_eq!(created.quantity_blocked, 5);
    assert_eq!(created.remaining_quantity, 15);
    assert_eq!(created.expires_at, f.clock.now() + Duration::hours(1));
    assert_eq!(quantity_of(&f.db, &item.id).await, 15);

    let block = f.db.blocks().get_by_id(&created.block_id).await.unwrap().unwrap();
    assert!(!block.is_permanent);
    assert_eq!(block.item_id, item.id);
    assert_eq!(block.expires_at, Some(created.expires_at));
    assert_eq!(total_stock(&f.db, &item.id).await, 20);
}

#[tokio::test]
async fn test_create_exact_fit_then_one_over() {
    let f = fixture().await;
    let exact = item_with(&f.db, 4).await;
    let short = item_with(&f.db, 4).await;

    let created = f.engine.create_temporary_block(&exact.id, 4).await.unwrap();
    assert_eq!(created.remaining_quantity, 0);
    assert_eq!(quantity_of(&f.db, &exact.id).await, 0);

    let err = f.engine.create_temporary_block(&short.id, 5).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(
        rejection(err),
        CoreError::InsufficientQuantity {
            item_id: short.id.clone(),
            available: 4,
            requested: 5,
        }
    );
    assert_eq!(quantity_of(&f.db, &short.id).await, 4);
    assert!(f.db.blocks().list_for_item(&short.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_non_positive_quantity() {
    let f = fixture().await;
    let item = item_with(&f.db, 3).await;

    for requested in [0, -1] {
        let err = f
            .engine
            .create_temporary_block(&item.id, requested)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(rejection(err), CoreError::InvalidQuantity { requested });
    }
    assert_eq!(quantity_of(&f.db, &item.id).await, 3);
}

#[tokio::test]
async fn test_create_unknown_item() {
    let f = fixture().await;

    let err = f
        .engine
        .create(&CreateBlockRequest {
            item_id: "no-such-item".to_string(),
            quantity: 1,
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(
        rejection(err),
        CoreError::ItemNotFound("no-such-item".to_string())
    );
}

#[tokio::test]
async fn test_reservation_window_is_configurable() {
    let f = fixture().await;
    let item = item_with(&f.db, 2).await;
    let engine = f.db.engine_with_clock(
        ReservationConfig::default().reservation_window(Duration::minutes(10)),
        Arc::new(f.clock.clone()),
    );

    let created = engine.create_temporary_block(&item.id, 1).await.unwrap();
    assert_eq!(
        created.expires_at,
        f.clock.now() + Duration::minutes(10)
    );
}

// =============================================================================
// Promote
// =============================================================================

#[tokio::test]
async fn test_promote_twice() {
    let f = fixture().await;
    let item = item_with(&f.db, 10).await;
    let created = f.engine.create_temporary_block(&item.id, 4).await.unwrap();

    let promoted = f
        .engine
        .promote(&PromoteBlockRequest {
            block_id: created.block_id.clone(),
        })
        .await
        .unwrap();
    assert_eq!(promoted.block_id, created.block_id);
    assert_eq!(promoted.quantity, 4);
    assert_eq!(promoted.item_id, item.id);

    let err = f
        .engine
        .promote_to_permanent(&created.block_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(
        rejection(err),
        CoreError::AlreadyPermanent(created.block_id.clone())
    );

    assert_eq!(quantity_of(&f.db, &item.id).await, 6);
    let block = f.db.blocks().get_by_id(&created.block_id).await.unwrap().unwrap();
    assert!(block.is_permanent);
    assert_eq!(block.expires_at, None);
}

#[tokio::test]
async fn test_promote_at_exact_expiry_is_rejected() {
    let f = fixture().await;
    let item = item_with(&f.db, 10).await;
    let created = f.engine.create_temporary_block(&item.id, 2).await.unwrap();

    f.clock.set(created.expires_at);

    let err = f
        .engine
        .promote_to_permanent(&created.block_id)
        .await
        .unwrap_err();
    assert_eq!(
        rejection(err),
        CoreError::BlockExpired {
            block_id: created.block_id.clone(),
            expired_at: created.expires_at,
        }
    );

    // Still waiting for a sweep; nothing changed.
    let block = f.db.blocks().get_by_id(&created.block_id).await.unwrap().unwrap();
    assert_eq!(block.state_at(created.expires_at), BlockState::Expired);
    assert_eq!(quantity_of(&f.db, &item.id).await, 8);
}

#[tokio::test]
async fn test_promote_just_before_expiry_succeeds() {
    let f = fixture().await;
    let item = item_with(&f.db, 10).await;
    let created = f.engine.create_temporary_block(&item.id, 2).await.unwrap();

    f.clock.set(created.expires_at - Duration::milliseconds(1));

    f.engine.promote_to_permanent(&created.block_id).await.unwrap();
}

#[tokio::test]
async fn test_promote_unknown_block() {
    let f = fixture().await;

    let err = f.engine.promote_to_permanent("no-such-block").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(
        rejection(err),
        CoreError::BlockNotFound("no-such-block".to_string())
    );
}

// =============================================================================
// Reclaim
// =============================================================================

#[tokio::test]
async fn test_reclaim_boundary_is_inclusive() {
    let f = fixture().await;
    let item = item_with(&f.db, 10).await;
    let created = f.engine.create_temporary_block(&item.id, 3).await.unwrap();

    let before = f
        .engine
        .reclaim_expired(created.expires_at - Duration::milliseconds(1))
        .await
        .unwrap();
    assert_eq!(before.reclaimed_count, 0);
    assert_eq!(quantity_of(&f.db, &item.id).await, 7);

    let at = f.engine.reclaim_expired(created.expires_at).await.unwrap();
    assert_eq!(at.reclaimed_count, 1);
    assert_eq!(quantity_of(&f.db, &item.id).await, 10);
}

#[tokio::test]
async fn test_reclaim_is_idempotent() {
    let f = fixture().await;
    let item = item_with(&f.db, 10).await;
    let created = f.engine.create_temporary_block(&item.id, 3).await.unwrap();
    let now = created.expires_at + Duration::minutes(5);

    assert_eq!(f.engine.reclaim_expired(now).await.unwrap().reclaimed_count, 1);
    assert_eq!(f.engine.reclaim_expired(now).await.unwrap().reclaimed_count, 0);
    assert_eq!(quantity_of(&f.db, &item.id).await, 10);
}

#[tokio::test]
async fn test_reclaim_sums_per_item_and_skips_live_blocks() {
    let f = fixture().await;
    let first = item_with(&f.db, 10).await;
    let second = item_with(&f.db, 10).await;

    f.engine.create_temporary_block(&first.id, 2).await.unwrap();
    f.engine.create_temporary_block(&first.id, 3).await.unwrap();
    f.engine.create_temporary_block(&second.id, 4).await.unwrap();

    // Created later, so still live at the sweep instant.
    f.clock.advance(Duration::minutes(30));
    let live = f.engine.create_temporary_block(&second.id, 1).await.unwrap();

    let sweep_at = f.clock.now() + Duration::minutes(31);
    assert!(sweep_at < live.expires_at);
    assert_eq!(f.db.blocks().count_expired(sweep_at).await.unwrap(), 3);

    let reclaimed = f.engine.reclaim_expired(sweep_at).await.unwrap();
    assert_eq!(reclaimed.reclaimed_count, 3);

    assert_eq!(quantity_of(&f.db, &first.id).await, 10);
    assert_eq!(quantity_of(&f.db, &second.id).await, 9);

    let remaining = f.db.blocks().list_for_item(&second.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, live.block_id);
    assert_eq!(total_stock(&f.db, &second.id).await, 10);
}

#[tokio::test]
async fn test_reclaim_request_defaults_to_engine_clock() {
    let f = fixture().await;
    let item = item_with(&f.db, 5).await;
    f.engine.create_temporary_block(&item.id, 5).await.unwrap();

    let early = f.engine.reclaim(&ReclaimRequest::default()).await.unwrap();
    assert_eq!(early.reclaimed_count, 0);

    f.clock.advance(Duration::hours(1));
    let due = f.engine.reclaim(&ReclaimRequest::default()).await.unwrap();
    assert_eq!(due.reclaimed_count, 1);
    assert_eq!(quantity_of(&f.db, &item.id).await, 5);
}

#[tokio::test]
async fn test_reclaimed_block_reports_not_found_on_promote() {
    let f = fixture().await;
    let item = item_with(&f.db, 5).await;
    let created = f.engine.create_temporary_block(&item.id, 2).await.unwrap();

    f.clock.advance(Duration::hours(2));
    f.engine.reclaim_expired_now().await.unwrap();

    let err = f
        .engine
        .promote_to_permanent(&created.block_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// =============================================================================
// End to end
// =============================================================================

#[tokio::test]
async fn test_promoted_block_survives_sweeps() {
    let f = fixture().await;
    let item = item_with(&f.db, 20).await;

    let created = f.engine.create_temporary_block(&item.id, 5).await.unwrap();
    assert_eq!(created.remaining_quantity, 15);

    f.engine.promote_to_permanent(&created.block_id).await.unwrap();
    assert_eq!(quantity_of(&f.db, &item.id).await, 15);

    f.clock.advance(Duration::days(30));
    let reclaimed = f.engine.reclaim_expired_now().await.unwrap();
    assert_eq!(reclaimed.reclaimed_count, 0);

    assert_eq!(quantity_of(&f.db, &item.id).await, 15);
    let block = f.db.blocks().get_by_id(&created.block_id).await.unwrap().unwrap();
    assert!(block.is_permanent);
    assert_eq!(block.expires_at, None);
    assert_eq!(total_stock(&f.db, &item.id).await, 20);
}

#[tokio::test]
async fn test_unpromoted_block_is_reclaimed() {
    let f = fixture().await;
    let item = item_with(&f.db, 20).await;

    let created = f.engine.create_temporary_block(&item.id, 5).await.unwrap();
    assert_eq!(quantity_of(&f.db, &item.id).await, 15);

    f.clock.advance(Duration::hours(1) + Duration::seconds(1));
    let reclaimed = f.engine.reclaim_expired_now().await.unwrap();
    assert_eq!(reclaimed.reclaimed_count, 1);

    assert_eq!(quantity_of(&f.db, &item.id).await, 20);
    assert!(f
        .db
        .blocks()
        .get_by_id(&created.block_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_response_json_shape() {
    let f = fixture().await;
    let item = item_with(&f.db, 3).await;

    let created = f.engine.create_temporary_block(&item.id, 1).await.unwrap();
    let json = serde_json::to_value(&created).unwrap();

    assert_eq!(json["blockId"], created.block_id.as_str());
    assert_eq!(json["quantityBlocked"], 1);
    assert_eq!(json["remainingQuantity"], 2);
    assert!(json["expiresAt"].is_string());
}

// =============================================================================
// Storage failures
// =============================================================================

#[tokio::test]
async fn test_closed_store_is_unavailable() {
    let f = fixture().await;
    let item = item_with(&f.db, 3).await;
    f.db.close().await;

    let err = f.engine.create_temporary_block(&item.id, 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(err.is_retryable());

    let err = f.engine.reclaim_expired_now().await.unwrap_err();
    assert!(matches!(err, EngineError::Unavailable(_)));
}
