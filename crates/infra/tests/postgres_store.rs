//! Postgres store integration tests.
//!
//! Require a reachable database:
//!
//! ```text
//! DATABASE_URL=postgres://... cargo test -p stockroom-infra -- --ignored
//! ```

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use stockroom_core::{CalendarDate, ItemId};
use stockroom_infra::db::{connect_lazy, ensure_schema};
use stockroom_infra::service::{InventoryService, ServiceError};
use stockroom_infra::store::{InventoryStore, PostgresInventoryStore, StoreError};
use stockroom_inventory::{
    ItemName, ItemPatch, ItemRef, NewItem, NewStock, Quantity, QuantityDelta, StockPatch,
};

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");
    let pool = connect_lazy(&url, 8).expect("pool");
    ensure_schema(&pool).await.expect("schema");
    pool
}

async fn store() -> PostgresInventoryStore {
    PostgresInventoryStore::new(pool().await)
}

fn name(s: &str) -> ItemName {
    ItemName::parse(s).unwrap()
}

fn date(s: &str) -> CalendarDate {
    s.parse().unwrap()
}

#[tokio::test]
#[ignore]
async fn item_round_trips_and_snapshots_survive_delete() {
    let svc = InventoryService::new(store().await);

    let item = svc
        .create_item(NewItem::new(name("Postgres Yogurt"), None))
        .await
        .unwrap();
    assert_eq!(svc.get_item(item.id).await.unwrap(), Some(item.clone()));

    let stock = svc
        .create_stock(NewStock::new(
            ItemRef::Id(item.id),
            date("2026-02-07"),
            Quantity::new(3).unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(stock.item_name_snapshot, name("Postgres Yogurt"));

    let stored = svc.get_stock(stock.id).await.unwrap().unwrap();
    assert_eq!(stored.expiry_date.to_string(), "2026-02-07");
    assert_eq!(stored, stock);

    svc.update_item(
        item.id,
        ItemPatch::new(Some(name("Renamed Yogurt")), None).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(svc.count_referencing_stocks(item.id).await.unwrap(), 1);

    let deletion = svc.delete_item(item.id).await.unwrap();
    assert!(deletion.removed);
    assert_eq!(deletion.dangling_references, 1);

    let stored = svc.get_stock(stock.id).await.unwrap().unwrap();
    assert_eq!(stored.item_id, Some(item.id));
    assert_eq!(stored.item_name_snapshot, name("Postgres Yogurt"));

    let err = svc
        .update_stock(
            stock.id,
            StockPatch::new(Some(ItemRef::Id(item.id)), None, None).unwrap(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ReferenceNotFound(_)));

    assert!(svc.delete_stock(stock.id).await.unwrap());
    assert!(!svc.delete_stock(stock.id).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn unknown_item_reference_is_rejected() {
    let store = store().await;
    let err = store
        .insert_stock(
            NewStock::new(
                ItemRef::Id(ItemId::new()),
                date("2026-02-07"),
                Quantity::ZERO,
            ),
            Utc::now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        ServiceError::from(err),
        ServiceError::ReferenceNotFound(_)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn concurrent_adjustments_serialize_on_the_row() {
    let svc = Arc::new(InventoryService::new(store().await));
    let stock = svc
        .create_stock(NewStock::new(
            ItemRef::Name(name("Contended flour")),
            date("2026-05-01"),
            Quantity::new(50).unwrap(),
        ))
        .await
        .unwrap();

    let deltas: Vec<i64> = (0..32).map(|i| if i % 2 == 0 { 4 } else { -1 }).collect();
    let expected = 50 + deltas.iter().sum::<i64>();

    let id = stock.id;
    let mut handles = Vec::new();
    for d in deltas {
        let svc = Arc::clone(&svc);
        handles.push(tokio::spawn(async move {
            svc.adjust_quantity(id, QuantityDelta::new(d).unwrap())
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = svc.get_stock(stock.id).await.unwrap().unwrap();
    assert_eq!(stored.quantity.value(), expected);

    let err = svc
        .adjust_quantity(stock.id, QuantityDelta::new(-(expected + 1)).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvariantViolation(_)));
    svc.delete_stock(stock.id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn rejected_writes_keep_their_domain_error_and_release_the_row() {
    let store = store().await;
    let stock = store
        .insert_stock(
            NewStock::new(
                ItemRef::Name(name("Rollback rice")),
                date("2026-03-01"),
                Quantity::new(2).unwrap(),
            ),
            Utc::now(),
        )
        .await
        .unwrap();

    let err = store
        .adjust_quantity(stock.id, QuantityDelta::new(-3).unwrap(), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(
        ServiceError::from(err),
        ServiceError::InvariantViolation(_)
    ));

    let err = store
        .update_stock(
            stock.id,
            &StockPatch::new(Some(ItemRef::Id(ItemId::new())), None, None).unwrap(),
            Utc::now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        ServiceError::from(err),
        ServiceError::ReferenceNotFound(_)
    ));

    let adjusted = store
        .adjust_quantity(stock.id, QuantityDelta::new(-2).unwrap(), Utc::now())
        .await
        .unwrap();
    assert_eq!(adjusted.quantity, Quantity::ZERO);
    assert_eq!(adjusted.item_name_snapshot, name("Rollback rice"));

    store.delete_stock(stock.id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn malformed_stored_rows_are_reported_as_corrupt() {
    let pool = pool().await;
    let store = PostgresInventoryStore::new(pool.clone());
    let stock = store
        .insert_stock(
            NewStock::new(
                ItemRef::Name(name("Soon blank")),
                date("2026-04-01"),
                Quantity::new(1).unwrap(),
            ),
            Utc::now(),
        )
        .await
        .unwrap();
    let item = store
        .insert_item(NewItem::new(name("Soon broken image"), None), Utc::now())
        .await
        .unwrap();

    sqlx::query("UPDATE stocks SET item_name_snapshot = '   ' WHERE id = $1")
        .bind(stock.id.as_uuid())
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE items SET image = 'not-an-image' WHERE id = $1")
        .bind(item.id.as_uuid())
        .execute(&pool)
        .await
        .unwrap();

    let err = store.get_stock(stock.id).await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(msg) if msg.contains("item_name_snapshot")));

    let err = store.get_item(item.id).await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(msg) if msg.contains("image")));

    assert!(store.delete_stock(stock.id).await.unwrap());
    assert!(store.delete_item(item.id).await.unwrap());
}
