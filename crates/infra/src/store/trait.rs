use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use stockroom_core::{DomainError, ItemId, StockId};
use stockroom_inventory::{Item, ItemPatch, NewItem, NewStock, QuantityDelta, Stock, StockPatch};

/// Storage operation error.
///
/// Rule violations detected inside a store's atomic unit (negative quantity,
/// dangling item reference) surface as `Domain`; everything else is a
/// storage/transport concern.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("malformed stored record: {0}")]
    Corrupt(String),

    #[error("transaction conflict: {0}")]
    Conflict(String),

    #[error("database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn item_not_found(id: ItemId) -> Self {
        Self::NotFound {
            entity: "item",
            id: id.to_string(),
        }
    }

    pub fn stock_not_found(id: StockId) -> Self {
        Self::NotFound {
            entity: "stock",
            id: id.to_string(),
        }
    }
}

/// Document store for items and stock entries.
///
/// ## Ordering
///
/// - `list_items`: `name` ascending, then `created_at`, then `id`
/// - `list_stocks`: `expiry_date` ascending, then `created_at`, then `id`
///
/// ## Atomicity
///
/// - `adjust_quantity` is an indivisible read-check-write per stock id:
///   concurrent adjusters on one id serialize and never see a stale read.
/// - `insert_stock` / `update_stock` resolve a referenced item's name inside
///   the same write, so the snapshot is the name at the moment of the write.
/// - Every other write is a single-record last-writer-wins write.
///
/// Deletes are hard and unconditional; they report whether a record existed.
/// Item deletion never cascades to stock entries.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn insert_item(&self, item: NewItem, now: DateTime<Utc>) -> Result<Item, StoreError>;

    async fn list_items(&self) -> Result<Vec<Item>, StoreError>;

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    async fn update_item(&self, id: ItemId, patch: &ItemPatch) -> Result<Item, StoreError>;

    async fn delete_item(&self, id: ItemId) -> Result<bool, StoreError>;

    /// Number of stock entries whose `item_id` equals `item_id`.
    async fn count_stocks_referencing(&self, item_id: ItemId) -> Result<u64, StoreError>;

    async fn insert_stock(&self, stock: NewStock, now: DateTime<Utc>) -> Result<Stock, StoreError>;

    async fn list_stocks(&self) -> Result<Vec<Stock>, StoreError>;

    async fn get_stock(&self, id: StockId) -> Result<Option<Stock>, StoreError>;

    async fn update_stock(
        &self,
        id: StockId,
        patch: &StockPatch,
        now: DateTime<Utc>,
    ) -> Result<Stock, StoreError>;

    async fn delete_stock(&self, id: StockId) -> Result<bool, StoreError>;

    async fn adjust_quantity(
        &self,
        id: StockId,
        delta: QuantityDelta,
        now: DateTime<Utc>,
    ) -> Result<Stock, StoreError>;
}

#[async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    async fn insert_item(&self, item: NewItem, now: DateTime<Utc>) -> Result<Item, StoreError> {
        (**self).insert_item(item, now).await
    }

    async fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        (**self).list_items().await
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        (**self).get_item(id).await
    }

    async fn update_item(&self, id: ItemId, patch: &ItemPatch) -> Result<Item, StoreError> {
        (**self).update_item(id, patch).await
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool, StoreError> {
        (**self).delete_item(id).await
    }

    async fn count_stocks_referencing(&self, item_id: ItemId) -> Result<u64, StoreError> {
        (**self).count_stocks_referencing(item_id).await
    }

    async fn insert_stock(&self, stock: NewStock, now: DateTime<Utc>) -> Result<Stock, StoreError> {
        (**self).insert_stock(stock, now).await
    }

    async fn list_stocks(&self) -> Result<Vec<Stock>, StoreError> {
        (**self).list_stocks().await
    }

    async fn get_stock(&self, id: StockId) -> Result<Option<Stock>, StoreError> {
        (**self).get_stock(id).await
    }

    async fn update_stock(
        &self,
        id: StockId,
        patch: &StockPatch,
        now: DateTime<Utc>,
    ) -> Result<Stock, StoreError> {
        (**self).update_stock(id, patch, now).await
    }

    async fn delete_stock(&self, id: StockId) -> Result<bool, StoreError> {
        (**self).delete_stock(id).await
    }

    async fn adjust_quantity(
        &self,
        id: StockId,
        delta: QuantityDelta,
        now: DateTime<Utc>,
    ) -> Result<Stock, StoreError> {
        (**self).adjust_quantity(id, delta, now).await
    }
}

/// Canonical item order shared by store implementations.
pub fn sort_items(items: &mut [Item]) {
    items.sort_by(|a, b| {
        a.name
            .as_str()
            .cmp(b.name.as_str())
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}

/// Canonical stock order shared by store implementations.
pub fn sort_stocks(stocks: &mut [Stock]) {
    stocks.sort_by(|a, b| {
        a.expiry_date
            .cmp(&b.expiry_date)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}
