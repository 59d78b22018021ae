//! Inventory service (application-level orchestration).
//!
//! `InventoryService` is the single entry point the API layer talks to. It
//! composes an injected `InventoryStore`, stamps server timestamps, and maps
//! domain and store failures into one `ServiceError` taxonomy:
//!
//! ```text
//! request input (already validated into domain types)
//!   ↓
//! InventoryService (timestamps, advisory checks, logging)
//!   ↓
//! InventoryStore (atomic unit per operation)
//! ```
//!
//! The service holds no state of its own; the store handle is built once per
//! process and passed in.

use chrono::Utc;
use thiserror::Error;
use tracing::{instrument, warn};

use stockroom_core::{DomainError, ItemId, StockId};
use stockroom_inventory::{
    encode_image, Item, ItemPatch, NewItem, NewStock, QuantityDelta, Stock, StockPatch,
};

use crate::store::{InventoryStore, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or out-of-range input (deterministic).
    #[error("validation failed: {0}")]
    Validation(String),
    /// The targeted record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    /// A domain rule rejected the operation (e.g. negative quantity).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    /// A stock write referenced an item id that does not resolve.
    #[error("reference not found: {0}")]
    ReferenceNotFound(String),
    /// Concurrent writers kept colliding after bounded retries.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Storage/transport failure, propagated as-is.
    #[error(transparent)]
    Store(StoreError),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
            DomainError::ReferenceNotFound(msg) => ServiceError::ReferenceNotFound(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            StoreError::Domain(err) => err.into(),
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Store(other),
        }
    }
}

/// Outcome of an item delete.
///
/// `dangling_references` is the number of stock entries that still carried
/// the item's id when it was removed. Deletion is never blocked by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemDeletion {
    pub removed: bool,
    pub dangling_references: u64,
}

#[derive(Debug, Clone)]
pub struct InventoryService<S> {
    store: S,
}

impl<S> InventoryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> InventoryService<S>
where
    S: InventoryStore,
{
    #[instrument(skip(self, item), fields(name = %item.name))]
    pub async fn create_item(&self, item: NewItem) -> Result<Item, ServiceError> {
        Ok(self.store.insert_item(item, Utc::now()).await?)
    }

    pub async fn list_items(&self) -> Result<Vec<Item>, ServiceError> {
        Ok(self.store.list_items().await?)
    }

    pub async fn get_item(&self, id: ItemId) -> Result<Option<Item>, ServiceError> {
        Ok(self.store.get_item(id).await?)
    }

    #[instrument(skip(self, patch), fields(item_id = %id))]
    pub async fn update_item(&self, id: ItemId, patch: ItemPatch) -> Result<Item, ServiceError> {
        Ok(self.store.update_item(id, &patch).await?)
    }

    /// Encode raw image bytes as an embedded reference and set it on the item.
    #[instrument(skip(self, bytes), fields(item_id = %id, size = bytes.len()))]
    pub async fn set_item_image(
        &self,
        id: ItemId,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<Item, ServiceError> {
        let image = encode_image(bytes, content_type)?;
        let patch = ItemPatch::new(None, Some(Some(image)))?;
        Ok(self.store.update_item(id, &patch).await?)
    }

    /// Hard-delete an item. Stock entries referencing it are left as they are.
    #[instrument(skip(self), fields(item_id = %id))]
    pub async fn delete_item(&self, id: ItemId) -> Result<ItemDeletion, ServiceError> {
        let dangling_references = self.store.count_stocks_referencing(id).await?;
        let removed = self.store.delete_item(id).await?;

        if removed && dangling_references > 0 {
            warn!(
                item_id = %id,
                dangling_references,
                "deleted item is still referenced by stock entries"
            );
        }

        Ok(ItemDeletion {
            removed,
            dangling_references,
        })
    }

    pub async fn count_referencing_stocks(&self, item_id: ItemId) -> Result<u64, ServiceError> {
        Ok(self.store.count_stocks_referencing(item_id).await?)
    }

    #[instrument(skip(self, stock), fields(item_id = ?stock.item.item_id(), expiry_date = %stock.expiry_date))]
    pub async fn create_stock(&self, stock: NewStock) -> Result<Stock, ServiceError> {
        Ok(self.store.insert_stock(stock, Utc::now()).await?)
    }

    pub async fn list_stocks(&self) -> Result<Vec<Stock>, ServiceError> {
        Ok(self.store.list_stocks().await?)
    }

    pub async fn get_stock(&self, id: StockId) -> Result<Option<Stock>, ServiceError> {
        Ok(self.store.get_stock(id).await?)
    }

    #[instrument(skip(self, patch), fields(stock_id = %id))]
    pub async fn update_stock(&self, id: StockId, patch: StockPatch) -> Result<Stock, ServiceError> {
        Ok(self.store.update_stock(id, &patch, Utc::now()).await?)
    }

    #[instrument(skip(self), fields(stock_id = %id))]
    pub async fn delete_stock(&self, id: StockId) -> Result<bool, ServiceError> {
        Ok(self.store.delete_stock(id).await?)
    }

    /// Apply a signed delta to a stock entry's quantity.
    ///
    /// The read-check-write is indivisible per stock id. A result below zero
    /// is an `InvariantViolation` and leaves the entry untouched.
    #[instrument(skip(self), fields(stock_id = %id, delta = delta.value()))]
    pub async fn adjust_quantity(
        &self,
        id: StockId,
        delta: QuantityDelta,
    ) -> Result<Stock, ServiceError> {
        Ok(self.store.adjust_quantity(id, delta, Utc::now()).await?)
    }
}
