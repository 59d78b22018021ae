use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stockroom_core::{Entity, ItemId, StockId};
use stockroom_inventory::{Item, ItemPatch, NewItem, NewStock, QuantityDelta, Stock, StockPatch};

use super::r#trait::{sort_items, sort_stocks, InventoryStore, StoreError};

/// One collection of entities keyed by id.
#[derive(Debug)]
struct Table<E: Entity> {
    rows: RwLock<HashMap<E::Id, E>>,
}

impl<E: Entity + Clone> Table<E> {
    fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<E::Id, E>>, StoreError> {
        self.rows.read().map_err(|_| poisoned("read"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<E::Id, E>>, StoreError> {
        self.rows.write().map_err(|_| poisoned("write"))
    }

    fn insert(&self, row: E) -> Result<E, StoreError> {
        self.write()?.insert(row.id(), row.clone());
        Ok(row)
    }

    fn get(&self, id: E::Id) -> Result<Option<E>, StoreError> {
        Ok(self.read()?.get(&id).cloned())
    }

    fn all(&self) -> Result<Vec<E>, StoreError> {
        Ok(self.read()?.values().cloned().collect())
    }

    fn remove(&self, id: E::Id) -> Result<bool, StoreError> {
        Ok(self.write()?.remove(&id).is_some())
    }
}

fn poisoned(operation: &'static str) -> StoreError {
    StoreError::Database {
        operation,
        message: "lock poisoned".to_string(),
    }
}

/// In-memory item/stock store.
///
/// Intended for tests/dev. Lock order is always items before stocks; a stock
/// write that references an item holds the items read lock for the duration
/// of the write so the resolved name cannot change underneath it.
#[derive(Debug)]
pub struct InMemoryInventoryStore {
    items: Table<Item>,
    stocks: Table<Stock>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self {
            items: Table::new(),
            stocks: Table::new(),
        }
    }
}

impl Default for InMemoryInventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn insert_item(&self, item: NewItem, now: DateTime<Utc>) -> Result<Item, StoreError> {
        self.items.insert(item.into_item(ItemId::new(), now))
    }

    async fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        let mut items = self.items.all()?;
        sort_items(&mut items);
        Ok(items)
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        self.items.get(id)
    }

    async fn update_item(&self, id: ItemId, patch: &ItemPatch) -> Result<Item, StoreError> {
        let mut items = self.items.write()?;
        let item = items.get_mut(&id).ok_or_else(|| StoreError::item_not_found(id))?;
        patch.apply_to(item);
        Ok(item.clone())
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool, StoreError> {
        self.items.remove(id)
    }

    async fn count_stocks_referencing(&self, item_id: ItemId) -> Result<u64, StoreError> {
        let stocks = self.stocks.read()?;
        Ok(stocks.values().filter(|s| s.item_id == Some(item_id)).count() as u64)
    }

    async fn insert_stock(&self, stock: NewStock, now: DateTime<Utc>) -> Result<Stock, StoreError> {
        let items = self.items.read()?;
        let current_name = stock
            .item
            .item_id()
            .and_then(|id| items.get(&id))
            .map(|item| item.name.clone());

        let stock = stock.into_stock(StockId::new(), current_name.as_ref(), now)?;
        let inserted = self.stocks.insert(stock);
        drop(items);
        inserted
    }

    async fn list_stocks(&self) -> Result<Vec<Stock>, StoreError> {
        let mut stocks = self.stocks.all()?;
        sort_stocks(&mut stocks);
        Ok(stocks)
    }

    async fn get_stock(&self, id: StockId) -> Result<Option<Stock>, StoreError> {
        self.stocks.get(id)
    }

    async fn update_stock(
        &self,
        id: StockId,
        patch: &StockPatch,
        now: DateTime<Utc>,
    ) -> Result<Stock, StoreError> {
        let items = self.items.read()?;
        let mut stocks = self.stocks.write()?;
        let stock = stocks.get_mut(&id).ok_or_else(|| StoreError::stock_not_found(id))?;

        let current_name = patch
            .item()
            .and_then(|r| r.item_id())
            .and_then(|item_id| items.get(&item_id))
            .map(|item| item.name.clone());

        patch.apply_to(stock, current_name.as_ref(), now)?;
        Ok(stock.clone())
    }

    async fn delete_stock(&self, id: StockId) -> Result<bool, StoreError> {
        self.stocks.remove(id)
    }

    async fn adjust_quantity(
        &self,
        id: StockId,
        delta: QuantityDelta,
        now: DateTime<Utc>,
    ) -> Result<Stock, StoreError> {
        // Read, check and write all happen under the one write guard.
        let mut stocks = self.stocks.write()?;
        let stock = stocks.get_mut(&id).ok_or_else(|| StoreError::stock_not_found(id))?;
        stock.adjust(delta, now)?;
        Ok(stock.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::{CalendarDate, DomainError};
    use stockroom_inventory::{ItemName, ItemRef, Quantity};

    fn new_item(name: &str) -> NewItem {
        NewItem::new(ItemName::parse(name).unwrap(), None)
    }

    fn new_stock(item: ItemRef, expiry: &str, quantity: i64) -> NewStock {
        NewStock::new(
            item,
            expiry.parse::<CalendarDate>().unwrap(),
            Quantity::new(quantity).unwrap(),
        )
    }

    #[tokio::test]
    async fn stock_referencing_missing_item_is_not_inserted() {
        let store = InMemoryInventoryStore::new();

        let err = store
            .insert_stock(new_stock(ItemRef::Id(ItemId::new()), "2026-05-01", 1), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Domain(DomainError::ReferenceNotFound(_))));
        assert!(store.list_stocks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_records_is_not_found() {
        let store = InMemoryInventoryStore::new();
        let patch = ItemPatch::new(Some(ItemName::parse("x").unwrap()), None).unwrap();

        let err = store.update_item(ItemId::new(), &patch).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "item", .. }));

        let err = store
            .adjust_quantity(StockId::new(), QuantityDelta::new(1).unwrap(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "stock", .. }));
    }

    #[tokio::test]
    async fn delete_reports_whether_a_record_existed() {
        let store = InMemoryInventoryStore::new();
        let item = store.insert_item(new_item("Tea"), Utc::now()).await.unwrap();

        assert!(store.delete_item(item.id).await.unwrap());
        assert!(!store.delete_item(item.id).await.unwrap());
        assert!(!store.delete_stock(StockId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn item_rename_does_not_touch_stock_snapshots() {
        let store = InMemoryInventoryStore::new();
        let item = store.insert_item(new_item("Coffee"), Utc::now()).await.unwrap();
        let stock = store
            .insert_stock(new_stock(ItemRef::Id(item.id), "2026-05-01", 1), Utc::now())
            .await
            .unwrap();

        let patch = ItemPatch::new(Some(ItemName::parse("Decaf").unwrap()), None).unwrap();
        store.update_item(item.id, &patch).await.unwrap();

        let reread = store.get_stock(stock.id).await.unwrap().unwrap();
        assert_eq!(reread.item_name_snapshot.as_str(), "Coffee");
    }
}
