//! Postgres-backed item/stock store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (serialization failure) | `40001` | `Conflict` | Concurrent transaction could not be serialized |
//! | Database (deadlock detected) | `40P01` | `Conflict` | Lock cycle between transactions |
//! | Database (check constraint violation) | `23514` | `Domain` (invariant) | e.g. `quantity >= 0` rejected by the schema |
//! | ColumnDecode / Decode | N/A | `Corrupt` | Stored data does not match the model |
//! | Anything else | Any other | `Database` | Network errors, pool closed, etc. |
//!
//! Only `adjust_quantity` retries on `Conflict` (bounded by `MAX_TX_ATTEMPTS`).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use stockroom_core::{CalendarDate, DomainError, ItemId, StockId};
use stockroom_inventory::{
    ImageRef, Item, ItemName, ItemPatch, NewItem, NewStock, Quantity, QuantityDelta, Stock,
    StockPatch,
};

use super::r#trait::{InventoryStore, StoreError};

/// Attempts made by `adjust_quantity` before a conflict is surfaced.
pub const MAX_TX_ATTEMPTS: u32 = 5;

/// Postgres-backed store.
///
/// ## Thread Safety
///
/// Uses the SQLx connection pool, which is `Send + Sync`; the store can be
/// shared behind an `Arc`.
///
/// ## Atomicity
///
/// Multi-step writes (stock writes that resolve an item name, field-level
/// updates, quantity adjustments) run in one transaction and lock the rows
/// they read (`FOR UPDATE` / `FOR SHARE`).
#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }

    #[instrument(skip(self), fields(stock_id = %id, delta = delta.value()), err)]
    async fn adjust_once(
        &self,
        id: StockId,
        delta: QuantityDelta,
        now: DateTime<Utc>,
    ) -> Result<Stock, StoreError> {
        let mut tx = self.begin().await?;

        let Some(mut stock) = lock_stock(&mut tx, id).await? else {
            return Err(abort(tx, StoreError::stock_not_found(id)).await);
        };

        if let Err(e) = stock.adjust(delta, now) {
            return Err(abort(tx, e.into()).await);
        }

        sqlx::query("UPDATE stocks SET quantity = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(stock.quantity.value())
            .bind(stock.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("adjust_quantity", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(stock)
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    async fn insert_item(&self, item: NewItem, now: DateTime<Utc>) -> Result<Item, StoreError> {
        let item = item.into_item(ItemId::new(), now.trunc_subsecs(6));

        sqlx::query("INSERT INTO items (id, name, image, created_at) VALUES ($1, $2, $3, $4)")
            .bind(item.id.as_uuid())
            .bind(item.name.as_str())
            .bind(item.image.as_ref().map(ImageRef::as_str))
            .bind(item.created_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_item", e))?;

        Ok(item)
    }

    async fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, image, created_at
            FROM items
            ORDER BY name COLLATE "C" ASC, created_at ASC, id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;

        rows.iter().map(decode_item).collect()
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query("SELECT id, name, image, created_at FROM items WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?;

        row.as_ref().map(decode_item).transpose()
    }

    async fn update_item(&self, id: ItemId, patch: &ItemPatch) -> Result<Item, StoreError> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(
            "SELECT id, name, image, created_at FROM items WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_item", e))?;

        let Some(row) = row else {
            return Err(abort(tx, StoreError::item_not_found(id)).await);
        };
        let mut item = decode_item(&row)?;
        patch.apply_to(&mut item);

        sqlx::query("UPDATE items SET name = $2, image = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(item.name.as_str())
            .bind(item.image.as_ref().map(ImageRef::as_str))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_item", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(item)
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_stocks_referencing(&self, item_id: ItemId) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM stocks WHERE item_id = $1")
            .bind(item_id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_stocks_referencing", e))?;

        let total: i64 = row
            .try_get("total")
            .map_err(|e| StoreError::Corrupt(format!("failed to read count: {e}")))?;
        Ok(total.max(0) as u64)
    }

    async fn insert_stock(&self, stock: NewStock, now: DateTime<Utc>) -> Result<Stock, StoreError> {
        let mut tx = self.begin().await?;

        let current_name = match stock.item.item_id() {
            Some(item_id) => share_item_name(&mut tx, item_id).await?,
            None => None,
        };
        let stock = match stock.into_stock(StockId::new(), current_name.as_ref(), now.trunc_subsecs(6)) {
            Ok(stock) => stock,
            Err(e) => return Err(abort(tx, e.into()).await),
        };

        let expires_at = stock.expiry_date.to_instant()?;
        sqlx::query(
            r#"
            INSERT INTO stocks (
                id,
                item_id,
                item_name_snapshot,
                expires_at,
                quantity,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(stock.id.as_uuid())
        .bind(stock.item_id.map(Uuid::from))
        .bind(stock.item_name_snapshot.as_str())
        .bind(expires_at)
        .bind(stock.quantity.value())
        .bind(stock.created_at)
        .bind(stock.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_stock", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(stock)
    }

    async fn list_stocks(&self) -> Result<Vec<Stock>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                id,
                item_id,
                item_name_snapshot,
                expires_at,
                quantity,
                created_at,
                updated_at
            FROM stocks
            ORDER BY expires_at ASC, created_at ASC, id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_stocks", e))?;

        rows.iter().map(decode_stock).collect()
    }

    async fn get_stock(&self, id: StockId) -> Result<Option<Stock>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                id,
                item_id,
                item_name_snapshot,
                expires_at,
                quantity,
                created_at,
                updated_at
            FROM stocks
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_stock", e))?;

        row.as_ref().map(decode_stock).transpose()
    }

    async fn update_stock(
        &self,
        id: StockId,
        patch: &StockPatch,
        now: DateTime<Utc>,
    ) -> Result<Stock, StoreError> {
        let mut tx = self.begin().await?;

        let Some(mut stock) = lock_stock(&mut tx, id).await? else {
            return Err(abort(tx, StoreError::stock_not_found(id)).await);
        };

        let current_name = match patch.item().and_then(|r| r.item_id()) {
            Some(item_id) => share_item_name(&mut tx, item_id).await?,
            None => None,
        };
        if let Err(e) = patch.apply_to(&mut stock, current_name.as_ref(), now.trunc_subsecs(6)) {
            return Err(abort(tx, e.into()).await);
        }

        let expires_at = stock.expiry_date.to_instant()?;
        sqlx::query(
            r#"
            UPDATE stocks SET
                item_id = $2,
                item_name_snapshot = $3,
                expires_at = $4,
                quantity = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(stock.item_id.map(Uuid::from))
        .bind(stock.item_name_snapshot.as_str())
        .bind(expires_at)
        .bind(stock.quantity.value())
        .bind(stock.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_stock", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(stock)
    }

    async fn delete_stock(&self, id: StockId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM stocks WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_stock", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn adjust_quantity(
        &self,
        id: StockId,
        delta: QuantityDelta,
        now: DateTime<Utc>,
    ) -> Result<Stock, StoreError> {
        let now = now.trunc_subsecs(6);
        let mut attempt = 1;
        loop {
            match self.adjust_once(id, delta, now).await {
                Err(StoreError::Conflict(msg)) if attempt < MAX_TX_ATTEMPTS => {
                    tracing::debug!(stock_id = %id, attempt, %msg, "retrying quantity adjustment");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

/// Read a stock row and hold its row lock until the transaction ends.
async fn lock_stock(
    tx: &mut Transaction<'_, Postgres>,
    id: StockId,
) -> Result<Option<Stock>, StoreError> {
    let row = sqlx::query(
        r#"
        SELECT
            id,
            item_id,
            item_name_snapshot,
            expires_at,
            quantity,
            created_at,
            updated_at
        FROM stocks
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_stock", e))?;

    row.as_ref().map(decode_stock).transpose()
}

/// Current name of an item, share-locked so it cannot change or disappear
/// before the transaction ends. `None` when the item does not exist.
async fn share_item_name(
    tx: &mut Transaction<'_, Postgres>,
    id: ItemId,
) -> Result<Option<ItemName>, StoreError> {
    let row = sqlx::query("SELECT name FROM items WHERE id = $1 FOR SHARE")
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("resolve_item_name", e))?;

    row.map(|row| {
        let name: String = row
            .try_get("name")
            .map_err(|e| StoreError::Corrupt(format!("items.name for {id}: {e}")))?;
        ItemName::parse(name).map_err(|e| StoreError::Corrupt(format!("items.name for {id}: {e}")))
    })
    .transpose()
}

/// Roll back `tx` and hand back `cause`.
///
/// A failed rollback is logged; the caller still sees the error that ended
/// the transaction.
async fn abort(tx: Transaction<'_, Postgres>, cause: StoreError) -> StoreError {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, cause = %cause, "transaction rollback failed");
    }
    cause
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            match db_err.code().as_deref() {
                Some("40001") | Some("40P01") => {
                    StoreError::Conflict(format!("{operation}: {message}"))
                }
                Some("23514") => StoreError::Domain(DomainError::invariant(format!(
                    "{operation}: {message}"
                ))),
                _ => StoreError::Database { operation, message },
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("{operation}: {err}"))
        }
        _ => StoreError::Database {
            operation,
            message: err.to_string(),
        },
    }
}

// SQLx row types

#[derive(Debug)]
struct ItemRow {
    id: Uuid,
    name: String,
    image: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            image: row.try_get("image")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<ItemRow> for Item {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, e: DomainError| {
            StoreError::Corrupt(format!("items.{field} for {}: {e}", row.id))
        };
        let name = ItemName::parse(&row.name).map_err(|e| corrupt("name", e))?;
        let image = row
            .image
            .as_deref()
            .map(ImageRef::parse)
            .transpose()
            .map_err(|e| corrupt("image", e))?;

        Ok(Item {
            id: ItemId::from_uuid(row.id),
            name,
            image,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug)]
struct StockRow {
    id: Uuid,
    item_id: Option<Uuid>,
    item_name_snapshot: String,
    expires_at: DateTime<Utc>,
    quantity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for StockRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(StockRow {
            id: row.try_get("id")?,
            item_id: row.try_get("item_id")?,
            item_name_snapshot: row.try_get("item_name_snapshot")?,
            expires_at: row.try_get("expires_at")?,
            quantity: row.try_get("quantity")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<StockRow> for Stock {
    type Error = StoreError;

    fn try_from(row: StockRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, e: DomainError| {
            StoreError::Corrupt(format!("stocks.{field} for {}: {e}", row.id))
        };
        let item_name_snapshot =
            ItemName::parse(&row.item_name_snapshot).map_err(|e| corrupt("item_name_snapshot", e))?;
        let quantity = Quantity::new(row.quantity).map_err(|e| corrupt("quantity", e))?;

        Ok(Stock {
            id: StockId::from_uuid(row.id),
            item_id: row.item_id.map(ItemId::from_uuid),
            item_name_snapshot,
            expiry_date: CalendarDate::from_instant(row.expires_at),
            quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn decode_item(row: &PgRow) -> Result<Item, StoreError> {
    let row = ItemRow::from_row(row).map_err(|e| StoreError::Corrupt(format!("items row: {e}")))?;
    Item::try_from(row)
}

fn decode_stock(row: &PgRow) -> Result<Stock, StoreError> {
    let row = StockRow::from_row(row).map_err(|e| StoreError::Corrupt(format!("stocks row: {e}")))?;
    Stock::try_from(row)
}
