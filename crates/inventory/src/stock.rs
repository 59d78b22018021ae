use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{CalendarDate, DomainError, DomainResult, Entity, ItemId, StockId, ValueObject};

use crate::item::ItemName;

/// Stock quantity. Never negative.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(i64);

impl ValueObject for Quantity {}

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    pub fn new(value: i64) -> DomainResult<Self> {
        if value < 0 {
            return Err(DomainError::validation(format!(
                "quantity cannot be negative (got {value})"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// The adjuster rule: `current + delta`, refusing anything below zero.
    pub fn apply(self, delta: QuantityDelta) -> DomainResult<Quantity> {
        let next = self.0.checked_add(delta.0).ok_or_else(|| {
            DomainError::invariant(format!(
                "quantity overflow (current {}, delta {})",
                self.0, delta.0
            ))
        })?;
        if next < 0 {
            return Err(DomainError::invariant(format!(
                "quantity cannot go negative (current {}, delta {})",
                self.0, delta.0
            )));
        }
        Ok(Quantity(next))
    }
}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

/// Signed, non-zero quantity adjustment.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct QuantityDelta(i64);

impl QuantityDelta {
    pub fn new(value: i64) -> DomainResult<Self> {
        if value == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// How a stock write names its item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemRef {
    /// Reference an item master record; its current name is snapshotted.
    Id(ItemId),
    /// Free-text entry; stored as-is with no item id.
    Name(ItemName),
}

impl ItemRef {
    /// Build a reference from the two mutually exclusive request fields.
    pub fn from_fields(item_id: Option<ItemId>, item_name: Option<ItemName>) -> DomainResult<Self> {
        Self::optional_from_fields(item_id, item_name)?.ok_or_else(|| {
            DomainError::validation("an item reference (item_id or item_name) is required")
        })
    }

    /// Like `from_fields`, but absence of both is allowed (update paths).
    pub fn optional_from_fields(
        item_id: Option<ItemId>,
        item_name: Option<ItemName>,
    ) -> DomainResult<Option<Self>> {
        match (item_id, item_name) {
            (Some(_), Some(_)) => Err(DomainError::validation(
                "provide either item_id or item_name, not both",
            )),
            (Some(id), None) => Ok(Some(Self::Id(id))),
            (None, Some(name)) => Ok(Some(Self::Name(name))),
            (None, None) => Ok(None),
        }
    }

    /// The item id a store must resolve before writing, if any.
    pub fn item_id(&self) -> Option<ItemId> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Name(_) => None,
        }
    }

    /// Take the snapshot for a stock write.
    ///
    /// `current_name` is the referenced item's name as read inside the same
    /// store write (ignored for free-text references). A missing item is a
    /// `ReferenceNotFound` error.
    pub fn snapshot(&self, current_name: Option<&ItemName>) -> DomainResult<StockSubject> {
        match self {
            Self::Id(id) => {
                let name = current_name.ok_or_else(|| {
                    DomainError::reference_not_found(format!("item {id} does not exist"))
                })?;
                Ok(StockSubject {
                    item_id: Some(*id),
                    item_name_snapshot: name.clone(),
                })
            }
            Self::Name(name) => Ok(StockSubject {
                item_id: None,
                item_name_snapshot: name.clone(),
            }),
        }
    }
}

/// The item-facing part of a stock record: reference plus name snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockSubject {
    pub item_id: Option<ItemId>,
    pub item_name_snapshot: ItemName,
}

/// Stock entry.
///
/// `item_name_snapshot` is a copy taken at write time. It is not kept live:
/// renaming or deleting the referenced item leaves it untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub id: StockId,
    pub item_id: Option<ItemId>,
    pub item_name_snapshot: ItemName,
    pub expiry_date: CalendarDate,
    pub quantity: Quantity,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Stock {
    type Id = StockId;

    fn id(&self) -> StockId {
        self.id
    }
}

impl Stock {
    /// Apply a quantity adjustment. On error the stock is left unchanged.
    pub fn adjust(&mut self, delta: QuantityDelta, now: DateTime<Utc>) -> DomainResult<()> {
        self.quantity = self.quantity.apply(delta)?;
        self.updated_at = now;
        Ok(())
    }
}

/// Input for creating a stock entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStock {
    pub item: ItemRef,
    pub expiry_date: CalendarDate,
    pub quantity: Quantity,
}

impl NewStock {
    pub fn new(item: ItemRef, expiry_date: CalendarDate, quantity: Quantity) -> Self {
        Self {
            item,
            expiry_date,
            quantity,
        }
    }

    /// Materialize the record; see `ItemRef::snapshot` for `current_name`.
    pub fn into_stock(
        self,
        id: StockId,
        current_name: Option<&ItemName>,
        now: DateTime<Utc>,
    ) -> DomainResult<Stock> {
        let subject = self.item.snapshot(current_name)?;
        Ok(Stock {
            id,
            item_id: subject.item_id,
            item_name_snapshot: subject.item_name_snapshot,
            expiry_date: self.expiry_date,
            quantity: self.quantity,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Field-level stock update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockPatch {
    item: Option<ItemRef>,
    expiry_date: Option<CalendarDate>,
    quantity: Option<Quantity>,
}

impl StockPatch {
    pub fn new(
        item: Option<ItemRef>,
        expiry_date: Option<CalendarDate>,
        quantity: Option<Quantity>,
    ) -> DomainResult<Self> {
        if item.is_none() && expiry_date.is_none() && quantity.is_none() {
            return Err(DomainError::validation(
                "stock update must change at least one field",
            ));
        }
        Ok(Self {
            item,
            expiry_date,
            quantity,
        })
    }

    pub fn item(&self) -> Option<&ItemRef> {
        self.item.as_ref()
    }

    pub fn expiry_date(&self) -> Option<CalendarDate> {
        self.expiry_date
    }

    pub fn quantity(&self) -> Option<Quantity> {
        self.quantity
    }

    /// Apply the supplied fields and refresh `updated_at`.
    ///
    /// When the patch carries an item reference the snapshot is re-taken from
    /// `current_name`; otherwise the existing reference and snapshot are kept.
    /// On error the stock is left unchanged.
    pub fn apply_to(
        &self,
        stock: &mut Stock,
        current_name: Option<&ItemName>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let subject = self
            .item
            .as_ref()
            .map(|item| item.snapshot(current_name))
            .transpose()?;

        if let Some(subject) = subject {
            stock.item_id = subject.item_id;
            stock.item_name_snapshot = subject.item_name_snapshot;
        }
        if let Some(expiry_date) = self.expiry_date {
            stock.expiry_date = expiry_date;
        }
        if let Some(quantity) = self.quantity {
            stock.quantity = quantity;
        }
        stock.updated_at = now;
        Ok(())
    }
}
