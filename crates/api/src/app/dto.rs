use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use stockroom_core::{CalendarDate, DomainError, DomainResult, ItemId};
use stockroom_inventory::{
    ImageRef, Item, ItemName, ItemPatch, ItemRef, NewItem, NewStock, Quantity, QuantityDelta,
    Stock, StockPatch,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    /// Absent keeps the image, `null` clears it, a string replaces it.
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStockRequest {
    pub item_id: Option<String>,
    pub item_name: Option<String>,
    pub expiry_date: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStockRequest {
    pub item_id: Option<String>,
    pub item_name: Option<String>,
    pub expiry_date: Option<String>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustQuantityRequest {
    pub delta: i64,
}

fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

// -------------------------
// Request -> domain
// -------------------------

impl CreateItemRequest {
    pub fn into_domain(self) -> DomainResult<NewItem> {
        let name = ItemName::parse(&self.name)?;
        let image = self.image.map(ImageRef::parse).transpose()?;
        Ok(NewItem::new(name, image))
    }
}

impl UpdateItemRequest {
    pub fn into_domain(self) -> DomainResult<ItemPatch> {
        let name = self.name.map(ItemName::parse).transpose()?;
        let image = self
            .image
            .map(|image| image.map(ImageRef::parse).transpose())
            .transpose()?;
        ItemPatch::new(name, image)
    }
}

impl CreateStockRequest {
    pub fn into_domain(self) -> DomainResult<NewStock> {
        let item = ItemRef::from_fields(
            parse_item_id(self.item_id)?,
            self.item_name.map(ItemName::parse).transpose()?,
        )?;
        let expiry_date: CalendarDate = self.expiry_date.parse()?;
        let quantity = Quantity::new(self.quantity)?;
        Ok(NewStock::new(item, expiry_date, quantity))
    }
}

impl UpdateStockRequest {
    pub fn into_domain(self) -> DomainResult<StockPatch> {
        let item = ItemRef::optional_from_fields(
            parse_item_id(self.item_id)?,
            self.item_name.map(ItemName::parse).transpose()?,
        )?;
        let expiry_date = self
            .expiry_date
            .map(|d| d.parse::<CalendarDate>())
            .transpose()?;
        let quantity = self.quantity.map(Quantity::new).transpose()?;
        StockPatch::new(item, expiry_date, quantity)
    }
}

impl AdjustQuantityRequest {
    pub fn into_domain(self) -> DomainResult<QuantityDelta> {
        QuantityDelta::new(self.delta)
    }
}

fn parse_item_id(raw: Option<String>) -> DomainResult<Option<ItemId>> {
    raw.map(|s| {
        s.trim()
            .parse::<ItemId>()
            .map_err(|_| DomainError::validation(format!("item_id '{s}' is not a valid id")))
    })
    .transpose()
}

// -------------------------
// Domain -> JSON
// -------------------------

pub fn item_to_json(item: &Item) -> Value {
    json!({
        "id": item.id.to_string(),
        "name": item.name.as_str(),
        "image": item.image.as_ref().map(ImageRef::as_str),
        "created_at": item.created_at.to_rfc3339(),
    })
}

pub fn stock_to_json(stock: &Stock) -> Value {
    json!({
        "id": stock.id.to_string(),
        "item_id": stock.item_id.map(|id| id.to_string()),
        "item_name_snapshot": stock.item_name_snapshot.as_str(),
        "expiry_date": stock.expiry_date.to_string(),
        "quantity": stock.quantity.value(),
        "created_at": stock.created_at.to_rfc3339(),
        "updated_at": stock.updated_at.to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_item_image_is_tri_state() {
        let absent: UpdateItemRequest = serde_json::from_str(r#"{"name":"Tea"}"#).unwrap();
        assert_eq!(absent.image, None);

        let cleared: UpdateItemRequest = serde_json::from_str(r#"{"image":null}"#).unwrap();
        assert_eq!(cleared.image, Some(None));

        let set: UpdateItemRequest =
            serde_json::from_str(r#"{"image":"https://example.com/tea.png"}"#).unwrap();
        assert_eq!(
            set.image,
            Some(Some("https://example.com/tea.png".to_string()))
        );

        let patch = cleared.into_domain().unwrap();
        assert_eq!(patch.image(), Some(None));
    }

    #[test]
    fn empty_update_is_rejected() {
        let req: UpdateStockRequest = serde_json::from_str("{}").unwrap();
        assert!(matches!(req.into_domain(), Err(DomainError::Validation(_))));

        let req: UpdateItemRequest = serde_json::from_str("{}").unwrap();
        assert!(matches!(req.into_domain(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn stock_request_requires_exactly_one_item_reference() {
        let both = CreateStockRequest {
            item_id: Some(ItemId::new().to_string()),
            item_name: Some("Milk".into()),
            expiry_date: "2026-02-07".into(),
            quantity: 1,
        };
        assert!(matches!(both.into_domain(), Err(DomainError::Validation(_))));

        let neither = CreateStockRequest {
            item_id: None,
            item_name: None,
            expiry_date: "2026-02-07".into(),
            quantity: 1,
        };
        assert!(matches!(neither.into_domain(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn stock_request_rejects_bad_dates_and_ids() {
        let bad_date = CreateStockRequest {
            item_id: None,
            item_name: Some("Milk".into()),
            expiry_date: "2026-02-30".into(),
            quantity: 1,
        };
        assert!(matches!(bad_date.into_domain(), Err(DomainError::Validation(_))));

        let bad_id = CreateStockRequest {
            item_id: Some("nope".into()),
            item_name: None,
            expiry_date: "2026-02-07".into(),
            quantity: 1,
        };
        assert!(matches!(bad_id.into_domain(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn stock_json_uses_calendar_date() {
        let stock = CreateStockRequest {
            item_id: None,
            item_name: Some("Milk".into()),
            expiry_date: "2026-02-07".into(),
            quantity: 3,
        }
        .into_domain()
        .unwrap()
        .into_stock(stockroom_core::StockId::new(), None, chrono::Utc::now())
        .unwrap();

        let json = stock_to_json(&stock);
        assert_eq!(json["expiry_date"], "2026-02-07");
        assert_eq!(json["item_id"], Value::Null);
        assert_eq!(json["item_name_snapshot"], "Milk");
        assert_eq!(json["quantity"], 3);
    }
}
