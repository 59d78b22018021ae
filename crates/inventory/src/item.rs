use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, ItemId, ValueObject};

use crate::image::ImageRef;

/// Upper bound on item (and snapshot) names, counted in characters.
pub const MAX_NAME_CHARS: usize = 100;

/// Display name of an item. Trimmed, non-empty, at most `MAX_NAME_CHARS`.
///
/// Names are not unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemName(String);

impl ValueObject for ItemName {}

impl ItemName {
    pub fn parse(raw: impl AsRef<str>) -> DomainResult<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        let chars = trimmed.chars().count();
        if chars > MAX_NAME_CHARS {
            return Err(DomainError::validation(format!(
                "name must be at most {MAX_NAME_CHARS} characters (got {chars})"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ItemName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ItemName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ItemName> for String {
    fn from(value: ItemName) -> Self {
        value.0
    }
}

/// Item master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: ItemName,
    pub image: Option<ImageRef>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }
}

/// Input for creating an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: ItemName,
    pub image: Option<ImageRef>,
}

impl NewItem {
    pub fn new(name: ItemName, image: Option<ImageRef>) -> Self {
        Self { name, image }
    }

    /// Materialize the record with store-assigned id and timestamp.
    pub fn into_item(self, id: ItemId, now: DateTime<Utc>) -> Item {
        Item {
            id,
            name: self.name,
            image: self.image,
            created_at: now,
        }
    }
}

/// Field-level item update.
///
/// `image` is tri-state: `None` keeps the current image, `Some(None)` clears
/// it, `Some(Some(_))` replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPatch {
    name: Option<ItemName>,
    image: Option<Option<ImageRef>>,
}

impl ItemPatch {
    pub fn new(name: Option<ItemName>, image: Option<Option<ImageRef>>) -> DomainResult<Self> {
        if name.is_none() && image.is_none() {
            return Err(DomainError::validation(
                "item update must change at least one field",
            ));
        }
        Ok(Self { name, image })
    }

    pub fn name(&self) -> Option<&ItemName> {
        self.name.as_ref()
    }

    pub fn image(&self) -> Option<Option<&ImageRef>> {
        self.image.as_ref().map(Option::as_ref)
    }

    /// Apply the supplied fields; `id` and `created_at` are never touched.
    ///
    /// Stock snapshots of the old name are not refreshed here.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(image) = &self.image {
            item.image = image.clone();
        }
    }
}
