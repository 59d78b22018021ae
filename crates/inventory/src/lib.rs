//! Inventory domain module.
//!
//! Business rules for item master records and stock entries, implemented as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod image;
pub mod item;
pub mod stock;

pub use image::{encode_image, ImageRef, MAX_ENCODED_IMAGE_BYTES, MAX_IMAGE_INPUT_BYTES};
pub use item::{Item, ItemName, ItemPatch, NewItem, MAX_NAME_CHARS};
pub use stock::{ItemRef, NewStock, Quantity, QuantityDelta, Stock, StockPatch, StockSubject};
