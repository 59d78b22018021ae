//! Item/stock storage boundary.
//!
//! `InventoryStore` is the port; `InMemoryInventoryStore` serves tests/dev and
//! `PostgresInventoryStore` is the persistent backend.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;
pub use r#trait::{sort_items, sort_stocks, InventoryStore, StoreError};
