//! `stockroom-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod calendar;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use calendar::CalendarDate;
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ItemId, StockId};
pub use value_object::ValueObject;
