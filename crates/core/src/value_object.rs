//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**: two value objects with the same
//! attributes are equal. `ItemName`, `Quantity`, `CalendarDate` and
//! `ImageRef` are value objects; `Item` and `Stock` are entities.

/// Marker trait for value objects.
///
/// Value objects are immutable once constructed. Their constructors are the
/// only place validation happens, so holding one means holding a valid value.
/// To "modify" a field, replace the whole value.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
