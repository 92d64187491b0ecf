//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values
/// (e.g. a price in cents, a line-item quantity). Constructors validate, so a
/// value object that exists is always well-formed.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
