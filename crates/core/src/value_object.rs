//! Value object trait: equality by value, not identity.
//!
//! Addresses and monetary amounts are value objects: two addresses with the
//! same lines are the same address, no matter which order they came from.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct Money {
///     amount: f64,
///     currency: String,
/// }
///
/// impl ValueObject for Money {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
