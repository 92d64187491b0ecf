//! Strongly-typed integer surrogate keys.
//!
//! Every table uses a store-generated `BIGINT` key. Records built in memory
//! before their first insert carry the unassigned key (`0`); the store hands
//! back the generated key from `insert`.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Common behaviour of all surrogate keys, used by generic store adapters.
pub trait SurrogateKey:
    Copy + Eq + Ord + core::hash::Hash + core::fmt::Debug + core::fmt::Display + Send + Sync + 'static
{
    fn from_raw(raw: i64) -> Self;

    fn raw(self) -> i64;

    fn is_assigned(self) -> bool {
        self.raw() > 0
    }
}

/// Identifier of a user (account owner of orders and notifications).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

/// Identifier of a product category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(i64);

/// Identifier of a catalog product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i64);

/// Identifier of an order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(i64);

/// Identifier of an order line item.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderDetailId(i64);

/// Identifier of a notification.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(i64);

macro_rules! impl_surrogate_key {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Key of a record that has not been inserted yet.
            pub const UNASSIGNED: Self = Self(0);

            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl SurrogateKey for $t {
            fn from_raw(raw: i64) -> Self {
                Self(raw)
            }

            fn raw(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| DomainError::validation(format!("{}: {}", $name, e)))?;
                if raw <= 0 {
                    return Err(DomainError::validation(format!(
                        "{}: must be positive, got {raw}",
                        $name
                    )));
                }
                Ok(Self(raw))
            }
        }
    };
}

impl_surrogate_key!(UserId, "UserId");
impl_surrogate_key!(CategoryId, "CategoryId");
impl_surrogate_key!(ProductId, "ProductId");
impl_surrogate_key!(OrderId, "OrderId");
impl_surrogate_key!(OrderDetailId, "OrderDetailId");
impl_surrogate_key!(NotificationId, "NotificationId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_keys() {
        let id: OrderId = "42".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert!(id.is_assigned());
    }

    #[test]
    fn rejects_zero_and_garbage() {
        assert!("0".parse::<UserId>().is_err());
        assert!("-3".parse::<UserId>().is_err());
        assert!("abc".parse::<UserId>().is_err());
    }

    #[test]
    fn unassigned_key_is_not_assigned() {
        assert!(!ProductId::UNASSIGNED.is_assigned());
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&CategoryId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
