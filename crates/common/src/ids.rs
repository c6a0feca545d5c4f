use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing an identifier from text.
#[derive(Debug, Error)]
#[error("invalid id '{value}': must be a positive integer")]
pub struct IdParseError {
    pub value: String,
}

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        ///
        /// Wraps an `i64` assigned by the order store. Newtyping prevents
        /// mixing up the different identifier spaces.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from a raw database value.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Parses an identifier from text, requiring a positive integer.
            pub fn parse(value: &str) -> Result<Self, IdParseError> {
                match value.trim().parse::<i64>() {
                    Ok(id) if id > 0 => Ok(Self(id)),
                    _ => Err(IdParseError {
                        value: value.to_string(),
                    }),
                }
            }

            /// Returns the underlying integer value.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for an order.
    OrderId
);

define_id!(
    /// Unique identifier for a line item within an order.
    OrderItemId
);

define_id!(
    /// Unique identifier for the client that placed an order.
    UserId
);

define_id!(
    /// Unique identifier for the business selling the bags.
    BusinessId
);

define_id!(
    /// Unique identifier for a sellable inventory unit (a "bag").
    UnitId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_positive_integers() {
        let id = OrderId::parse("42").unwrap();
        assert_eq!(id.as_i64(), 42);
    }

    #[test]
    fn parse_trims_whitespace() {
        let id = OrderId::parse(" 7 ").unwrap();
        assert_eq!(id.as_i64(), 7);
    }

    #[test]
    fn parse_rejects_zero_and_negative() {
        assert!(OrderId::parse("0").is_err());
        assert!(OrderId::parse("-3").is_err());
    }

    #[test]
    fn parse_rejects_non_numeric() {
        assert!(OrderId::parse("abc").is_err());
        assert!(OrderId::parse("").is_err());
        assert!(OrderId::parse("1.5").is_err());
    }

    #[test]
    fn ids_are_distinct_types() {
        let order = OrderId::new(1);
        let unit = UnitId::new(1);
        assert_eq!(order.as_i64(), unit.as_i64());
    }

    #[test]
    fn serialization_is_transparent() {
        let id = UnitId::new(99);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "99");
        let back: UnitId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
