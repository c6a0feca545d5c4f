//! Shared types for the marketplace order engine.

mod ids;
mod money;

pub use ids::{BusinessId, IdParseError, OrderId, OrderItemId, UnitId, UserId};
pub use money::Money;
