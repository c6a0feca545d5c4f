//! Domain layer: the order aggregate and its status state machine.
//!
//! The aggregate owns its line items and keeps `total == Σ(price × quantity)`
//! after every mutation. Cross-entity rules (price snapshots, inventory
//! activity) live in the `workflow` crate.

mod error;
mod item;
mod order;
mod status;
mod version;

pub use error::OrderError;
pub use item::OrderItem;
pub use order::Order;
pub use status::OrderStatus;
pub use version::Version;
