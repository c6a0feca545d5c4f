//! Order store: durable storage for orders and their line items.
//!
//! The store is the system of record and the only component that assigns
//! final identities. Updates are compare-and-swap on the order's version, so
//! interleaved read-modify-write cycles surface as conflicts instead of lost
//! updates.

mod error;
mod memory;
mod postgres;
mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::OrderStore;
