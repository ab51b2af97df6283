//! Synchronization queue of local orders.
//!
//! - `OrderQueueStore`: the storage contract the processor depends on
//! - `InMemoryOrderQueueStore`: tests/dev
//! - `PgOrderQueueStore`: durable, safe for concurrent processor instances

pub mod postgres;
pub mod store;

pub use postgres::PgOrderQueueStore;
pub use store::{InMemoryOrderQueueStore, OrderQueueStore, QueueStoreError};
