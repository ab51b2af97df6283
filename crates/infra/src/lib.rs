//! Infrastructure layer: order queue storage, fulfillment API client, sync processing.

pub mod config;
pub mod processor;
pub mod queue;
pub mod remote;
pub mod scheduler;
pub mod store_config;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{database_url_from_env, ConfigError, SyncConfig};
pub use processor::{BatchReport, OrderSyncProcessor, SyncError};
pub use scheduler::{SchedulerHandle, SchedulerStats, SyncScheduler};
pub use store_config::{
    load_store_config, parse_store_config, InMemoryRegionDirectory, InMemoryStoreConfig,
    StoreConfigLoadError,
};
