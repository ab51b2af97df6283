//! Order synchronization domain module.
//!
//! This crate contains the business rules for turning a locally placed order
//! into the canonical fulfillment payload, implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod order;
pub mod payload;
pub mod status;
pub mod store_config;
pub mod transformer;

pub use order::{LocalOrder, OrderItem, ProductType, ShippingTotals, SourceAddress, TaxLine, TaxableItemType};
pub use payload::{
    CanonicalPayload, CustomerPrice, CustomerTaxType, OrderState, PayloadAddress, PayloadItem,
    ShippingBlock, ShippingType,
};
pub use status::SyncStatus;
pub use store_config::{
    OriginAddress, RegionDirectory, StoreConfig, StoreConfigError, StoreConfigProvider,
};
pub use transformer::OrderTransformer;
