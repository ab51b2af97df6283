//! Builders and doubles for tests of this crate and its dependents.
//!
//! Compiled for unit tests and behind the `test-support` feature.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use ordersync_core::{ItemId, OrderId, StoreScope};
use ordersync_orders::store_config::paths;
use ordersync_orders::{
    LocalOrder, OrderItem, ProductType, ShippingTotals, SourceAddress, SyncStatus, TaxLine,
    TaxableItemType,
};

use crate::remote::{ApiResponse, OrderTransport, TransportError};
use crate::store_config::{InMemoryRegionDirectory, InMemoryStoreConfig};

/// A pending order with one simple item, a shipping address and no billing address.
pub fn order_created_at(created_at: DateTime<Utc>) -> LocalOrder {
    LocalOrder {
        id: OrderId::new(),
        increment_id: "000000101".to_string(),
        store_scope: StoreScope(1),
        status: SyncStatus::Pending,
        external_id: None,
        failure_reason: None,
        created_at,
        currency_code: "EUR".to_string(),
        customer_email: "jane@example.com".to_string(),
        billing_address: None,
        shipping_address: Some(SourceAddress {
            company: None,
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            street: vec!["Hauptstrasse 1".to_string()],
            city: "Berlin".to_string(),
            country_id: "DE".to_string(),
            region_code: Some("BE".to_string()),
            postcode: "10115".to_string(),
            telephone: Some("+49 30 1234".to_string()),
        }),
        items: vec![OrderItem {
            item_id: ItemId(1),
            parent_item_id: None,
            sku: "TSHIRT-M".to_string(),
            product_type: ProductType::Simple,
            qty_ordered: 1.0,
            row_total: 19.99,
            tax_percent: 19.0,
            tax_amount: 3.8,
        }],
        shipping: ShippingTotals {
            amount: 4.9,
            tax_amount: 0.93,
        },
        tax_lines: Some(vec![TaxLine {
            taxable_item_type: TaxableItemType::Shipping,
            tax_percent: 19.0,
        }]),
    }
}

/// Store configuration with a complete origin address in the default scope.
pub fn test_store_config() -> InMemoryStoreConfig {
    InMemoryStoreConfig::new()
        .with_value(StoreScope::DEFAULT, paths::STORE_NAME, "Print Shop")
        .with_value(StoreScope::DEFAULT, paths::STREET_LINE1, "Werkstrasse 3")
        .with_value(StoreScope::DEFAULT, paths::CITY, "Leipzig")
        .with_value(StoreScope::DEFAULT, paths::COUNTRY_ID, "DE")
        .with_value(StoreScope::DEFAULT, paths::REGION_ID, "91")
        .with_value(StoreScope::DEFAULT, paths::POSTCODE, "04109")
}

pub fn test_regions() -> InMemoryRegionDirectory {
    InMemoryRegionDirectory::new().with_region("91", "SN")
}

/// Transport that replays scripted responses in order and records requests.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
    requests: Mutex<Vec<(String, Option<Value>)>>,
}

impl ScriptedTransport {
    pub fn arc(responses: Vec<Result<ApiResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<(String, Option<Value>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderTransport for ScriptedTransport {
    async fn post(&self, resource: &str, body: Option<&Value>) -> Result<ApiResponse, TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push((resource.to_string(), body.cloned()));

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted response".to_string())))
    }
}
