#![allow(dead_code)]

pub use ordersync_infra::test_support::ScriptedTransport;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;

use ordersync_core::{ItemId, OrderId, StoreScope};
use ordersync_infra::queue::InMemoryOrderQueueStore;
use ordersync_infra::remote::{ApiResponse, OrderTransport, TransportError};
use ordersync_infra::test_support::{test_regions, test_store_config};
use ordersync_infra::OrderSyncProcessor;
use ordersync_orders::{
    LocalOrder, OrderItem, ProductType, ShippingTotals, SourceAddress, SyncStatus,
};

pub fn address(first_name: &str) -> SourceAddress {
    SourceAddress {
        company: None,
        first_name: first_name.to_string(),
        last_name: "Doe".to_string(),
        street: vec!["Hauptstrasse 1".to_string(), "Hinterhaus".to_string()],
        city: "Berlin".to_string(),
        country_id: "DE".to_string(),
        region_code: None,
        postcode: "10115".to_string(),
        telephone: Some("030 1234".to_string()),
    }
}

/// A pending order `seq` seconds after a fixed base time, with one simple item.
pub fn pending_order(seq: i64, reference: &str) -> LocalOrder {
    LocalOrder {
        id: OrderId::new(),
        increment_id: reference.to_string(),
        store_scope: StoreScope(1),
        status: SyncStatus::Pending,
        external_id: None,
        failure_reason: None,
        created_at: Utc::now() - Duration::hours(1) + Duration::seconds(seq),
        currency_code: "EUR".to_string(),
        customer_email: "jane@example.com".to_string(),
        billing_address: Some(address("Jane")),
        shipping_address: Some(address("Jane")),
        items: vec![OrderItem {
            item_id: ItemId(10),
            parent_item_id: None,
            sku: "MUG-WHITE".to_string(),
            product_type: ProductType::Simple,
            qty_ordered: 2.0,
            row_total: 25.0,
            tax_percent: 19.0,
            tax_amount: 4.75,
        }],
        shipping: ShippingTotals {
            amount: 4.9,
            tax_amount: 0.0,
        },
        tax_lines: None,
    }
}

pub fn processor<T: OrderTransport>(
    store: Arc<InMemoryOrderQueueStore>,
    transport: T,
) -> OrderSyncProcessor<Arc<InMemoryOrderQueueStore>, T> {
    OrderSyncProcessor::new(
        store,
        transport,
        Arc::new(test_store_config()),
        Arc::new(test_regions()),
    )
}

/// Accepts every order and records the references it was asked to create.
#[derive(Default)]
pub struct CountingTransport {
    next_id: AtomicU64,
    created: Mutex<Vec<String>>,
}

impl CountingTransport {
    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderTransport for CountingTransport {
    async fn post(&self, _resource: &str, body: Option<&Value>) -> Result<ApiResponse, TransportError> {
        tokio::task::yield_now().await;

        let reference = body
            .and_then(|b| b.get("externalOrderReference"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.created.lock().unwrap().push(reference);

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ApiResponse::new(201, format!(r#"{{"id":{id}}}"#)))
    }
}
