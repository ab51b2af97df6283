//! Local order snapshot as read from the synchronization queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ordersync_core::{Entity, ExternalOrderId, ItemId, OrderId, StoreScope, ValueObject};

use crate::status::SyncStatus;

/// Catalog product type of a purchased row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Simple,
    Configurable,
    Bundle,
    Grouped,
    Virtual,
    Downloadable,
    /// Any type this system does not know (e.g. gift cards); never shipped.
    #[serde(other)]
    Other,
}

impl ProductType {
    /// Composite rows aggregate the monetary totals of their constituent rows.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            ProductType::Configurable | ProductType::Bundle | ProductType::Grouped
        )
    }
}

/// A purchased row of an order.
///
/// Composite products appear as a parent row (carrying the money) plus one
/// child row per constituent (carrying SKU and quantity, zeroed money).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_id: ItemId,
    pub parent_item_id: Option<ItemId>,
    pub sku: String,
    pub product_type: ProductType,
    pub qty_ordered: f64,
    pub row_total: f64,
    pub tax_percent: f64,
    pub tax_amount: f64,
}

/// Address as stored on the local order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAddress {
    pub company: Option<String>,
    pub first_name: String,
    pub last_name: String,
    /// Street lines in order; the first is the street, the second the annex.
    pub street: Vec<String>,
    pub city: String,
    pub country_id: String,
    pub region_code: Option<String>,
    pub postcode: String,
    pub telephone: Option<String>,
}

impl ValueObject for SourceAddress {}

/// Which part of the order a tax line applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxableItemType {
    Product,
    Shipping,
    #[serde(other)]
    Other,
}

/// One applied tax rate of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxLine {
    pub taxable_item_type: TaxableItemType,
    pub tax_percent: f64,
}

/// Shipping totals of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingTotals {
    pub amount: f64,
    pub tax_amount: f64,
}

/// A locally placed order together with its synchronization state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalOrder {
    pub id: OrderId,
    /// Human-readable order number shown to customers.
    pub increment_id: String,
    pub store_scope: StoreScope,
    pub status: SyncStatus,
    pub external_id: Option<ExternalOrderId>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub currency_code: String,
    pub customer_email: String,
    pub billing_address: Option<SourceAddress>,
    pub shipping_address: Option<SourceAddress>,
    pub items: Vec<OrderItem>,
    pub shipping: ShippingTotals,
    /// `None` when the order's tax lines could not be loaded.
    pub tax_lines: Option<Vec<TaxLine>>,
}

impl LocalOrder {
    /// Look up a row of this order by id.
    pub fn item(&self, id: ItemId) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.item_id == id)
    }
}

impl Entity for LocalOrder {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
