//! Mapping from a local order to the canonical fulfillment payload.
//!
//! The transformer is a pure function of `(LocalOrder, StoreConfig)`: it keeps
//! no state and performs no IO, so identical inputs serialize to identical
//! bytes.

use ordersync_core::{DomainError, DomainResult};

use crate::order::{LocalOrder, OrderItem, ProductType, SourceAddress, TaxLine, TaxableItemType};
use crate::payload::{
    CanonicalPayload, CustomerPrice, CustomerTaxType, OrderState, PayloadAddress, PayloadItem,
    ShippingBlock, ShippingType,
};
use crate::store_config::StoreConfig;

/// Builds [`CanonicalPayload`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderTransformer;

impl OrderTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Build the submission payload for `order`.
    ///
    /// Fails only when the order has no shipping address.
    pub fn transform(&self, order: &LocalOrder, config: &StoreConfig) -> DomainResult<CanonicalPayload> {
        let shipping_address = order.shipping_address.as_ref().ok_or_else(|| {
            DomainError::validation(format!(
                "order {} has no shipping address",
                order.increment_id
            ))
        })?;

        Ok(CanonicalPayload {
            order_items: line_items(order),
            billing_address: order.billing_address.as_ref().map(address),
            shipping: ShippingBlock {
                address: address(shipping_address),
                preferred_type: ShippingType::default(),
                customer_price: CustomerPrice {
                    amount: order.shipping.amount,
                    tax_rate: shipping_tax_rate(order.tax_lines.as_deref()),
                    tax_amount: order.shipping.tax_amount,
                    currency: order.currency_code.clone(),
                },
                from_address: PayloadAddress::from(&config.origin),
            },
            phone: order
                .billing_address
                .as_ref()
                .and_then(|b| b.telephone.clone())
                .unwrap_or_default(),
            email: order.customer_email.clone(),
            external_order_reference: order.increment_id.clone(),
            state: OrderState::New,
            customer_tax_type: CustomerTaxType::NotTaxable,
        })
    }
}

/// One entry per purchased simple row, priced from its composite parent when it
/// has one.
pub fn line_items(order: &LocalOrder) -> Vec<PayloadItem> {
    order
        .items
        .iter()
        .filter(|item| item.product_type == ProductType::Simple)
        .map(|item| {
            let priced = rollup_source(order, item);
            PayloadItem {
                sku: item.sku.clone(),
                quantity: item.qty_ordered.trunc() as i64,
                external_order_item_reference: item.item_id.to_string(),
                customer_price: CustomerPrice {
                    amount: priced.row_total,
                    tax_rate: priced.tax_percent,
                    tax_amount: priced.tax_amount,
                    currency: order.currency_code.clone(),
                },
            }
        })
        .collect()
}

/// The row whose money applies to `item`: its composite parent if present,
/// otherwise the row itself.
fn rollup_source<'a>(order: &'a LocalOrder, item: &'a OrderItem) -> &'a OrderItem {
    item.parent_item_id
        .and_then(|parent_id| order.item(parent_id))
        .filter(|parent| parent.product_type.is_composite())
        .unwrap_or(item)
}

/// Percentage of the first tax line that applies to shipping, 0 otherwise.
pub fn shipping_tax_rate(tax_lines: Option<&[TaxLine]>) -> f64 {
    tax_lines
        .unwrap_or_default()
        .iter()
        .find(|line| line.taxable_item_type == TaxableItemType::Shipping)
        .map_or(0.0, |line| line.tax_percent)
}

fn address(source: &SourceAddress) -> PayloadAddress {
    PayloadAddress {
        company: source
            .company
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_default(),
        first_name: source.first_name.clone(),
        last_name: source.last_name.clone(),
        street: source.street.first().cloned().unwrap_or_default(),
        street_annex: source.street.get(1).cloned(),
        city: source.city.clone(),
        country: source.country_id.clone(),
        state: source
            .region_code
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_default(),
        zip_code: source.postcode.clone(),
    }
}
