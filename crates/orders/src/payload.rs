//! Canonical submission payload for the fulfillment API.
//!
//! Field names follow the remote wire format (camelCase). Optional fields are
//! omitted from the JSON entirely rather than sent as `null`.

use serde::{Deserialize, Serialize};

use ordersync_core::ValueObject;

/// Remote lifecycle state a new order is created in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    #[default]
    New,
}

/// Requested shipping service level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingType {
    #[default]
    Standard,
    Express,
    Premium,
}

/// Tax classification of the buyer.
///
/// Only `NotTaxable` is ever produced; per-jurisdiction resolution is not done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerTaxType {
    #[default]
    NotTaxable,
    Taxable,
}

/// Monetary block attached to items and shipping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPrice {
    pub amount: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub currency: String,
}

impl ValueObject for CustomerPrice {}

/// Address block; used for billing, shipping and origin alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadAddress {
    /// Never absent; empty when unknown.
    pub company: String,
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_annex: Option<String>,
    pub city: String,
    pub country: String,
    /// Region code; empty when unresolved.
    pub state: String,
    pub zip_code: String,
}

impl ValueObject for PayloadAddress {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadItem {
    pub sku: String,
    pub quantity: i64,
    pub external_order_item_reference: String,
    pub customer_price: CustomerPrice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingBlock {
    pub address: PayloadAddress,
    pub preferred_type: ShippingType,
    pub customer_price: CustomerPrice,
    pub from_address: PayloadAddress,
}

/// The normalized order submitted to the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalPayload {
    pub order_items: Vec<PayloadItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<PayloadAddress>,
    pub shipping: ShippingBlock,
    pub phone: String,
    pub email: String,
    pub external_order_reference: String,
    pub state: OrderState,
    pub customer_tax_type: CustomerTaxType,
}

impl CanonicalPayload {
    /// JSON request body. Field order is fixed by the struct layout.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(annex: Option<&str>) -> PayloadAddress {
        PayloadAddress {
            company: String::new(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            street: "Main St 1".to_string(),
            street_annex: annex.map(str::to_string),
            city: "Leipzig".to_string(),
            country: "DE".to_string(),
            state: String::new(),
            zip_code: "04109".to_string(),
        }
    }

    #[test]
    fn markers_use_wire_spelling() {
        assert_eq!(serde_json::to_value(OrderState::New).unwrap(), "NEW");
        assert_eq!(serde_json::to_value(ShippingType::Standard).unwrap(), "STANDARD");
        assert_eq!(
            serde_json::to_value(CustomerTaxType::NotTaxable).unwrap(),
            "NOT_TAXABLE"
        );
    }

    #[test]
    fn address_keys_are_camel_case_and_annex_is_omitted_when_absent() {
        let json = serde_json::to_value(address(None)).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("firstName"));
        assert!(obj.contains_key("zipCode"));
        assert!(!obj.contains_key("streetAnnex"));
        assert_eq!(obj["company"], "");

        let json = serde_json::to_value(address(Some("Hinterhaus"))).unwrap();
        assert_eq!(json["streetAnnex"], "Hinterhaus");
    }
}
