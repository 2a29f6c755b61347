//! Runtime facts a condition is evaluated against.

use serde::{Deserialize, Serialize};

/// A resolved cart line: the product and the collections it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product ID.
    pub product_id: String,
    /// IDs of every collection containing the product.
    #[serde(default)]
    pub collection_ids: Vec<String>,
}

impl CartLine {
    /// Create a cart line for `product_id` in `collection_ids`.
    #[must_use]
    pub fn new(product_id: impl Into<String>, collection_ids: &[&str]) -> Self {
        Self {
            product_id: product_id.into(),
            collection_ids: collection_ids.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}

/// Eligibility context for one cart and customer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationContext {
    /// Cart subtotal.
    pub cart_total: f64,
    /// Total item quantity.
    pub cart_quantity: u32,
    /// Total cart weight.
    pub cart_weight: f64,
    /// Orders previously placed by the customer.
    pub order_count: u32,
    /// Shipping country code.
    pub country: Option<String>,
    /// Shipping postal code.
    pub postal_code: Option<String>,
    /// Customer tags.
    pub customer_tags: Vec<String>,
    /// Whether the customer is logged in.
    pub logged_in: bool,
    /// Resolved cart contents.
    pub cart_lines: Vec<CartLine>,
}
