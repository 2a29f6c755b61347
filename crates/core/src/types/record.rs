//! Discount records: the unit of local configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::condition::{Condition, ConditionType};
use super::id::{RecordId, RemoteRef};
use super::status::RecordState;

/// How `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
    /// `value` is a percentage in `0..=100`.
    Percentage,
    /// `value` is an amount in the shop currency.
    FixedAmount,
}

impl std::str::FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixedAmount" | "fixed_amount" => Ok(Self::FixedAmount),
            _ => Err(format!("invalid value kind: {s}")),
        }
    }
}

/// Discount class, as the platform sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// Order-level discount.
    #[default]
    Order,
    /// Shipping discount.
    Shipping,
}

impl std::str::FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ORDER" => Ok(Self::Order),
            "SHIPPING" => Ok(Self::Shipping),
            _ => Err(format!("invalid classification: {s}")),
        }
    }
}

/// How a customer receives the discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Activation {
    /// Applied automatically at checkout.
    #[default]
    Automatic,
    /// Applied when the customer enters `code`.
    Code,
}

impl std::str::FromStr for Activation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "automatic" => Ok(Self::Automatic),
            "code" => Ok(Self::Code),
            _ => Err(format!("invalid activation: {s}")),
        }
    }
}

/// Which other discount classes this one may stack with.
// Allow: each flag is an independent platform setting with no grouping.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombineFlags {
    /// Can combine with order discounts.
    #[serde(default)]
    pub order_discounts: bool,
    /// Can combine with product discounts.
    #[serde(default)]
    pub product_discounts: bool,
    /// Can combine with shipping discounts.
    #[serde(default)]
    pub shipping_discounts: bool,
}

/// Invariant violations on a [`DiscountRecord`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// The record has no name.
    #[error("record {id}: name cannot be empty")]
    EmptyName { id: RecordId },
    /// Code activation without a code.
    #[error("record {id}: code activation requires a non-empty code")]
    MissingCode { id: RecordId },
    /// Automatic activation with a code attached.
    #[error("record {id}: automatic discounts cannot carry a code")]
    UnexpectedCode { id: RecordId },
    /// Shipping discounts may not combine with other shipping discounts.
    #[error("record {id}: shipping discounts cannot combine with shipping discounts")]
    ShippingCombinesWithShipping { id: RecordId },
    /// The value is negative, not finite, or an out-of-range percentage.
    #[error("record {id}: invalid value {value}")]
    InvalidValue { id: RecordId, value: f64 },
    /// A condition pairs a type with an operator it does not support.
    #[error("record {id}: condition {condition_id} has unsupported operator {operator} for {condition_type}")]
    UnsupportedCondition {
        id: RecordId,
        condition_id: String,
        condition_type: String,
        operator: String,
    },
}

/// A discount rule record, owned by the local configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRecord {
    /// Locally generated, stable ID.
    pub id: RecordId,
    /// Display name; also the title of the remote object.
    pub name: String,
    /// How `value` is interpreted.
    pub value_kind: ValueKind,
    /// Discount amount.
    pub value: f64,
    /// Order or shipping discount.
    #[serde(default)]
    pub classification: Classification,
    /// Automatic or code-based.
    #[serde(default)]
    pub activation: Activation,
    /// Redeem code, present iff `activation == code`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Stacking rules.
    #[serde(default)]
    pub combine_flags: CombineFlags,
    /// AND-ed eligibility conditions; empty means unconditional.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Whether the storefront panel lists this discount.
    #[serde(default = "default_true")]
    pub visible_in_panel: bool,
    /// User toggle between Active and Inactive.
    #[serde(default = "default_true")]
    pub active: bool,
    /// ID of the remote object, once created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_ref: Option<RemoteRef>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

const fn default_true() -> bool {
    true
}

impl DiscountRecord {
    /// Create a draft record with a fresh ID and no conditions.
    #[must_use]
    pub fn draft(name: impl Into<String>, value_kind: ValueKind, value: f64) -> Self {
        Self {
            id: RecordId::generate(),
            name: name.into(),
            value_kind,
            value,
            classification: Classification::Order,
            activation: Activation::Automatic,
            code: None,
            combine_flags: CombineFlags::default(),
            conditions: Vec::new(),
            visible_in_panel: true,
            active: true,
            remote_ref: None,
            created_at: Utc::now(),
        }
    }

    /// Lifecycle state derived from `remote_ref` and `active`.
    #[must_use]
    pub const fn state(&self) -> RecordState {
        match (&self.remote_ref, self.active) {
            (None, _) => RecordState::Draft,
            (Some(_), true) => RecordState::Active,
            (Some(_), false) => RecordState::Inactive,
        }
    }

    /// Check the record invariants.
    ///
    /// # Errors
    ///
    /// Returns the first [`RecordError`] found.
    pub fn validate(&self) -> Result<(), RecordError> {
        let id = || self.id.clone();

        if self.name.trim().is_empty() {
            return Err(RecordError::EmptyName { id: id() });
        }

        let has_code = self.code.as_deref().is_some_and(|c| !c.trim().is_empty());
        match self.activation {
            Activation::Code if !has_code => return Err(RecordError::MissingCode { id: id() }),
            Activation::Automatic if self.code.is_some() => {
                return Err(RecordError::UnexpectedCode { id: id() });
            }
            _ => {}
        }

        if self.classification == Classification::Shipping && self.combine_flags.shipping_discounts
        {
            return Err(RecordError::ShippingCombinesWithShipping { id: id() });
        }

        let value_ok = self.value.is_finite()
            && self.value >= 0.0
            && (self.value_kind != ValueKind::Percentage || self.value <= 100.0);
        if !value_ok {
            return Err(RecordError::InvalidValue {
                id: id(),
                value: self.value,
            });
        }

        if let Some(bad) = self
            .conditions
            .iter()
            .find(|c| !c.condition_type.supports(&c.operator))
        {
            return Err(RecordError::UnsupportedCondition {
                id: id(),
                condition_id: bad.id.to_string(),
                condition_type: bad.condition_type.to_string(),
                operator: bad.operator.to_string(),
            });
        }

        Ok(())
    }

    /// Whether any condition inspects the cart contents.
    #[must_use]
    pub fn depends_on_cart_lines(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.condition_type == ConditionType::CartContains)
    }
}
