//! Typed condition language for discount eligibility.
//!
//! A [`Condition`] is a `(type, operator, value)` triple. The legal operator
//! set for each type is a closed matrix ([`ConditionType::operators`]); any
//! other pairing is rejected by the rule engine with
//! [`ConditionError::UnsupportedOperator`](crate::rules::ConditionError).
//!
//! Unrecognised type or operator names survive deserialization as
//! `Other(String)` so a stored document with a newer or misspelled condition
//! still loads and is reported, rather than failing the whole document.

use serde::{Deserialize, Serialize};

use super::id::ConditionId;

/// What a condition inspects in the evaluation context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionType {
    /// Cart subtotal.
    CartTotal,
    /// Total item quantity in the cart.
    CartQuantity,
    /// Total cart weight.
    CartWeight,
    /// Number of previous orders placed by the customer.
    OrderCount,
    /// Shipping country (ISO 3166-1 alpha-2).
    Country,
    /// Shipping postal code.
    PostalCode,
    /// Customer tags.
    CustomerTags,
    /// Whether the customer is logged in.
    CustomerLoggedIn,
    /// Products or collections present in the cart.
    CartContains,
    /// A type name this build does not recognise.
    #[serde(untagged)]
    Other(String),
}

/// Comparison applied by a condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    NotContains,
    IsLoggedIn,
    IsNotLoggedIn,
    OnlyTheseProducts,
    AtLeastOneOfProducts,
    AllOfProducts,
    NoneOfProducts,
    OnlyTheseCollections,
    AtLeastOneOfCollections,
    AllOfCollections,
    NoneOfCollections,
    /// An operator name this build does not recognise.
    #[serde(untagged)]
    Other(String),
}

const NUMERIC_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::GreaterThan,
    Operator::GreaterThanOrEqual,
    Operator::LessThan,
    Operator::LessThanOrEqual,
];

const COUNTRY_OPERATORS: &[Operator] = &[Operator::Equals, Operator::NotEquals];

const POSTAL_CODE_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::Contains,
    Operator::NotContains,
];

const TAG_OPERATORS: &[Operator] = &[Operator::Contains, Operator::NotContains];

const LOGGED_IN_OPERATORS: &[Operator] = &[Operator::IsLoggedIn, Operator::IsNotLoggedIn];

const CART_CONTAINS_OPERATORS: &[Operator] = &[
    Operator::OnlyTheseProducts,
    Operator::AtLeastOneOfProducts,
    Operator::AllOfProducts,
    Operator::NoneOfProducts,
    Operator::OnlyTheseCollections,
    Operator::AtLeastOneOfCollections,
    Operator::AllOfCollections,
    Operator::NoneOfCollections,
];

impl ConditionType {
    /// Every recognised condition type.
    pub const ALL: [Self; 9] = [
        Self::CartTotal,
        Self::CartQuantity,
        Self::CartWeight,
        Self::OrderCount,
        Self::Country,
        Self::PostalCode,
        Self::CustomerTags,
        Self::CustomerLoggedIn,
        Self::CartContains,
    ];

    /// Legal operators for this type. Empty for unrecognised types.
    #[must_use]
    pub const fn operators(&self) -> &'static [Operator] {
        match self {
            Self::CartTotal | Self::CartQuantity | Self::CartWeight | Self::OrderCount => {
                NUMERIC_OPERATORS
            }
            Self::Country => COUNTRY_OPERATORS,
            Self::PostalCode => POSTAL_CODE_OPERATORS,
            Self::CustomerTags => TAG_OPERATORS,
            Self::CustomerLoggedIn => LOGGED_IN_OPERATORS,
            Self::CartContains => CART_CONTAINS_OPERATORS,
            Self::Other(_) => &[],
        }
    }

    /// Whether `operator` is legal for this type.
    #[must_use]
    pub fn supports(&self, operator: &Operator) -> bool {
        self.operators().contains(operator)
    }

    /// Whether conditions of this type carry a value.
    #[must_use]
    pub const fn takes_value(&self) -> bool {
        !matches!(self, Self::CustomerLoggedIn)
    }

    /// Wire name of the type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CartTotal => "cartTotal",
            Self::CartQuantity => "cartQuantity",
            Self::CartWeight => "cartWeight",
            Self::OrderCount => "orderCount",
            Self::Country => "country",
            Self::PostalCode => "postalCode",
            Self::CustomerTags => "customerTags",
            Self::CustomerLoggedIn => "customerLoggedIn",
            Self::CartContains => "cartContains",
            Self::Other(name) => name,
        }
    }
}

impl std::fmt::Display for ConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Operator {
    /// Every recognised operator.
    pub const ALL: [Self; 18] = [
        Self::Equals,
        Self::NotEquals,
        Self::GreaterThan,
        Self::GreaterThanOrEqual,
        Self::LessThan,
        Self::LessThanOrEqual,
        Self::Contains,
        Self::NotContains,
        Self::IsLoggedIn,
        Self::IsNotLoggedIn,
        Self::OnlyTheseProducts,
        Self::AtLeastOneOfProducts,
        Self::AllOfProducts,
        Self::NoneOfProducts,
        Self::OnlyTheseCollections,
        Self::AtLeastOneOfCollections,
        Self::AllOfCollections,
        Self::NoneOfCollections,
    ];

    /// Wire name of the operator.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "notEquals",
            Self::GreaterThan => "greaterThan",
            Self::GreaterThanOrEqual => "greaterThanOrEqual",
            Self::LessThan => "lessThan",
            Self::LessThanOrEqual => "lessThanOrEqual",
            Self::Contains => "contains",
            Self::NotContains => "notContains",
            Self::IsLoggedIn => "isLoggedIn",
            Self::IsNotLoggedIn => "isNotLoggedIn",
            Self::OnlyTheseProducts => "onlyTheseProducts",
            Self::AtLeastOneOfProducts => "atLeastOneOfProducts",
            Self::AllOfProducts => "allOfProducts",
            Self::NoneOfProducts => "noneOfProducts",
            Self::OnlyTheseCollections => "onlyTheseCollections",
            Self::AtLeastOneOfCollections => "atLeastOneOfCollections",
            Self::AllOfCollections => "allOfCollections",
            Self::NoneOfCollections => "noneOfCollections",
            Self::Other(name) => name,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single eligibility condition attached to a discount record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Stable condition ID.
    pub id: ConditionId,
    /// What the condition inspects.
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    /// How the context value is compared.
    pub operator: Operator,
    /// Raw value: a number, a CSV set, or empty for `customerLoggedIn`.
    #[serde(default)]
    pub value: String,
}

impl Condition {
    /// Create a condition with a freshly generated ID.
    #[must_use]
    pub fn new(condition_type: ConditionType, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            id: ConditionId::generate(),
            condition_type,
            operator,
            value: value.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_known_condition() {
        let json = r#"{"id":"c1","type":"cartTotal","operator":"greaterThanOrEqual","value":"100"}"#;
        let condition: Condition = serde_json::from_str(json).unwrap();
        assert_eq!(condition.condition_type, ConditionType::CartTotal);
        assert_eq!(condition.operator, Operator::GreaterThanOrEqual);
        assert_eq!(condition.value, "100");
    }

    #[test]
    fn test_unknown_names_are_preserved() {
        let json = r#"{"id":"c1","type":"cartColour","operator":"isBlue","value":""}"#;
        let condition: Condition = serde_json::from_str(json).unwrap();
        assert_eq!(
            condition.condition_type,
            ConditionType::Other("cartColour".to_string())
        );
        assert_eq!(condition.operator, Operator::Other("isBlue".to_string()));

        let back = serde_json::to_value(&condition).unwrap();
        assert_eq!(back["type"], "cartColour");
        assert_eq!(back["operator"], "isBlue");
    }

    #[test]
    fn test_missing_value_defaults_to_empty() {
        let json = r#"{"id":"c1","type":"customerLoggedIn","operator":"isLoggedIn"}"#;
        let condition: Condition = serde_json::from_str(json).unwrap();
        assert!(condition.value.is_empty());
    }

    #[test]
    fn test_as_str_matches_serde_name() {
        for operator in Operator::ALL {
            let json = serde_json::to_string(&operator).unwrap();
            assert_eq!(json, format!("\"{}\"", operator.as_str()));
        }
        for condition_type in ConditionType::ALL {
            let json = serde_json::to_string(&condition_type).unwrap();
            assert_eq!(json, format!("\"{}\"", condition_type.as_str()));
        }
    }

    #[test]
    fn test_every_operator_is_legal_somewhere() {
        for operator in Operator::ALL {
            assert!(
                ConditionType::ALL.iter().any(|t| t.supports(&operator)),
                "{operator} is not legal for any condition type"
            );
        }
    }

    #[test]
    fn test_unknown_type_supports_nothing() {
        let other = ConditionType::Other("x".to_string());
        assert!(Operator::ALL.iter().all(|op| !other.supports(op)));
    }
}
