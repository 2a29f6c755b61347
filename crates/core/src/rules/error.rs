//! Configuration errors reported by the rule engine.

use thiserror::Error;

use crate::types::{Condition, ConditionId};

/// A condition that cannot be evaluated as configured.
///
/// These are configuration errors: the condition is wrong, not the context.
/// The engine reports them instead of treating the condition as passed or
/// failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    /// The type does not support the operator (or either is unrecognised).
    #[error("condition {condition_id}: operator '{operator}' is not supported for '{condition_type}'")]
    UnsupportedOperator {
        condition_id: ConditionId,
        condition_type: String,
        operator: String,
    },

    /// A numeric condition whose value is not a number.
    #[error("condition {condition_id}: '{value}' is not a number")]
    InvalidNumber {
        condition_id: ConditionId,
        value: String,
    },

    /// A set-valued condition with no entries.
    #[error("condition {condition_id}: '{condition_type}' requires at least one value")]
    EmptyValue {
        condition_id: ConditionId,
        condition_type: String,
    },
}

impl ConditionError {
    pub(crate) fn unsupported(condition: &Condition) -> Self {
        Self::UnsupportedOperator {
            condition_id: condition.id.clone(),
            condition_type: condition.condition_type.to_string(),
            operator: condition.operator.to_string(),
        }
    }

    pub(crate) fn invalid_number(condition: &Condition) -> Self {
        Self::InvalidNumber {
            condition_id: condition.id.clone(),
            value: condition.value.clone(),
        }
    }

    pub(crate) fn empty_value(condition: &Condition) -> Self {
        Self::EmptyValue {
            condition_id: condition.id.clone(),
            condition_type: condition.condition_type.to_string(),
        }
    }

    /// ID of the offending condition.
    #[must_use]
    pub const fn condition_id(&self) -> &ConditionId {
        match self {
            Self::UnsupportedOperator { condition_id, .. }
            | Self::InvalidNumber { condition_id, .. }
            | Self::EmptyValue { condition_id, .. } => condition_id,
        }
    }
}
