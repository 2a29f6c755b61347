//! Documents derived from the record set.
//!
//! `records` holds every record with every field, for the admin surface.
//! `activeRecords` holds what the eligibility runtime needs to execute a
//! discount, for active panel-visible records only, with values normalised.

use serde::{Deserialize, Serialize};

use discount_sync_core::{
    Activation, Classification, CombineFlags, Condition, DiscountRecord, RecordId, ValueKind,
};

/// Key of the full records document.
pub const RECORDS_KEY: &str = "records";

/// Key of the execution document.
pub const ACTIVE_RECORDS_KEY: &str = "activeRecords";

/// Normalised discount amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExecutionValue {
    /// Fraction of the subtotal in `0.0..=1.0`.
    Percentage { fraction: f64 },
    /// Non-negative amount in the shop currency.
    FixedAmount { amount: f64 },
}

impl ExecutionValue {
    /// Normalise a record's value.
    #[must_use]
    pub fn from_record(record: &DiscountRecord) -> Self {
        match record.value_kind {
            ValueKind::Percentage => Self::Percentage {
                fraction: record.value.clamp(0.0, 100.0) / 100.0,
            },
            ValueKind::FixedAmount => Self::FixedAmount {
                amount: record.value.max(0.0),
            },
        }
    }
}

/// One entry of the execution document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: RecordId,
    pub title: String,
    pub activation: Activation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub classification: Classification,
    pub combine_flags: CombineFlags,
    pub discount: ExecutionValue,
    pub conditions: Vec<Condition>,
}

impl From<&DiscountRecord> for ExecutionRecord {
    fn from(record: &DiscountRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.name.clone(),
            activation: record.activation,
            code: record.code.clone(),
            classification: record.classification,
            combine_flags: record.combine_flags,
            discount: ExecutionValue::from_record(record),
            conditions: record.conditions.clone(),
        }
    }
}

/// The execution subset of `records`, in input order.
#[must_use]
pub fn execution_subset(records: &[DiscountRecord]) -> Vec<ExecutionRecord> {
    records
        .iter()
        .filter(|r| r.active && r.visible_in_panel)
        .map(ExecutionRecord::from)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_subset_keeps_only_active_visible() {
        let shown = DiscountRecord::draft("Shown", ValueKind::Percentage, 10.0);
        let mut hidden = DiscountRecord::draft("Hidden", ValueKind::Percentage, 10.0);
        hidden.visible_in_panel = false;
        let mut paused = DiscountRecord::draft("Paused", ValueKind::Percentage, 10.0);
        paused.active = false;

        let subset = execution_subset(&[shown.clone(), hidden, paused]);
        assert_eq!(subset.len(), 1);
        assert_eq!(subset[0].id, shown.id);
        assert_eq!(subset[0].title, "Shown");
    }

    #[test]
    fn test_percentage_becomes_clamped_fraction() {
        let mut record = DiscountRecord::draft("Ten", ValueKind::Percentage, 10.0);
        assert_eq!(
            ExecutionValue::from_record(&record),
            ExecutionValue::Percentage { fraction: 0.1 }
        );
        record.value = 140.0;
        assert_eq!(
            ExecutionValue::from_record(&record),
            ExecutionValue::Percentage { fraction: 1.0 }
        );
    }

    #[test]
    fn test_fixed_amount_is_non_negative() {
        let record = DiscountRecord::draft("Neg", ValueKind::FixedAmount, -3.0);
        assert_eq!(
            ExecutionValue::from_record(&record),
            ExecutionValue::FixedAmount { amount: 0.0 }
        );
    }

    #[test]
    fn test_execution_json_shape() {
        let record = DiscountRecord::draft("Five off", ValueKind::FixedAmount, 5.0);
        let json = serde_json::to_value(ExecutionRecord::from(&record)).unwrap();
        assert_eq!(json["discount"]["kind"], "fixedAmount");
        assert_eq!(json["discount"]["amount"], 5.0);
        assert!(json.get("visibleInPanel").is_none());
    }
}
