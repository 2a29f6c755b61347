//! One-time migration from the per-field legacy layout.
//!
//! Before the consolidated `records` document existed, each record was spread
//! over keys named `record<index>_<field>` in the legacy namespace. Migration
//! groups those keys by index, decodes each field, and writes the surviving
//! records through the writer. The legacy keys are deleted afterwards.
//!
//! Interrupting a migration is safe. Once the consolidated document is
//! written every later run is a no-op, and legacy keys left behind by an
//! interrupted delete are inert.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use discount_sync_core::{
    Activation, Classification, CombineFlags, Condition, ConditionType, DiscountRecord, Operator,
    RecordId, RemoteRef, ValueKind,
};

use super::SyncEngine;
use super::error::SyncError;
use crate::store::{DocumentKey, RemoteStore, with_deadline};

/// Why a legacy group could not become a record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LegacyDecodeError {
    #[error("missing required field '{0}'")]
    Missing(&'static str),
    #[error("field '{field}' is not valid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Split a legacy key into its record index and field name.
#[must_use]
pub fn parse_legacy_key(key: &str) -> Option<(u32, &str)> {
    let rest = key.strip_prefix("record")?;
    let (index, field) = rest.split_once('_')?;
    if index.is_empty() || field.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((index.parse().ok()?, field))
}

/// Legacy fields of one record, by field name.
pub type LegacyGroup = BTreeMap<String, String>;

/// Group legacy fields by record index. Also returns every matched key so
/// they can be deleted after migration.
#[must_use]
pub fn group_legacy_fields(
    fields: &[(DocumentKey, String)],
) -> (BTreeMap<u32, LegacyGroup>, Vec<DocumentKey>) {
    let mut groups: BTreeMap<u32, LegacyGroup> = BTreeMap::new();
    let mut keys = Vec::new();

    for (key, value) in fields {
        let Some((index, field)) = parse_legacy_key(&key.key) else {
            debug!(key = %key, "Skipping non-legacy key");
            continue;
        };
        groups
            .entry(index)
            .or_default()
            .insert(field.to_string(), value.clone());
        keys.push(key.clone());
    }

    (groups, keys)
}

fn required<'a>(group: &'a LegacyGroup, field: &'static str) -> Result<&'a str, LegacyDecodeError> {
    group
        .get(field)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or(LegacyDecodeError::Missing(field))
}

fn number(group: &LegacyGroup, field: &'static str) -> Result<f64, LegacyDecodeError> {
    let raw = required(group, field)?;
    raw.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| LegacyDecodeError::Invalid {
            field,
            reason: format!("'{raw}' is not a number"),
        })
}

/// Decode an optional field, falling back to `default` (with a warning) when
/// the stored value is present but malformed.
fn optional<T>(
    group: &LegacyGroup,
    index: u32,
    field: &'static str,
    default: T,
    decode: impl FnOnce(&str) -> Option<T>,
) -> T {
    match group.get(field).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => default,
        Some(raw) => decode(raw).unwrap_or_else(|| {
            warn!(index, field, value = raw, "Unreadable legacy field, using default");
            default
        }),
    }
}

fn flag(raw: &str) -> Option<bool> {
    match raw {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            raw.parse::<i64>()
                .ok()
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
        })
}

/// Decode one legacy group into a record.
///
/// `id`, `name`, `threshold` and `value` are required. A positive threshold
/// becomes a leading `cartTotal greaterThanOrEqual` condition.
///
/// # Errors
///
/// Returns [`LegacyDecodeError`] if a required field is missing or malformed.
pub fn decode_legacy_group(index: u32, group: &LegacyGroup) -> Result<DiscountRecord, LegacyDecodeError> {
    let id = required(group, "id")?;
    let name = required(group, "name")?;
    let threshold = number(group, "threshold")?;
    let value = number(group, "value")?;

    let mut conditions = Vec::new();
    if threshold > 0.0 {
        conditions.push(Condition::new(
            ConditionType::CartTotal,
            Operator::GreaterThanOrEqual,
            threshold.to_string(),
        ));
    }
    conditions.extend(optional(group, index, "conditions", Vec::new(), |raw| {
        serde_json::from_str::<Vec<Condition>>(raw).ok()
    }));

    let activation = optional(group, index, "activation", Activation::Automatic, |raw| {
        Activation::from_str(raw).ok()
    });
    let code = group
        .get("code")
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && activation == Activation::Code);

    Ok(DiscountRecord {
        id: RecordId::new(id),
        name: name.to_string(),
        value_kind: optional(group, index, "valueKind", ValueKind::Percentage, |raw| {
            ValueKind::from_str(raw).ok()
        }),
        value,
        classification: optional(group, index, "classification", Classification::Order, |raw| {
            Classification::from_str(raw).ok()
        }),
        activation,
        code,
        combine_flags: optional(group, index, "combineFlags", CombineFlags::default(), |raw| {
            serde_json::from_str(raw).ok()
        }),
        conditions,
        visible_in_panel: optional(group, index, "visibleInPanel", true, flag),
        active: optional(group, index, "active", true, flag),
        remote_ref: group
            .get("remoteRef")
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(RemoteRef::new),
        created_at: optional(group, index, "createdAt", Utc::now(), timestamp),
    })
}

/// Decode every group, dropping (and logging) the ones that cannot be used.
#[must_use]
pub fn decode_legacy_groups(groups: &BTreeMap<u32, LegacyGroup>) -> Vec<DiscountRecord> {
    groups
        .iter()
        .filter_map(|(index, group)| {
            let record = match decode_legacy_group(*index, group) {
                Ok(record) => record,
                Err(e) => {
                    warn!(index, error = %e, "Dropping legacy record");
                    return None;
                }
            };
            if let Err(e) = record.validate() {
                warn!(index, error = %e, "Dropping invalid legacy record");
                return None;
            }
            Some(record)
        })
        .collect()
}

impl<S: RemoteStore + ?Sized> SyncEngine<S> {
    /// Move legacy per-field records into the consolidated document.
    ///
    /// Returns whether a migration happened. `false` means the consolidated
    /// document already exists or there is nothing to migrate.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if a read or write fails. The next call retries
    /// from the start.
    #[instrument(skip(self), fields(namespace = %self.config.legacy_namespace))]
    pub async fn migrate_if_needed(&self) -> Result<bool, SyncError> {
        let _edits = self.lock_edits().await;
        if self.writer.load().await?.is_some() {
            debug!("Consolidated document present, nothing to migrate");
            return Ok(false);
        }

        let legacy = with_deadline(
            self.config.request_timeout,
            self.store.list_documents(&self.config.legacy_namespace),
        )
        .await?;

        let (groups, keys) = group_legacy_fields(&legacy);
        if keys.is_empty() {
            debug!("No legacy keys found");
            return Ok(false);
        }

        let records = decode_legacy_groups(&groups);
        info!(
            groups = groups.len(),
            migrated = records.len(),
            legacy_keys = keys.len(),
            "Migrating legacy records"
        );

        self.writer.persist(&records).await?;
        self.writer.delete_documents(&keys).await?;

        info!(migrated = records.len(), "Legacy migration complete");
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn group(pairs: &[(&str, &str)]) -> LegacyGroup {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_parse_legacy_key() {
        assert_eq!(parse_legacy_key("record0_name"), Some((0, "name")));
        assert_eq!(parse_legacy_key("record12_valueKind"), Some((12, "valueKind")));
        assert_eq!(parse_legacy_key("record_name"), None);
        assert_eq!(parse_legacy_key("recordx_name"), None);
        assert_eq!(parse_legacy_key("record3_"), None);
        assert_eq!(parse_legacy_key("settings"), None);
    }

    #[test]
    fn test_group_skips_foreign_keys() {
        let fields = vec![
            (DocumentKey::new("discounts", "record1_id"), "a".to_string()),
            (DocumentKey::new("discounts", "record1_name"), "A".to_string()),
            (DocumentKey::new("discounts", "record0_id"), "b".to_string()),
            (DocumentKey::new("discounts", "panelTitle"), "x".to_string()),
        ];
        let (groups, keys) = group_legacy_fields(&fields);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&1]["name"], "A");
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_decode_full_group() {
        let record = decode_legacy_group(
            0,
            &group(&[
                ("id", "r1"),
                ("name", "Spend 100"),
                ("threshold", "100"),
                ("value", "10"),
                ("valueKind", "percentage"),
                ("visibleInPanel", "false"),
                ("combineFlags", r#"{"orderDiscounts":true}"#),
                ("createdAt", "2024-05-01T10:00:00Z"),
            ]),
        )
        .unwrap();

        assert_eq!(record.id.as_str(), "r1");
        assert!((record.value - 10.0).abs() < f64::EPSILON);
        assert!(!record.visible_in_panel);
        assert!(record.combine_flags.order_discounts);
        assert_eq!(record.conditions.len(), 1);
        assert_eq!(record.conditions[0].condition_type, ConditionType::CartTotal);
        assert_eq!(record.conditions[0].operator, Operator::GreaterThanOrEqual);
        assert_eq!(record.conditions[0].value, "100");
        assert_eq!(record.created_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_threshold_is_prepended_to_stored_conditions() {
        let record = decode_legacy_group(
            0,
            &group(&[
                ("id", "r1"),
                ("name", "Local"),
                ("threshold", "50"),
                ("value", "5"),
                (
                    "conditions",
                    r#"[{"id":"c1","type":"country","operator":"equals","value":"DE"}]"#,
                ),
            ]),
        )
        .unwrap();
        assert_eq!(record.conditions.len(), 2);
        assert_eq!(record.conditions[0].condition_type, ConditionType::CartTotal);
        assert_eq!(record.conditions[1].condition_type, ConditionType::Country);
    }

    #[test]
    fn test_zero_threshold_adds_no_condition() {
        let record = decode_legacy_group(
            0,
            &group(&[("id", "r1"), ("name", "Always"), ("threshold", "0"), ("value", "5")]),
        )
        .unwrap();
        assert!(record.conditions.is_empty());
    }

    #[test]
    fn test_missing_required_field_drops_group() {
        assert_eq!(
            decode_legacy_group(0, &group(&[("id", "r1"), ("threshold", "1"), ("value", "5")])),
            Err(LegacyDecodeError::Missing("name"))
        );
        assert!(matches!(
            decode_legacy_group(
                0,
                &group(&[("id", "r1"), ("name", "x"), ("threshold", "lots"), ("value", "5")])
            ),
            Err(LegacyDecodeError::Invalid { field: "threshold", .. })
        ));
    }

    #[test]
    fn test_malformed_optional_field_uses_default() {
        let record = decode_legacy_group(
            0,
            &group(&[
                ("id", "r1"),
                ("name", "x"),
                ("threshold", "0"),
                ("value", "5"),
                ("active", "yes please"),
                ("combineFlags", "{not json"),
            ]),
        )
        .unwrap();
        assert!(record.active);
        assert_eq!(record.combine_flags, CombineFlags::default());
    }

    #[test]
    fn test_epoch_millis_timestamp() {
        let parsed = timestamp("1714557600000").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_invalid_records_are_dropped() {
        let mut groups = BTreeMap::new();
        groups.insert(
            0,
            group(&[("id", "ok"), ("name", "Fine"), ("threshold", "0"), ("value", "5")]),
        );
        groups.insert(
            1,
            group(&[
                ("id", "bad"),
                ("name", "Too much"),
                ("threshold", "0"),
                ("value", "500"),
                ("valueKind", "percentage"),
            ]),
        );
        groups.insert(2, group(&[("name", "No id")]));

        let records = decode_legacy_groups(&groups);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_str(), "ok");
    }
}
