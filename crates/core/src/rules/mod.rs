//! Rule engine: evaluates condition lists against an [`EvaluationContext`].
//!
//! # Semantics
//!
//! - An empty list is always satisfied.
//! - Conditions are AND-ed; there is no OR.
//! - Every condition is checked for configuration errors, even after an
//!   earlier one has already failed, so a broken condition is reported no
//!   matter where it sits in the list.
//!
//! # Example
//!
//! ```rust
//! use discount_sync_core::rules::{EvaluationContext, evaluate};
//! use discount_sync_core::{Condition, ConditionType, Operator};
//!
//! let conditions = vec![Condition::new(
//!     ConditionType::CartTotal,
//!     Operator::GreaterThanOrEqual,
//!     "100",
//! )];
//! let ctx = EvaluationContext { cart_total: 100.0, ..Default::default() };
//! assert!(evaluate(&conditions, &ctx).unwrap());
//! ```

mod context;
mod error;

use std::collections::HashSet;

pub use context::{CartLine, EvaluationContext};
pub use error::ConditionError;

use crate::types::{Condition, ConditionType, DiscountRecord, Operator};

/// Tolerance for numeric equality on parsed floats.
const NUMERIC_TOLERANCE: f64 = 1e-9;

/// Evaluate `conditions` against `ctx`.
///
/// # Errors
///
/// Returns the first [`ConditionError`] in list order if any condition is
/// misconfigured.
pub fn evaluate(conditions: &[Condition], ctx: &EvaluationContext) -> Result<bool, ConditionError> {
    let mut satisfied = true;
    for condition in conditions {
        satisfied &= evaluate_condition(condition, ctx)?;
    }
    Ok(satisfied)
}

/// Whether `record` applies to `ctx`: it must be active and its conditions met.
///
/// # Errors
///
/// Returns a [`ConditionError`] if any of the record's conditions is
/// misconfigured.
pub fn is_eligible(record: &DiscountRecord, ctx: &EvaluationContext) -> Result<bool, ConditionError> {
    let conditions_met = evaluate(&record.conditions, ctx)?;
    Ok(record.active && conditions_met)
}

/// Whether the storefront panel should show `record` for `ctx`.
///
/// # Errors
///
/// Returns a [`ConditionError`] if any of the record's conditions is
/// misconfigured.
pub fn is_visible_in_panel(
    record: &DiscountRecord,
    ctx: &EvaluationContext,
) -> Result<bool, ConditionError> {
    let eligible = is_eligible(record, ctx)?;
    Ok(record.visible_in_panel && eligible)
}

/// Evaluate a single condition.
///
/// # Errors
///
/// Returns a [`ConditionError`] for an unsupported `(type, operator)` pair or
/// a value that does not fit the type.
pub fn evaluate_condition(
    condition: &Condition,
    ctx: &EvaluationContext,
) -> Result<bool, ConditionError> {
    if !condition.condition_type.supports(&condition.operator) {
        return Err(ConditionError::unsupported(condition));
    }

    match &condition.condition_type {
        ConditionType::CartTotal => compare_number(condition, ctx.cart_total),
        ConditionType::CartQuantity => compare_number(condition, f64::from(ctx.cart_quantity)),
        ConditionType::CartWeight => compare_number(condition, ctx.cart_weight),
        ConditionType::OrderCount => compare_number(condition, f64::from(ctx.order_count)),
        ConditionType::Country => country(condition, ctx),
        ConditionType::PostalCode => postal_code(condition, ctx),
        ConditionType::CustomerTags => customer_tags(condition, ctx),
        ConditionType::CustomerLoggedIn => match condition.operator {
            Operator::IsLoggedIn => Ok(ctx.logged_in),
            Operator::IsNotLoggedIn => Ok(!ctx.logged_in),
            _ => Err(ConditionError::unsupported(condition)),
        },
        ConditionType::CartContains => cart_contains(condition, ctx),
        ConditionType::Other(_) => Err(ConditionError::unsupported(condition)),
    }
}

fn compare_number(condition: &Condition, actual: f64) -> Result<bool, ConditionError> {
    let expected: f64 = condition
        .value
        .trim()
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| ConditionError::invalid_number(condition))?;

    let equal = (actual - expected).abs() < NUMERIC_TOLERANCE;
    match condition.operator {
        Operator::Equals => Ok(equal),
        Operator::NotEquals => Ok(!equal),
        Operator::GreaterThan => Ok(actual > expected && !equal),
        Operator::GreaterThanOrEqual => Ok(actual > expected || equal),
        Operator::LessThan => Ok(actual < expected && !equal),
        Operator::LessThanOrEqual => Ok(actual < expected || equal),
        _ => Err(ConditionError::unsupported(condition)),
    }
}

/// Split a CSV value into trimmed, non-empty entries.
fn csv_entries(condition: &Condition) -> Result<Vec<&str>, ConditionError> {
    let entries: Vec<&str> = condition
        .value
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect();
    if entries.is_empty() {
        return Err(ConditionError::empty_value(condition));
    }
    Ok(entries)
}

fn country(condition: &Condition, ctx: &EvaluationContext) -> Result<bool, ConditionError> {
    let codes: HashSet<String> = csv_entries(condition)?
        .into_iter()
        .map(str::to_ascii_uppercase)
        .collect();
    let member = ctx
        .country
        .as_deref()
        .is_some_and(|c| codes.contains(&c.trim().to_ascii_uppercase()));

    match condition.operator {
        Operator::Equals => Ok(member),
        Operator::NotEquals => Ok(!member),
        _ => Err(ConditionError::unsupported(condition)),
    }
}

fn normalize_postal_code(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}

fn postal_code(condition: &Condition, ctx: &EvaluationContext) -> Result<bool, ConditionError> {
    let entries: Vec<String> = csv_entries(condition)?
        .into_iter()
        .map(normalize_postal_code)
        .collect();
    let code = ctx
        .postal_code
        .as_deref()
        .map(normalize_postal_code)
        .unwrap_or_default();

    // A trailing `*` turns any entry into a prefix match.
    let matches = |substring: bool| {
        !code.is_empty()
            && entries.iter().any(|entry| match entry.strip_suffix('*') {
                Some(prefix) => code.starts_with(prefix),
                None if substring => code.contains(entry.as_str()),
                None => code == *entry,
            })
    };

    match condition.operator {
        Operator::Equals => Ok(matches(false)),
        Operator::NotEquals => Ok(!matches(false)),
        Operator::Contains => Ok(matches(true)),
        Operator::NotContains => Ok(!matches(true)),
        _ => Err(ConditionError::unsupported(condition)),
    }
}

fn customer_tags(condition: &Condition, ctx: &EvaluationContext) -> Result<bool, ConditionError> {
    let wanted: HashSet<String> = csv_entries(condition)?
        .into_iter()
        .map(str::to_lowercase)
        .collect();
    let intersects = ctx
        .customer_tags
        .iter()
        .any(|tag| wanted.contains(&tag.trim().to_lowercase()));

    match condition.operator {
        Operator::Contains => Ok(intersects),
        Operator::NotContains => Ok(!intersects),
        _ => Err(ConditionError::unsupported(condition)),
    }
}

/// Which side of a cart line a `cartContains` operator inspects.
#[derive(Clone, Copy)]
enum CartTarget {
    Products,
    Collections,
}

#[derive(Clone, Copy)]
enum SetTest {
    OnlyThese,
    AtLeastOneOf,
    AllOf,
    NoneOf,
}

const fn cart_operator(operator: &Operator) -> Option<(CartTarget, SetTest)> {
    match operator {
        Operator::OnlyTheseProducts => Some((CartTarget::Products, SetTest::OnlyThese)),
        Operator::AtLeastOneOfProducts => Some((CartTarget::Products, SetTest::AtLeastOneOf)),
        Operator::AllOfProducts => Some((CartTarget::Products, SetTest::AllOf)),
        Operator::NoneOfProducts => Some((CartTarget::Products, SetTest::NoneOf)),
        Operator::OnlyTheseCollections => Some((CartTarget::Collections, SetTest::OnlyThese)),
        Operator::AtLeastOneOfCollections => {
            Some((CartTarget::Collections, SetTest::AtLeastOneOf))
        }
        Operator::AllOfCollections => Some((CartTarget::Collections, SetTest::AllOf)),
        Operator::NoneOfCollections => Some((CartTarget::Collections, SetTest::NoneOf)),
        _ => None,
    }
}

fn cart_contains(condition: &Condition, ctx: &EvaluationContext) -> Result<bool, ConditionError> {
    let (target, test) =
        cart_operator(&condition.operator).ok_or_else(|| ConditionError::unsupported(condition))?;
    let ids: HashSet<&str> = csv_entries(condition)?.into_iter().collect();

    let line_matches = |line: &CartLine| match target {
        CartTarget::Products => ids.contains(line.product_id.as_str()),
        CartTarget::Collections => line
            .collection_ids
            .iter()
            .any(|c| ids.contains(c.as_str())),
    };
    let lines = &ctx.cart_lines;

    let result = match test {
        // An empty cart contains nothing, so it cannot consist "only" of the set.
        SetTest::OnlyThese => !lines.is_empty() && lines.iter().all(line_matches),
        SetTest::AtLeastOneOf => lines.iter().any(line_matches),
        SetTest::NoneOf => !lines.iter().any(line_matches),
        SetTest::AllOf => {
            let present: HashSet<&str> = match target {
                CartTarget::Products => lines.iter().map(|l| l.product_id.as_str()).collect(),
                CartTarget::Collections => lines
                    .iter()
                    .flat_map(|l| l.collection_ids.iter().map(String::as_str))
                    .collect(),
            };
            ids.iter().all(|id| present.contains(id))
        }
    };
    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cond(condition_type: ConditionType, operator: Operator, value: &str) -> Condition {
        Condition::new(condition_type, operator, value)
    }

    fn eval(condition: Condition, ctx: &EvaluationContext) -> Result<bool, ConditionError> {
        evaluate(&[condition], ctx)
    }

    #[test]
    fn test_empty_conditions_always_pass() {
        assert!(evaluate(&[], &EvaluationContext::default()).unwrap());
    }

    #[test]
    fn test_cart_total_threshold() {
        let c = || cond(ConditionType::CartTotal, Operator::GreaterThanOrEqual, "100");
        let at = EvaluationContext {
            cart_total: 100.0,
            ..Default::default()
        };
        let below = EvaluationContext {
            cart_total: 99.99,
            ..Default::default()
        };
        assert!(eval(c(), &at).unwrap());
        assert!(!eval(c(), &below).unwrap());
    }

    #[test]
    fn test_numeric_operators() {
        let ctx = EvaluationContext {
            cart_quantity: 3,
            order_count: 0,
            cart_weight: 1.5,
            ..Default::default()
        };
        assert!(eval(cond(ConditionType::CartQuantity, Operator::Equals, "3"), &ctx).unwrap());
        assert!(!eval(cond(ConditionType::CartQuantity, Operator::NotEquals, "3"), &ctx).unwrap());
        assert!(!eval(cond(ConditionType::CartQuantity, Operator::GreaterThan, "3"), &ctx).unwrap());
        assert!(eval(cond(ConditionType::CartQuantity, Operator::LessThanOrEqual, "3"), &ctx).unwrap());
        assert!(eval(cond(ConditionType::OrderCount, Operator::LessThan, "1"), &ctx).unwrap());
        assert!(eval(cond(ConditionType::CartWeight, Operator::GreaterThan, "1.25"), &ctx).unwrap());
    }

    #[test]
    fn test_non_numeric_value_is_reported() {
        let result = eval(
            cond(ConditionType::CartTotal, Operator::GreaterThan, "lots"),
            &EvaluationContext::default(),
        );
        assert!(matches!(result, Err(ConditionError::InvalidNumber { .. })));

        let result = eval(
            cond(ConditionType::CartTotal, Operator::GreaterThan, "NaN"),
            &EvaluationContext::default(),
        );
        assert!(matches!(result, Err(ConditionError::InvalidNumber { .. })));
    }

    #[test]
    fn test_country_membership() {
        let c = || cond(ConditionType::Country, Operator::Equals, "PL,DE");
        let de = EvaluationContext {
            country: Some("DE".to_string()),
            ..Default::default()
        };
        let fr = EvaluationContext {
            country: Some("FR".to_string()),
            ..Default::default()
        };
        assert!(eval(c(), &de).unwrap());
        assert!(!eval(c(), &fr).unwrap());
        assert!(eval(cond(ConditionType::Country, Operator::NotEquals, "PL, DE"), &fr).unwrap());
        assert!(!eval(c(), &EvaluationContext::default()).unwrap());
    }

    #[test]
    fn test_postal_code_wildcards() {
        let ctx = EvaluationContext {
            postal_code: Some("sw1a 1aa".to_string()),
            ..Default::default()
        };
        assert!(eval(cond(ConditionType::PostalCode, Operator::Equals, "SW1A*,EC1*"), &ctx).unwrap());
        assert!(eval(cond(ConditionType::PostalCode, Operator::Equals, "SW1A1AA"), &ctx).unwrap());
        assert!(!eval(cond(ConditionType::PostalCode, Operator::Equals, "SW1A"), &ctx).unwrap());
        assert!(eval(cond(ConditionType::PostalCode, Operator::Contains, "1A1"), &ctx).unwrap());
        assert!(eval(cond(ConditionType::PostalCode, Operator::NotContains, "EC1"), &ctx).unwrap());
        assert!(!eval(cond(ConditionType::PostalCode, Operator::NotEquals, "SW*"), &ctx).unwrap());
    }

    #[test]
    fn test_missing_postal_code_matches_nothing() {
        let ctx = EvaluationContext::default();
        assert!(!eval(cond(ConditionType::PostalCode, Operator::Equals, "*"), &ctx).unwrap());
        assert!(eval(cond(ConditionType::PostalCode, Operator::NotContains, "00"), &ctx).unwrap());
    }

    #[test]
    fn test_customer_tags_intersection() {
        let ctx = EvaluationContext {
            customer_tags: vec!["VIP".to_string(), "wholesale".to_string()],
            ..Default::default()
        };
        assert!(eval(cond(ConditionType::CustomerTags, Operator::Contains, "vip,staff"), &ctx).unwrap());
        assert!(!eval(cond(ConditionType::CustomerTags, Operator::NotContains, "vip"), &ctx).unwrap());
        assert!(eval(cond(ConditionType::CustomerTags, Operator::NotContains, "staff"), &ctx).unwrap());
    }

    #[test]
    fn test_customer_logged_in() {
        let logged_in = EvaluationContext {
            logged_in: true,
            ..Default::default()
        };
        let c = cond(ConditionType::CustomerLoggedIn, Operator::IsNotLoggedIn, "");
        assert!(!eval(c.clone(), &logged_in).unwrap());
        assert!(eval(c, &EvaluationContext::default()).unwrap());
        assert!(eval(cond(ConditionType::CustomerLoggedIn, Operator::IsLoggedIn, ""), &logged_in).unwrap());
    }

    #[test]
    fn test_cart_contains_products() {
        let ctx = EvaluationContext {
            cart_lines: vec![CartLine::new("p1", &["c1"]), CartLine::new("p2", &["c2"])],
            ..Default::default()
        };
        let t = ConditionType::CartContains;
        assert!(eval(cond(t.clone(), Operator::OnlyTheseProducts, "p1,p2,p3"), &ctx).unwrap());
        assert!(!eval(cond(t.clone(), Operator::OnlyTheseProducts, "p1"), &ctx).unwrap());
        assert!(eval(cond(t.clone(), Operator::AtLeastOneOfProducts, "p2,p9"), &ctx).unwrap());
        assert!(eval(cond(t.clone(), Operator::AllOfProducts, "p1,p2"), &ctx).unwrap());
        assert!(!eval(cond(t.clone(), Operator::AllOfProducts, "p1,p3"), &ctx).unwrap());
        assert!(eval(cond(t.clone(), Operator::NoneOfProducts, "p7"), &ctx).unwrap());
        assert!(!eval(cond(t, Operator::NoneOfProducts, "p1"), &ctx).unwrap());
    }

    #[test]
    fn test_cart_contains_collections() {
        let ctx = EvaluationContext {
            cart_lines: vec![
                CartLine::new("p1", &["summer", "sale"]),
                CartLine::new("p2", &["sale"]),
            ],
            ..Default::default()
        };
        let t = ConditionType::CartContains;
        assert!(eval(cond(t.clone(), Operator::OnlyTheseCollections, "sale"), &ctx).unwrap());
        assert!(!eval(cond(t.clone(), Operator::OnlyTheseCollections, "summer"), &ctx).unwrap());
        assert!(eval(cond(t.clone(), Operator::AtLeastOneOfCollections, "summer"), &ctx).unwrap());
        assert!(eval(cond(t.clone(), Operator::AllOfCollections, "summer,sale"), &ctx).unwrap());
        assert!(!eval(cond(t.clone(), Operator::AllOfCollections, "winter,sale"), &ctx).unwrap());
        assert!(eval(cond(t, Operator::NoneOfCollections, "winter"), &ctx).unwrap());
    }

    #[test]
    fn test_only_these_on_empty_cart_is_false() {
        let c = cond(ConditionType::CartContains, Operator::OnlyTheseProducts, "p1");
        assert!(!eval(c, &EvaluationContext::default()).unwrap());
    }

    #[test]
    fn test_empty_set_value_is_reported() {
        let result = eval(
            cond(ConditionType::Country, Operator::Equals, " , "),
            &EvaluationContext::default(),
        );
        assert!(matches!(result, Err(ConditionError::EmptyValue { .. })));
    }

    #[test]
    fn test_conditions_are_anded() {
        let ctx = EvaluationContext {
            cart_total: 150.0,
            country: Some("FR".to_string()),
            ..Default::default()
        };
        let conditions = [
            cond(ConditionType::CartTotal, Operator::GreaterThan, "100"),
            cond(ConditionType::Country, Operator::Equals, "DE"),
        ];
        assert!(!evaluate(&conditions, &ctx).unwrap());
    }

    #[test]
    fn test_invalid_condition_after_failing_one_is_still_reported() {
        let conditions = [
            cond(ConditionType::CartTotal, Operator::GreaterThan, "100"),
            cond(ConditionType::Country, Operator::LessThan, "DE"),
        ];
        let err = evaluate(&conditions, &EvaluationContext::default()).unwrap_err();
        assert_eq!(err.condition_id(), &conditions[1].id);
    }

    #[test]
    fn test_unknown_type_is_reported() {
        let c = cond(
            ConditionType::Other("cartColour".to_string()),
            Operator::Equals,
            "blue",
        );
        assert!(matches!(
            eval(c, &EvaluationContext::default()),
            Err(ConditionError::UnsupportedOperator { .. })
        ));
    }

    /// Walk the full type × operator matrix: every legal pair evaluates, every
    /// illegal pair is reported as unsupported.
    #[test]
    fn test_operator_matrix_is_exhaustive() {
        let ctx = EvaluationContext::default();
        for condition_type in ConditionType::ALL {
            let value = match condition_type {
                ConditionType::CartTotal
                | ConditionType::CartQuantity
                | ConditionType::CartWeight
                | ConditionType::OrderCount => "1",
                ConditionType::CustomerLoggedIn => "",
                _ => "a,b",
            };
            for operator in Operator::ALL {
                let legal = condition_type.supports(&operator);
                let result = eval(cond(condition_type.clone(), operator.clone(), value), &ctx);
                if legal {
                    assert!(result.is_ok(), "{condition_type}/{operator} should evaluate");
                } else {
                    assert!(
                        matches!(result, Err(ConditionError::UnsupportedOperator { .. })),
                        "{condition_type}/{operator} should be unsupported"
                    );
                }
            }
        }
    }

    #[test]
    fn test_record_eligibility_and_visibility() {
        let mut record = DiscountRecord::draft(
            "Big spender",
            crate::types::ValueKind::Percentage,
            10.0,
        );
        record.conditions.push(cond(ConditionType::CartTotal, Operator::GreaterThan, "50"));
        let ctx = EvaluationContext {
            cart_total: 80.0,
            ..Default::default()
        };

        assert!(is_eligible(&record, &ctx).unwrap());
        assert!(is_visible_in_panel(&record, &ctx).unwrap());

        record.visible_in_panel = false;
        assert!(is_eligible(&record, &ctx).unwrap());
        assert!(!is_visible_in_panel(&record, &ctx).unwrap());

        record.active = false;
        assert!(!is_eligible(&record, &ctx).unwrap());
    }
}
