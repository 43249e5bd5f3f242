//! Condition evaluator
//!
//! Scores a warrant's conditions against a request's context. Pure: no
//! state, no side effects, and every condition is reported even after one
//! has failed.
//!
//! A warrant with operator constraints is scored on those instead of its
//! named conditions. A capability allowlist, when declared, adds one more
//! result after either.

use openwarrant_types::{
    display_value, is_truthy, Amount, Condition, ConditionKind, ConditionResult, ConditionRule,
    Constraint, ConstraintOp, Warrant, WarrantRequest, CAPABILITY_CONTEXT_KEY,
};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Context keys consulted for threshold conditions, in priority order
const THRESHOLD_AMOUNT_KEYS: [&str; 2] = ["amount", "trade_amount"];
/// Context keys consulted for role-scoped payout limits, in priority order
const PAYOUT_AMOUNT_KEYS: [&str; 2] = ["amount", "payout_amount"];

/// Evaluate every condition or constraint declared by `warrant`
pub fn evaluate(warrant: &Warrant, request: &WarrantRequest) -> Vec<ConditionResult> {
    let mut results: Vec<ConditionResult> = if warrant.context_constraints.is_empty() {
        warrant
            .conditions
            .iter()
            .map(|condition| evaluate_condition(condition, request))
            .collect()
    } else {
        warrant
            .context_constraints
            .iter()
            .map(|constraint| constraint_result(constraint, request))
            .collect()
    };
    results.extend(evaluate_capability(warrant, request));
    results
}

/// Evaluate a single condition
pub fn evaluate_condition(condition: &Condition, request: &WarrantRequest) -> ConditionResult {
    let name = condition.name();
    let kind = condition.kind();

    match condition.rule() {
        ConditionRule::Threshold { limit } => match context_amount(request, &THRESHOLD_AMOUNT_KEYS) {
            Some(amount) if amount > *limit => ConditionResult::unmet(
                name,
                kind,
                format!("Amount {} exceeds threshold {}: escalation required", amount, limit),
            ),
            _ => ConditionResult::met(name, kind, format!("Within threshold ({})", limit)),
        },
        ConditionRule::RoleLimit { limits } => evaluate_role_limit(name, limits, request),
        ConditionRule::Required => {
            let met = request.context_value(name).map(is_truthy).unwrap_or(false);
            let detail = if met {
                "Present in context"
            } else {
                "Missing or false in context"
            };
            ConditionResult {
                condition: name.to_string(),
                met,
                detail: detail.to_string(),
                kind,
            }
        }
        ConditionRule::AllowedSet(allowed) => {
            let actual = context_string(request, name);
            let met = allowed.iter().any(|v| v == &actual);
            ConditionResult {
                condition: name.to_string(),
                met,
                detail: format!(
                    "Value '{}' {} allowed: [{}]",
                    actual,
                    if met { "in" } else { "not in" },
                    allowed.join(", ")
                ),
                kind,
            }
        }
        ConditionRule::ExactMatch(expected) => {
            let actual = context_string(request, name);
            ConditionResult {
                condition: name.to_string(),
                met: &actual == expected,
                detail: format!("Expected '{}', got '{}'", expected, actual),
                kind,
            }
        }
        ConditionRule::Unrecognized => ConditionResult::met(name, kind, "Condition accepted"),
    }
}

fn evaluate_role_limit(
    name: &str,
    limits: &BTreeMap<String, Option<Amount>>,
    request: &WarrantRequest,
) -> ConditionResult {
    let kind = ConditionKind::RoleLimit;
    let role = request.role.as_str();
    // A role missing from the table has no payout authority at all
    let limit = limits.get(role).copied().unwrap_or(Some(Amount::Int(0)));
    let amount = context_amount(request, &PAYOUT_AMOUNT_KEYS);

    match (amount, limit) {
        (Some(amount), Some(limit)) if amount > limit => ConditionResult::unmet(
            name,
            kind,
            format!("Amount {} exceeds {} limit of {}", amount, role, limit),
        ),
        (Some(_), Some(limit)) => {
            ConditionResult::met(name, kind, format!("Within {} limit ({})", role, limit))
        }
        _ => ConditionResult::met(name, kind, "No amount to check"),
    }
}

/// First present key wins; an absent amount counts as zero, a non-numeric one as unknown
fn context_amount(request: &WarrantRequest, keys: &[&str]) -> Option<Amount> {
    match keys.iter().find_map(|key| request.context_value(key)) {
        None => Some(Amount::Int(0)),
        Some(value) => Amount::from_number_value(value),
    }
}

fn constraint_result(constraint: &Constraint, request: &WarrantRequest) -> ConditionResult {
    ConditionResult {
        condition: constraint.field.clone(),
        met: evaluate_constraint(constraint, &request.context),
        detail: constraint.describe(),
        kind: ConditionKind::Constraint,
    }
}

/// Test one operator constraint against a context bag.
///
/// A missing or null field never satisfies any operator. Ordering operators
/// compare numbers with numbers and strings with strings; any other pairing
/// fails.
pub fn evaluate_constraint(constraint: &Constraint, context: &Map<String, Value>) -> bool {
    let Some(actual) = context.get(&constraint.field).filter(|v| !v.is_null()) else {
        return false;
    };
    let expected = &constraint.value;

    match constraint.operator {
        ConstraintOp::Eq => values_equal(actual, expected),
        ConstraintOp::Ne => !values_equal(actual, expected),
        ConstraintOp::In => member_of(actual, expected),
        ConstraintOp::NotIn => !member_of(actual, expected),
        ConstraintOp::Gt => compare(actual, expected) == Some(Ordering::Greater),
        ConstraintOp::Gte => matches!(compare(actual, expected), Some(Ordering::Greater | Ordering::Equal)),
        ConstraintOp::Lt => compare(actual, expected) == Some(Ordering::Less),
        ConstraintOp::Lte => matches!(compare(actual, expected), Some(Ordering::Less | Ordering::Equal)),
        ConstraintOp::Contains => display_value(actual).contains(&display_value(expected)),
        ConstraintOp::Required => is_truthy(actual),
    }
}

/// Numbers compare by value (`18 == 18.0`), everything else structurally
fn values_equal(a: &Value, b: &Value) -> bool {
    match (Amount::from_number_value(a), Amount::from_number_value(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// A scalar expected value acts as a one-element list
fn member_of(actual: &Value, expected: &Value) -> bool {
    match expected {
        Value::Array(items) => items.iter().any(|item| values_equal(actual, item)),
        other => values_equal(actual, other),
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => Amount::from_number_value(a)?.partial_cmp(&Amount::from_number_value(b)?),
    }
}

/// Check the invoking capability against the warrant's allowlist.
///
/// Nothing to report when the warrant allows any capability or the request
/// does not name one as a `{name, version}` object.
pub fn evaluate_capability(warrant: &Warrant, request: &WarrantRequest) -> Option<ConditionResult> {
    if warrant.allowed_capabilities.is_empty() {
        return None;
    }
    let Value::Object(invoking) = request.context_value(CAPABILITY_CONTEXT_KEY)? else {
        return None;
    };
    let field = |key: &str| invoking.get(key).map(display_value).unwrap_or_default();
    let (name, version) = (field("name"), field("version"));

    let kind = ConditionKind::Capability;
    let allowed = warrant
        .allowed_capabilities
        .iter()
        .any(|c| c.name == name && c.version == version);
    Some(if allowed {
        ConditionResult::met(
            CAPABILITY_CONTEXT_KEY,
            kind,
            format!("Capability {}@{} allowed", name, version),
        )
    } else {
        ConditionResult::unmet(
            CAPABILITY_CONTEXT_KEY,
            kind,
            format!("Capability {}@{} not in allowlist", name, version),
        )
    })
}

fn context_string(request: &WarrantRequest, key: &str) -> String {
    request.context_value(key).map(display_value).unwrap_or_default()
}
