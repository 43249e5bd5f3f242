//! Warrant condition types
//!
//! A warrant declares its conditions as single-key mappings from a
//! condition name to an arbitrary value. Each entry is classified into a
//! [`ConditionRule`] once, when the warrant is built, so evaluation is a
//! plain match over a closed set of shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::{OpenWarrantError, Result};

/// Condition name that caps a request amount and escalates when exceeded
pub const ESCALATION_THRESHOLD: &str = "escalation_threshold";
/// Condition name that caps a single trade amount
pub const SINGLE_TRADE_LIMIT: &str = "single_trade_limit";
/// Condition name that caps a payout by the requesting role
pub const PAYOUT_WITHIN_AUTHORITY: &str = "payout_within_authority";

/// Value that marks a boolean-required condition
pub const REQUIRED_MARKER: &str = "required";

/// Classified shape of a condition
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionRule {
    /// Amount must not exceed `limit`
    Threshold { limit: Amount },
    /// Amount must not exceed the limit listed for the requesting role.
    /// `None` marks a role whose limit is not numeric.
    RoleLimit { limits: BTreeMap<String, Option<Amount>> },
    /// Context value under the condition name must be truthy
    Required,
    /// Context value must be one of these (compared as strings)
    AllowedSet(Vec<String>),
    /// Context value must equal this string
    ExactMatch(String),
    /// Shape not understood; always accepted
    Unrecognized,
}

impl ConditionRule {
    /// Classify a raw condition by name and value shape
    pub fn classify(name: &str, value: &Value) -> Self {
        match name {
            ESCALATION_THRESHOLD | SINGLE_TRADE_LIMIT => match Amount::from_value(value) {
                Some(limit) => Self::Threshold { limit },
                None => Self::Unrecognized,
            },
            PAYOUT_WITHIN_AUTHORITY => match value {
                Value::Object(map) => Self::RoleLimit {
                    limits: map
                        .iter()
                        .map(|(role, limit)| (role.clone(), Amount::from_number_value(limit)))
                        .collect(),
                },
                _ => Self::Unrecognized,
            },
            _ => match value {
                Value::Bool(true) => Self::Required,
                Value::String(s) if s == REQUIRED_MARKER => Self::Required,
                Value::Array(items) => Self::AllowedSet(items.iter().map(display_value).collect()),
                Value::String(s) => Self::ExactMatch(s.clone()),
                _ => Self::Unrecognized,
            },
        }
    }

    /// The result tag this rule produces
    pub fn kind(&self) -> ConditionKind {
        match self {
            Self::Threshold { .. } => ConditionKind::Threshold,
            Self::RoleLimit { .. } => ConditionKind::RoleLimit,
            Self::Required => ConditionKind::Required,
            Self::AllowedSet(_) => ConditionKind::AllowedSet,
            Self::ExactMatch(_) => ConditionKind::ExactMatch,
            Self::Unrecognized => ConditionKind::Unrecognized,
        }
    }
}

/// Kind tag attached to every evaluated condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Threshold,
    RoleLimit,
    Required,
    AllowedSet,
    ExactMatch,
    Unrecognized,
    /// Operator constraint over a context field
    Constraint,
    /// Lifecycle status of the covering warrant
    Status,
    /// Invoking capability checked against the warrant's allowlist
    Capability,
}

impl ConditionKind {
    /// Amount-limit kinds route failures to human review instead of a flat denial
    pub fn escalates_on_failure(&self) -> bool {
        matches!(self, Self::Threshold | Self::RoleLimit)
    }
}

/// A named condition declared by a warrant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Condition {
    name: String,
    value: Value,
    rule: ConditionRule,
}

impl Condition {
    /// Build a condition from its name and declared value
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        let rule = ConditionRule::classify(&name, &value);
        Self { name, value, rule }
    }

    /// Build one condition per key of a condition mapping, in document order
    pub fn from_mapping(map: Map<String, Value>) -> Vec<Self> {
        map.into_iter()
            .map(|(name, value)| Self::new(name, value))
            .collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value exactly as declared
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn rule(&self) -> &ConditionRule {
        &self.rule
    }

    pub fn kind(&self) -> ConditionKind {
        self.rule.kind()
    }
}

impl TryFrom<Map<String, Value>> for Condition {
    type Error = OpenWarrantError;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        if map.len() != 1 {
            return Err(OpenWarrantError::InvalidCondition {
                name: map.keys().cloned().collect::<Vec<_>>().join(","),
                reason: format!("expected a single-key mapping, found {} keys", map.len()),
            });
        }
        let (name, value) = map
            .into_iter()
            .next()
            .ok_or_else(|| OpenWarrantError::InvalidCondition {
                name: String::new(),
                reason: "empty mapping".to_string(),
            })?;
        Ok(Self::new(name, value))
    }
}

impl From<Condition> for Map<String, Value> {
    fn from(condition: Condition) -> Self {
        let mut map = Map::new();
        map.insert(condition.name, condition.value);
        map
    }
}

/// A numeric limit or amount.
///
/// Integers stay exact so limits past 2^53 compare correctly; any side
/// that is not an integer falls back to `f64` comparison.
#[derive(Debug, Clone, Copy)]
pub enum Amount {
    Int(i128),
    Float(f64),
}

impl Amount {
    /// Interpret a value as a number, accepting numeric strings
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Self::from_number(n),
            Value::String(s) => Self::parse(s.trim()),
            _ => None,
        }
    }

    /// Interpret a value as a number, rejecting strings
    pub fn from_number_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Self::from_number(n),
            _ => None,
        }
    }

    pub fn from_number(n: &Number) -> Option<Self> {
        if let Some(i) = n.as_i64() {
            return Some(Self::Int(i.into()));
        }
        if let Some(u) = n.as_u64() {
            return Some(Self::Int(u.into()));
        }
        n.as_f64().filter(|f| f.is_finite()).map(Self::Float)
    }

    fn parse(s: &str) -> Option<Self> {
        if let Ok(i) = s.parse::<i128>() {
            return Some(Self::Int(i));
        }
        s.parse::<f64>().ok().filter(|f| f.is_finite()).map(Self::Float)
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

impl PartialEq for Amount {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Amount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
        }
    }
}

/// Render a context value as a string for comparison and reporting.
///
/// Strings render verbatim, null renders empty, everything else as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Truthiness of a context value: null, false, zero and empty containers are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
