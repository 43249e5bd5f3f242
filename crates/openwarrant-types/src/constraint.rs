//! Operator constraints and capability allowlists
//!
//! A constraint names a context field, a comparison operator and an
//! expected value:
//!
//! ```yaml
//! context_constraints:
//!   - field: care_setting
//!     operator: in
//!     value: [icu, ed]
//! ```
//!
//! When a warrant declares any constraints they replace its named
//! conditions during evaluation.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::condition::display_value;

/// Context key holding the invoking capability, `{name, version}`
pub const CAPABILITY_CONTEXT_KEY: &str = "__capability";

/// Comparison applied by a [`Constraint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintOp {
    Eq,
    Ne,
    In,
    NotIn,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Expected text occurs in the rendered field value
    Contains,
    /// Field is present and truthy; the expected value is ignored
    Required,
}

impl ConstraintOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Contains => "contains",
            Self::Required => "required",
        }
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A comparison between one context field and an expected value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub field: String,
    #[serde(alias = "op")]
    pub operator: ConstraintOp,
    #[serde(default)]
    pub value: Value,
}

impl Constraint {
    pub fn new(field: impl Into<String>, operator: ConstraintOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Short form used in evaluation details, e.g. `gte 18`
    pub fn describe(&self) -> String {
        format!("{} {}", self.operator, display_value(&self.value))
    }
}

/// A capability allowed to invoke a warrant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    #[serde(deserialize_with = "scalar_string")]
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
}

impl Capability {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// `name@version`
    pub fn label(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// Accept any scalar (YAML reads `version: 3.2` as a float) and keep its text
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Value::deserialize(deserializer).map(|v| display_value(&v))
}
