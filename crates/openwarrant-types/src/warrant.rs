//! Warrant types for OpenWarrant
//!
//! A warrant is a pre-authenticated authorization grant. It scopes which
//! roles may perform which actions on which data categories, subject to
//! conditions and a validity window.
//!
//! Warrants are built once at load time and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::condition::Condition;
use crate::constraint::{Capability, Constraint, ConstraintOp};

/// Lifecycle status of a warrant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarrantStatus {
    #[serde(alias = "active")]
    Active,
    #[serde(alias = "suspended")]
    Suspended,
    #[serde(alias = "revoked")]
    Revoked,
}

impl WarrantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
            Self::Revoked => "REVOKED",
        }
    }
}

/// An authorization grant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warrant {
    /// Unique warrant ID
    pub id: String,
    /// Authority that issued the warrant
    pub issuer: String,
    /// Signature over the warrant (opaque here, verified upstream)
    #[serde(default)]
    pub signature: String,
    /// Roles allowed to invoke the warrant
    pub roles: Vec<String>,
    /// Actions covered by the warrant; entries may be dot-path wildcards
    pub actions: Vec<String>,
    /// Data categories covered by the warrant
    #[serde(alias = "data_types")]
    pub data_categories: Vec<String>,
    /// Conditions evaluated against the request context, in order
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Operator constraints; when non-empty they are evaluated instead of `conditions`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_constraints: Vec<Constraint>,
    /// Capabilities allowed to invoke the warrant; empty allows any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_capabilities: Vec<Capability>,
    /// Lifecycle status; absent means active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WarrantStatus>,
    /// Start of the validity window
    pub valid_from: DateTime<Utc>,
    /// End of the validity window
    pub valid_until: DateTime<Utc>,
    /// Minimum trust level required
    #[serde(default)]
    pub trust_level_required: u32,
    /// Whether audit logging is mandatory for this warrant
    #[serde(default = "default_audit_required")]
    pub audit_required: bool,
    /// Who to contact when a decision escalates
    #[serde(default)]
    pub escalation_target: String,
    /// Free-text notes
    #[serde(default)]
    pub notes: String,
}

fn default_audit_required() -> bool {
    true
}

impl Warrant {
    /// Start building a warrant
    pub fn builder(id: impl Into<String>, issuer: impl Into<String>) -> WarrantBuilder {
        WarrantBuilder::new(id, issuer)
    }

    /// Whether `at` falls inside the validity window (both ends inclusive)
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        !(at > self.valid_until || at < self.valid_from)
    }

    /// Suspended and revoked warrants never authorize anything
    pub fn is_usable(&self) -> bool {
        !matches!(
            self.status,
            Some(WarrantStatus::Suspended | WarrantStatus::Revoked)
        )
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_data_category(&self, category: &str) -> bool {
        self.data_categories.iter().any(|c| c == category)
    }
}

/// Builder for [`Warrant`]
#[derive(Debug, Clone)]
pub struct WarrantBuilder {
    warrant: Warrant,
}

impl WarrantBuilder {
    /// New builder with an open-ended validity window and empty scope
    pub fn new(id: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            warrant: Warrant {
                id: id.into(),
                issuer: issuer.into(),
                signature: String::new(),
                roles: vec![],
                actions: vec![],
                data_categories: vec![],
                conditions: vec![],
                context_constraints: vec![],
                allowed_capabilities: vec![],
                status: None,
                valid_from: DateTime::<Utc>::MIN_UTC,
                valid_until: DateTime::<Utc>::MAX_UTC,
                trust_level_required: 0,
                audit_required: true,
                escalation_target: String::new(),
                notes: String::new(),
            },
        }
    }

    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.warrant.signature = signature.into();
        self
    }

    pub fn roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.warrant.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.warrant.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn data_categories(
        mut self,
        categories: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.warrant.data_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Append a condition
    pub fn condition(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.warrant.conditions.push(Condition::new(name, value));
        self
    }

    /// Append an operator constraint
    pub fn constraint(
        mut self,
        field: impl Into<String>,
        operator: ConstraintOp,
        value: impl Into<Value>,
    ) -> Self {
        self.warrant
            .context_constraints
            .push(Constraint::new(field, operator, value));
        self
    }

    /// Allow a capability to invoke the warrant
    pub fn allowed_capability(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.warrant
            .allowed_capabilities
            .push(Capability::new(name, version));
        self
    }

    pub fn status(mut self, status: WarrantStatus) -> Self {
        self.warrant.status = Some(status);
        self
    }

    pub fn valid_between(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.warrant.valid_from = from;
        self.warrant.valid_until = until;
        self
    }

    pub fn trust_level_required(mut self, level: u32) -> Self {
        self.warrant.trust_level_required = level;
        self
    }

    pub fn audit_required(mut self, required: bool) -> Self {
        self.warrant.audit_required = required;
        self
    }

    pub fn escalation_target(mut self, target: impl Into<String>) -> Self {
        self.warrant.escalation_target = target.into();
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.warrant.notes = notes.into();
        self
    }

    pub fn build(self) -> Warrant {
        self.warrant
    }
}
