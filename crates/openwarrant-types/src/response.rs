//! Decision and response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::condition::ConditionKind;
use crate::warrant::Warrant;

/// Outcome of a warrant check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// A warrant matched and every condition held
    Authorized,
    /// A warrant matched but a condition failed
    Denied,
    /// A warrant matched but an amount limit was breached; route to human review
    Escalate,
    /// No warrant covers the request
    NoWarrant,
    /// The matching warrant is outside its validity window
    Expired,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorized => "AUTHORIZED",
            Self::Denied => "DENIED",
            Self::Escalate => "ESCALATE",
            Self::NoWarrant => "NO_WARRANT",
            Self::Expired => "EXPIRED",
        }
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionResult {
    /// Condition name
    pub condition: String,
    /// Whether the condition held
    pub met: bool,
    /// Why it passed or failed
    pub detail: String,
    /// Which rule shape produced the result
    pub kind: ConditionKind,
}

impl ConditionResult {
    pub fn met(condition: impl Into<String>, kind: ConditionKind, detail: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            met: true,
            detail: detail.into(),
            kind,
        }
    }

    pub fn unmet(condition: impl Into<String>, kind: ConditionKind, detail: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            met: false,
            detail: detail.into(),
            kind,
        }
    }

    /// A failed amount-limit condition
    pub fn triggers_escalation(&self) -> bool {
        !self.met && self.kind.escalates_on_failure()
    }
}

/// Authority metadata copied from the matched warrant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantAuthority {
    pub issuer: String,
    /// Warrant identifier
    #[serde(rename = "type")]
    pub warrant_type: String,
    pub issued: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    /// Actions the warrant covers
    pub scope: Vec<String>,
}

impl From<&Warrant> for WarrantAuthority {
    fn from(warrant: &Warrant) -> Self {
        Self {
            issuer: warrant.issuer.clone(),
            warrant_type: warrant.id.clone(),
            issued: warrant.valid_from,
            expires: warrant.valid_until,
            scope: warrant.actions.clone(),
        }
    }
}

/// Notice that the engine's trust level went up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustElevation {
    pub eligible: bool,
    pub new_level: u8,
}

impl TrustElevation {
    pub fn to_level(new_level: u8) -> Self {
        Self {
            eligible: true,
            new_level,
        }
    }
}

/// Result of a warrant check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantResponse {
    pub decision: Decision,
    pub warrant_id: Option<String>,
    pub authority: Option<WarrantAuthority>,
    pub conditions_evaluated: Vec<ConditionResult>,
    /// Hash of the audit record written for this decision
    pub audit_hash: String,
    /// Hash of the record before it
    pub previous_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_elevation: Option<TrustElevation>,
}

impl WarrantResponse {
    /// Response with no warrant attached; hashes are filled in after the audit append
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            warrant_id: None,
            authority: None,
            conditions_evaluated: vec![],
            audit_hash: String::new(),
            previous_hash: String::new(),
            trust_elevation: None,
        }
    }

    /// Response carrying the matched warrant's id and authority snapshot
    pub fn for_warrant(decision: Decision, warrant: &Warrant) -> Self {
        Self {
            warrant_id: Some(warrant.id.clone()),
            authority: Some(WarrantAuthority::from(warrant)),
            ..Self::new(decision)
        }
    }

    pub fn with_conditions(mut self, conditions: Vec<ConditionResult>) -> Self {
        self.conditions_evaluated = conditions;
        self
    }

    pub fn failed_conditions(&self) -> impl Iterator<Item = &ConditionResult> {
        self.conditions_evaluated.iter().filter(|c| !c.met)
    }
}
