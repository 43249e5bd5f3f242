//! Audit record types and the chain hashing rule

use chrono::{DateTime, SecondsFormat, Utc};
use openwarrant_types::{AuditRecordId, ConditionResult, Decision, WarrantResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Tag prefixed to every rendered digest
pub const HASH_SCHEME: &str = "sha256:";

/// Head of an empty chain
pub const GENESIS_HASH: &str =
    "sha256:0000000000000000000000000000000000000000000000000000000000000000";

/// `sha256:` + hex(SHA-256(content ++ previous_hash))
pub fn chain_hash(content: &str, previous_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.update(previous_hash.as_bytes());
    format!("{}{}", HASH_SCHEME, hex::encode(hasher.finalize()))
}

/// Flattened condition outcome as stored in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditCondition {
    pub condition: String,
    pub met: bool,
    pub detail: String,
}

impl From<&ConditionResult> for AuditCondition {
    fn from(result: &ConditionResult) -> Self {
        Self {
            condition: result.condition.clone(),
            met: result.met,
            detail: result.detail.clone(),
        }
    }
}

/// Decision content handed to the ledger for appending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContent {
    pub agent_id: String,
    pub warrant_id: Option<String>,
    pub action: String,
    pub decision: Decision,
    pub conditions: Vec<AuditCondition>,
    pub correlation_id: Option<String>,
}

impl AuditContent {
    /// Capture the audit-relevant parts of a finished decision
    pub fn from_response(
        response: &WarrantResponse,
        agent_id: impl Into<String>,
        action: impl Into<String>,
        correlation_id: Option<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            warrant_id: response.warrant_id.clone(),
            action: action.into(),
            decision: response.decision,
            conditions: response
                .conditions_evaluated
                .iter()
                .map(AuditCondition::from)
                .collect(),
            correlation_id,
        }
    }

    /// Canonical content string: compact JSON with keys in sorted order.
    ///
    /// Absent warrant or correlation ids render as `null`.
    pub fn canonical_string(&self, timestamp: &DateTime<Utc>) -> String {
        let mut fields: BTreeMap<&str, Value> = BTreeMap::new();
        fields.insert("agent_id", json!(self.agent_id));
        fields.insert("warrant_id", json!(self.warrant_id));
        fields.insert("action", json!(self.action));
        fields.insert("decision", json!(self.decision.as_str()));
        fields.insert("conditions", json!(sorted_conditions(&self.conditions)));
        fields.insert("correlation_id", json!(self.correlation_id));
        fields.insert("timestamp", json!(render_timestamp(timestamp)));
        serde_json::to_string(&fields).unwrap_or_default()
    }
}

fn sorted_conditions(conditions: &[AuditCondition]) -> Vec<BTreeMap<&'static str, Value>> {
    conditions
        .iter()
        .map(|c| {
            BTreeMap::from([
                ("condition", json!(c.condition)),
                ("detail", json!(c.detail)),
                ("met", json!(c.met)),
            ])
        })
        .collect()
}

/// Timestamp form used inside the hashed content
pub fn render_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// One immutable ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub record_id: AuditRecordId,
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub warrant_id: Option<String>,
    pub action: String,
    pub decision: Decision,
    pub conditions_evaluated: Vec<AuditCondition>,
    pub correlation_id: Option<String>,
    pub previous_hash: String,
    pub record_hash: String,
}

impl AuditRecord {
    /// Content this record was hashed from
    pub fn content(&self) -> AuditContent {
        AuditContent {
            agent_id: self.agent_id.clone(),
            warrant_id: self.warrant_id.clone(),
            action: self.action.clone(),
            decision: self.decision,
            conditions: self.conditions_evaluated.clone(),
            correlation_id: self.correlation_id.clone(),
        }
    }

    /// Recompute this record's hash from its stored fields
    pub fn compute_hash(&self) -> String {
        chain_hash(&self.content().canonical_string(&self.timestamp), &self.previous_hash)
    }

    /// Verify the stored hash matches the stored fields
    pub fn verify(&self) -> bool {
        self.record_hash == self.compute_hash()
    }
}
