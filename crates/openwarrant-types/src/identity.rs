//! Identity types for OpenWarrant
//!
//! Warrant ids come from the catalog and stay plain strings. Ids the system
//! mints itself are strongly typed wrappers around UUIDs.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix carried by every audit record id
pub const AUDIT_RECORD_PREFIX: &str = "aud";

/// Unique identifier for an audit ledger record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct AuditRecordId(pub Uuid);

impl AuditRecordId {
    /// Create a new random ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string (with or without prefix)
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        let s = s
            .strip_prefix(AUDIT_RECORD_PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(s);
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AuditRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuditRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", AUDIT_RECORD_PREFIX, self.0.simple())
    }
}

impl From<AuditRecordId> for String {
    fn from(id: AuditRecordId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for AuditRecordId {
    type Error = uuid::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}
