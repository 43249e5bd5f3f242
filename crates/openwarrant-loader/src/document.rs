//! On-disk warrant document shape
//!
//! ```yaml
//! warrant:
//!   id: hipaa-treatment-001
//!   issuer: compliance@hospital.example
//!   who_can_act:
//!     roles: [attending_physician]
//!   what_they_can_do:
//!     actions: [read-patient-record]
//!     data_types: [PHI]
//!   under_what_conditions:
//!     - patient_consent: required
//!   valid_from: 2026-01-01T00:00:00Z
//!   valid_until: 2026-12-31T23:59:59Z
//! ```
//!
//! The `warrant:` wrapper is optional. Optional extras:
//!
//! ```yaml
//!   status: SUSPENDED
//!   context_constraints:
//!     - {field: care_setting, operator: in, value: [icu, ed]}
//!   allowed_capabilities:
//!     - {name: sepsis-model, version: "3.2"}
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use openwarrant_types::{display_value, Capability, Condition, Constraint, Warrant, WarrantStatus};
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_VALID_FROM: &str = "2026-01-01T00:00:00Z";
pub const DEFAULT_VALID_UNTIL: &str = "2026-12-31T23:59:59Z";

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WarrantDocument {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    issuer: Value,
    #[serde(default)]
    signature: Value,
    #[serde(default)]
    who_can_act: Option<Scope>,
    #[serde(default)]
    what_they_can_do: Option<Scope>,
    #[serde(default)]
    under_what_conditions: Option<Vec<Value>>,
    #[serde(default)]
    context_constraints: Option<Vec<Constraint>>,
    #[serde(default)]
    allowed_capabilities: Option<Vec<Capability>>,
    #[serde(default)]
    status: Option<WarrantStatus>,
    #[serde(default)]
    valid_from: Value,
    #[serde(default)]
    valid_until: Value,
    #[serde(default)]
    trust_level_required: Option<u32>,
    #[serde(default)]
    audit_required: Option<bool>,
    #[serde(default)]
    escalation_target: Value,
    #[serde(default)]
    notes: Value,
}

#[derive(Debug, Default, Deserialize)]
struct Scope {
    #[serde(default)]
    roles: Option<Vec<String>>,
    #[serde(default)]
    actions: Option<Vec<String>>,
    #[serde(default)]
    data_types: Option<Vec<String>>,
}

impl WarrantDocument {
    /// Convert into a warrant; fails only on unparseable validity bounds
    pub(crate) fn into_warrant(self) -> Result<Warrant, String> {
        let who = self.who_can_act.unwrap_or_default();
        let what = self.what_they_can_do.unwrap_or_default();

        // Non-mapping entries are ignored; multi-key mappings become one
        // condition per key, in document order
        let conditions = self
            .under_what_conditions
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| match entry {
                Value::Object(map) => Some(Condition::from_mapping(map)),
                _ => None,
            })
            .flatten()
            .collect();

        Ok(Warrant {
            id: display_value(&self.id),
            issuer: display_value(&self.issuer),
            signature: display_value(&self.signature),
            roles: who.roles.unwrap_or_default(),
            actions: what.actions.unwrap_or_default(),
            data_categories: what.data_types.unwrap_or_default(),
            conditions,
            context_constraints: self.context_constraints.unwrap_or_default(),
            allowed_capabilities: self.allowed_capabilities.unwrap_or_default(),
            status: self.status,
            valid_from: bound(&self.valid_from, DEFAULT_VALID_FROM)?,
            valid_until: bound(&self.valid_until, DEFAULT_VALID_UNTIL)?,
            trust_level_required: self.trust_level_required.unwrap_or(0),
            audit_required: self.audit_required.unwrap_or(true),
            escalation_target: display_value(&self.escalation_target),
            notes: display_value(&self.notes),
        })
    }
}

fn bound(value: &Value, default: &str) -> Result<DateTime<Utc>, String> {
    match value {
        Value::Null => parse_datetime(default),
        other => parse_datetime(&display_value(other)),
    }
}

/// Parse a validity bound.
///
/// Accepts RFC 3339, naive date-times (taken as UTC) and bare dates
/// (midnight UTC).
pub fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, String> {
    let s = raw.trim().trim_matches(|c| c == '"' || c == '\'');

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&midnight));
    }
    Err(format!("invalid timestamp '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_forms() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(parse_datetime("2026-03-01T09:30:00Z").unwrap(), expected);
        assert_eq!(parse_datetime("2026-03-01T10:30:00+01:00").unwrap(), expected);
        assert_eq!(parse_datetime("2026-03-01T09:30:00").unwrap(), expected);
        assert_eq!(parse_datetime("2026-03-01 09:30:00").unwrap(), expected);
        assert_eq!(parse_datetime("\"2026-03-01T09:30:00Z\"").unwrap(), expected);
        assert_eq!(
            parse_datetime("2026-03-01").unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
        );
        assert!(parse_datetime("next tuesday").is_err());
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let warrant = WarrantDocument::default().into_warrant().unwrap();

        assert_eq!(warrant.id, "");
        assert!(warrant.roles.is_empty());
        assert!(warrant.conditions.is_empty());
        assert!(warrant.context_constraints.is_empty());
        assert!(warrant.allowed_capabilities.is_empty());
        assert!(warrant.status.is_none());
        assert!(warrant.audit_required);
        assert_eq!(warrant.trust_level_required, 0);
        assert_eq!(warrant.valid_from, parse_datetime(DEFAULT_VALID_FROM).unwrap());
        assert_eq!(warrant.valid_until, parse_datetime(DEFAULT_VALID_UNTIL).unwrap());
    }
}
