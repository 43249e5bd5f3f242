//! Authorization request types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{OpenWarrantError, Result};

/// A single authorization query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarrantRequest {
    /// Acting agent
    pub agent_id: String,
    /// Requested action
    pub action: String,
    /// Role the agent is acting under
    pub role: String,
    /// Data category being touched
    #[serde(alias = "data_type")]
    pub data_category: String,
    /// Facts consulted by condition evaluation
    #[serde(default)]
    pub context: Map<String, Value>,
    /// Decision instant; defaults to now when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Caller-supplied id for tracing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl WarrantRequest {
    pub fn new(
        agent_id: impl Into<String>,
        action: impl Into<String>,
        role: impl Into<String>,
        data_category: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            action: action.into(),
            role: role.into(),
            data_category: data_category.into(),
            context: Map::new(),
            timestamp: None,
            correlation_id: None,
        }
    }

    /// Set a single context entry
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Parse a context bag from JSON text; it must be an object
    pub fn parse_context(raw: &str) -> Result<Map<String, Value>> {
        match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => Ok(map),
            other => Err(OpenWarrantError::Serialization {
                message: format!("context must be a JSON object, got {}", other),
            }),
        }
    }

    /// Replace the whole context bag
    pub fn with_context_map(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Instant the decision is evaluated at
    pub fn effective_time(&self) -> DateTime<Utc> {
        self.timestamp.unwrap_or_else(Utc::now)
    }

    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    /// Reject requests missing any of the identifying fields
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("agent_id", &self.agent_id),
            ("action", &self.action),
            ("role", &self.role),
            ("data_category", &self.data_category),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(OpenWarrantError::invalid_request(field));
            }
        }
        Ok(())
    }
}
