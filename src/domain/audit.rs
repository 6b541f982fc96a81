//! Audit log entries. Append-only: every write path adds a row, nothing
//! updates or deletes one. Every other component that needs to leave a
//! trail builds one of these rather than writing free-form log lines.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warn,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Order,
    Risk,
    Signal,
    Broker,
    System,
    Auth,
    Config,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub timestamp: i64,
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    pub context: HashMap<String, String>,
    pub related_entity_id: Option<String>,
    pub related_entity_type: Option<String>,
}

impl AuditEntry {
    pub fn new(id: String, timestamp: i64, severity: Severity, category: Category, message: impl Into<String>) -> Self {
        Self {
            id,
            timestamp,
            severity,
            category,
            message: message.into(),
            context: HashMap::new(),
            related_entity_id: None,
            related_entity_type: None,
        }
    }

    pub fn with_related(mut self, entity_id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        self.related_entity_id = Some(entity_id.into());
        self.related_entity_type = Some(entity_type.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}
