//! Broadcast notification rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::BroadcastId;

/// Severity tag attached to broadcasts and local notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

/// A broadcast row: fire-and-forget, consumed by all connected clients via
/// subscription, never queried historically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Broadcast {
    pub id: BroadcastId,
    pub message: String,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBroadcast {
    pub message: String,
    #[serde(rename = "type")]
    pub severity: Severity,
}

impl NewBroadcast {
    /// Compose a broadcast with the given severity tag.
    #[must_use]
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_wire_name_is_type() {
        let broadcast = NewBroadcast::new("restock tonight", Severity::Info);
        let json = serde_json::to_value(&broadcast).expect("serialize");
        assert_eq!(json["type"], "info");
        assert_eq!(json["message"], "restock tonight");
    }
}
