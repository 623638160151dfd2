//! Visitor presence rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::SessionId;

/// A visitor presence record, keyed by session identifier.
///
/// Created on a visitor's first load and upserted on every heartbeat.
/// Geolocation and network-address fields are filled opportunistically and
/// may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visitor {
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub last_active: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Best-effort re-identification across sessions on the same network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_address: Option<String>,
}

impl Visitor {
    /// Display name for operators: nickname if set, short session id otherwise.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.nickname
            .as_deref()
            .unwrap_or_else(|| self.session_id.short())
    }
}

/// Upsert payload for a visitor heartbeat, keyed by `session_id`.
///
/// Only the fields present are written, so a bare heartbeat never clobbers
/// an operator-assigned nickname.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorUpsert {
    pub session_id: SessionId,
    pub last_active: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_address: Option<String>,
}

impl VisitorUpsert {
    /// A heartbeat for `session_id` stamped with the current time.
    #[must_use]
    pub fn heartbeat(session_id: SessionId) -> Self {
        Self {
            session_id,
            last_active: Utc::now(),
            network_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_nickname() {
        let mut visitor = Visitor {
            session_id: SessionId::from("a1b2c3d4-full-token"),
            nickname: None,
            last_active: Utc::now(),
            location_city: None,
            location_country: None,
            latitude: None,
            longitude: None,
            network_address: None,
        };
        assert_eq!(visitor.display_name(), "a1b2c3d4");

        visitor.nickname = Some("Repeat Buyer".to_string());
        assert_eq!(visitor.display_name(), "Repeat Buyer");
    }
}
