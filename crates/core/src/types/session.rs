//! Admin authentication state and client-local preferences.

use serde::{Deserialize, Serialize};

/// Admin authentication state gating the admin view.
///
/// Established by an external auth exchange (out of scope here), torn down
/// by an explicit lock. This is process-local state, never persisted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminSession {
    authenticated: bool,
}

impl AdminSession {
    /// A locked session.
    #[must_use]
    pub const fn locked() -> Self {
        Self {
            authenticated: false,
        }
    }

    /// Mark the session authenticated after a successful external exchange.
    pub const fn unlock(&mut self) {
        self.authenticated = true;
    }

    /// Explicitly lock the panel.
    pub const fn lock(&mut self) {
        self.authenticated = false;
    }

    /// Whether the admin view may be entered.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

/// Visitor-facing theme preference, persisted in local storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_session_lock_cycle() {
        let mut session = AdminSession::locked();
        assert!(!session.is_authenticated());

        session.unlock();
        assert!(session.is_authenticated());

        session.lock();
        assert!(!session.is_authenticated());
    }
}
