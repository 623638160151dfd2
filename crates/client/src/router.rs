//! View routing with the admin gate.
//!
//! A single enum of top-level views and the one rule the UI must never get
//! wrong: the admin view is only reachable while the admin session is
//! authenticated. Navigating there while locked lands on the login view,
//! and a successful unlock completes the original navigation. There is no
//! history stack; navigation always replaces the current view.

use cardvault_core::AdminSession;
use tracing::debug;

/// Top-level views of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Home,
    Shop,
    Favorites,
    Auctions,
    Portfolio,
    Settings,
    Cart,
    Profile,
    AdminLogin,
    Admin,
}

/// Current view plus the admin session gating [`View::Admin`].
#[derive(Debug, Default)]
pub struct ViewRouter {
    current: View,
    session: AdminSession,
}

impl ViewRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn current(&self) -> View {
        self.current
    }

    #[must_use]
    pub const fn is_admin_unlocked(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Navigate, redirecting a locked admin request to the login view.
    pub fn navigate(&mut self, view: View) {
        self.current = match view {
            View::Admin if !self.session.is_authenticated() => {
                debug!("admin view requested while locked, redirecting to login");
                View::AdminLogin
            }
            other => other,
        };
    }

    /// Record a successful external auth exchange. If the visitor was
    /// parked on the login view, the original navigation completes.
    pub fn unlock_admin(&mut self) {
        self.session.unlock();
        if self.current == View::AdminLogin {
            self.current = View::Admin;
        }
    }

    /// Lock the panel. A visitor still on an admin view is sent home.
    pub fn lock_admin(&mut self) {
        self.session.lock();
        if matches!(self.current, View::Admin | View::AdminLogin) {
            self.current = View::Home;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_admin_navigation_redirects_to_login() {
        let mut router = ViewRouter::new();
        router.navigate(View::Admin);
        assert_eq!(router.current(), View::AdminLogin);
    }

    #[test]
    fn test_unlock_completes_pending_navigation() {
        let mut router = ViewRouter::new();
        router.navigate(View::Admin);
        router.unlock_admin();
        assert_eq!(router.current(), View::Admin);
    }

    #[test]
    fn test_unlocked_session_navigates_directly() {
        let mut router = ViewRouter::new();
        router.unlock_admin();
        router.navigate(View::Admin);
        assert_eq!(router.current(), View::Admin);
    }

    #[test]
    fn test_lock_evicts_from_admin_view() {
        let mut router = ViewRouter::new();
        router.unlock_admin();
        router.navigate(View::Admin);

        router.lock_admin();
        assert_eq!(router.current(), View::Home);
        assert!(!router.is_admin_unlocked());
    }

    #[test]
    fn test_lock_leaves_storefront_views_alone() {
        let mut router = ViewRouter::new();
        router.navigate(View::Cart);
        router.lock_admin();
        assert_eq!(router.current(), View::Cart);
    }

    #[test]
    fn test_navigation_replaces_current_view() {
        let mut router = ViewRouter::new();
        router.navigate(View::Shop);
        router.navigate(View::Portfolio);
        assert_eq!(router.current(), View::Portfolio);
    }
}
