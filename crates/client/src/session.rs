//! Visitor session identity and preferences.
//!
//! Each browser-equivalent client carries a persistent random session token.
//! The token keys the visitor's presence row and chat transcript on the
//! remote store, so losing it means losing chat history; persistence
//! failures therefore degrade to a per-run identity with a warning rather
//! than failing the client.

use cardvault_core::{SessionId, Theme, VisitorUpsert};
use tracing::{debug, warn};

use crate::gateway::Gateway;
use crate::storage::{KEY_SESSION_ID, KEY_THEME, LocalStore};

/// Owns the session token and client-local preferences.
#[derive(Debug)]
pub struct SessionManager {
    session_id: SessionId,
    theme: Theme,
}

impl SessionManager {
    /// Establish the identity and announce it: load or mint the token,
    /// then upsert this visitor's presence row with a fresh timestamp.
    pub async fn init<G: Gateway>(store: &mut LocalStore, gateway: &G) -> Self {
        let manager = Self::load_or_create(store);
        manager.heartbeat(gateway).await;
        manager
    }

    /// Load the persisted identity, minting and persisting a fresh token on
    /// first run.
    pub fn load_or_create(store: &mut LocalStore) -> Self {
        let session_id = match store.get::<String>(KEY_SESSION_ID) {
            Some(token) => SessionId::new(token),
            None => {
                let fresh = SessionId::generate();
                if let Err(e) = store.set(KEY_SESSION_ID, &fresh.as_str()) {
                    warn!(error = %e, "could not persist session token, identity is per-run");
                }
                debug!(session = %fresh.short(), "minted new session token");
                fresh
            }
        };
        let theme = store.get::<Theme>(KEY_THEME).unwrap_or_default();
        Self { session_id, theme }
    }

    #[must_use]
    pub const fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    #[must_use]
    pub const fn theme(&self) -> Theme {
        self.theme
    }

    /// Switch the theme and persist the choice.
    pub fn set_theme(&mut self, store: &mut LocalStore, theme: Theme) {
        self.theme = theme;
        if let Err(e) = store.set(KEY_THEME, &theme) {
            warn!(error = %e, "could not persist theme preference");
        }
    }

    /// Upsert this visitor's presence row. Best-effort: presence is
    /// invisible to the visitor, so failures are logged and swallowed.
    pub async fn heartbeat<G: Gateway>(&self, gateway: &G) {
        let upsert = VisitorUpsert::heartbeat(self.session_id.clone());
        if let Err(e) = gateway.upsert_visitor(upsert).await {
            warn!(session = %self.session_id.short(), error = %e, "presence heartbeat failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;

    fn temp_store(name: &str) -> LocalStore {
        let path = std::env::temp_dir().join(format!(
            "cardvault-session-{name}-{}",
            uuid::Uuid::new_v4()
        ));
        LocalStore::open(path)
    }

    #[test]
    fn test_identity_survives_reload() {
        let mut store = temp_store("reload");
        let first = SessionManager::load_or_create(&mut store);

        let reopened = LocalStore::open(store.path().to_path_buf());
        let mut reopened = reopened;
        let second = SessionManager::load_or_create(&mut reopened);

        assert_eq!(first.session_id(), second.session_id());
        std::fs::remove_file(store.path()).unwrap();
    }

    #[test]
    fn test_fresh_tokens_differ_across_stores() {
        let mut a = temp_store("a");
        let mut b = temp_store("b");
        let first = SessionManager::load_or_create(&mut a);
        let second = SessionManager::load_or_create(&mut b);
        assert_ne!(first.session_id(), second.session_id());
        std::fs::remove_file(a.path()).unwrap();
        std::fs::remove_file(b.path()).unwrap();
    }

    #[test]
    fn test_theme_round_trips() {
        let mut store = temp_store("theme");
        let mut manager = SessionManager::load_or_create(&mut store);
        manager.set_theme(&mut store, Theme::Dark);

        let mut reopened = LocalStore::open(store.path().to_path_buf());
        let reloaded = SessionManager::load_or_create(&mut reopened);
        assert_eq!(reloaded.theme(), Theme::Dark);
        std::fs::remove_file(store.path()).unwrap();
    }

    #[tokio::test]
    async fn test_heartbeat_creates_presence_row() {
        let gateway = MemoryGateway::new();
        let mut store = temp_store("heartbeat");
        let manager = SessionManager::load_or_create(&mut store);

        manager.heartbeat(&gateway).await;

        let visitors = gateway.list_visitors().await.unwrap();
        assert_eq!(visitors.len(), 1);
        assert_eq!(&visitors[0].session_id, manager.session_id());
        std::fs::remove_file(store.path()).unwrap();
    }

    #[tokio::test]
    async fn test_init_persists_identity_and_announces_presence() {
        let gateway = MemoryGateway::new();
        let mut store = temp_store("init");

        let manager = SessionManager::init(&mut store, &gateway).await;

        let visitors = gateway.list_visitors().await.unwrap();
        assert_eq!(&visitors[0].session_id, manager.session_id());

        let mut reopened = LocalStore::open(store.path().to_path_buf());
        let reloaded = SessionManager::init(&mut reopened, &gateway).await;
        assert_eq!(reloaded.session_id(), manager.session_id());
        assert_eq!(gateway.list_visitors().await.unwrap().len(), 1);
        std::fs::remove_file(store.path()).unwrap();
    }
}
