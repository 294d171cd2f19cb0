//! Identity state persisted across page loads.
//!
//! The session is stateless over the store: the persisted keys ARE the
//! identity, so there is no in-memory copy to drift out of sync. A 401 from
//! the backend is session-fatal; the API layer calls
//! [`Session::clear_identity`] and the shell forces re-authentication.
use crate::store::KeyValueStore;
use std::sync::Arc;
use tracing::warn;

const ACCESS_TOKEN: &str = "access_token";
const REFRESH_TOKEN: &str = "refresh_token";
const USERNAME: &str = "username";

pub struct Session {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: &str) -> Self {
        Self {
            store,
            namespace: namespace.to_string(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}_{}", self.namespace, name)
    }

    fn read(&self, name: &str) -> Option<String> {
        match self.store.read(&self.key(name)) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(err) => {
                warn!(?err, name, "failed to read identity key");
                None
            }
        }
    }

    fn write(&self, name: &str, value: &str) {
        if let Err(err) = self.store.write(&self.key(name), value) {
            warn!(?err, name, "failed to persist identity key");
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN)
    }

    pub fn username(&self) -> Option<String> {
        self.read(USERNAME)
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn set_identity(&self, access_token: &str, refresh_token: &str, username: &str) {
        self.write(ACCESS_TOKEN, access_token);
        self.write(REFRESH_TOKEN, refresh_token);
        self.write(USERNAME, username);
    }

    /// Forced-logout wipe: removes every identity key. Store failures are
    /// logged; the in-memory view is gone either way since reads go through
    /// the store.
    pub fn clear_identity(&self) {
        for name in [ACCESS_TOKEN, REFRESH_TOKEN, USERNAME] {
            if let Err(err) = self.store.remove(&self.key(name)) {
                warn!(?err, name, "failed to remove identity key");
            }
        }
    }
}
