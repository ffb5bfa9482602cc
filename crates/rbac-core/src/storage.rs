//! Session-scoped client state shared by the session store and the HTTP
//! layer.

use std::collections::HashMap;
use std::sync::RwLock;

/// Storage key holding the current access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Key/value storage that lives exactly as long as the console session
/// (never shared across sessions, cleared when the process exits).
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// In-process [`SessionStorage`].
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_owned(), value);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }
}

/// Receives session transitions that originate below the session store,
/// i.e. in the HTTP layer's refresh protocol.
pub trait SessionListener: Send + Sync {
    /// A refresh minted a new access token.
    fn token_refreshed(&self, access_token: &str);

    /// The session can no longer be recovered; the user must log in again.
    fn session_expired(&self);
}
