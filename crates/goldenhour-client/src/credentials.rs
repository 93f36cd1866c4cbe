//! Injected credential storage.
//!
//! The transport never reads tokens from ambient global state. Whoever
//! builds the transport hands it a [`CredentialStore`]; the transport asks
//! it for a token on every call so a token stored after login is picked
//! up without rebuilding anything.

use std::sync::{PoisonError, RwLock};

/// Source of the bearer token attached to outgoing calls.
pub trait CredentialStore: Send + Sync {
    /// The current token, if one is stored.
    fn token(&self) -> Option<String>;
}

/// A credential store that never has a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl CredentialStore for Anonymous {
    fn token(&self) -> Option<String> {
        None
    }
}

/// Process-local token storage, replaceable at runtime.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    token: RwLock<Option<String>>,
}

impl MemoryCredentials {
    /// Create a store, optionally seeded with a token.
    pub const fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    /// Store a new token, replacing any previous one.
    pub fn set(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    /// Forget the stored token.
    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl CredentialStore for MemoryCredentials {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_replaces_and_clears() {
        let store = MemoryCredentials::new(None);
        assert_eq!(store.token(), None);
        store.set("first");
        store.set("second");
        assert_eq!(store.token().as_deref(), Some("second"));
        store.clear();
        assert_eq!(store.token(), None);
    }

    #[test]
    fn anonymous_has_no_token() {
        assert_eq!(Anonymous.token(), None);
    }
}
