//! In-memory token store.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::{StoreKey, TokenStore};

/// A token store that lives as long as the process.
///
/// Useful for tests and for sessions that must not touch disk.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: Mutex<HashMap<StoreKey, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with entries.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (StoreKey, &'a str)>) -> Self {
        let values = entries
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: StoreKey) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    fn set(&self, key: StoreKey, value: &str) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value.to_string());
    }

    fn clear(&self, keys: &[StoreKey]) {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            values.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_clear() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get(StoreKey::AccessToken), None);

        store.set(StoreKey::AccessToken, "a");
        store.set(StoreKey::RefreshToken, "r");
        assert_eq!(store.get(StoreKey::AccessToken).as_deref(), Some("a"));

        store.clear(&[StoreKey::AccessToken]);
        assert_eq!(store.get(StoreKey::AccessToken), None);
        assert_eq!(store.get(StoreKey::RefreshToken).as_deref(), Some("r"));

        store.clear(&StoreKey::ALL);
        assert!(store.is_empty());
    }

    #[test]
    fn prepopulated() {
        let store = MemoryTokenStore::with_entries([(StoreKey::UserInfo, "{}")]);
        assert_eq!(store.get(StoreKey::UserInfo).as_deref(), Some("{}"));
    }
}
