//! Durable key-value storage for session tokens.
//!
//! A [`TokenStore`] is a dumb accessor: it never validates what it holds and
//! never talks to the network. Storage failures are logged and swallowed, so
//! callers must tolerate `get` returning `None` at any time.
//!
//! Only [`SessionManager`](crate::SessionManager) writes to a store.

mod file;
mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

use std::fmt;

/// The keys a session persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    AccessToken,
    RefreshToken,
    /// Serialized [`Identity`](crate::Identity).
    UserInfo,
}

impl StoreKey {
    /// Every key, for clearing a whole session.
    pub const ALL: [StoreKey; 3] = [
        StoreKey::AccessToken,
        StoreKey::RefreshToken,
        StoreKey::UserInfo,
    ];

    /// Stable name of the key in the underlying medium.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::AccessToken => "access_token",
            StoreKey::RefreshToken => "refresh_token",
            StoreKey::UserInfo => "user_info",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage for access token, refresh token and cached identity.
pub trait TokenStore: Send + Sync + fmt::Debug {
    /// Returns the stored value, or `None` if absent or unreadable.
    fn get(&self, key: StoreKey) -> Option<String>;

    /// Stores a value. A no-op if the medium is unavailable.
    fn set(&self, key: StoreKey, value: &str);

    /// Removes the given keys. A no-op if the medium is unavailable.
    fn clear(&self, keys: &[StoreKey]);

    /// Stores several values at once.
    ///
    /// Implementations backed by a single file override this to write once.
    fn set_many(&self, entries: &[(StoreKey, &str)]) {
        for (key, value) in entries {
            self.set(*key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_are_stable() {
        assert_eq!(StoreKey::AccessToken.as_str(), "access_token");
        assert_eq!(StoreKey::RefreshToken.as_str(), "refresh_token");
        assert_eq!(StoreKey::UserInfo.to_string(), "user_info");
    }
}
