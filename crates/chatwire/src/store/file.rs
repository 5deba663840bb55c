//! File-backed token store.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};

use super::{StoreKey, TokenStore};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

type Entries = BTreeMap<String, String>;

/// A token store persisted as a single JSON object on disk.
///
/// Every write rewrites the file while holding an exclusive lock on a sibling
/// `.lock` file. On Unix the file is readable by its owner only. Clearing the
/// last key removes the file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store backed by `path`. Nothing is touched until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the session file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn read(&self) -> io::Result<Entries> {
        match fs::read_to_string(&self.path) {
            Ok(json) => serde_json::from_str(&json)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut Entries)) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        lock_file.lock_exclusive()?;

        let mut entries = match self.read() {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!(path = %self.path.display(), error = %e, "Discarding corrupt session file");
                Entries::new()
            }
            Err(e) => {
                let _ = FileExt::unlock(&lock_file);
                return Err(e);
            }
        };
        apply(&mut entries);

        let result = if entries.is_empty() {
            match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            }
        } else {
            self.write(&entries)
        };

        FileExt::unlock(&lock_file)?;
        result
    }

    fn write(&self, entries: &Entries) -> io::Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json)?;

        // Set restrictive permissions (Unix only)
        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: StoreKey) -> Option<String> {
        match self.read() {
            Ok(mut entries) => entries.remove(key.as_str()),
            Err(e) => {
                warn!(path = %self.path.display(), %key, error = %e, "Session file unreadable");
                None
            }
        }
    }

    fn set(&self, key: StoreKey, value: &str) {
        self.set_many(&[(key, value)]);
    }

    fn set_many(&self, values: &[(StoreKey, &str)]) {
        let result = self.update(|entries| {
            for (key, value) in values {
                entries.insert(key.as_str().to_string(), value.to_string());
            }
        });
        match result {
            Ok(()) => debug!(path = %self.path.display(), count = values.len(), "Stored session values"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to write session file"),
        }
    }

    fn clear(&self, keys: &[StoreKey]) {
        let result = self.update(|entries| {
            for key in keys {
                entries.remove(key.as_str());
            }
        });
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "Failed to clear session file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn survives_reopening() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileTokenStore::new(&path);
        store.set_many(&[
            (StoreKey::AccessToken, "access"),
            (StoreKey::RefreshToken, "refresh"),
        ]);

        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.get(StoreKey::AccessToken).as_deref(), Some("access"));
        assert_eq!(reopened.get(StoreKey::RefreshToken).as_deref(), Some("refresh"));
        assert_eq!(reopened.get(StoreKey::UserInfo), None);
    }

    #[test]
    fn clearing_everything_removes_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let store = FileTokenStore::new(&path);

        store.set(StoreKey::AccessToken, "access");
        assert!(path.exists());

        store.clear(&StoreKey::ALL);
        assert!(!path.exists());

        // Clearing an absent file is still fine.
        store.clear(&StoreKey::ALL);
        assert_eq!(store.get(StoreKey::AccessToken), None);
    }

    #[test]
    fn corrupt_file_reads_as_empty_and_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{ not json").unwrap();

        let store = FileTokenStore::new(&path);
        assert_eq!(store.get(StoreKey::AccessToken), None);

        store.set(StoreKey::AccessToken, "fresh");
        assert_eq!(store.get(StoreKey::AccessToken).as_deref(), Some("fresh"));
    }

    #[cfg(unix)]
    #[test]
    fn file_is_owner_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let store = FileTokenStore::new(&path);
        store.set(StoreKey::RefreshToken, "secret");

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
