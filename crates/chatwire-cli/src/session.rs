//! Session setup shared by the commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use chatwire::{BaseUrl, ClientConfig, FileTokenStore, SessionManager};

/// Hint shown whenever a command needs a session and there is none.
pub const LOGIN_HINT: &str = "No active session. Run 'chatwire login' first.";

/// Get the session file path.
pub fn session_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "chatwire").context("Could not determine data directory")?;
    Ok(dirs.data_dir().join("session.json"))
}

/// Client configuration for `base_url`.
pub fn config(base_url: &str) -> Result<ClientConfig> {
    let base_url = BaseUrl::new(base_url).context("Invalid base URL")?;
    Ok(ClientConfig::new(base_url))
}

/// Open the persisted session.
///
/// The stored identity is not revalidated here; commands that need a
/// verified identity ask for it.
pub fn open(config: &ClientConfig) -> Result<SessionManager> {
    let store = FileTokenStore::new(session_path()?);
    tracing::debug!(path = %store.path().display(), "Opening session");
    SessionManager::new(config, Arc::new(store)).context("Failed to open session")
}

/// Open the persisted session and revalidate its identity in the background.
///
/// Callers should await `wait_for_revalidation` before exiting.
pub fn restore(config: &ClientConfig) -> Result<SessionManager> {
    let store = FileTokenStore::new(session_path()?);
    tracing::debug!(path = %store.path().display(), "Restoring session");
    SessionManager::restore(config, Arc::new(store)).context("Failed to open session")
}
