//! Session state machine: login, identity revalidation, token refresh, logout.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{AuthError, Error};
use crate::http::{
    AuthenticatedRequest, HttpClient, LOGIN, LoginRequest, LoginResponse, ME, REFRESH,
    RefreshRequest, RefreshResponse, RequestOptions,
};
use crate::store::{StoreKey, TokenStore};

use super::credentials::{AccessToken, Credentials};
use super::identity::Identity;

type PendingRefresh = Shared<BoxFuture<'static, Result<AccessToken, Error>>>;

/// Coarse view of the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No identity is known. Stored credentials may still exist.
    Anonymous,
    /// An identity is cached (possibly stale).
    Authenticated,
    /// A token refresh is in flight.
    Refreshing,
}

/// The session of one user against one API.
///
/// Owns the credentials and the cached identity, and is the only writer of
/// the [`TokenStore`]. Cheap to clone; clones share state.
///
/// Concurrent [`refresh_if_possible`](Self::refresh_if_possible) calls share
/// one refresh request and all observe its outcome.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use chatwire::{BaseUrl, ClientConfig, MemoryTokenStore, SessionManager};
///
/// # async fn example() -> Result<(), chatwire::Error> {
/// let config = ClientConfig::new(BaseUrl::new("https://chat.example.com")?);
/// let session = SessionManager::restore(&config, Arc::new(MemoryTokenStore::new()))?;
/// let identity = session.login("alice", "hunter2").await?;
/// println!("Logged in as {}", identity.username());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    client: HttpClient,
    config: ClientConfig,
    store: Arc<dyn TokenStore>,
    cell: Mutex<SessionCell>,
    revalidation: Mutex<Option<JoinHandle<()>>>,
}

struct SessionCell {
    credentials: Option<Credentials>,
    state: SessionState,
    /// Bumped whenever a refresh starts, so a late refresh cannot overwrite
    /// a newer login or logout.
    epoch: u64,
}

enum SessionState {
    Anonymous,
    Authenticated(CachedIdentity),
    Refreshing {
        epoch: u64,
        pending: PendingRefresh,
        last: Option<CachedIdentity>,
    },
}

impl SessionState {
    fn identity(&self) -> Option<&CachedIdentity> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated(cached) => Some(cached),
            SessionState::Refreshing { last, .. } => last.as_ref(),
        }
    }

    fn into_identity(self) -> Option<CachedIdentity> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated(cached) => Some(cached),
            SessionState::Refreshing { last, .. } => last,
        }
    }
}

#[derive(Clone)]
struct CachedIdentity {
    identity: Identity,
    /// `None` for an identity read back from the store and not yet verified.
    fetched_at: Option<DateTime<Utc>>,
}

impl CachedIdentity {
    fn fetched_now(identity: Identity) -> Self {
        Self {
            identity,
            fetched_at: Some(Utc::now()),
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.is_some_and(|fetched_at| {
            (Utc::now() - fetched_at)
                .to_std()
                .is_ok_and(|elapsed| elapsed < ttl)
        })
    }
}

impl SessionManager {
    /// Load the session persisted in `store`.
    ///
    /// With both tokens and a valid cached identity the session starts
    /// authenticated, and the identity is revalidated in the background when a
    /// Tokio runtime is available. A cached identity that fails validation
    /// clears the store. Tokens without a cached identity are kept; the next
    /// [`get_current_identity`](Self::get_current_identity) verifies them.
    pub fn restore(config: &ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self, Error> {
        let session = Self::new(config, store)?;
        if session.status() == SessionStatus::Authenticated {
            session.spawn_revalidation();
        }
        Ok(session)
    }

    /// Like [`restore`](Self::restore), without background revalidation.
    pub fn new(config: &ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self, Error> {
        let client = HttpClient::new(config)?;
        let cell = Self::load(store.as_ref());

        Ok(Self {
            inner: Arc::new(SessionInner {
                client,
                config: config.clone(),
                store,
                cell: Mutex::new(cell),
                revalidation: Mutex::new(None),
            }),
        })
    }

    fn load(store: &dyn TokenStore) -> SessionCell {
        let mut cell = SessionCell {
            credentials: None,
            state: SessionState::Anonymous,
            epoch: 0,
        };

        let access = store.get(StoreKey::AccessToken);
        let refresh = store.get(StoreKey::RefreshToken);
        let had_any = access.is_some() || refresh.is_some();

        let Some(credentials) = Credentials::from_parts(access, refresh) else {
            if had_any {
                warn!("Stored session is missing a token, clearing it");
                store.clear(&StoreKey::ALL);
            }
            return cell;
        };

        match store.get(StoreKey::UserInfo).map(|json| Identity::from_json(&json)) {
            None => {
                debug!("Restored tokens without a cached identity");
                cell.credentials = Some(credentials);
            }
            Some(Ok(identity)) => {
                debug!(username = identity.username(), "Restored cached session");
                cell.credentials = Some(credentials);
                cell.state = SessionState::Authenticated(CachedIdentity {
                    identity,
                    fetched_at: None,
                });
            }
            Some(Err(e)) => {
                warn!(error = %e, "Cached identity is invalid, clearing session");
                store.clear(&StoreKey::ALL);
            }
        }

        cell
    }

    /// Exchange a username and password for a session.
    ///
    /// On failure the current state is left untouched.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, Error> {
        info!("Logging in");

        let response: LoginResponse = self
            .inner
            .client
            .post_json(LOGIN, &LoginRequest { username, password })
            .await?;

        let identity = Identity::from_value(response.user_info)?;
        let credentials = Credentials::new(response.access_token, response.refresh_token);

        {
            let mut cell = self.lock();
            self.inner.store.set_many(&[
                (StoreKey::AccessToken, credentials.access_token().as_str()),
                (StoreKey::RefreshToken, credentials.refresh_token().as_str()),
                (StoreKey::UserInfo, &identity.to_json()),
            ]);
            cell.credentials = Some(credentials);
            cell.state = SessionState::Authenticated(CachedIdentity::fetched_now(identity.clone()));
        }

        info!(username = identity.username(), "Logged in");
        Ok(identity)
    }

    /// Returns the current identity, asking the server when the cache is stale.
    ///
    /// Returns `Ok(None)` when there are no credentials at all. Any failure of
    /// the identity check, including an invalid payload, logs the session out
    /// before the error is returned.
    #[instrument(skip(self))]
    pub async fn get_current_identity(&self) -> Result<Option<Identity>, Error> {
        {
            let cell = self.lock();
            if cell.credentials.is_none() {
                return Ok(None);
            }
            if let Some(cached) = cell.state.identity() {
                if cached.is_fresh(self.inner.config.identity_ttl) {
                    return Ok(Some(cached.identity.clone()));
                }
            }
        }

        debug!("Revalidating identity");
        let request = AuthenticatedRequest::new(self.clone());
        match request.execute::<Identity>(ME, RequestOptions::get()).await {
            Ok(identity) => {
                self.remember_identity(identity.clone());
                Ok(Some(identity))
            }
            Err(e) => {
                warn!(error = %e, "Identity check failed, logging out");
                self.logout();
                Err(e)
            }
        }
    }

    /// Returns the cached identity without blocking.
    ///
    /// A stale identity is still returned, and a background revalidation is
    /// started.
    pub fn cached_identity(&self) -> Option<Identity> {
        let (identity, fresh) = {
            let cell = self.lock();
            let cached = cell.state.identity()?;
            (
                cached.identity.clone(),
                cached.is_fresh(self.inner.config.identity_ttl),
            )
        };
        if !fresh {
            self.spawn_revalidation();
        }
        Some(identity)
    }

    /// Wait for a background identity revalidation, if one was started.
    pub async fn wait_for_revalidation(&self) {
        let handle = self
            .inner
            .revalidation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Identity revalidation task failed");
            }
        }
    }

    fn spawn_revalidation(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime, skipping background identity check");
            return;
        };

        let mut slot = self
            .inner
            .revalidation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let session = self.clone();
        *slot = Some(runtime.spawn(async move {
            if let Err(e) = session.get_current_identity().await {
                warn!(error = %e, "Background identity check failed");
            }
        }));
    }

    /// Obtain a new access token with the stored refresh token.
    ///
    /// Callers arriving while a refresh is in flight await that same refresh;
    /// only one refresh request is ever outstanding. On failure the session is
    /// cleared and every waiter receives the error.
    ///
    /// The refresh runs as its own task, so it completes and updates the
    /// session even if every caller stops waiting.
    #[instrument(skip(self))]
    pub async fn refresh_if_possible(&self) -> Result<AccessToken, Error> {
        let pending = {
            let mut cell = self.lock();
            if let SessionState::Refreshing { pending, .. } = &cell.state {
                debug!("Joining in-flight refresh");
                pending.clone()
            } else {
                cell.epoch += 1;
                let epoch = cell.epoch;
                let pending = self.start_refresh(epoch);
                let last =
                    std::mem::replace(&mut cell.state, SessionState::Anonymous).into_identity();
                cell.state = SessionState::Refreshing {
                    epoch,
                    pending: pending.clone(),
                    last,
                };
                pending
            }
        };

        pending.await
    }

    fn start_refresh(&self, epoch: u64) -> PendingRefresh {
        let refresh = self.clone().run_refresh(epoch);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime, refreshing on the caller's task");
            return refresh.boxed().shared();
        };

        runtime
            .spawn(refresh)
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    Err(AuthError::RefreshFailed {
                        reason: format!("refresh task failed: {}", e),
                    }
                    .into())
                })
            })
            .boxed()
            .shared()
    }

    async fn run_refresh(self, epoch: u64) -> Result<AccessToken, Error> {
        info!("Refreshing session");

        let credentials = self.lock().credentials.clone();
        let result = match credentials {
            Some(ref credentials) => {
                let request = RefreshRequest {
                    refresh_token: credentials.refresh_token().as_str(),
                };
                self.inner
                    .client
                    .post_json::<_, RefreshResponse>(REFRESH, &request)
                    .await
            }
            None => Err(AuthError::MissingCredentials.into()),
        };

        let mut cell = self.lock();
        let current = matches!(cell.state, SessionState::Refreshing { epoch: e, .. } if e == epoch);

        match (result, credentials) {
            (Ok(response), Some(previous)) => {
                let rotated = previous.rotated(response.access_token, response.refresh_token);
                let token = rotated.access_token().clone();
                if !current {
                    debug!("Session changed during refresh, discarding refreshed tokens");
                    return Ok(token);
                }

                self.inner.store.set_many(&[
                    (StoreKey::AccessToken, rotated.access_token().as_str()),
                    (StoreKey::RefreshToken, rotated.refresh_token().as_str()),
                ]);
                cell.credentials = Some(rotated);
                cell.state = match std::mem::replace(&mut cell.state, SessionState::Anonymous)
                    .into_identity()
                {
                    Some(cached) => SessionState::Authenticated(cached),
                    None => SessionState::Anonymous,
                };

                info!("Session refreshed");
                Ok(token)
            }
            (Err(e), _) => {
                warn!(error = %e, "Token refresh failed, clearing session");
                if current {
                    self.clear(&mut cell);
                }
                Err(e)
            }
            (Ok(_), None) => Err(AuthError::MissingCredentials.into()),
        }
    }

    /// Forget the session and clear the store. Idempotent.
    pub fn logout(&self) {
        let mut cell = self.lock();
        let was_active = cell.credentials.is_some();
        self.clear(&mut cell);
        if was_active {
            info!("Logged out");
        }
    }

    fn clear(&self, cell: &mut SessionCell) {
        self.inner.store.clear(&StoreKey::ALL);
        cell.credentials = None;
        cell.state = SessionState::Anonymous;
    }

    fn remember_identity(&self, identity: Identity) {
        let mut cell = self.lock();
        if cell.credentials.is_none() {
            return;
        }

        self.inner
            .store
            .set(StoreKey::UserInfo, &identity.to_json());
        let fresh = CachedIdentity::fetched_now(identity);
        match &mut cell.state {
            SessionState::Refreshing { last, .. } => *last = Some(fresh),
            state => *state = SessionState::Authenticated(fresh),
        }
    }

    /// The access token to attach to requests, if any.
    pub fn access_token(&self) -> Option<AccessToken> {
        self.lock()
            .credentials
            .as_ref()
            .map(|credentials| credentials.access_token().clone())
    }

    /// True when credentials are held, whether or not an identity is known.
    pub fn is_authenticated(&self) -> bool {
        self.lock().credentials.is_some()
    }

    /// Coarse state of the session.
    pub fn status(&self) -> SessionStatus {
        match self.lock().state {
            SessionState::Anonymous => SessionStatus::Anonymous,
            SessionState::Authenticated(_) => SessionStatus::Authenticated,
            SessionState::Refreshing { .. } => SessionStatus::Refreshing,
        }
    }

    /// The configuration this session was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub(crate) fn client(&self) -> &HttpClient {
        &self.inner.client
    }

    fn lock(&self) -> MutexGuard<'_, SessionCell> {
        self.inner
            .cell
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// Custom Debug impl that hides sensitive data
impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", self.inner.client.base())
            .field("status", &self.status())
            .field("tokens", &"[REDACTED]")
            .finish()
    }
}
