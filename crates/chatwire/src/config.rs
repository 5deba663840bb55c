//! Client configuration.

use std::time::Duration;

use crate::http::BaseUrl;

/// Model requested when none is configured.
pub const DEFAULT_MODEL: &str = "volcengine/deepseek-v3";

/// How long a fetched identity is trusted without revalidation.
pub const DEFAULT_IDENTITY_TTL: Duration = Duration::from_secs(5 * 60);

/// Upper bound on opening a completion stream (until response headers).
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for plain (non-streaming) requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between words emitted by the offline simulator.
pub const DEFAULT_SIMULATOR_DELAY: Duration = Duration::from_millis(100);

/// Settings shared by the session, request and chat layers.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use chatwire::{BaseUrl, ClientConfig};
///
/// let config = ClientConfig::new(BaseUrl::new("https://chat.example.com").unwrap())
///     .with_model("gpt-4o-mini")
///     .with_simulator_delay(Duration::ZERO);
/// assert_eq!(config.model, "gpt-4o-mini");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: BaseUrl,
    pub model: String,
    pub identity_ttl: Duration,
    pub open_timeout: Duration,
    pub request_timeout: Duration,
    pub simulator_delay: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the base URL.
    pub fn new(base_url: BaseUrl) -> Self {
        Self {
            base_url,
            model: DEFAULT_MODEL.to_string(),
            identity_ttl: DEFAULT_IDENTITY_TTL,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            simulator_delay: DEFAULT_SIMULATOR_DELAY,
            user_agent: concat!("chatwire/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_identity_ttl(mut self, ttl: Duration) -> Self {
        self.identity_ttl = ttl;
        self
    }

    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_simulator_delay(mut self, delay: Duration) -> Self {
        self.simulator_delay = delay;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
