//! API base URL type.

use std::fmt;

use url::Url;

use crate::error::{Error, InvalidInputError};

/// The root every API endpoint hangs off.
///
/// The base may carry a path prefix (`https://example.com/api`); endpoints are
/// appended to it rather than resolved against it, so the prefix survives.
///
/// ```
/// use chatwire::BaseUrl;
///
/// let base = BaseUrl::new("https://chat.example.com/api/").unwrap();
/// assert_eq!(base.endpoint_url("/auth/me"), "https://chat.example.com/api/auth/me");
/// assert_eq!(base.endpoint_url("auth/me"), "https://chat.example.com/api/auth/me");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseUrl {
    /// Parsed form, without a trailing slash.
    root: String,
}

impl BaseUrl {
    /// Parse an absolute `http` or `https` URL with a host.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let raw = s.as_ref();
        let reject = |reason: &str| -> Error {
            InvalidInputError::BaseUrl {
                value: raw.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        let url = Url::parse(raw).map_err(|e| reject(&e.to_string()))?;
        match url.scheme() {
            "http" | "https" if url.has_host() => Ok(Self {
                root: url.as_str().trim_end_matches('/').to_string(),
            }),
            "http" | "https" => Err(reject("must have a host")),
            _ => Err(reject("must use http or https")),
        }
    }

    /// Full URL for `endpoint`. Endpoints that are already absolute
    /// (`http...`) are used verbatim.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http") {
            return endpoint.to_string();
        }
        format!("{}/{}", self.root, endpoint.trim_start_matches('/'))
    }

    pub fn as_str(&self) -> &str {
        &self.root
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)
    }
}
