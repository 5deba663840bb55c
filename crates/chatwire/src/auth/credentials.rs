//! Bearer tokens and the credential pair that holds them.
//!
//! Token values are opaque and never appear in `Debug` output.

use std::fmt;

/// A short-lived token attached as `Authorization: Bearer ...`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value, for authorization headers and persistence only.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}

/// A longer-lived token exchanged at the refresh endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshToken(String);

impl RefreshToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value, for refresh requests and persistence only.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefreshToken").field(&"[REDACTED]").finish()
    }
}

/// Access and refresh token of an authenticated session.
///
/// Both tokens are always present together; a session with only one of them
/// is not a session.
///
/// # Example
///
/// ```
/// use chatwire::Credentials;
///
/// let creds = Credentials::new("access-abc", "refresh-xyz");
/// assert_eq!(creds.access_token().as_str(), "access-abc");
/// assert!(!format!("{:?}", creds).contains("refresh-xyz"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    access_token: AccessToken,
    refresh_token: RefreshToken,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: AccessToken::new(access_token),
            refresh_token: RefreshToken::new(refresh_token),
        }
    }

    /// Rebuild a pair from optional halves; `None` unless both are present.
    pub fn from_parts(access_token: Option<String>, refresh_token: Option<String>) -> Option<Self> {
        match (access_token, refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Some(Self::new(access, refresh))
            }
            _ => None,
        }
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &RefreshToken {
        &self.refresh_token
    }

    /// Credentials after a refresh: the new access token, and the rotated
    /// refresh token when the server issued one.
    pub fn rotated(&self, access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            access_token: AccessToken::new(access_token),
            refresh_token: refresh_token
                .map(RefreshToken::new)
                .unwrap_or_else(|| self.refresh_token.clone()),
        }
    }
}
