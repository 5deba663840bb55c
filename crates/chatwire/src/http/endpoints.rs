//! Endpoint paths and request/response wire types.

use serde::{Deserialize, Serialize};

// ============================================================================
// Endpoint Paths
// ============================================================================

/// Credential exchange.
pub const LOGIN: &str = "/auth/login";

/// Access token refresh.
pub const REFRESH: &str = "/auth/refresh";

/// Identity of the bearer ("whoami").
pub const ME: &str = "/auth/me";

/// Streaming chat completions.
pub const CHAT_COMPLETIONS: &str = "/agent/chat/completions";

/// Returns true if `endpoint` addresses the identity endpoint.
pub fn is_identity_endpoint(endpoint: &str) -> bool {
    let endpoint = endpoint.split('?').next().unwrap_or(endpoint);
    endpoint == ME || endpoint.ends_with(ME)
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for login.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response from login. `user_info` is validated separately.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user_info: serde_json::Value,
}

/// Request body for refresh.
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response from refresh. The refresh token is only present when rotated.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Request body for a streamed completion.
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<CompletionMessage<'a>>,
    pub stream: bool,
}

/// One role-tagged turn of a completion request.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CompletionMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

/// One decoded `data:` frame of a completion stream.
#[derive(Debug, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionChunk {
    /// Text content of the first choice's delta, if non-empty.
    pub fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty())
    }
}

/// Error body returned with non-success statuses.
///
/// Servers disagree on the shape; `error` may be a string or an object.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// The most specific human-readable message in the body.
    pub fn into_message(self) -> Option<String> {
        if let Some(message) = self.message.filter(|m| !m.is_empty()) {
            return Some(message);
        }
        match self.error? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s),
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_owned),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_endpoint_matching() {
        assert!(is_identity_endpoint("/auth/me"));
        assert!(is_identity_endpoint("https://example.com/api/auth/me"));
        assert!(is_identity_endpoint("/auth/me?fields=all"));
        assert!(!is_identity_endpoint("/auth/members"));
        assert!(!is_identity_endpoint("/auth/refresh"));
    }

    #[test]
    fn chunk_text_extraction() {
        let chunk: CompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#).unwrap();
        assert_eq!(chunk.into_text().as_deref(), Some("Hi"));

        let chunk: CompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert_eq!(chunk.into_text(), None);

        let chunk: CompletionChunk = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(chunk.into_text(), None);
    }

    #[test]
    fn error_message_shapes() {
        let body: ErrorResponse = serde_json::from_str(r#"{"message":"bad model"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("bad model"));

        let body: ErrorResponse = serde_json::from_str(r#"{"error":"quota exceeded"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("quota exceeded"));

        let body: ErrorResponse =
            serde_json::from_str(r#"{"error":{"message":"upstream down"}}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("upstream down"));

        let body: ErrorResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(body.into_message(), None);
    }
}
