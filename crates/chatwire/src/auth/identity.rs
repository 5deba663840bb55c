//! The authenticated user's profile record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AuthError;

/// Minimal profile of the logged-in user.
///
/// An identity always has a non-empty `id` and `username`; anything else the
/// server sends is kept verbatim in [`extra`](Identity::extra). Payloads that
/// fail this check never become an `Identity` and are treated as an invalid
/// session by callers.
///
/// # Example
///
/// ```
/// use chatwire::Identity;
/// use serde_json::json;
///
/// let identity = Identity::from_value(json!({"id": "u1", "username": "alice", "plan": "pro"})).unwrap();
/// assert_eq!(identity.username(), "alice");
/// assert_eq!(identity.extra()["plan"], "pro");
///
/// assert!(Identity::from_value(json!({"id": "u1"})).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    id: String,
    username: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Identity {
    /// Validate a JSON payload as an identity.
    ///
    /// A non-zero integer `id` is accepted and kept as its decimal string.
    pub fn from_value(value: Value) -> Result<Self, AuthError> {
        let Value::Object(mut fields) = value else {
            return Err(invalid("identity payload is not an object"));
        };

        let id = match fields.remove("id") {
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(Value::Number(n)) if n.as_i64().is_some_and(|i| i != 0) => n.to_string(),
            Some(Value::Number(n)) if n.as_u64().is_some_and(|u| u != 0) => n.to_string(),
            _ => return Err(invalid("identity is missing an id")),
        };

        let username = match fields.remove("username") {
            Some(Value::String(username)) if !username.is_empty() => username,
            _ => return Err(invalid("identity is missing a username")),
        };

        Ok(Self {
            id,
            username,
            extra: fields,
        })
    }

    /// Validate a serialized identity, as cached in a token store.
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| invalid(&format!("cached identity is not JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Serialize for caching.
    pub fn to_json(&self) -> String {
        // An object of strings and JSON values always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Fields beyond `id` and `username`.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Identity::from_value(value).map_err(serde::de::Error::custom)
    }
}

fn invalid(reason: &str) -> AuthError {
    AuthError::InvalidSession {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_minimal_identity() {
        let identity = Identity::from_value(json!({"id": "42", "username": "alice"})).unwrap();
        assert_eq!(identity.id(), "42");
        assert_eq!(identity.username(), "alice");
        assert!(identity.extra().is_empty());
    }

    #[test]
    fn numeric_id_is_normalised() {
        let identity = Identity::from_value(json!({"id": 7, "username": "bob"})).unwrap();
        assert_eq!(identity.id(), "7");
    }

    #[test]
    fn rejects_missing_or_empty_fields() {
        for payload in [
            json!({"username": "alice"}),
            json!({"id": "1"}),
            json!({"id": "", "username": "alice"}),
            json!({"id": "1", "username": ""}),
            json!({"id": 0, "username": "alice"}),
            json!({"id": 1.5, "username": "alice"}),
            json!({"id": 0.0, "username": "alice"}),
            json!({"id": 7.0, "username": "alice"}),
            json!({"id": null, "username": "alice"}),
            json!({"id": "1", "username": 5}),
            json!(null),
            json!("alice"),
            json!([]),
        ] {
            let result = Identity::from_value(payload.clone());
            assert!(
                matches!(result, Err(AuthError::InvalidSession { .. })),
                "accepted {}",
                payload
            );
        }
    }

    #[test]
    fn cache_round_trip_keeps_extra_fields() {
        let identity =
            Identity::from_value(json!({"id": "1", "username": "alice", "email": "a@example.com"}))
                .unwrap();
        let restored = Identity::from_json(&identity.to_json()).unwrap();
        assert_eq!(restored, identity);
        assert_eq!(restored.extra()["email"], "a@example.com");
    }

    #[test]
    fn corrupt_cache_is_invalid() {
        assert!(Identity::from_json("{not json").is_err());
    }

    #[test]
    fn deserialize_applies_validation() {
        let ok: Result<Identity, _> = serde_json::from_str(r#"{"id":"1","username":"a"}"#);
        assert!(ok.is_ok());

        let bad: Result<Identity, _> = serde_json::from_str(r#"{"id":"1"}"#);
        assert!(bad.is_err());
    }
}
