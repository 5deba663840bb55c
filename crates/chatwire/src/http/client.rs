//! Low-level HTTP client shared by the session, request and chat layers.
//!
//! This client knows nothing about sessions: callers pass the bearer token
//! they want attached. Refresh-and-retry lives in
//! [`AuthenticatedRequest`](super::AuthenticatedRequest).

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_LENGTH};
use reqwest::{Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, trace};

use crate::auth::AccessToken;
use crate::config::ClientConfig;
use crate::error::{DecodeError, Error, HttpError, InvalidInputError, TransportError};

use super::base_url::BaseUrl;
use super::endpoints::ErrorResponse;

/// Method and body of a request, kept so the request can be reissued verbatim.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<serde_json::Value>,
}

impl RequestOptions {
    /// A `GET` without a body.
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            body: None,
        }
    }

    /// A `POST` with a JSON body.
    pub fn post<B: Serialize>(body: &B) -> Result<Self, Error> {
        Ok(Self {
            method: Method::POST,
            body: Some(serde_json::to_value(body)?),
        })
    }
}

/// HTTP client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base: BaseUrl,
    request_timeout: Duration,
}

impl HttpClient {
    /// Create a new client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        // No client-wide timeout: it would also bound how long a completion
        // stream may run. Plain requests get `request_timeout` individually.
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| InvalidInputError::Other {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base: config.base_url.clone(),
            request_timeout: config.request_timeout,
        })
    }

    /// Returns the base URL this client is configured for.
    pub fn base(&self) -> &BaseUrl {
        &self.base
    }

    /// Issue a request and return the raw response, whatever its status.
    #[instrument(skip(self, options, token), fields(base = %self.base, method = %options.method))]
    pub async fn send(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        token: Option<&AccessToken>,
    ) -> Result<reqwest::Response, Error> {
        let url = self.base.endpoint_url(endpoint);
        debug!(%url, authed = token.is_some(), "HTTP request");

        let mut request = self
            .client
            .request(options.method.clone(), &url)
            .timeout(self.request_timeout);
        if let Some(token) = token {
            request = request.bearer_auth(token.as_str());
        }
        if let Some(ref body) = options.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| self.transport(e))?;
        trace!(status = %response.status(), "HTTP response");
        Ok(response)
    }

    /// Make an unauthenticated JSON `POST` and decode a success body.
    #[instrument(skip(self, body), fields(base = %self.base))]
    pub async fn post_json<B, R>(&self, endpoint: &str, body: &B) -> Result<R, Error>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let options = RequestOptions::post(body)?;
        let response = self.send(endpoint, &options, None).await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await.into());
        }
        let value = Self::read_json(response).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Open a streamed `POST`.
    ///
    /// Only the wait for response headers is bounded by `open_timeout`; the
    /// body may then stream for as long as the server keeps it open.
    #[instrument(skip(self, body, token), fields(base = %self.base))]
    pub async fn open_stream<B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
        token: Option<&AccessToken>,
        open_timeout: Duration,
    ) -> Result<reqwest::Response, Error> {
        let url = self.base.endpoint_url(endpoint);
        debug!(%url, "Opening event stream");

        let mut request = self
            .client
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token.as_str());
        }

        match tokio::time::timeout(open_timeout, request.send()).await {
            Ok(response) => response.map_err(|e| self.transport(e)),
            Err(_) => Err(TransportError::Timeout {
                duration_ms: Some(open_timeout.as_millis() as u64),
            }
            .into()),
        }
    }

    /// Read a success body as JSON. Empty bodies read as `null`.
    pub async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, Error> {
        if Self::is_empty(&response) {
            return Ok(serde_json::Value::Null);
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            Error::Decode(DecodeError {
                message: format!("failed to parse response: {}", e),
            })
        })
    }

    /// Convert a non-success response into an [`HttpError`].
    pub async fn error_from_response(response: reqwest::Response) -> HttpError {
        let status = response.status().as_u16();

        match response.json::<ErrorResponse>().await {
            Ok(body) => HttpError::new(status, body.into_message()),
            Err(_) => HttpError::new(status, None),
        }
    }

    fn is_empty(response: &reqwest::Response) -> bool {
        response.status() == StatusCode::NO_CONTENT
            || response
                .headers()
                .get(CONTENT_LENGTH)
                .is_some_and(|len| len.as_bytes() == b"0")
    }

    fn transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            TransportError::Timeout {
                duration_ms: Some(self.request_timeout.as_millis() as u64),
            }
            .into()
        } else {
            err.into()
        }
    }
}
