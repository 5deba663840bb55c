//! Bearer-authenticated requests with one refresh-and-retry on 401.

use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::auth::{Identity, SessionManager};
use crate::error::{AuthError, DecodeError, Error};

use super::client::{HttpClient, RequestOptions};
use super::endpoints::is_identity_endpoint;

/// How many times a request is reissued after a token refresh.
pub const MAX_AUTH_RETRIES: usize = 1;

/// Issues requests on behalf of a [`SessionManager`].
///
/// A `401` on a request that carried a token triggers one
/// [`refresh_if_possible`](SessionManager::refresh_if_possible), unless the
/// session already holds a newer token; the request is then reissued once
/// with the new token. A second `401`, or a `401` with
/// no token attached, logs the session out.
///
/// Responses from the identity endpoint are validated as an [`Identity`]
/// before decoding; an invalid payload also logs the session out.
#[derive(Debug, Clone)]
pub struct AuthenticatedRequest {
    session: SessionManager,
}

impl AuthenticatedRequest {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    /// `GET` an endpoint and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, Error> {
        self.execute(endpoint, RequestOptions::get()).await
    }

    /// `POST` a JSON body and decode the JSON response.
    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        self.execute(endpoint, RequestOptions::post(body)?).await
    }

    /// Issue a request and decode a success body as `T`.
    ///
    /// An empty success body decodes from `null`, so `()` and `Option<_>`
    /// work for endpoints that return nothing.
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, Error> {
        let client = self.session.client();
        let mut token = self.session.access_token();
        let mut retries = 0;

        let response = loop {
            let response = client.send(endpoint, &options, token.as_ref()).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                break response;
            }

            if token.is_none() || retries >= MAX_AUTH_RETRIES {
                let message = HttpClient::error_from_response(response).await.message;
                warn!(endpoint, "Request unauthorized, clearing session");
                self.session.logout();
                return Err(AuthError::Rejected { message }.into());
            }

            retries += 1;

            // Another caller already rotated the token this request was sent with.
            let current = self.session.access_token();
            if current.is_some() && current != token {
                debug!(endpoint, "Access token rotated meanwhile, retrying");
                token = current;
                continue;
            }

            debug!(endpoint, "Access token rejected, refreshing");
            match self.session.refresh_if_possible().await {
                Ok(refreshed) => token = Some(refreshed),
                Err(e) => {
                    return Err(AuthError::RefreshFailed {
                        reason: e.to_string(),
                    }
                    .into());
                }
            }
        };

        if !response.status().is_success() {
            return Err(HttpClient::error_from_response(response).await.into());
        }

        let value = HttpClient::read_json(response).await?;
        if is_identity_endpoint(endpoint) {
            if let Err(e) = Identity::from_value(value.clone()) {
                warn!(error = %e, "Identity endpoint returned an invalid identity");
                self.session.logout();
                return Err(e.into());
            }
        }

        serde_json::from_value(value).map_err(|e| {
            Error::Decode(DecodeError {
                message: format!("failed to decode {} response: {}", endpoint, e),
            })
        })
    }
}
