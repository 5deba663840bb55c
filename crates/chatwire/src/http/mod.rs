//! HTTP plumbing: base URL handling, the raw client, wire types, and
//! authenticated requests.

mod authed;
mod base_url;
mod client;
mod endpoints;

pub use authed::{AuthenticatedRequest, MAX_AUTH_RETRIES};
pub use base_url::BaseUrl;
pub use client::{HttpClient, RequestOptions};
pub use endpoints::*;
