//! chatwire - Streaming chat-completion client
//!
//! This library talks to a chat backend that issues bearer tokens and streams
//! completions as server-sent events. All authenticated traffic flows through a
//! [`SessionManager`], which owns the tokens, refreshes them on `401`, and
//! persists them in a [`TokenStore`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chatwire::{BaseUrl, ChatClient, ClientConfig, FileTokenStore, SessionManager};
//!
//! # async fn example() -> Result<(), chatwire::Error> {
//! let config = ClientConfig::new(BaseUrl::new("https://chat.example.com/api")?);
//! let store = Arc::new(FileTokenStore::new("/tmp/chatwire/session.json"));
//! let session = SessionManager::restore(&config, store)?;
//! session.login("alice", "hunter2").await?;
//!
//! let chat = ChatClient::new(session);
//! let reply = chat
//!     .send("What is an event stream?", &[], |chunk| print!("{}", chunk))
//!     .await;
//! println!("\n[{:?}]", reply.outcome);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod http;
pub mod store;

// Re-export primary types at crate root for convenience
pub use auth::{AccessToken, Credentials, Identity, RefreshToken, SessionManager, SessionStatus};
pub use chat::{ChatClient, ChatMessage, ChatReply, ReplyOutcome, Sender};
pub use config::ClientConfig;
pub use error::Error;
pub use http::{AuthenticatedRequest, BaseUrl, HttpClient, RequestOptions};
pub use store::{FileTokenStore, MemoryTokenStore, StoreKey, TokenStore};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
