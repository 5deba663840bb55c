//! Authentication: credentials, identity, and the session state machine.

mod credentials;
mod identity;
mod session;

pub use credentials::{AccessToken, Credentials, RefreshToken};
pub use identity::Identity;
pub use session::{SessionManager, SessionStatus};
