//! Chat messages, completion streaming, and the offline simulator.

mod client;
mod message;
pub mod simulator;
pub mod sse;

pub use client::{
    AUTH_FAILED_NOTICE, AUTH_REFRESHED_NOTICE, ChatClient, ChatReply, INVALID_SESSION_NOTICE,
    ReplyOutcome,
};
pub use message::{ChatMessage, Sender};
pub use simulator::Simulator;
