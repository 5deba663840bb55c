//! Streaming chat completions with offline fallback.

use bytes::Bytes;
use futures_util::{StreamExt, pin_mut, stream};
use reqwest::StatusCode;
use tracing::{debug, info, instrument, warn};

use crate::auth::{AccessToken, SessionManager};
use crate::error::Error;
use crate::http::{CHAT_COMPLETIONS, CompletionMessage, CompletionRequest, HttpClient};

use super::message::ChatMessage;
use super::simulator::Simulator;
use super::sse::{self, DATA_PREFIX};

/// Shown after a rejected stream was recovered by refreshing the token.
pub const AUTH_REFRESHED_NOTICE: &str =
    "[Authentication refreshed. Please try sending your message again.]";

/// Shown after a rejected stream could not be recovered.
pub const AUTH_FAILED_NOTICE: &str = "[Authentication failed. Please log in again.]";

/// Shown when the server answered with an invalid-session body instead of a stream.
pub const INVALID_SESSION_NOTICE: &str = "[Your session is invalid. Please log in again.]";

/// Body fragments that mark a non-stream answer as an invalid session.
const INVALID_SESSION_MARKERS: [&str; 3] = ["invalid user", "unauthorized", "not authorized"];

/// How a reply came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Streamed from the completion endpoint.
    Streamed,
    /// Not logged in; the simulator answered.
    Simulated,
    /// The stream was rejected and the token refreshed. The message was not
    /// answered and should be resent.
    AuthRefreshed,
    /// The stream was rejected and the refresh failed. The session is cleared.
    AuthExpired,
    /// The server reported the session as invalid. The session is cleared.
    InvalidSession,
    /// The stream failed; the simulator finished the reply.
    Fallback,
}

impl ReplyOutcome {
    /// True if the user has to log in again.
    pub fn requires_login(self) -> bool {
        matches!(self, ReplyOutcome::AuthExpired | ReplyOutcome::InvalidSession)
    }
}

/// The text a [`ChatClient::send`] call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    /// Everything delivered to the chunk callback, minus the leading
    /// separator of informational notices.
    pub content: String,
    pub outcome: ReplyOutcome,
}

impl ChatReply {
    fn new(content: impl Into<String>, outcome: ReplyOutcome) -> Self {
        Self {
            content: content.into(),
            outcome,
        }
    }
}

/// Sends chat messages for a session.
///
/// `send` never fails: transport and decoding problems degrade to a
/// simulated reply, and authentication problems become a notice delivered
/// through the chunk callback.
#[derive(Debug, Clone)]
pub struct ChatClient {
    session: SessionManager,
    simulator: Simulator,
}

impl ChatClient {
    pub fn new(session: SessionManager) -> Self {
        let simulator = Simulator::new(session.config().simulator_delay);
        Self { session, simulator }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Send `message` after `history` and stream the reply into `on_chunk`.
    ///
    /// Chunks arrive in order, each exactly once. Without a session the reply
    /// is simulated. A stream that breaks part-way is finished by the
    /// simulator, so the caller sees the partial text followed by a simulated
    /// reply.
    #[instrument(skip_all, fields(history = history.len()))]
    pub async fn send<F>(&self, message: &str, history: &[ChatMessage], on_chunk: F) -> ChatReply
    where
        F: FnMut(&str),
    {
        let mut sink = Sink::new(on_chunk);

        let Some(token) = self.session.access_token() else {
            debug!("Not logged in, answering from simulator");
            self.simulator
                .respond(message, &mut |chunk: &str| sink.emit(chunk))
                .await;
            return ChatReply::new(sink.delivered, ReplyOutcome::Simulated);
        };

        match self.stream(message, history, &token, &mut sink).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Completion stream failed, falling back to simulator");
                self.simulator
                    .respond(message, &mut |chunk: &str| sink.emit(chunk))
                    .await;
                ChatReply::new(sink.delivered, ReplyOutcome::Fallback)
            }
        }
    }

    async fn stream<F>(
        &self,
        message: &str,
        history: &[ChatMessage],
        token: &AccessToken,
        sink: &mut Sink<F>,
    ) -> Result<ChatReply, Error>
    where
        F: FnMut(&str),
    {
        let config = self.session.config();
        let request = CompletionRequest {
            model: &config.model,
            messages: completion_messages(history, message),
            stream: true,
        };

        let response = self
            .session
            .client()
            .open_stream(CHAT_COMPLETIONS, &request, Some(token), config.open_timeout)
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Ok(self.recover_unauthorized(sink).await);
        }
        if !status.is_success() {
            return Err(HttpClient::error_from_response(response).await.into());
        }

        let body = response.bytes_stream();
        pin_mut!(body);
        let first = match body.next().await {
            Some(chunk) => chunk?,
            None => {
                debug!("Completion stream was empty");
                return Ok(ChatReply::new(String::new(), ReplyOutcome::Streamed));
            }
        };

        if looks_like_invalid_session(&first) {
            warn!("Server reported an invalid session, logging out");
            self.session.logout();
            return Ok(sink.notice(INVALID_SESSION_NOTICE, ReplyOutcome::InvalidSession));
        }

        let deltas = sse::delta_stream(stream::iter([Ok::<Bytes, reqwest::Error>(first)]).chain(body));
        pin_mut!(deltas);

        let mut content = String::new();
        while let Some(delta) = deltas.next().await {
            let delta = delta?;
            sink.emit(&delta);
            content.push_str(&delta);
        }

        debug!(chars = content.len(), "Completion stream finished");
        Ok(ChatReply::new(content, ReplyOutcome::Streamed))
    }

    async fn recover_unauthorized<F>(&self, sink: &mut Sink<F>) -> ChatReply
    where
        F: FnMut(&str),
    {
        info!("Completion stream rejected, refreshing session");
        match self.session.refresh_if_possible().await {
            Ok(_) => sink.notice(AUTH_REFRESHED_NOTICE, ReplyOutcome::AuthRefreshed),
            Err(e) => {
                warn!(error = %e, "Refresh after rejected stream failed");
                self.session.logout();
                sink.notice(AUTH_FAILED_NOTICE, ReplyOutcome::AuthExpired)
            }
        }
    }
}

/// Forwards chunks to the caller and remembers what was delivered.
struct Sink<F> {
    on_chunk: F,
    delivered: String,
}

impl<F: FnMut(&str)> Sink<F> {
    fn new(on_chunk: F) -> Self {
        Self {
            on_chunk,
            delivered: String::new(),
        }
    }

    fn emit(&mut self, chunk: &str) {
        self.delivered.push_str(chunk);
        (self.on_chunk)(chunk);
    }

    fn notice(&mut self, notice: &str, outcome: ReplyOutcome) -> ChatReply {
        (self.on_chunk)(&format!("\n\n{}", notice));
        ChatReply::new(notice, outcome)
    }
}

/// History in order, then the new user message.
fn completion_messages<'a>(history: &'a [ChatMessage], message: &'a str) -> Vec<CompletionMessage<'a>> {
    history
        .iter()
        .map(|turn| CompletionMessage {
            role: turn.sender.role(),
            content: &turn.content,
        })
        .chain(std::iter::once(CompletionMessage {
            role: "user",
            content: message,
        }))
        .collect()
}

/// True if the first body chunk is a plain error text rather than an event stream.
fn looks_like_invalid_session(first: &[u8]) -> bool {
    let text = String::from_utf8_lossy(first);
    if text.lines().any(|line| line.trim_start().starts_with(DATA_PREFIX)) {
        return false;
    }
    INVALID_SESSION_MARKERS
        .iter()
        .any(|marker| text.contains(marker))
}
