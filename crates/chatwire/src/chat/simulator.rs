//! Offline stand-in for the completion endpoint.

use std::time::Duration;

use rand::Rng;

/// Openers the simulator picks from.
pub const CANNED_REPLIES: [&str; 4] = [
    "I understand your question. Let me help you with that.",
    "That's an interesting point. Here's what I think...",
    "Based on my analysis, I would suggest...",
    "Let me break this down for you...",
];

/// Produces a canned reply word by word, as if it were streamed.
#[derive(Debug, Clone)]
pub struct Simulator {
    delay: Duration,
}

impl Simulator {
    /// A simulator that pauses `delay` before each word.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// A random canned opener followed by the user's message.
    pub fn compose(&self, message: &str) -> String {
        let opener = CANNED_REPLIES[rand::thread_rng().gen_range(0..CANNED_REPLIES.len())];
        format!("{} {}", opener, message)
    }

    /// Emit a composed reply through `on_chunk` and return the full text.
    ///
    /// The chunks concatenate to exactly the returned text.
    pub async fn respond<F>(&self, message: &str, on_chunk: &mut F) -> String
    where
        F: FnMut(&str),
    {
        let reply = self.compose(message);
        for word in word_chunks(&reply) {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            on_chunk(word);
        }
        reply
    }
}

/// Split on single spaces, keeping each space attached to the word before it.
pub fn word_chunks(text: &str) -> Vec<&str> {
    text.split_inclusive(' ').collect()
}
