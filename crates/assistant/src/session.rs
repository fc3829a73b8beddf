use crate::feature::Feature;
use crate::Assistant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

pub const GREETING: &str =
    "Hello! I'm Caramel AI, your Smart Building assistant. How can I help you today?";

/// Most recent messages sent to the assistant with each turn.
pub const CONTEXT_WINDOW: usize = 20;

/// Messages a session keeps; older ones are dropped first.
pub const MAX_HISTORY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text)
    }
}

/// One multi-turn conversation. Owned by whoever shows the chat; there is
/// no process-wide session.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session opened with the assistant's greeting.
    pub fn with_greeting() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(GREETING)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Records `text` and the reply. A failed call is answered with the
    /// chat fallback sentence, so this never fails.
    pub async fn send(&mut self, assistant: &dyn Assistant, text: &str) -> ChatMessage {
        self.messages.push(ChatMessage::user(text));

        let context = &self.messages[self.messages.len().saturating_sub(CONTEXT_WINDOW)..];
        let reply = match assistant.converse(context).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "chat reply failed, using fallback");
                Feature::Chat.fallback(assistant.is_configured()).to_string()
            }
        };

        let message = ChatMessage::assistant(reply);
        self.messages.push(message.clone());
        if self.messages.len() > MAX_HISTORY {
            let excess = self.messages.len() - MAX_HISTORY;
            self.messages.drain(..excess);
        }
        message
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
