//! Building assistant backed by a hosted language model.
//!
//! Everything AI-backed degrades to a fixed sentence when the model is not
//! configured or cannot be reached; see [`ask_or_fallback`].

pub mod config;
pub mod error;
pub mod feature;
pub mod hosted;
pub mod session;

use async_trait::async_trait;
use std::sync::Arc;

pub use config::AssistantConfig;
pub use error::AssistantError;
pub use feature::{ask_or_fallback, Feature};
pub use hosted::HostedAssistant;
pub use session::{ChatMessage, ChatSession, Sender};

#[async_trait]
pub trait Assistant: Send + Sync {
    /// Whether a backing model is configured at all.
    fn is_configured(&self) -> bool {
        true
    }

    /// Continues a conversation; the last message is the one to answer.
    async fn converse(&self, history: &[ChatMessage]) -> Result<String, AssistantError>;

    /// One-shot prompt.
    async fn submit(&self, prompt: &str) -> Result<String, AssistantError> {
        self.converse(&[ChatMessage::user(prompt)]).await
    }
}

/// Stand-in used when no API key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredAssistant;

#[async_trait]
impl Assistant for UnconfiguredAssistant {
    fn is_configured(&self) -> bool {
        false
    }

    async fn converse(&self, _history: &[ChatMessage]) -> Result<String, AssistantError> {
        Err(AssistantError::not_configured())
    }
}

/// Hosted assistant when `config` carries an API key, otherwise the
/// unconfigured stand-in.
pub fn build_assistant(config: AssistantConfig) -> anyhow::Result<Arc<dyn Assistant>> {
    if config.api_key.is_none() {
        tracing::warn!("ASSISTANT_API_KEY not set, assistant features will use fallback messages");
        return Ok(Arc::new(UnconfiguredAssistant));
    }
    Ok(Arc::new(HostedAssistant::new(config)?))
}
