use crate::Assistant;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// AI-backed features of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Chat,
    EnergyRecommendations,
    SecurityAnalysis,
    ComfortTip,
}

impl Feature {
    /// Sentence shown instead of an answer. `configured` picks between the
    /// missing-configuration and the failed-call wording.
    pub fn fallback(&self, configured: bool) -> &'static str {
        match (self, configured) {
            (Feature::Chat, false) | (Feature::EnergyRecommendations, false) => {
                "AI features are currently unavailable due to a configuration issue."
            }
            (Feature::SecurityAnalysis, false) => "AI analysis unavailable due to a configuration issue.",
            (Feature::ComfortTip, false) => "AI tips unavailable due to a configuration issue.",
            (Feature::Chat, true) => "I'm having a little trouble thinking right now. Could you try asking again?",
            (Feature::EnergyRecommendations, true) => {
                "Sorry, I couldn't generate recommendations at this time. Please try again later."
            }
            (Feature::SecurityAnalysis, true) => "Could not analyze the event at this time.",
            (Feature::ComfortTip, true) => "Could not generate a comfort tip at this time.",
        }
    }
}

/// Submits `prompt` and returns the answer or the feature's fallback
/// sentence. Never fails.
pub async fn ask_or_fallback(assistant: &dyn Assistant, feature: Feature, prompt: &str) -> String {
    match assistant.submit(prompt).await {
        Ok(answer) => answer,
        Err(e) => {
            warn!(feature = ?feature, error = %e, "assistant request failed, using fallback");
            feature.fallback(assistant.is_configured()).to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{CONTEXT_WINDOW, MAX_HISTORY};
    use crate::{AssistantError, ChatMessage, ChatSession, Sender, UnconfiguredAssistant};
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Assistant for Echo {
        async fn converse(&self, history: &[ChatMessage]) -> Result<String, AssistantError> {
            let last = history.last().map(|m| m.text.clone()).unwrap_or_default();
            Ok(format!("{} messages, last: {last}", history.len()))
        }
    }

    struct Down;

    #[async_trait]
    impl Assistant for Down {
        async fn converse(&self, _history: &[ChatMessage]) -> Result<String, AssistantError> {
            Err(AssistantError::ServiceUnavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn fallback_depends_on_configuration() {
        let unconfigured = ask_or_fallback(&UnconfiguredAssistant, Feature::ComfortTip, "co2 800").await;
        assert_eq!(unconfigured, "AI tips unavailable due to a configuration issue.");

        let failed = ask_or_fallback(&Down, Feature::SecurityAnalysis, "door forced").await;
        assert_eq!(failed, "Could not analyze the event at this time.");

        let answered = ask_or_fallback(&Echo, Feature::EnergyRecommendations, "usage").await;
        assert_eq!(answered, "1 messages, last: usage");
    }

    #[tokio::test]
    async fn chat_session_keeps_history() {
        let mut session = ChatSession::with_greeting();
        let reply = session.send(&Echo, "hi").await;
        assert_eq!(reply.sender, Sender::Assistant);
        assert_eq!(reply.text, "2 messages, last: hi");

        let reply = session.send(&Down, "still there?").await;
        assert_eq!(reply.text, Feature::Chat.fallback(true));
        assert_eq!(session.messages().len(), 5);

        session.clear();
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn long_chats_send_a_bounded_window() {
        let mut session = ChatSession::with_greeting();
        for turn in 0..MAX_HISTORY {
            let reply = session.send(&Echo, &format!("turn {turn}")).await;
            let sent: usize = reply.text.split(' ').next().and_then(|n| n.parse().ok()).unwrap();
            assert!(sent <= CONTEXT_WINDOW, "sent {sent} messages");
            assert!(reply.text.ends_with(&format!("last: turn {turn}")));
        }
        assert_eq!(session.messages().len(), MAX_HISTORY);
        assert_eq!(
            session.messages().last().map(|m| m.sender),
            Some(Sender::Assistant)
        );
        assert_eq!(session.messages()[0].text, format!("turn {}", MAX_HISTORY / 2));
    }
}
