use crate::config::AssistantConfig;
use crate::error::AssistantError;
use crate::session::{ChatMessage, Sender};
use crate::Assistant;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Client for a `generateContent` style hosted model API.
pub struct HostedAssistant {
    http: Client,
    api_key: String,
    url: String,
}

impl HostedAssistant {
    pub fn new(config: AssistantConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .ok_or_else(|| anyhow!("hosted assistant requires an API key"))?;
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build assistant HTTP client")?;
        let url = format!(
            "{}/models/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        );
        Ok(Self { http, api_key, url })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

fn request_body(history: &[ChatMessage]) -> GenerateRequest<'_> {
    // The conversation has to open with a user turn.
    let contents = history
        .iter()
        .skip_while(|m| m.sender == Sender::Assistant)
        .map(|m| Content {
            role: match m.sender {
                Sender::User => "user",
                Sender::Assistant => "model",
            },
            parts: [Part { text: &m.text }],
        })
        .collect();
    GenerateRequest { contents }
}

#[async_trait]
impl Assistant for HostedAssistant {
    #[instrument(skip_all, fields(turns = history.len()))]
    async fn converse(&self, history: &[ChatMessage]) -> Result<String, AssistantError> {
        let body = request_body(history);
        if body.contents.is_empty() {
            return Err(AssistantError::InvalidResponse("nothing to answer".to_string()));
        }

        let response: GenerateResponse = self
            .http
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AssistantError::InvalidResponse("empty candidate".to_string()));
        }
        debug!(chars = text.len(), "assistant answered");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{ask_or_fallback, Feature};
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};

    async fn generate(
        Path(model): Path<String>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, StatusCode> {
        if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("test-key") {
            return Err(StatusCode::FORBIDDEN);
        }
        let contents = body["contents"].as_array().cloned().unwrap_or_default();
        let last = contents
            .last()
            .and_then(|c| c["parts"][0]["text"].as_str())
            .unwrap_or_default()
            .to_string();
        Ok(Json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": format!("{model}: {} turns, {last}", contents.len())}]}
            }]
        })))
    }

    async fn serve() -> String {
        let app = Router::new().route("/v1beta/models/:call", post(generate));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1beta")
    }

    fn config(endpoint: &str, key: &str) -> AssistantConfig {
        AssistantConfig::default()
            .with_endpoint(endpoint)
            .with_api_key(key)
    }

    #[tokio::test]
    async fn submits_and_reads_first_candidate() {
        let endpoint = serve().await;
        let assistant = HostedAssistant::new(config(&endpoint, "test-key")).unwrap();

        let answer = assistant.submit("lights left on").await.unwrap();
        assert_eq!(answer, "gemini-2.0-flash:generateContent: 1 turns, lights left on");
    }

    #[tokio::test]
    async fn leading_greeting_is_not_sent() {
        let endpoint = serve().await;
        let assistant = HostedAssistant::new(config(&endpoint, "test-key")).unwrap();
        let history = vec![
            ChatMessage::assistant("Hello!"),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hey"),
            ChatMessage::user("tips?"),
        ];

        let answer = assistant.converse(&history).await.unwrap();
        assert!(answer.ends_with("3 turns, tips?"));
    }

    #[tokio::test]
    async fn rejected_key_degrades_to_fallback() {
        let endpoint = serve().await;
        let assistant = HostedAssistant::new(config(&endpoint, "wrong")).unwrap();

        assert!(matches!(
            assistant.submit("x").await,
            Err(AssistantError::ServiceUnavailable(_))
        ));
        assert_eq!(
            ask_or_fallback(&assistant, Feature::ComfortTip, "x").await,
            "Could not generate a comfort tip at this time."
        );
    }

    #[test]
    fn missing_key_is_a_construction_error() {
        assert!(HostedAssistant::new(AssistantConfig::default()).is_err());
    }
}
