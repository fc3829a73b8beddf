use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssistantError {
    /// Not configured, unreachable, or answered with an error status
    #[error("assistant service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("assistant returned an unusable response: {0}")]
    InvalidResponse(String),
}

impl AssistantError {
    pub fn not_configured() -> Self {
        Self::ServiceUnavailable("no API key configured".to_string())
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::ServiceUnavailable(e.to_string())
        }
    }
}
