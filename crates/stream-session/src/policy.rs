use crate::client::ClientConfig;
use std::time::Duration;

/// Recovery and manifest-loading parameters for stream sessions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoveryPolicy {
    /// Fatal recoverable errors tolerated before a session fails
    pub max_retries: u32,
    pub manifest_timeout: Duration,
    pub manifest_max_retry: u32,
    pub manifest_retry_delay: Duration,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            manifest_timeout: Duration::from_millis(10_000),
            manifest_max_retry: 5,
            manifest_retry_delay: Duration::from_millis(1_000),
        }
    }
}

impl RecoveryPolicy {
    pub fn from_env() -> Self {
        let def = Self::default();
        Self {
            max_retries: env_u32("STREAM_RECOVERY_MAX_RETRIES", def.max_retries),
            manifest_timeout: Duration::from_millis(env_u64(
                "STREAM_MANIFEST_TIMEOUT_MS",
                def.manifest_timeout.as_millis() as u64,
            )),
            manifest_max_retry: env_u32("STREAM_MANIFEST_MAX_RETRY", def.manifest_max_retry),
            manifest_retry_delay: Duration::from_millis(env_u64(
                "STREAM_MANIFEST_RETRY_DELAY_MS",
                def.manifest_retry_delay.as_millis() as u64,
            )),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            manifest_timeout: self.manifest_timeout,
            manifest_max_retry: self.manifest_max_retry,
            manifest_retry_delay: self.manifest_retry_delay,
        }
    }
}

fn env_u32(key: &str, def: u32) -> u32 { std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(def) }
fn env_u64(key: &str, def: u64) -> u64 { std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(def) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_and_bad_values_fall_back() {
        std::env::set_var("STREAM_RECOVERY_MAX_RETRIES", "7");
        std::env::set_var("STREAM_MANIFEST_TIMEOUT_MS", "2500");
        std::env::set_var("STREAM_MANIFEST_MAX_RETRY", "many");
        let policy = RecoveryPolicy::from_env();
        std::env::remove_var("STREAM_RECOVERY_MAX_RETRIES");
        std::env::remove_var("STREAM_MANIFEST_TIMEOUT_MS");
        std::env::remove_var("STREAM_MANIFEST_MAX_RETRY");

        assert_eq!(policy.max_retries, 7);
        assert_eq!(policy.manifest_timeout, Duration::from_millis(2500));
        assert_eq!(policy.manifest_max_retry, 5);
        assert_eq!(policy.manifest_retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn client_config_mirrors_manifest_settings() {
        let config = RecoveryPolicy::default().client_config();
        assert_eq!(config.manifest_timeout, Duration::from_secs(10));
        assert_eq!(config.manifest_max_retry, 5);
    }
}
