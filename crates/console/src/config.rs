use anyhow::{Context, Result};
use assistant::AssistantConfig;
use mock_feeds::FeedConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use stream_session::RecoveryPolicy;

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding the persisted camera list and schedules
    pub data_dir: PathBuf,
    pub recovery: RecoveryPolicy,
    pub assistant: AssistantConfig,
    pub feeds: FeedConfig,
}

impl ConsoleConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("CONSOLE_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8095".to_string())
            .parse()
            .context("invalid CONSOLE_ADDR")?;

        let data_dir = std::env::var("CONSOLE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/console"));

        Ok(Self {
            bind_addr,
            data_dir,
            recovery: RecoveryPolicy::from_env(),
            assistant: AssistantConfig::from_env(),
            feeds: FeedConfig::from_env(),
        })
    }
}
