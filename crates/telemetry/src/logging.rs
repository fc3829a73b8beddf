use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// Single-line text
    Compact,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }

    /// Reads `LOG_FORMAT`, falling back to pretty output.
    pub fn from_env() -> Self {
        Self::parse(&env::var("LOG_FORMAT").unwrap_or_default())
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub service_name: String,
    pub service_version: String,
    /// Directive used when `RUST_LOG` is unset
    pub default_directive: String,
}

impl LogConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            format: LogFormat::from_env(),
            service_name: service_name.into(),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            default_directive: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    pub fn with_default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    fn filter(&self) -> Result<EnvFilter> {
        let base = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.default_directive))
            .map_err(|e| anyhow!("invalid log directive '{}': {}", self.default_directive, e))?;

        let mut filter = base;
        for noisy in ["hyper=warn", "reqwest=warn", "tower_http=info"] {
            filter = filter.add_directive(
                noisy
                    .parse()
                    .map_err(|e| anyhow!("invalid log directive '{}': {}", noisy, e))?,
            );
        }
        Ok(filter)
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_structured_logging(config: LogConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(config.filter()?);

    let installed = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_writer(io::stdout),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(true))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(true).with_line_number(true))
            .try_init(),
    };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))?;

    tracing::info!(
        service.name = %config.service_name,
        service.version = %config.service_version,
        format = ?config.format,
        "structured logging initialized"
    );
    Ok(())
}

/// Installs logging for `service_name`, reporting a second install on stderr.
pub fn init_with_service(service_name: impl Into<String>) {
    if let Err(e) = init_structured_logging(LogConfig::new(service_name)) {
        eprintln!("logging not initialized: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" Compact "), LogFormat::Compact);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("yaml"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(""), LogFormat::Pretty);
    }

    #[test]
    fn test_log_config_builder() {
        let config = LogConfig::new("console")
            .with_version("2.1.0")
            .with_format(LogFormat::Json)
            .with_default_directive("debug");

        assert_eq!(config.service_name, "console");
        assert_eq!(config.service_version, "2.1.0");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.default_directive, "debug");
    }

    #[test]
    fn test_invalid_directive_is_reported() {
        std::env::remove_var("RUST_LOG");
        let config = LogConfig::new("console").with_default_directive("console=loud");
        assert!(config.filter().is_err());
    }
}
