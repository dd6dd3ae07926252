//! # Host Configuration
//!
//! Loaded once at startup: `.env` (via dotenvy), then `config/bridge.toml`
//! if one is found, then environment variables, which win over the file.

use bridge_freedom::{CurrentAdapter, LegacyAdapter, MockBehavior, Platform};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const CONFIG_PATHS: [&str; 3] = [
    "config/bridge.toml",
    "../config/bridge.toml",
    "../../config/bridge.toml",
];

const DEFAULT_GRACE_MS: u64 = 5_000;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to parse {path}: {source}")]
    ConfigFile {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidVar {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Contents of `config/bridge.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub provider: Option<String>,
    pub platform: Option<Platform>,
    pub mock: MockSection,
    pub shutdown: ShutdownSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MockSection {
    pub behavior: Option<MockBehavior>,
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShutdownSection {
    pub grace_ms: Option<u64>,
}

impl FileConfig {
    pub fn parse(path: &str, content: &str) -> Result<Self, HostError> {
        toml::from_str(content).map_err(|source| HostError::ConfigFile {
            path: path.to_string(),
            source,
        })
    }

    /// First config file found on the search path
    pub fn discover() -> Result<Option<Self>, HostError> {
        for path in CONFIG_PATHS {
            if let Ok(content) = std::fs::read_to_string(path) {
                let config = Self::parse(path, &content)?;
                tracing::info!("Loaded host configuration from {}", path);
                return Ok(Some(config));
            }
        }
        Ok(None)
    }
}

/// Resolved host configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Provider generation used when `initialize` names none
    pub provider: String,
    pub platform: Platform,
    pub mock_behavior: MockBehavior,
    pub mock_latency: Option<Duration>,
    /// How long in-flight replies are awaited once input ends
    pub shutdown_grace: Duration,
    pub log_format: LogFormat,
}

impl HostConfig {
    /// Load from `.env`, the config file and the process environment
    pub fn load() -> Result<Self, HostError> {
        dotenvy::dotenv().ok();
        let file = FileConfig::discover()?;
        Self::resolve(file.unwrap_or_default(), |name| std::env::var(name).ok())
    }

    /// Merge `file` with variables looked up through `var`; variables win
    pub fn resolve<F>(file: FileConfig, var: F) -> Result<Self, HostError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = var("BRIDGE_PROVIDER")
            .or(file.provider)
            .unwrap_or_else(|| CurrentAdapter::NAME.to_string())
            .to_ascii_lowercase();
        if provider != CurrentAdapter::NAME && provider != LegacyAdapter::NAME {
            return Err(HostError::InvalidVar {
                name: "BRIDGE_PROVIDER",
                value: provider,
                reason: format!("expected {} or {}", CurrentAdapter::NAME, LegacyAdapter::NAME),
            });
        }

        let platform = match var("BRIDGE_PLATFORM") {
            Some(raw) => parse_var("BRIDGE_PLATFORM", raw)?,
            None => file.platform.unwrap_or_default(),
        };

        let mock_behavior = match var("BRIDGE_MOCK_BEHAVIOR") {
            Some(raw) => parse_var("BRIDGE_MOCK_BEHAVIOR", raw)?,
            None => file.mock.behavior.unwrap_or_default(),
        };

        let latency_ms = match var("BRIDGE_MOCK_LATENCY_MS") {
            Some(raw) => Some(parse_var::<u64>("BRIDGE_MOCK_LATENCY_MS", raw)?),
            None => file.mock.latency_ms,
        };

        let grace_ms = match var("BRIDGE_SHUTDOWN_GRACE_MS") {
            Some(raw) => parse_var::<u64>("BRIDGE_SHUTDOWN_GRACE_MS", raw)?,
            None => file.shutdown.grace_ms.unwrap_or(DEFAULT_GRACE_MS),
        };

        let log_format = match var("LOG_FORMAT").as_deref() {
            Some(raw) if raw.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            provider,
            platform,
            mock_behavior,
            mock_latency: latency_ms.filter(|ms| *ms > 0).map(Duration::from_millis),
            shutdown_grace: Duration::from_millis(grace_ms),
            log_format,
        })
    }
}

fn parse_var<T>(name: &'static str, raw: String) -> Result<T, HostError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| HostError::InvalidVar {
        name,
        reason: e.to_string(),
        value: raw,
    })
}
