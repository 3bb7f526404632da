use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use wire::CodecLimits;

/// Path used when `WIRE_CONFIG_PATH` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "server/config/wire.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub limits: CodecLimits,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `env_logger` filter used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let parsed = toml::from_str::<Self>(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(parsed)
    }

    /// Loads `path` if it exists, otherwise falls back to the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!(
                "config file {} not found, using default settings",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }
}
