//! Application configuration (YAML).
//!
//! Everything has a default so a missing or empty file still yields a
//! runnable console.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_repeat_ttl_ms() -> u64 {
    600
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    /// Overrides the default bindings file location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bindings_file: Option<PathBuf>,
    /// Pulse debounce window for held inputs
    #[serde(default = "default_repeat_ttl_ms")]
    pub repeat_ttl_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            midi: MidiConfig::default(),
            bindings_file: None,
            repeat_ttl_ms: default_repeat_ttl_ms(),
        }
    }
}

/// MIDI port configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MidiConfig {
    /// Substring pattern matched against available input port names;
    /// empty picks the first port
    #[serde(default)]
    pub input_port: String,
}

impl AppConfig {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load the config, falling back to defaults when the file is absent.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(AppConfig::default());
        }
        Self::load(path).await
    }

    pub fn repeat_ttl(&self) -> Duration {
        Duration::from_millis(self.repeat_ttl_ms)
    }
}
