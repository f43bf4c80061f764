//! Resolution of the config and bindings file locations.
//!
//! Development runs (a `deckctl.yaml` in the working directory) keep
//! everything local; otherwise files live under the platform data directory.

use std::path::PathBuf;

/// Application name used for the data directory
const APP_NAME: &str = "deckctl";

const CONFIG_FILE: &str = "deckctl.yaml";
const BINDINGS_FILE: &str = "bindings";

/// Where the config and bindings files live.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config: PathBuf,
    pub bindings: PathBuf,
}

impl AppPaths {
    /// Detect the appropriate locations. A `deckctl.yaml` in the current
    /// working directory wins (typical with `cargo run`); otherwise the
    /// platform data dir is used, falling back to the cwd when the platform
    /// reports none.
    pub fn detect() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let cwd_config = cwd.join(CONFIG_FILE);
        if cwd_config.exists() {
            return Self {
                config: cwd_config,
                bindings: cwd.join(BINDINGS_FILE),
            };
        }

        let base = dirs::data_dir()
            .map(|dir| dir.join(APP_NAME))
            .unwrap_or(cwd);
        Self {
            config: base.join(CONFIG_FILE),
            bindings: base.join(BINDINGS_FILE),
        }
    }

    /// Explicit locations, as resolved from CLI or config overrides.
    pub fn at(config: PathBuf, bindings: PathBuf) -> Self {
        Self { config, bindings }
    }
}
