//! Line-oriented bindings file: one binding string per line.
//!
//! Blank lines and `#` comments are ignored. A line that fails to parse is
//! skipped with a diagnostic and loading continues; a half-broken file never
//! aborts the session. Saving rewrites the whole file from the in-memory
//! list, one newline-terminated binding per line in list order.

use crate::binding::Binding;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

/// Bindings installed when no file exists yet: number row drives the deck
/// pair, F-keys the microphones, and CC 0x0f is wired to the crossfader.
pub const DEFAULT_BINDINGS: &[&str] = &[
    "k0.31:pp_stop.0.127",
    "k0.32:pp_play.0.127",
    "k0.33:pp_pause.0.127",
    "k0.34:pp_prev.0.127",
    "k0.35:pp_next.0.127",
    "k0.36:pp_stop.1.127",
    "k0.37:pp_play.1.127",
    "k0.38:pp_pause.1.127",
    "k0.39:pp_prev.1.127",
    "k0.30:pp_next.1.127",
    "k0.ffbe:pm_on.0.127",
    "k1.ffbe:pm_off.0.127",
    "k0.ffbf:pm_on.1.127",
    "k1.ffbf:pm_off.1.127",
    "k4.78:px_pass.0.127",
    "k4.66:px_focus.0.127",
    "c0.0f:dx_fade.0.1",
];

/// Parse binding lines, skipping comments, blanks and malformed entries.
pub fn parse_lines<'a>(lines: impl Iterator<Item = &'a str>, origin: &str) -> Vec<Binding> {
    let mut bindings = Vec::new();
    for (number, line) in lines.enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match Binding::parse(line) {
            Ok(binding) => bindings.push(binding),
            Err(err) => warn!("{}:{}: skipping '{}': {}", origin, number + 1, line, err),
        }
    }
    bindings
}

/// The hard-coded default binding list.
pub fn default_bindings() -> Vec<Binding> {
    parse_lines(DEFAULT_BINDINGS.iter().copied(), "defaults")
}

/// Load bindings from a file. Only an unreadable file is an error; bad
/// lines are skipped with a warning.
pub async fn load_bindings(path: impl AsRef<Path>) -> Result<Vec<Binding>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read bindings file: {}", path.display()))?;
    let bindings = parse_lines(content.lines(), &path.display().to_string());
    info!("Loaded {} bindings from {}", bindings.len(), path.display());
    Ok(bindings)
}

/// Rewrite the bindings file from the in-memory list.
pub async fn save_bindings(path: impl AsRef<Path>, bindings: &[Binding]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut content = String::new();
    for binding in bindings {
        content.push_str(&binding.to_string());
        content.push('\n');
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write bindings file: {}", path.display()))?;
    info!("Saved {} bindings to {}", bindings.len(), path.display());
    Ok(())
}
