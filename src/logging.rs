//! Logging setup and settings loading for the binary.

use anyhow::{Context, Result};
use std::path::Path;
use svcbind_core::{Settings, SettingsUpdate};

/// Default filter directive when `RUST_LOG` is unset.
pub const fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

/// Load settings from `path`, or the defaults when none is given.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::with_defaults());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    let file = Settings::from_json_str(&json)
        .with_context(|| format!("Invalid settings file {}", path.display()))?;

    // Fields the file leaves out keep their defaults.
    let mut settings = Settings::with_defaults();
    settings.merge(&SettingsUpdate {
        default_strategy: file.default_strategy.map(Some),
        language_tag: file.language_tag.map(Some),
        add_language_filter: file.add_language_filter.map(Some),
        required_by_default: file.required_by_default.map(Some),
    });
    tracing::debug!(path = %path.display(), ?settings, "Settings loaded");
    Ok(settings)
}
