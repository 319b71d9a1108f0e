//! Settings domain types and validation.
//!
//! Defaults applied to every dependency created through a
//! [`DependencyContext`](crate::services::DependencyContext). These are pure
//! domain types with no infrastructure dependencies.

use crate::domain::RebindStrategy;
use crate::ports::CoreError;
use serde::{Deserialize, Serialize};

/// Language tag used when a dependency asks for a language filter.
pub const DEFAULT_LANGUAGE_TAG: &str = "rust";

/// Dependency defaults.
///
/// All fields are optional to support partial updates and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Strategy for newly created dependencies.
    pub default_strategy: Option<RebindStrategy>,

    /// Tag merged into filters as `(LANG=<tag>)`.
    pub language_tag: Option<String>,

    /// Whether new dependencies add the language clause.
    pub add_language_filter: Option<bool>,

    /// Whether new dependencies start out required.
    pub required_by_default: Option<bool>,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            default_strategy: Some(RebindStrategy::Suspend),
            language_tag: Some(DEFAULT_LANGUAGE_TAG.to_string()),
            add_language_filter: Some(false),
            required_by_default: Some(true),
        }
    }

    /// Parse settings from JSON; missing fields stay `None`.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let settings: Self = serde_json::from_str(json)?;
        validate_settings(&settings)?;
        Ok(settings)
    }

    #[must_use]
    pub fn effective_strategy(&self) -> RebindStrategy {
        self.default_strategy.unwrap_or_default()
    }

    #[must_use]
    pub fn effective_language_tag(&self) -> &str {
        self.language_tag.as_deref().unwrap_or(DEFAULT_LANGUAGE_TAG)
    }

    #[must_use]
    pub fn effective_add_language_filter(&self) -> bool {
        self.add_language_filter.unwrap_or(false)
    }

    #[must_use]
    pub fn effective_required(&self) -> bool {
        self.required_by_default.unwrap_or(true)
    }

    /// Merge an update into this one, only touching fields that are Some.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(strategy) = other.default_strategy {
            self.default_strategy = strategy;
        }
        if let Some(ref tag) = other.language_tag {
            self.language_tag.clone_from(tag);
        }
        if let Some(add) = other.add_language_filter {
            self.add_language_filter = add;
        }
        if let Some(required) = other.required_by_default {
            self.required_by_default = required;
        }
    }
}

/// Partial settings update.
///
/// Each field is `Option<Option<T>>`:
/// - `None` = don't change this field
/// - `Some(None)` = reset field to its default
/// - `Some(Some(value))` = set field to value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub default_strategy: Option<Option<RebindStrategy>>,
    pub language_tag: Option<Option<String>>,
    pub add_language_filter: Option<Option<bool>>,
    pub required_by_default: Option<Option<bool>>,
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Language tag cannot be empty")]
    EmptyLanguageTag,

    #[error("Language tag '{0}' contains filter syntax characters")]
    InvalidLanguageTag(String),
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if let Some(ref tag) = settings.language_tag {
        if tag.trim().is_empty() {
            return Err(SettingsError::EmptyLanguageTag);
        }
        // The tag is spliced verbatim into a filter expression
        if tag.contains(['(', ')', '=', '*', '&', '|', '!', '\\']) {
            return Err(SettingsError::InvalidLanguageTag(tag.clone()));
        }
    }

    Ok(())
}
