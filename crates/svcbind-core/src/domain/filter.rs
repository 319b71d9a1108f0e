//! Filter composition for service dependencies.
//!
//! A dependency is described to the registry by an interface name, an
//! optional version range and an optional LDAP-style filter. When the
//! dependency asks for providers of one language only, a `(LANG=<tag>)`
//! clause is merged into the user's filter:
//!
//! | user filter        | composed                         |
//! |--------------------|----------------------------------|
//! | *(empty)*          | `(LANG=tag)`                     |
//! | `(&(a=1)(b=2))`    | `(&(a=1)(b=2)(LANG=tag))`        |
//! | `(a=1)`            | `(&(a=1)(LANG=tag))`             |
//! | contains `(LANG=`  | unchanged                        |
//! | anything else      | `(LANG=tag)` plus a reported error |
//!
//! Composition is a pure function of its inputs, so composing twice yields
//! the same bytes.

use super::properties::SERVICE_LANGUAGE;
use thiserror::Error;

/// Name used when no interface name was given and none could be inferred.
pub const TYPE_NAME_ERROR: &str = "<TYPE_NAME_ERROR>";

/// What a dependency asks the registry for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Interface the providers must be registered under.
    pub interface_name: String,
    /// Version range the provided interface version must fall in.
    pub version_range: Option<String>,
    /// Composed filter over provider properties.
    pub filter: Option<String>,
}

/// Problems found while composing a [`ServiceSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error("interface name is empty and could not be inferred, using '<TYPE_NAME_ERROR>'")]
    EmptyInterfaceName,

    #[error("unexpected filter layout: '{0}'")]
    UnexpectedLayout(String),
}

/// Result of composing a spec: always usable, possibly with reported issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub spec: ServiceSpec,
    pub issues: Vec<ComposeError>,
}

impl Composition {
    /// True when composition needed no fallback.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Builder for the (name, version range, filter) triple sent to the registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterBuilder<'a> {
    interface_name: &'a str,
    version_range: Option<&'a str>,
    user_filter: Option<&'a str>,
    language_tag: Option<&'a str>,
}

impl<'a> FilterBuilder<'a> {
    pub const fn new(interface_name: &'a str) -> Self {
        Self {
            interface_name,
            version_range: None,
            user_filter: None,
            language_tag: None,
        }
    }

    #[must_use]
    pub const fn version_range(mut self, range: Option<&'a str>) -> Self {
        self.version_range = range;
        self
    }

    #[must_use]
    pub const fn user_filter(mut self, filter: Option<&'a str>) -> Self {
        self.user_filter = filter;
        self
    }

    /// Restrict matches to providers registered with this language tag.
    #[must_use]
    pub const fn language_tag(mut self, tag: Option<&'a str>) -> Self {
        self.language_tag = tag;
        self
    }

    /// Compose the service spec. Never fails; issues are returned alongside the
    /// best-effort result so callers can report them.
    pub fn compose(&self) -> Composition {
        let mut issues = Vec::new();

        let interface_name = if self.interface_name.is_empty() {
            issues.push(ComposeError::EmptyInterfaceName);
            TYPE_NAME_ERROR.to_string()
        } else {
            self.interface_name.to_string()
        };

        let user_filter = self.user_filter.unwrap_or_default();
        let filter = match self.language_tag {
            None => user_filter.to_string(),
            Some(tag) => match with_language_clause(user_filter, tag) {
                Ok(filter) => filter,
                Err(err) => {
                    issues.push(err);
                    language_clause(tag)
                }
            },
        };

        Composition {
            spec: ServiceSpec {
                interface_name,
                version_range: non_empty(self.version_range),
                filter: non_empty(Some(filter.as_str())),
            },
            issues,
        }
    }
}

/// The `(LANG=<tag>)` clause.
pub fn language_clause(tag: &str) -> String {
    format!("({SERVICE_LANGUAGE}={tag})")
}

/// Merge a language clause into a user filter.
///
/// Returns [`ComposeError::UnexpectedLayout`] when the filter is neither
/// empty, a conjunction, nor a single parenthesized expression.
pub fn with_language_clause(user_filter: &str, tag: &str) -> Result<String, ComposeError> {
    let clause = language_clause(tag);
    if user_filter.is_empty() {
        return Ok(clause);
    }

    let needle = format!("({SERVICE_LANGUAGE}=");
    if user_filter.contains(&needle) {
        return Ok(user_filter.to_string());
    }

    if user_filter.starts_with("(&") && user_filter.ends_with(')') {
        let body = &user_filter[..user_filter.len() - 1];
        return Ok(format!("{body}{clause})"));
    }

    if user_filter.starts_with('(') && user_filter.ends_with(')') {
        return Ok(format!("(&{user_filter}{clause})"));
    }

    Err(ComposeError::UnexpectedLayout(user_filter.to_string()))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
