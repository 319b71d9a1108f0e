//! Offline composition of a dependency's service spec.

use anyhow::Result;
use serde_json::{Value, json};
use svcbind_core::{FilterBuilder, ServiceSpec, Settings};
use svcbind_registry::{Filter, VersionRange};

/// Inputs of `svcbind compose`.
#[derive(Debug, Clone, Default)]
pub struct ComposeRequest {
    pub interface: String,
    pub version_range: Option<String>,
    pub filter: Option<String>,
    /// Explicit language tag; otherwise the settings decide.
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeReport {
    pub spec: ServiceSpec,
    /// Composition problems; the spec is still the best-effort result.
    pub issues: Vec<String>,
    /// Problems the registry would have parsing the result.
    pub parse_errors: Vec<String>,
}

impl ComposeReport {
    pub fn to_json(&self) -> Value {
        json!({
            "interface_name": self.spec.interface_name,
            "version_range": self.spec.version_range,
            "filter": self.spec.filter,
            "issues": self.issues,
            "parse_errors": self.parse_errors,
        })
    }
}

pub fn execute_compose(settings: &Settings, request: &ComposeRequest) -> Result<ComposeReport> {
    let tag = match &request.language {
        Some(tag) => Some(tag.as_str()),
        None => settings
            .effective_add_language_filter()
            .then(|| settings.effective_language_tag()),
    };
    let composition = FilterBuilder::new(&request.interface)
        .version_range(request.version_range.as_deref())
        .user_filter(request.filter.as_deref())
        .language_tag(tag)
        .compose();

    let mut parse_errors = Vec::new();
    if let Some(filter) = composition.spec.filter.as_deref() {
        if let Err(err) = Filter::parse(filter) {
            parse_errors.push(format!("filter: {err}"));
        }
    }
    if let Some(range) = composition.spec.version_range.as_deref() {
        if let Err(err) = range.parse::<VersionRange>() {
            parse_errors.push(format!("version range: {err}"));
        }
    }

    Ok(ComposeReport {
        issues: composition.issues.iter().map(ToString::to_string).collect(),
        spec: composition.spec,
        parse_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(filter: Option<&str>, language: Option<&str>) -> ComposeRequest {
        ComposeRequest {
            interface: "Echo".to_string(),
            version_range: None,
            filter: filter.map(str::to_string),
            language: language.map(str::to_string),
        }
    }

    #[test]
    fn test_settings_decide_language_clause() {
        let mut settings = Settings::with_defaults();
        let report = execute_compose(&settings, &request(Some("(a=1)"), None)).unwrap();
        assert_eq!(report.spec.filter.as_deref(), Some("(a=1)"));

        settings.add_language_filter = Some(true);
        let report = execute_compose(&settings, &request(Some("(a=1)"), None)).unwrap();
        assert_eq!(report.spec.filter.as_deref(), Some("(&(a=1)(LANG=rust))"));
    }

    #[test]
    fn test_json_shape() {
        let report =
            execute_compose(&Settings::with_defaults(), &request(None, Some("cxx"))).unwrap();
        let value = report.to_json();
        assert_eq!(value["interface_name"], "Echo");
        assert_eq!(value["filter"], "(LANG=cxx)");
        assert_eq!(value["version_range"], Value::Null);
        assert_eq!(value["issues"], json!([]));
    }
}
