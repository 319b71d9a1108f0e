//! `DependencyContext` - the runtime handle dependencies are created from.
//!
//! The context bundles the engine, the registration lookup, the diagnostic
//! sink, the ranking comparator and the settings defaults. A context without
//! an engine is "uninitialized": every dependency created from it is invalid
//! and inert.

use super::dependency::ServiceDependency;
use crate::domain::{ProviderRanking, ServiceRankingOrder};
use crate::ports::{
    ComponentLifecycle, CoreError, DependencyEngine, DiagnosticSink, NoopLookup,
    RegistrationLookup, TracingDiagnostics,
};
use crate::settings::{Settings, validate_settings};
use std::sync::Arc;

/// Runtime handle for creating service dependencies.
///
/// # Example
///
/// ```ignore
/// let ctx = DependencyContext::new(engine, lookup)
///     .with_settings(Settings::with_defaults())?;
/// let mut echo = ctx.dependency::<Arc<dyn Echo>>(gate.clone(), "Echo");
/// echo.set_required(true)
///     .set_callbacks(Callbacks::on_set(|svc| { /* ... */ }));
/// ```
#[derive(Clone)]
pub struct DependencyContext {
    engine: Option<Arc<dyn DependencyEngine>>,
    lookup: Arc<dyn RegistrationLookup>,
    diagnostics: Arc<dyn DiagnosticSink>,
    ranking: Arc<dyn ProviderRanking>,
    settings: Settings,
}

impl DependencyContext {
    /// Create an initialized context.
    pub fn new(engine: Arc<dyn DependencyEngine>, lookup: Arc<dyn RegistrationLookup>) -> Self {
        Self {
            engine: Some(engine),
            lookup,
            diagnostics: Arc::new(TracingDiagnostics),
            ranking: Arc::new(ServiceRankingOrder),
            settings: Settings::with_defaults(),
        }
    }

    /// A context whose runtime failed to initialize.
    pub fn uninitialized() -> Self {
        Self {
            engine: None,
            lookup: Arc::new(NoopLookup),
            diagnostics: Arc::new(TracingDiagnostics),
            ranking: Arc::new(ServiceRankingOrder),
            settings: Settings::with_defaults(),
        }
    }

    /// Replace the diagnostic sink.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Replace the comparator that picks the best of several matches.
    #[must_use]
    pub fn with_ranking(mut self, ranking: Arc<dyn ProviderRanking>) -> Self {
        self.ranking = ranking;
        self
    }

    /// Replace the settings defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings fail validation; the language tag is
    /// spliced into composed filters verbatim.
    pub fn with_settings(mut self, settings: Settings) -> Result<Self, CoreError> {
        validate_settings(&settings)?;
        self.settings = settings;
        Ok(self)
    }

    pub const fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub(crate) fn engine(&self) -> Option<&Arc<dyn DependencyEngine>> {
        self.engine.as_ref()
    }

    pub(crate) fn lookup(&self) -> &Arc<dyn RegistrationLookup> {
        &self.lookup
    }

    pub(crate) fn diagnostics(&self) -> &Arc<dyn DiagnosticSink> {
        &self.diagnostics
    }

    pub(crate) fn ranking(&self) -> &Arc<dyn ProviderRanking> {
        &self.ranking
    }

    /// Create a dependency on `interface_name` for `component`.
    ///
    /// An empty name is inferred from the provider type.
    pub fn dependency<P>(
        &self,
        component: Arc<dyn ComponentLifecycle>,
        interface_name: impl Into<String>,
    ) -> ServiceDependency<P>
    where
        P: Clone + Send + Sync + 'static,
    {
        ServiceDependency::new(self, component, interface_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RebindStrategy;
    use crate::ports::{MockDependencyEngine, NoopLifecycle};

    #[test]
    fn test_uninitialized_context() {
        let ctx = DependencyContext::uninitialized();
        assert!(!ctx.is_initialized());
        assert!(ctx.engine().is_none());
    }

    #[test]
    fn test_settings_are_carried() {
        let mut settings = Settings::with_defaults();
        settings.default_strategy = Some(RebindStrategy::Locking);
        let ctx = DependencyContext::new(Arc::new(MockDependencyEngine::new()), Arc::new(NoopLookup))
            .with_settings(settings)
            .unwrap();

        assert!(ctx.is_initialized());
        assert_eq!(ctx.settings().effective_strategy(), RebindStrategy::Locking);
    }

    #[test]
    fn test_settings_with_filter_syntax_in_tag_are_rejected() {
        for tag in ["c)(x", "a=b", "  "] {
            let mut settings = Settings::with_defaults();
            settings.language_tag = Some(tag.to_string());
            let result = DependencyContext::uninitialized().with_settings(settings);
            assert!(matches!(result, Err(CoreError::Settings(_))), "tag {tag:?}");
        }
    }

    #[test]
    fn test_rejected_settings_leave_no_context() {
        let mut settings = Settings::with_defaults();
        settings.language_tag = Some("rust)".to_string());
        let ctx = DependencyContext::uninitialized();

        assert!(ctx.clone().with_settings(settings).is_err());
        assert_eq!(ctx.settings().effective_language_tag(), "rust");
    }

    #[test]
    fn test_dependency_from_uninitialized_context_is_invalid() {
        let ctx = DependencyContext::uninitialized();
        let dep = ctx.dependency::<u32>(Arc::new(NoopLifecycle), "Echo");
        assert!(!dep.is_valid());
    }
}
