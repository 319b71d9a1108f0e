//! Service dependency - the per-dependency configuration and binding object.
//!
//! A `ServiceDependency` is created by its owning component, configured
//! through chained setters, and registered with the engine. Each setter that
//! affects matching recomposes the [`ServiceSpec`] and pushes it to the
//! engine; callbacks are installed through the binder, which the engine then
//! delivers events to.
//!
//! A dependency created from an uninitialized context, or one the engine
//! refused to create, is *invalid*: it never talks to the engine and every
//! setter is a no-op, so configuration chains stay safe.

use super::binder::Binder;
use super::callbacks::Callbacks;
use super::context::DependencyContext;
use crate::domain::{ComposeError, FilterBuilder, RebindStrategy, ServiceSpec};
use crate::ports::{
    ComponentLifecycle, DependencyEngine, DependencyError, DependencyHandle, DependencyListener,
    DiagnosticSink,
};
use std::sync::Arc;
use tracing::{debug, trace};

/// Interface name derived from a provider type.
///
/// Smart-pointer wrappers, `dyn` and auto-trait bounds are stripped, so
/// `Arc<dyn app::Echo + Send + Sync>` yields `app::Echo`. Registries that
/// register providers under this name match typed dependencies that do not
/// name their interface explicitly.
pub fn interface_name_of<P: ?Sized>() -> String {
    const WRAPPERS: [&str; 3] = ["alloc::sync::Arc<", "alloc::boxed::Box<", "alloc::rc::Rc<"];

    let mut name = std::any::type_name::<P>();
    while let Some(inner) = WRAPPERS
        .iter()
        .find_map(|w| name.strip_prefix(w))
        .and_then(|rest| rest.strip_suffix('>'))
    {
        name = inner;
    }
    let name = name.strip_prefix("dyn ").unwrap_or(name);
    name.split(" + ").next().unwrap_or_default().to_string()
}

struct ValidDependency<P> {
    handle: DependencyHandle,
    engine: Arc<dyn DependencyEngine>,
    diagnostics: Arc<dyn DiagnosticSink>,
    binder: Arc<Binder<P>>,
    name: String,
    inferred_name: String,
    version_range: Option<String>,
    filter: Option<String>,
    add_language_filter: bool,
    language_tag: String,
    required: bool,
    spec: ServiceSpec,
    reported: Vec<ComposeError>,
    listener_installed: bool,
}

impl<P> ValidDependency<P>
where
    P: Clone + Send + Sync + 'static,
{
    fn effective_name(&self) -> &str {
        if self.name.is_empty() {
            &self.inferred_name
        } else {
            &self.name
        }
    }

    /// Recompose the service spec and push it to the engine.
    fn setup_service(&mut self) {
        let tag = self
            .add_language_filter
            .then_some(self.language_tag.as_str());
        let composition = FilterBuilder::new(self.effective_name())
            .version_range(self.version_range.as_deref())
            .user_filter(self.filter.as_deref())
            .language_tag(tag)
            .compose();

        let label = composition.spec.interface_name.as_str();
        for issue in composition
            .issues
            .iter()
            .filter(|issue| !self.reported.contains(issue))
        {
            self.diagnostics
                .report(label, &DependencyError::from(issue.clone()));
        }
        self.reported.clone_from(&composition.issues);

        self.binder.set_label(label);
        self.engine.set_service(self.handle, &composition.spec);
        debug!(
            dependency = %self.handle,
            interface = label,
            version_range = ?composition.spec.version_range,
            filter = ?composition.spec.filter,
            "Service dependency configured"
        );
        self.spec = composition.spec;
    }
}

enum State<P> {
    Valid(Box<ValidDependency<P>>),
    Invalid,
}

/// A component's declared need for providers of one interface.
pub struct ServiceDependency<P> {
    state: State<P>,
}

impl<P> ServiceDependency<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// Create a dependency; an empty `interface_name` is inferred from `P`.
    pub fn new(
        ctx: &DependencyContext,
        component: Arc<dyn ComponentLifecycle>,
        interface_name: impl Into<String>,
    ) -> Self {
        let Some(engine) = ctx.engine() else {
            debug!("Runtime not initialized, creating inert service dependency");
            return Self::invalid();
        };

        let name = interface_name.into();
        let handle = match engine.create_dependency() {
            Ok(handle) => handle,
            Err(err) => {
                let label = if name.is_empty() { interface_name_of::<P>() } else { name };
                ctx.diagnostics().report(&label, &DependencyError::Engine(err));
                return Self::invalid();
            }
        };

        let settings = ctx.settings();
        let strategy = settings.effective_strategy();
        let binder = Arc::new(Binder::new(
            &name,
            strategy,
            component,
            ctx.ranking().clone(),
            ctx.lookup().clone(),
            ctx.diagnostics().clone(),
        ));

        let mut dep = ValidDependency {
            handle,
            engine: engine.clone(),
            diagnostics: ctx.diagnostics().clone(),
            binder,
            name,
            inferred_name: interface_name_of::<P>(),
            version_range: None,
            filter: None,
            add_language_filter: settings.effective_add_language_filter(),
            language_tag: settings.effective_language_tag().to_string(),
            required: settings.effective_required(),
            spec: ServiceSpec::default(),
            reported: Vec::new(),
            listener_installed: false,
        };
        dep.engine.set_strategy(handle, strategy);
        dep.engine.set_required(handle, dep.required);
        dep.engine
            .set_add_language_filter(handle, dep.add_language_filter);
        dep.setup_service();

        Self {
            state: State::Valid(Box::new(dep)),
        }
    }

    /// Create a dependency whose interface name is inferred from `P`.
    pub fn typed(ctx: &DependencyContext, component: Arc<dyn ComponentLifecycle>) -> Self {
        Self::new(ctx, component, String::new())
    }

    const fn invalid() -> Self {
        Self {
            state: State::Invalid,
        }
    }

    /// Apply `op` when valid; silently absorb it otherwise.
    fn configure(&mut self, op: &'static str, f: impl FnOnce(&mut ValidDependency<P>)) -> &mut Self {
        match &mut self.state {
            State::Valid(dep) => f(dep),
            State::Invalid => {
                trace!(error = %DependencyError::InvalidState(op), "Ignoring mutator");
            }
        }
        self
    }

    fn valid(&self) -> Option<&ValidDependency<P>> {
        match &self.state {
            State::Valid(dep) => Some(dep),
            State::Invalid => None,
        }
    }

    /// Whether the component may stay active without a matching provider.
    pub fn set_required(&mut self, required: bool) -> &mut Self {
        self.configure("set_required", |dep| {
            dep.required = required;
            dep.engine.set_required(dep.handle, required);
        })
    }

    /// Set the interface name; empty means "infer from the provider type".
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        self.configure("set_name", |dep| {
            dep.name = name;
            dep.setup_service();
        })
    }

    /// Set the user filter; empty clears it.
    pub fn set_filter(&mut self, filter: impl Into<String>) -> &mut Self {
        let filter = filter.into();
        self.configure("set_filter", |dep| {
            dep.filter = (!filter.is_empty()).then_some(filter);
            dep.setup_service();
        })
    }

    /// Set the version range; empty clears it.
    pub fn set_version_range(&mut self, range: impl Into<String>) -> &mut Self {
        let range = range.into();
        self.configure("set_version_range", |dep| {
            dep.version_range = (!range.is_empty()).then_some(range);
            dep.setup_service();
        })
    }

    /// Toggle the `(LANG=<tag>)` clause in the composed filter.
    pub fn set_add_language_filter(&mut self, enabled: bool) -> &mut Self {
        self.configure("set_add_language_filter", |dep| {
            dep.add_language_filter = enabled;
            dep.engine.set_add_language_filter(dep.handle, enabled);
            dep.setup_service();
        })
    }

    /// Choose the rebinding strategy.
    ///
    /// Once the dependency has received events the strategy is fixed; a
    /// different value is reported as a configuration error and ignored.
    pub fn set_strategy(&mut self, strategy: RebindStrategy) -> &mut Self {
        self.configure("set_strategy", |dep| {
            match dep.binder.try_set_strategy(strategy) {
                Ok(()) => dep.engine.set_strategy(dep.handle, strategy),
                Err(err) => dep.diagnostics.report(dep.effective_name(), &err),
            }
        })
    }

    /// Replace the callback slots and start receiving events.
    pub fn set_callbacks(&mut self, callbacks: Callbacks<P>) -> &mut Self {
        self.configure("set_callbacks", |dep| {
            dep.binder.replace_slots(callbacks.into_slots());
            if !dep.listener_installed {
                let listener: Arc<dyn DependencyListener> = dep.binder.clone();
                dep.engine.set_listener(dep.handle, Some(listener));
                dep.listener_installed = true;
            }
        })
    }

    pub const fn is_valid(&self) -> bool {
        matches!(self.state, State::Valid(_))
    }

    pub fn handle(&self) -> Option<DependencyHandle> {
        self.valid().map(|dep| dep.handle)
    }

    /// Interface name as configured (empty when inferred).
    pub fn name(&self) -> Option<&str> {
        self.valid().map(|dep| dep.name.as_str())
    }

    /// Interface name actually sent to the engine.
    pub fn interface_name(&self) -> Option<&str> {
        self.valid().map(|dep| dep.spec.interface_name.as_str())
    }

    /// User filter as configured.
    pub fn filter(&self) -> Option<&str> {
        self.valid().and_then(|dep| dep.filter.as_deref())
    }

    pub fn version_range(&self) -> Option<&str> {
        self.valid().and_then(|dep| dep.version_range.as_deref())
    }

    /// Filter after language composition.
    pub fn composed_filter(&self) -> Option<&str> {
        self.valid().and_then(|dep| dep.spec.filter.as_deref())
    }

    pub fn service_spec(&self) -> Option<&ServiceSpec> {
        self.valid().map(|dep| &dep.spec)
    }

    pub fn is_required(&self) -> bool {
        self.valid().is_some_and(|dep| dep.required)
    }

    pub fn adds_language_filter(&self) -> bool {
        self.valid().is_some_and(|dep| dep.add_language_filter)
    }

    pub fn strategy(&self) -> Option<RebindStrategy> {
        self.valid().map(|dep| dep.binder.strategy())
    }

    /// The currently bound best match.
    pub fn current(&self) -> Option<P> {
        self.valid().and_then(|dep| dep.binder.current())
    }

    /// Number of providers currently matching.
    pub fn tracked_count(&self) -> usize {
        self.valid().map_or(0, |dep| dep.binder.tracked_count())
    }

    /// Whether this dependency lets its component be active: optional, or
    /// bound to a provider.
    pub fn is_satisfied(&self) -> bool {
        self.valid()
            .is_some_and(|dep| !dep.required || dep.binder.current().is_some())
    }
}

impl<P> Drop for ServiceDependency<P> {
    fn drop(&mut self) {
        if let State::Valid(dep) = &self.state {
            debug!(dependency = %dep.handle, "Destroying service dependency");
            dep.engine.destroy_dependency(dep.handle);
        }
    }
}

impl<P> std::fmt::Debug for ServiceDependency<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            State::Valid(dep) => f
                .debug_struct("ServiceDependency")
                .field("handle", &dep.handle)
                .field("spec", &dep.spec)
                .field("required", &dep.required)
                .finish_non_exhaustive(),
            State::Invalid => f.write_str("ServiceDependency(invalid)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProviderObject, ServiceEvent, ServiceId, ServiceReference};
    use crate::ports::{
        CollectingDiagnostics, EngineError, MockDependencyEngine, NoopLifecycle, NoopLookup,
    };
    use crate::settings::Settings;
    use mockall::predicate::{always, eq};
    use std::sync::Mutex;

    trait Echo: Send + Sync {}

    /// Engine mock accepting everything, remembering the listener.
    fn permissive_engine(listener: Arc<Mutex<Option<Arc<dyn DependencyListener>>>>) -> MockDependencyEngine {
        let mut engine = MockDependencyEngine::new();
        engine
            .expect_create_dependency()
            .returning(|| Ok(DependencyHandle(1)));
        engine.expect_set_strategy().returning(|_, _| ());
        engine.expect_set_required().returning(|_, _| ());
        engine.expect_set_add_language_filter().returning(|_, _| ());
        engine.expect_set_service().returning(|_, _| ());
        engine.expect_destroy_dependency().returning(|_| ());
        engine
            .expect_set_listener()
            .returning(move |_, l| *listener.lock().unwrap() = l);
        engine
    }

    fn context(engine: MockDependencyEngine, diagnostics: &CollectingDiagnostics) -> DependencyContext {
        DependencyContext::new(Arc::new(engine), Arc::new(NoopLookup))
            .with_diagnostics(Arc::new(diagnostics.clone()))
    }

    #[test]
    fn test_interface_name_inference() {
        assert_eq!(interface_name_of::<String>(), "alloc::string::String");
        let inferred = interface_name_of::<Arc<dyn Echo>>();
        assert!(inferred.ends_with("Echo"), "{inferred}");
        assert!(!inferred.contains("Arc"));
        assert!(!inferred.starts_with("dyn"));
    }

    #[test]
    fn test_construction_pushes_defaults() {
        let mut engine = MockDependencyEngine::new();
        engine
            .expect_create_dependency()
            .times(1)
            .returning(|| Ok(DependencyHandle(7)));
        engine
            .expect_set_strategy()
            .with(eq(DependencyHandle(7)), eq(RebindStrategy::Suspend))
            .times(1)
            .returning(|_, _| ());
        engine
            .expect_set_required()
            .with(eq(DependencyHandle(7)), eq(true))
            .times(1)
            .returning(|_, _| ());
        engine
            .expect_set_add_language_filter()
            .with(eq(DependencyHandle(7)), eq(false))
            .times(1)
            .returning(|_, _| ());
        engine
            .expect_set_service()
            .withf(|handle, spec| {
                *handle == DependencyHandle(7) && spec.interface_name == "Echo" && spec.filter.is_none()
            })
            .times(1)
            .returning(|_, _| ());
        engine
            .expect_destroy_dependency()
            .with(eq(DependencyHandle(7)))
            .times(1)
            .returning(|_| ());

        let diagnostics = CollectingDiagnostics::new();
        let dep = ServiceDependency::<u32>::new(
            &context(engine, &diagnostics),
            Arc::new(NoopLifecycle),
            "Echo",
        );
        assert!(dep.is_valid());
        assert_eq!(dep.handle(), Some(DependencyHandle(7)));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_setters_recompose_and_push() {
        let pushed = Arc::new(Mutex::new(Vec::<ServiceSpec>::new()));
        let sink = pushed.clone();
        let mut engine = MockDependencyEngine::new();
        engine
            .expect_create_dependency()
            .returning(|| Ok(DependencyHandle(1)));
        engine.expect_set_strategy().returning(|_, _| ());
        engine.expect_set_required().returning(|_, _| ());
        engine.expect_set_add_language_filter().returning(|_, _| ());
        engine
            .expect_set_service()
            .with(eq(DependencyHandle(1)), always())
            .returning(move |_, spec| sink.lock().unwrap().push(spec.clone()));
        engine.expect_destroy_dependency().returning(|_| ());

        let diagnostics = CollectingDiagnostics::new();
        let mut dep = ServiceDependency::<u32>::new(
            &context(engine, &diagnostics),
            Arc::new(NoopLifecycle),
            "Echo",
        );
        dep.set_filter("(a=1)")
            .set_version_range("[1.0.0,2.0.0)")
            .set_add_language_filter(true);

        let pushed = pushed.lock().unwrap();
        assert_eq!(pushed.len(), 4);
        let last = pushed.last().unwrap();
        assert_eq!(last.interface_name, "Echo");
        assert_eq!(last.version_range.as_deref(), Some("[1.0.0,2.0.0)"));
        assert_eq!(last.filter.as_deref(), Some("(&(a=1)(LANG=rust))"));
        assert_eq!(dep.composed_filter(), Some("(&(a=1)(LANG=rust))"));
        assert_eq!(dep.filter(), Some("(a=1)"));
    }

    #[test]
    fn test_mutators_are_independent() {
        let diagnostics = CollectingDiagnostics::new();
        let listener = Arc::new(Mutex::new(None));
        let mut dep = ServiceDependency::<u32>::new(
            &context(permissive_engine(listener), &diagnostics),
            Arc::new(NoopLifecycle),
            "Echo",
        );

        dep.set_required(false)
            .set_filter("(a=1)")
            .set_version_range("1.0.0")
            .set_strategy(RebindStrategy::Locking)
            .set_add_language_filter(true)
            .set_name("Echo2");

        assert!(!dep.is_required());
        assert_eq!(dep.filter(), Some("(a=1)"));
        assert_eq!(dep.version_range(), Some("1.0.0"));
        assert_eq!(dep.strategy(), Some(RebindStrategy::Locking));
        assert!(dep.adds_language_filter());
        assert_eq!(dep.name(), Some("Echo2"));

        dep.set_filter("(b=2)");
        assert!(!dep.is_required());
        assert_eq!(dep.version_range(), Some("1.0.0"));
        assert_eq!(dep.strategy(), Some(RebindStrategy::Locking));
        assert_eq!(dep.name(), Some("Echo2"));
    }

    #[test]
    fn test_invalid_dependency_is_inert() {
        let diagnostics = CollectingDiagnostics::new();
        let ctx = DependencyContext::uninitialized().with_diagnostics(Arc::new(diagnostics.clone()));
        let mut dep = ServiceDependency::<u32>::new(&ctx, Arc::new(NoopLifecycle), "Echo");

        let before = format!("{dep:?}");
        dep.set_required(true)
            .set_name("Other")
            .set_filter("(a=1)")
            .set_version_range("[1,2)")
            .set_add_language_filter(true)
            .set_strategy(RebindStrategy::Locking)
            .set_callbacks(Callbacks::on_set(|_: Option<u32>| {}));

        assert!(!dep.is_valid());
        assert_eq!(format!("{dep:?}"), before);
        assert_eq!(dep.name(), None);
        assert_eq!(dep.filter(), None);
        assert_eq!(dep.composed_filter(), None);
        assert_eq!(dep.strategy(), None);
        assert!(!dep.is_required());
        assert!(!dep.is_satisfied());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_engine_refusal_makes_dependency_invalid() {
        let mut engine = MockDependencyEngine::new();
        engine
            .expect_create_dependency()
            .returning(|| Err(EngineError::CreationFailed("full".to_string())));
        // No other engine call may happen for an invalid dependency.
        let diagnostics = CollectingDiagnostics::new();
        let mut dep = ServiceDependency::<u32>::new(
            &context(engine, &diagnostics),
            Arc::new(NoopLifecycle),
            "Echo",
        );
        dep.set_filter("(a=1)").set_required(false);

        assert!(!dep.is_valid());
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics.reports()[0].1, DependencyError::Engine(_)));
    }

    #[test]
    fn test_malformed_filter_is_reported_once() {
        let diagnostics = CollectingDiagnostics::new();
        let listener = Arc::new(Mutex::new(None));
        let mut dep = ServiceDependency::<u32>::new(
            &context(permissive_engine(listener), &diagnostics),
            Arc::new(NoopLifecycle),
            "Echo",
        );

        dep.set_add_language_filter(true).set_filter("a=1");
        dep.set_version_range("1.0.0");

        assert_eq!(dep.composed_filter(), Some("(LANG=rust)"));
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics.reports()[0].1, DependencyError::Configuration(_)));
    }

    #[test]
    fn test_typed_dependency_infers_name() {
        let diagnostics = CollectingDiagnostics::new();
        let listener = Arc::new(Mutex::new(None));
        let dep = ServiceDependency::<Arc<dyn Echo>>::typed(
            &context(permissive_engine(listener), &diagnostics),
            Arc::new(NoopLifecycle),
        );

        assert_eq!(dep.name(), Some(""));
        assert_eq!(
            dep.interface_name().map(str::to_string),
            Some(interface_name_of::<Arc<dyn Echo>>())
        );
    }

    #[test]
    fn test_strategy_change_after_binding_is_rejected() {
        let diagnostics = CollectingDiagnostics::new();
        let listener = Arc::new(Mutex::new(None));
        let mut dep = ServiceDependency::<u32>::new(
            &context(permissive_engine(listener.clone()), &diagnostics),
            Arc::new(NoopLifecycle),
            "Echo",
        );
        dep.set_callbacks(Callbacks::on_set(|_: Option<u32>| {}));

        let installed = listener.lock().unwrap().clone().expect("listener installed");
        let provider: ProviderObject = Arc::new(5_u32);
        installed.deliver(&ServiceEvent::added(ServiceReference::new(ServiceId(1)), provider));

        dep.set_strategy(RebindStrategy::Locking);
        assert_eq!(dep.strategy(), Some(RebindStrategy::Suspend));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(dep.current(), Some(5));
        assert!(dep.is_satisfied());
    }

    #[test]
    fn test_required_dependency_unsatisfied_until_bound() {
        let diagnostics = CollectingDiagnostics::new();
        let listener = Arc::new(Mutex::new(None));
        let mut dep = ServiceDependency::<u32>::new(
            &context(permissive_engine(listener), &diagnostics),
            Arc::new(NoopLifecycle),
            "Echo",
        );

        assert!(!dep.is_satisfied());
        dep.set_required(false);
        assert!(dep.is_satisfied());
    }

    #[test]
    fn test_settings_defaults_apply() {
        let diagnostics = CollectingDiagnostics::new();
        let listener = Arc::new(Mutex::new(None));
        let mut settings = Settings::with_defaults();
        settings.default_strategy = Some(RebindStrategy::Locking);
        settings.add_language_filter = Some(true);
        settings.language_tag = Some("cxx".to_string());
        settings.required_by_default = Some(false);

        let ctx = context(permissive_engine(listener), &diagnostics)
            .with_settings(settings)
            .unwrap();
        let dep = ServiceDependency::<u32>::new(&ctx, Arc::new(NoopLifecycle), "Echo");

        assert_eq!(dep.strategy(), Some(RebindStrategy::Locking));
        assert_eq!(dep.composed_filter(), Some("(LANG=cxx)"));
        assert!(!dep.is_required());
    }
}
