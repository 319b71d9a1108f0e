//! Dependency-binding core of a dynamic service runtime.
//!
//! Components declare [`ServiceDependency`]s on provider interfaces; an
//! engine implementing [`DependencyEngine`] matches registered providers and
//! delivers add/modify/remove events, which the dependency turns into the
//! component's `set`/`add`/`remove` callbacks under a [`RebindStrategy`].
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod ports;
pub mod services;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    ComposeError, Composition, FilterBuilder, Properties, PropertySnapshot, ProviderObject,
    ProviderRanking, RebindStrategy, SERVICE_ID, SERVICE_LANGUAGE, SERVICE_RANKING,
    SERVICE_VERSION, ServiceEvent, ServiceEventKind, ServiceId, ServiceRankingOrder,
    ServiceReference, ServiceSpec, TYPE_NAME_ERROR, best_of, language_clause,
    with_language_clause,
};
pub use ports::{
    CollectingDiagnostics, ComponentLifecycle, CoreError, DeliveryStatus, DependencyEngine,
    DependencyError, DependencyHandle, DependencyListener, DiagnosticSink, EngineError,
    NoopLifecycle, NoopLookup, PropertyError, RegistrationHandle, RegistrationLookup,
    TracingDiagnostics,
};
pub use services::{
    CallbackSlots, Callbacks, ComponentGate, DependencyContext, Dispatcher, GateGuard,
    ServiceDependency, Slot, interface_name_of, snapshot_properties,
};
pub use settings::{
    DEFAULT_LANGUAGE_TAG, Settings, SettingsError, SettingsUpdate, validate_settings,
};
