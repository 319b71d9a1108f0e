//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define what the dependency core expects from the registry, from the
//! owning component and from the host's diagnostics. They contain no
//! implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No registry storage types in any signature
//! - Provider objects cross the boundary type-erased and are recovered by the
//!   typed dependency
//! - Nothing returned from a listener can fail the engine's delivery loop

pub mod component_lifecycle;
pub mod dependency_engine;
pub mod diagnostics;
pub mod registration_lookup;

use crate::domain::{ComposeError, ServiceId};
use thiserror::Error;

pub use component_lifecycle::{ComponentLifecycle, NoopLifecycle};
pub use dependency_engine::{
    DeliveryStatus, DependencyEngine, DependencyHandle, DependencyListener,
};
pub use diagnostics::{CollectingDiagnostics, DiagnosticSink, TracingDiagnostics};
pub use registration_lookup::{NoopLookup, RegistrationHandle, RegistrationLookup};

#[cfg(test)]
pub use dependency_engine::MockDependencyEngine;

/// Failures of the dependency engine itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine has not been initialized or was shut down.
    #[error("Engine unavailable: {0}")]
    Unavailable(String),

    /// The engine refused to allocate a dependency.
    #[error("Dependency creation failed: {0}")]
    CreationFailed(String),
}

/// Failures reading a registration's property table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// The registration is gone.
    #[error("Registration {0} is no longer registered")]
    Unregistered(ServiceId),

    /// The table could not be read.
    #[error("Property table unavailable: {0}")]
    Unavailable(String),
}

/// Errors a dependency reports through its diagnostic channel.
///
/// None of these abort anything: configuration errors fall back to a
/// best-effort value, invalid-state errors are absorbed, enumeration errors
/// degrade to an empty snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// Unusable interface name, filter layout or late reconfiguration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A mutator was called on a dependency that failed construction.
    #[error("Dependency is invalid, ignoring {0}")]
    InvalidState(&'static str),

    /// A registration's properties could not be copied.
    #[error(transparent)]
    PropertyEnumeration(#[from] PropertyError),

    /// A callback slot panicked; the event still counts as delivered.
    #[error("Callback '{slot}' panicked: {message}")]
    CallbackPanicked { slot: &'static str, message: String },

    /// The delivered provider is not of the dependency's provider type.
    #[error("Provider {service_id} is not a {expected}")]
    ProviderType {
        service_id: ServiceId,
        expected: &'static str,
    },

    /// The engine failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<ComposeError> for DependencyError {
    fn from(err: ComposeError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Core error type for semantic domain errors.
///
/// Adapters should map this to their own error types (CLI exit codes, etc.).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Settings(#[from] crate::settings::SettingsError),

    /// Settings file could not be parsed.
    #[error("Settings parse error: {0}")]
    SettingsParse(#[from] serde_json::Error),
}
