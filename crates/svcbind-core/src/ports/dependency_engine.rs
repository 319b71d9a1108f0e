//! Dependency engine port.
//!
//! The engine is the registry-side half of a dependency: it stores what the
//! dependency asks for, matches providers against it and delivers
//! [`ServiceEvent`]s to the dependency's listener. It must deliver events for
//! one dependency in order and never concurrently with each other; events
//! for different dependencies may be delivered in parallel.

use crate::domain::{RebindStrategy, ServiceEvent, ServiceSpec};
use crate::ports::EngineError;
use std::fmt;
use std::sync::Arc;

/// Engine-assigned identifier of one dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencyHandle(pub u64);

impl fmt::Display for DependencyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dep#{}", self.0)
    }
}

/// Outcome of one delivery, for the engine's own bookkeeping and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// At least one callback slot ran.
    Delivered,
    /// Nothing was configured for this event, or it could not be used.
    Dropped,
}

/// Typed callback context registered with the engine for one dependency.
pub trait DependencyListener: Send + Sync {
    /// Handle one event on the engine's delivery thread.
    ///
    /// Must not propagate failures back into the engine.
    fn deliver(&self, event: &ServiceEvent) -> DeliveryStatus;
}

/// Operations a dependency needs from the registry.
#[cfg_attr(test, mockall::automock)]
pub trait DependencyEngine: Send + Sync {
    /// Allocate a new dependency.
    fn create_dependency(&self) -> Result<DependencyHandle, EngineError>;

    /// Forget a dependency; nothing further is queued for it.
    fn destroy_dependency(&self, handle: DependencyHandle);

    fn set_strategy(&self, handle: DependencyHandle, strategy: RebindStrategy);

    /// Replace the interface name, version range and filter to match against.
    fn set_service(&self, handle: DependencyHandle, spec: &ServiceSpec);

    fn set_required(&self, handle: DependencyHandle, required: bool);

    fn set_add_language_filter(&self, handle: DependencyHandle, enabled: bool);

    /// Install (or clear) the listener events are delivered to.
    fn set_listener(&self, handle: DependencyHandle, listener: Option<Arc<dyn DependencyListener>>);
}
