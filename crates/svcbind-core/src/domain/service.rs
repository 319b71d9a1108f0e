//! Service references and registry events.
//!
//! These are the values that cross the boundary between the registry and a
//! dependency. The provider object is type-erased on the registry side and
//! recovered to the dependency's concrete provider type on delivery.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased provider object as stored by the registry.
pub type ProviderObject = Arc<dyn Any + Send + Sync>;

/// Registry-assigned identifier of one provider registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceId(pub u64);

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a registration, as seen by a dependency at event time.
///
/// The ranking is the value observed when the event was produced; a later
/// ranking change arrives as a separate modified event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceReference {
    /// Registration the reference points to.
    pub service_id: ServiceId,
    /// Ranking at event time (higher is preferred).
    pub ranking: i64,
}

impl ServiceReference {
    /// Create a reference with the default ranking of zero.
    pub const fn new(service_id: ServiceId) -> Self {
        Self {
            service_id,
            ranking: 0,
        }
    }

    /// Set the ranking.
    #[must_use]
    pub const fn with_ranking(mut self, ranking: i64) -> Self {
        self.ranking = ranking;
        self
    }
}

/// What happened to a matching provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceEventKind {
    /// A provider started matching the dependency.
    Added,
    /// A matching provider changed its properties and still matches.
    Modified,
    /// A provider stopped matching or was unregistered.
    Removed,
}

impl ServiceEventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for ServiceEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One notification delivered by the registry to a dependency.
#[derive(Clone)]
pub struct ServiceEvent {
    pub kind: ServiceEventKind,
    pub reference: ServiceReference,
    pub provider: ProviderObject,
}

impl ServiceEvent {
    pub fn added(reference: ServiceReference, provider: ProviderObject) -> Self {
        Self {
            kind: ServiceEventKind::Added,
            reference,
            provider,
        }
    }

    pub fn modified(reference: ServiceReference, provider: ProviderObject) -> Self {
        Self {
            kind: ServiceEventKind::Modified,
            reference,
            provider,
        }
    }

    pub fn removed(reference: ServiceReference, provider: ProviderObject) -> Self {
        Self {
            kind: ServiceEventKind::Removed,
            reference,
            provider,
        }
    }

    /// Recover the provider as a concrete type.
    pub fn provider_as<P>(&self) -> Option<P>
    where
        P: Clone + 'static,
    {
        self.provider.downcast_ref::<P>().cloned()
    }
}

impl fmt::Debug for ServiceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEvent")
            .field("kind", &self.kind)
            .field("reference", &self.reference)
            .finish_non_exhaustive()
    }
}
