//! In-memory service registry.
//!
//! `ServiceRegistry` holds provider registrations and implements both
//! [`DependencyEngine`] and [`RegistrationLookup`], so a
//! [`DependencyContext`] built from it binds dependencies to the providers
//! registered here.
//!
//! Registry tables are only locked long enough to copy handles out; match
//! evaluation and delivery happen under the individual dependency's lock
//! (see [`crate::entry`]).

use crate::entry::{DependencyEntry, EventTap, Registration, Trigger};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use svcbind_core::{
    DependencyContext, DependencyEngine, DependencyHandle, DependencyListener, EngineError,
    Properties, PropertyError, RebindStrategy, RegistrationHandle, RegistrationLookup, SERVICE_ID,
    ServiceId, ServiceReference, ServiceSpec, interface_name_of,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Property naming the interface a provider was registered under.
pub const OBJECT_CLASS: &str = "objectClass";

/// Registry operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Service {0} is not registered")]
    UnknownService(ServiceId),
}

/// Receipt for one registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRegistration {
    id: ServiceId,
    interface: String,
}

impl ServiceRegistration {
    pub const fn id(&self) -> ServiceId {
        self.id
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

/// Point-in-time view of one dependency, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyInfo {
    pub handle: DependencyHandle,
    pub spec: ServiceSpec,
    pub strategy: RebindStrategy,
    pub required: bool,
    pub add_language_filter: bool,
    pub has_listener: bool,
    /// Registrations currently matching, by id.
    pub matched: Vec<ServiceId>,
    /// Why the current service spec matches nothing, if it failed to parse.
    pub spec_error: Option<String>,
}

/// Provider registrations plus the dependencies matched against them.
pub struct ServiceRegistry {
    registrations: RwLock<BTreeMap<ServiceId, Arc<Registration>>>,
    dependencies: RwLock<BTreeMap<DependencyHandle, Arc<DependencyEntry>>>,
    next_service_id: AtomicU64,
    next_handle: AtomicU64,
    tap: Option<EventTap>,
    closed: AtomicBool,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            registrations: RwLock::new(BTreeMap::new()),
            dependencies: RwLock::new(BTreeMap::new()),
            next_service_id: AtomicU64::new(1),
            next_handle: AtomicU64::new(1),
            tap: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Observe every event as it is queued for a dependency.
    ///
    /// The tap runs under the dependency's lock, in queue order, and must
    /// not call back into the registry.
    pub fn with_event_tap(mut self, tap: EventTap) -> Self {
        self.tap = Some(tap);
        self
    }

    /// A context whose dependencies bind against this registry.
    pub fn context(self: &Arc<Self>) -> DependencyContext {
        let engine: Arc<dyn DependencyEngine> = self.clone();
        let lookup: Arc<dyn RegistrationLookup> = self.clone();
        DependencyContext::new(engine, lookup)
    }

    /// Register `provider` under `interface`.
    ///
    /// `service.id` and `objectClass` are assigned by the registry;
    /// `service.ranking` and `service.version` are read from `properties`.
    pub fn register<P>(
        &self,
        interface: &str,
        provider: P,
        properties: Properties,
    ) -> ServiceRegistration
    where
        P: Send + Sync + 'static,
    {
        let id = ServiceId(self.next_service_id.fetch_add(1, Ordering::Relaxed));
        let registration = Arc::new(Registration::new(
            id,
            interface.to_string(),
            Arc::new(provider),
            stamped(properties, id, interface),
        ));
        self.registrations_mut().insert(id, registration.clone());
        debug!(service_id = %id, interface, "Service registered");

        for entry in self.entries() {
            entry.update(&registration, Trigger::Registered);
        }
        ServiceRegistration {
            id,
            interface: interface.to_string(),
        }
    }

    /// Register under the interface name inferred from `P`.
    pub fn register_provider<P>(&self, provider: P, properties: Properties) -> ServiceRegistration
    where
        P: Send + Sync + 'static,
    {
        self.register(&interface_name_of::<P>(), provider, properties)
    }

    /// Replace a registration's properties.
    ///
    /// Dependencies that keep matching see `Modified`; ones that start or
    /// stop matching see `Added` or `Removed`.
    pub fn set_properties(&self, id: ServiceId, properties: Properties) -> Result<(), RegistryError> {
        let registration = self
            .find(id)
            .filter(|r| r.is_live())
            .ok_or(RegistryError::UnknownService(id))?;
        registration.replace_properties(stamped(properties, id, &registration.interface));
        debug!(service_id = %id, "Service properties changed");

        for entry in self.entries() {
            entry.update(&registration, Trigger::PropertiesChanged);
        }
        Ok(())
    }

    /// Withdraw a registration.
    ///
    /// Matching dependencies are told before the registration leaves the
    /// table, so removal callbacks can still read its properties.
    pub fn unregister(&self, id: ServiceId) -> Result<(), RegistryError> {
        let registration = self.find(id).ok_or(RegistryError::UnknownService(id))?;
        if !registration.retire() {
            return Err(RegistryError::UnknownService(id));
        }

        for entry in self.entries() {
            entry.update(&registration, Trigger::Unregistered);
        }
        self.registrations_mut().remove(&id);
        debug!(service_id = %id, "Service unregistered");
        Ok(())
    }

    /// Copy of a registration's current properties.
    pub fn properties_of(&self, id: ServiceId) -> Option<Properties> {
        self.find(id).map(|r| (*r.properties()).clone())
    }

    pub fn registration_count(&self) -> usize {
        self.registrations().len()
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies().len()
    }

    pub fn dependency_info(&self, handle: DependencyHandle) -> Option<DependencyInfo> {
        let entry = self.entry(handle)?;
        let state = entry.state();
        let info = DependencyInfo {
            handle,
            spec: state.config.spec.clone(),
            strategy: state.config.strategy,
            required: state.config.required,
            add_language_filter: state.config.add_language_filter,
            has_listener: state.listener.is_some(),
            matched: state.matched.keys().copied().collect(),
            spec_error: state.config.spec_error.clone(),
        };
        Some(info)
    }

    /// Refuse new dependencies from now on.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(
                registrations = self.registration_count(),
                dependencies = self.dependency_count(),
                "Service registry closed"
            );
        }
    }

    fn registrations(&self) -> RwLockReadGuard<'_, BTreeMap<ServiceId, Arc<Registration>>> {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn registrations_mut(&self) -> RwLockWriteGuard<'_, BTreeMap<ServiceId, Arc<Registration>>> {
        self.registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn dependencies(&self) -> RwLockReadGuard<'_, BTreeMap<DependencyHandle, Arc<DependencyEntry>>> {
        self.dependencies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn find(&self, id: ServiceId) -> Option<Arc<Registration>> {
        self.registrations().get(&id).cloned()
    }

    fn entry(&self, handle: DependencyHandle) -> Option<Arc<DependencyEntry>> {
        let entry = self.dependencies().get(&handle).cloned();
        if entry.is_none() {
            debug!(dependency = %handle, "Unknown dependency handle");
        }
        entry
    }

    /// Snapshot of all dependencies, taken without holding the table lock
    /// during evaluation.
    fn entries(&self) -> Vec<Arc<DependencyEntry>> {
        self.dependencies().values().cloned().collect()
    }
}

/// Overlay the registry-owned properties.
fn stamped(mut properties: Properties, id: ServiceId, interface: &str) -> Properties {
    properties.insert(SERVICE_ID.to_string(), id.0.to_string());
    properties.insert(OBJECT_CLASS.to_string(), interface.to_string());
    properties
}

impl DependencyEngine for ServiceRegistry {
    fn create_dependency(&self) -> Result<DependencyHandle, EngineError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngineError::Unavailable("service registry is closed".to_string()));
        }
        let handle = DependencyHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.dependencies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle, Arc::new(DependencyEntry::new(handle, self.tap.clone())));
        debug!(dependency = %handle, "Dependency created");
        Ok(handle)
    }

    fn destroy_dependency(&self, handle: DependencyHandle) {
        let removed = self
            .dependencies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle);
        if let Some(entry) = removed {
            entry.destroy();
            debug!(dependency = %handle, "Dependency destroyed");
        }
    }

    fn set_strategy(&self, handle: DependencyHandle, strategy: RebindStrategy) {
        if let Some(entry) = self.entry(handle) {
            entry.configure(|config| config.strategy = strategy);
        }
    }

    fn set_service(&self, handle: DependencyHandle, spec: &ServiceSpec) {
        let Some(entry) = self.entry(handle) else {
            return;
        };
        // The spec must be in place before the snapshot below, so that a
        // concurrent registration missing from the snapshot evaluates
        // against the new spec itself.
        if let Some(error) = entry.set_spec(spec) {
            warn!(dependency = %handle, %error, "Dependency spec rejected, nothing will match");
        }
        let candidates: Vec<_> = self.registrations().values().cloned().collect();
        entry.refilter(candidates);
    }

    fn set_required(&self, handle: DependencyHandle, required: bool) {
        if let Some(entry) = self.entry(handle) {
            entry.configure(|config| config.required = required);
        }
    }

    fn set_add_language_filter(&self, handle: DependencyHandle, enabled: bool) {
        if let Some(entry) = self.entry(handle) {
            entry.configure(|config| config.add_language_filter = enabled);
        }
    }

    fn set_listener(&self, handle: DependencyHandle, listener: Option<Arc<dyn DependencyListener>>) {
        if let Some(entry) = self.entry(handle) {
            entry.set_listener(listener);
        }
    }
}

impl RegistrationLookup for ServiceRegistry {
    fn registration(&self, reference: &ServiceReference) -> Option<RegistrationHandle> {
        self.registrations()
            .contains_key(&reference.service_id)
            .then_some(RegistrationHandle(reference.service_id))
    }

    fn properties(&self, handle: &RegistrationHandle) -> Result<Vec<(String, String)>, PropertyError> {
        let registration = self
            .find(handle.0)
            .ok_or(PropertyError::Unregistered(handle.0))?;
        Ok(registration
            .properties()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
