//! Registry-side state of one dependency.
//!
//! Each dependency owns a single lock guarding its configuration, the set of
//! registrations it currently matches and its mailbox of pending events.
//! Events are appended under that lock, so the mailbox order is the order in
//! which match changes were decided. Whichever thread appends to an idle
//! mailbox drains it, releasing the lock around every delivery; other
//! threads only append. That gives FIFO, one-at-a-time delivery per
//! dependency with no lock shared between dependencies.

use crate::filter::Filter;
use crate::version::{Version, VersionRange};
use std::collections::{BTreeMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use svcbind_core::{
    DependencyHandle, DependencyListener, Properties, ProviderObject, RebindStrategy,
    SERVICE_RANKING, SERVICE_VERSION, ServiceEvent, ServiceEventKind, ServiceId,
    ServiceReference, ServiceSpec,
};
use tracing::{error, trace};

/// Observer of every event appended to a dependency's mailbox, in order.
pub type EventTap = Arc<dyn Fn(DependencyHandle, &ServiceEvent) + Send + Sync>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One provider registration.
pub(crate) struct Registration {
    pub(crate) id: ServiceId,
    pub(crate) interface: String,
    pub(crate) provider: ProviderObject,
    properties: RwLock<Arc<Properties>>,
    /// Cleared once on unregister; read under dependency locks.
    live: AtomicBool,
}

impl Registration {
    pub(crate) fn new(
        id: ServiceId,
        interface: String,
        provider: ProviderObject,
        properties: Properties,
    ) -> Self {
        Self {
            id,
            interface,
            provider,
            properties: RwLock::new(Arc::new(properties)),
            live: AtomicBool::new(true),
        }
    }

    pub(crate) fn properties(&self) -> Arc<Properties> {
        self.properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn replace_properties(&self, properties: Properties) {
        *self
            .properties
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(properties);
    }

    pub(crate) fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Returns `false` if it was already retired.
    pub(crate) fn retire(&self) -> bool {
        self.live.swap(false, Ordering::AcqRel)
    }

    fn reference(&self, properties: &Properties) -> ServiceReference {
        let ranking = properties
            .get(SERVICE_RANKING)
            .and_then(|r| r.trim().parse().ok())
            .unwrap_or(0);
        ServiceReference::new(self.id).with_ranking(ranking)
    }

    fn event(&self, kind: ServiceEventKind, properties: &Properties) -> ServiceEvent {
        let reference = self.reference(properties);
        match kind {
            ServiceEventKind::Added => ServiceEvent::added(reference, self.provider.clone()),
            ServiceEventKind::Modified => ServiceEvent::modified(reference, self.provider.clone()),
            ServiceEventKind::Removed => ServiceEvent::removed(reference, self.provider.clone()),
        }
    }
}

/// What caused a registration to be re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trigger {
    Registered,
    PropertiesChanged,
    Unregistered,
    Refilter,
}

/// What a dependency asks for, parsed for matching.
#[derive(Debug, Clone, Default)]
pub(crate) struct DependencyConfig {
    pub(crate) spec: ServiceSpec,
    pub(crate) filter: Option<Filter>,
    pub(crate) range: Option<VersionRange>,
    /// Parse failure of the current service spec; nothing matches while set.
    pub(crate) spec_error: Option<String>,
    pub(crate) strategy: RebindStrategy,
    pub(crate) required: bool,
    pub(crate) add_language_filter: bool,
}

impl DependencyConfig {
    pub(crate) fn set_spec(&mut self, spec: &ServiceSpec) {
        self.spec = spec.clone();
        self.spec_error = None;
        self.filter = None;
        self.range = None;

        if let Some(filter) = spec.filter.as_deref() {
            match Filter::parse(filter) {
                Ok(parsed) => self.filter = Some(parsed),
                Err(err) => self.spec_error = Some(format!("filter '{filter}': {err}")),
            }
        }
        if let Some(range) = spec.version_range.as_deref() {
            match range.parse::<VersionRange>() {
                Ok(parsed) => self.range = Some(parsed),
                Err(err) => self.spec_error = Some(format!("version range '{range}': {err}")),
            }
        }
    }

    fn matches(&self, registration: &Registration, properties: &Properties) -> bool {
        if self.spec_error.is_some()
            || self.spec.interface_name.is_empty()
            || registration.interface != self.spec.interface_name
        {
            return false;
        }
        if let Some(range) = &self.range {
            let version = properties
                .get(SERVICE_VERSION)
                .and_then(|v| v.parse::<Version>().ok())
                .unwrap_or_default();
            if !range.contains(&version) {
                return false;
            }
        }
        self.filter.as_ref().is_none_or(|f| f.matches(properties))
    }
}

pub(crate) struct DependencyState {
    pub(crate) config: DependencyConfig,
    pub(crate) matched: BTreeMap<ServiceId, Arc<Registration>>,
    pub(crate) listener: Option<Arc<dyn DependencyListener>>,
    pending: VecDeque<ServiceEvent>,
    draining: bool,
    destroyed: bool,
}

pub(crate) struct DependencyEntry {
    pub(crate) handle: DependencyHandle,
    state: Mutex<DependencyState>,
    tap: Option<EventTap>,
}

impl DependencyEntry {
    pub(crate) fn new(handle: DependencyHandle, tap: Option<EventTap>) -> Self {
        Self {
            handle,
            state: Mutex::new(DependencyState {
                config: DependencyConfig {
                    required: true,
                    ..DependencyConfig::default()
                },
                matched: BTreeMap::new(),
                listener: None,
                pending: VecDeque::new(),
                draining: false,
                destroyed: false,
            }),
            tap,
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, DependencyState> {
        lock(&self.state)
    }

    /// Change configuration that does not affect matching.
    pub(crate) fn configure(&self, f: impl FnOnce(&mut DependencyConfig)) {
        f(&mut self.state().config);
    }

    /// Replace the service spec; returns the parse failure, if any.
    pub(crate) fn set_spec(&self, spec: &ServiceSpec) -> Option<String> {
        let mut state = self.state();
        state.config.set_spec(spec);
        state.config.spec_error.clone()
    }

    /// Re-evaluate one registration and deliver whatever that produced.
    pub(crate) fn update(&self, registration: &Arc<Registration>, trigger: Trigger) {
        let mut state = self.state();
        self.evaluate(&mut state, registration, trigger);
        self.drain(state);
    }

    /// Re-evaluate the given registrations plus everything currently matched.
    pub(crate) fn refilter(&self, candidates: Vec<Arc<Registration>>) {
        let mut state = self.state();
        let mut all: BTreeMap<ServiceId, Arc<Registration>> = state.matched.clone();
        all.extend(candidates.into_iter().map(|r| (r.id, r)));
        for registration in all.values() {
            self.evaluate(&mut state, registration, Trigger::Refilter);
        }
        self.drain(state);
    }

    /// Install, swap or clear the listener.
    ///
    /// A first listener receives `Added` for everything already matched.
    pub(crate) fn set_listener(&self, listener: Option<Arc<dyn DependencyListener>>) {
        let mut state = self.state();
        if state.destroyed {
            return;
        }
        let first = state.listener.is_none() && listener.is_some();
        state.listener = listener;

        if state.listener.is_none() {
            state.pending.clear();
            return;
        }
        if first {
            let matched: Vec<_> = state.matched.values().cloned().collect();
            for registration in matched {
                let event = registration.event(ServiceEventKind::Added, &registration.properties());
                self.enqueue(&mut state, event);
            }
        }
        self.drain(state);
    }

    pub(crate) fn destroy(&self) {
        let mut state = self.state();
        state.destroyed = true;
        state.listener = None;
        state.pending.clear();
        state.matched.clear();
    }

    fn evaluate(
        &self,
        state: &mut DependencyState,
        registration: &Arc<Registration>,
        trigger: Trigger,
    ) {
        if state.destroyed {
            return;
        }
        let properties = registration.properties();
        let now = registration.is_live() && state.config.matches(registration, &properties);
        let was = state.matched.contains_key(&registration.id);

        let kind = match (was, now) {
            (false, true) => {
                state.matched.insert(registration.id, registration.clone());
                ServiceEventKind::Added
            }
            (true, false) => {
                state.matched.remove(&registration.id);
                ServiceEventKind::Removed
            }
            (true, true) if trigger == Trigger::PropertiesChanged => ServiceEventKind::Modified,
            _ => return,
        };
        trace!(
            dependency = %self.handle,
            service_id = %registration.id,
            kind = %kind,
            ?trigger,
            "Match changed"
        );

        if state.listener.is_some() {
            let event = registration.event(kind, &properties);
            self.enqueue(state, event);
        }
    }

    fn enqueue(&self, state: &mut DependencyState, event: ServiceEvent) {
        if let Some(tap) = &self.tap {
            tap(self.handle, &event);
        }
        state.pending.push_back(event);
    }

    /// Deliver pending events unless another thread already is.
    fn drain<'a>(&'a self, mut state: MutexGuard<'a, DependencyState>) {
        if state.draining {
            return;
        }
        state.draining = true;
        loop {
            let next = state.pending.pop_front();
            let listener = state.listener.clone();
            let (Some(event), Some(listener)) = (next, listener) else {
                state.draining = false;
                return;
            };
            drop(state);

            let delivered = catch_unwind(AssertUnwindSafe(|| listener.deliver(&event)));
            match delivered {
                Ok(status) => trace!(
                    dependency = %self.handle,
                    service_id = %event.reference.service_id,
                    kind = %event.kind,
                    ?status,
                    "Event delivered"
                ),
                Err(_) => error!(
                    dependency = %self.handle,
                    service_id = %event.reference.service_id,
                    "Listener panicked, event discarded"
                ),
            }

            state = self.state();
        }
    }
}
