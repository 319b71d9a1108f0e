//! Rebinding of one dependency.
//!
//! The binder is the listener a dependency registers with the engine. For
//! every event it updates the set of tracked providers, works out whether the
//! best match changes, and then applies the swap and runs the callbacks under
//! the dependency's [`RebindStrategy`]:
//!
//! - **Suspend**: the owning component is suspended before the swap and
//!   resumed after the last callback of the event. Events that neither swap
//!   the bound provider nor run a callback open no suspend window.
//! - **Locking**: swap and callbacks run inside the binder's rebind lock.
//!
//! Within one event the order is always remove, add, set, so the removal of
//! a previous best match is seen before its replacement is bound.

use super::callbacks::CallbackSlots;
use super::dispatcher::Dispatcher;
use crate::domain::{
    ProviderRanking, RebindStrategy, ServiceEvent, ServiceEventKind, ServiceId, ServiceReference,
    best_of,
};
use crate::ports::{
    ComponentLifecycle, DeliveryStatus, DependencyError, DependencyListener, DiagnosticSink,
    RegistrationLookup,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, trace};

/// A provider the dependency currently matches.
#[derive(Clone)]
struct Tracked<P> {
    reference: ServiceReference,
    provider: P,
}

struct BindingState<P> {
    tracked: Vec<Tracked<P>>,
    current: Option<Tracked<P>>,
}

impl<P: Clone> BindingState<P> {
    fn position(&self, id: ServiceId) -> Option<usize> {
        self.tracked
            .iter()
            .position(|t| t.reference.service_id == id)
    }

    /// Fold one event into the tracked set and work out what it means for
    /// the binding. `current` is left untouched; the caller swaps it.
    fn track(
        &mut self,
        kind: ServiceEventKind,
        reference: ServiceReference,
        provider: P,
        ranking: &dyn ProviderRanking,
    ) -> Transition<P> {
        let mut transition = Transition::default();
        let entry = Tracked {
            reference,
            provider,
        };

        match (kind, self.position(reference.service_id)) {
            (ServiceEventKind::Added | ServiceEventKind::Modified, Some(index)) => {
                self.tracked[index] = entry;
            }
            (ServiceEventKind::Added | ServiceEventKind::Modified, None) => {
                self.tracked.push(entry.clone());
                transition.added = Some(entry);
            }
            (ServiceEventKind::Removed, Some(index)) => {
                transition.removed = Some(self.tracked.remove(index));
            }
            (ServiceEventKind::Removed, None) => {}
        }

        let best = best_of(ranking, self.tracked.iter().map(|t| &t.reference))
            .map(|r| r.service_id)
            .and_then(|id| self.position(id))
            .map(|index| self.tracked[index].clone());

        let current_id = self.current.as_ref().map(|t| t.reference.service_id);
        let best_id = best.as_ref().map(|t| t.reference.service_id);
        if current_id != best_id {
            transition.rebind = Some(best);
        }
        transition
    }
}

/// What one event changes.
struct Transition<P> {
    removed: Option<Tracked<P>>,
    added: Option<Tracked<P>>,
    /// `Some(next)` when the best match changes; `Some(None)` unbinds.
    rebind: Option<Option<Tracked<P>>>,
}

impl<P> Default for Transition<P> {
    fn default() -> Self {
        Self {
            removed: None,
            added: None,
            rebind: None,
        }
    }
}

impl<P> Transition<P> {
    /// Whether any configured slot runs for this transition.
    fn fires(&self, slots: &CallbackSlots<P>) -> bool {
        (self.removed.is_some() && slots.on_remove.is_some())
            || (self.added.is_some() && slots.on_add.is_some())
            || (self.rebind.is_some() && slots.on_set.is_some())
    }
}

/// Keeps the owning component suspended while alive.
///
/// Resumes on drop, so a panic between suspend and resume cannot leave the
/// component suspended.
struct SuspendGuard<'a> {
    component: &'a dyn ComponentLifecycle,
}

impl<'a> SuspendGuard<'a> {
    fn new(component: &'a dyn ComponentLifecycle) -> Self {
        component.suspend();
        Self { component }
    }
}

impl Drop for SuspendGuard<'_> {
    fn drop(&mut self) {
        self.component.resume();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Listener side of a typed dependency.
pub(crate) struct Binder<P> {
    label: RwLock<Arc<str>>,
    strategy: Mutex<RebindStrategy>,
    bound: AtomicBool,
    slots: RwLock<CallbackSlots<P>>,
    state: Mutex<BindingState<P>>,
    rebind_lock: Mutex<()>,
    component: Arc<dyn ComponentLifecycle>,
    ranking: Arc<dyn ProviderRanking>,
    lookup: Arc<dyn RegistrationLookup>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl<P> Binder<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        label: &str,
        strategy: RebindStrategy,
        component: Arc<dyn ComponentLifecycle>,
        ranking: Arc<dyn ProviderRanking>,
        lookup: Arc<dyn RegistrationLookup>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            label: RwLock::new(Arc::from(label)),
            strategy: Mutex::new(strategy),
            bound: AtomicBool::new(false),
            slots: RwLock::new(CallbackSlots::default()),
            state: Mutex::new(BindingState {
                tracked: Vec::new(),
                current: None,
            }),
            rebind_lock: Mutex::new(()),
            component,
            ranking,
            lookup,
            diagnostics,
        }
    }

    pub(crate) fn label(&self) -> Arc<str> {
        self.label
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_label(&self, label: &str) {
        *self.label.write().unwrap_or_else(PoisonError::into_inner) = Arc::from(label);
    }

    pub(crate) fn strategy(&self) -> RebindStrategy {
        *lock(&self.strategy)
    }

    /// Whether any event has been delivered yet.
    pub(crate) fn is_bound(&self) -> bool {
        self.bound.load(Ordering::Acquire)
    }

    /// Change the strategy; refused once events have started flowing.
    pub(crate) fn try_set_strategy(&self, strategy: RebindStrategy) -> Result<(), DependencyError> {
        let mut current = lock(&self.strategy);
        if *current == strategy {
            return Ok(());
        }
        if self.is_bound() {
            return Err(DependencyError::Configuration(format!(
                "cannot change rebind strategy from {current} to {strategy} after the dependency is bound"
            )));
        }
        *current = strategy;
        Ok(())
    }

    pub(crate) fn replace_slots(&self, slots: CallbackSlots<P>) {
        *self.slots.write().unwrap_or_else(PoisonError::into_inner) = slots;
    }

    pub(crate) fn current(&self) -> Option<P> {
        lock(&self.state)
            .current
            .as_ref()
            .map(|t| t.provider.clone())
    }

    pub(crate) fn tracked_count(&self) -> usize {
        lock(&self.state).tracked.len()
    }

    fn apply(&self, event: &ServiceEvent, provider: P, strategy: RebindStrategy) -> DeliveryStatus {
        let slots = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let transition =
            lock(&self.state).track(event.kind, event.reference, provider, &*self.ranking);
        let fires = transition.fires(&slots);

        let _suspended = ((fires || transition.rebind.is_some())
            && strategy == RebindStrategy::Suspend)
            .then(|| SuspendGuard::new(&*self.component));

        if let Some(next) = &transition.rebind {
            let mut state = lock(&self.state);
            debug!(
                dependency = %self.label(),
                from = ?state.current.as_ref().map(|t| t.reference.service_id),
                to = ?next.as_ref().map(|t| t.reference.service_id),
                %strategy,
                "Rebinding dependency"
            );
            state.current.clone_from(next);
        }

        if !fires {
            trace!(dependency = %self.label(), kind = %event.kind, "No callback configured, event dropped");
            return DeliveryStatus::Dropped;
        }

        let label = self.label();
        let dispatcher = Dispatcher::new(&*self.lookup, &*self.diagnostics, &label);
        if let (Some(removed), Some(slot)) = (transition.removed, &slots.on_remove) {
            dispatcher.invoke("remove", slot, Some(&removed.reference), Some(removed.provider));
        }
        if let (Some(added), Some(slot)) = (transition.added, &slots.on_add) {
            dispatcher.invoke("add", slot, Some(&added.reference), Some(added.provider));
        }
        if let (Some(next), Some(slot)) = (transition.rebind, &slots.on_set) {
            match next {
                Some(best) => dispatcher.invoke("set", slot, Some(&best.reference), Some(best.provider)),
                None => dispatcher.invoke("set", slot, None, None),
            }
        }
        DeliveryStatus::Delivered
    }
}

impl<P> DependencyListener for Binder<P>
where
    P: Clone + Send + Sync + 'static,
{
    fn deliver(&self, event: &ServiceEvent) -> DeliveryStatus {
        let Some(provider) = event.provider_as::<P>() else {
            self.diagnostics.report(
                &self.label(),
                &DependencyError::ProviderType {
                    service_id: event.reference.service_id,
                    expected: std::any::type_name::<P>(),
                },
            );
            return DeliveryStatus::Dropped;
        };

        self.bound.store(true, Ordering::Release);
        match self.strategy() {
            RebindStrategy::Locking => {
                let _section = lock(&self.rebind_lock);
                self.apply(event, provider, RebindStrategy::Locking)
            }
            RebindStrategy::Suspend => self.apply(event, provider, RebindStrategy::Suspend),
        }
    }
}
