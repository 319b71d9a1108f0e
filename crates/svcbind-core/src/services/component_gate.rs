//! Suspendable entry gate for a component.
//!
//! A component wraps each unit of the work it provides in [`ComponentGate::enter`].
//! When a dependency rebinds under the suspend strategy, the gate stops
//! admitting new work, waits for the work in flight to drain, and reopens on
//! resume. Suspensions nest: the gate reopens when the last one resumes.
//!
//! A thread holding a [`GateGuard`] must not trigger a suspend of the same
//! gate, or it waits on itself.

use crate::ports::ComponentLifecycle;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use tracing::trace;

#[derive(Debug, Default)]
struct GateState {
    active: usize,
    suspended: usize,
}

/// [`ComponentLifecycle`] that drains and blocks the component's own work.
#[derive(Debug, Default)]
pub struct ComponentGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl ComponentGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, GateState>) -> MutexGuard<'a, GateState> {
        self.changed
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Enter the component, blocking while it is suspended.
    pub fn enter(&self) -> GateGuard<'_> {
        let mut state = self.state();
        while state.suspended > 0 {
            state = self.wait(state);
        }
        state.active += 1;
        GateGuard { gate: self }
    }

    /// Enter the component unless it is suspended right now.
    pub fn try_enter(&self) -> Option<GateGuard<'_>> {
        let mut state = self.state();
        if state.suspended > 0 {
            return None;
        }
        state.active += 1;
        Some(GateGuard { gate: self })
    }

    pub fn is_suspended(&self) -> bool {
        self.state().suspended > 0
    }

    /// Units of work currently inside the component.
    pub fn active(&self) -> usize {
        self.state().active
    }
}

impl ComponentLifecycle for ComponentGate {
    fn suspend(&self) {
        let mut state = self.state();
        state.suspended += 1;
        while state.active > 0 {
            state = self.wait(state);
        }
        trace!(depth = state.suspended, "Component suspended");
    }

    fn resume(&self) {
        let mut state = self.state();
        state.suspended = state.suspended.saturating_sub(1);
        if state.suspended == 0 {
            trace!("Component resumed");
            self.changed.notify_all();
        }
    }
}

/// Proof of being inside the component; leaving happens on drop.
#[derive(Debug)]
pub struct GateGuard<'a> {
    gate: &'a ComponentGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.gate.state();
        state.active -= 1;
        if state.active == 0 {
            self.gate.changed.notify_all();
        }
    }
}
