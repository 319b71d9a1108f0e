//! Callback dispatch.
//!
//! Every invocation gets a fresh [`PropertySnapshot`] copied out of the
//! registration at dispatch time and runs synchronously on the delivering
//! thread. A missing registration or a failed enumeration yields an empty
//! snapshot; delivering the signal matters more than its metadata.

use super::callbacks::Slot;
use crate::domain::{PropertySnapshot, ServiceReference};
use crate::ports::{DependencyError, DiagnosticSink, PropertyError, RegistrationLookup};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::trace;

/// Copy the properties behind `reference` into a detached snapshot.
///
/// `Ok(empty)` when there is no reference or it no longer resolves.
pub fn snapshot_properties(
    lookup: &dyn RegistrationLookup,
    reference: Option<&ServiceReference>,
) -> Result<PropertySnapshot, PropertyError> {
    let Some(reference) = reference else {
        return Ok(PropertySnapshot::empty());
    };
    let Some(registration) = lookup.registration(reference) else {
        trace!(service_id = %reference.service_id, "Registration gone, using empty snapshot");
        return Ok(PropertySnapshot::empty());
    };
    let pairs = lookup.properties(&registration)?;
    Ok(PropertySnapshot::from_pairs(pairs))
}

/// Invokes slots for one dependency.
pub struct Dispatcher<'a> {
    lookup: &'a dyn RegistrationLookup,
    diagnostics: &'a dyn DiagnosticSink,
    label: &'a str,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        lookup: &'a dyn RegistrationLookup,
        diagnostics: &'a dyn DiagnosticSink,
        label: &'a str,
    ) -> Self {
        Self {
            lookup,
            diagnostics,
            label,
        }
    }

    /// Build a snapshot, degrading to empty on enumeration failure.
    pub fn snapshot(&self, reference: Option<&ServiceReference>) -> PropertySnapshot {
        snapshot_properties(self.lookup, reference).unwrap_or_else(|err| {
            self.diagnostics
                .report(self.label, &DependencyError::PropertyEnumeration(err));
            PropertySnapshot::empty()
        })
    }

    /// Run `slot` with `provider` and a fresh snapshot of `reference`.
    ///
    /// A panic inside the slot is caught and reported; it never reaches the
    /// delivering engine.
    pub fn invoke<P>(
        &self,
        slot_name: &'static str,
        slot: &Slot<P>,
        reference: Option<&ServiceReference>,
        provider: Option<P>,
    ) {
        let snapshot = self.snapshot(reference);
        trace!(
            dependency = self.label,
            slot = slot_name,
            service_id = ?reference.map(|r| r.service_id),
            properties = snapshot.len(),
            "Invoking callback"
        );

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| slot(provider, snapshot))) {
            self.diagnostics.report(
                self.label,
                &DependencyError::CallbackPanicked {
                    slot: slot_name,
                    message: panic_message(payload.as_ref()),
                },
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
