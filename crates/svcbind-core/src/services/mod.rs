//! Core services - dependency binding and callback dispatch.
//!
//! These orchestrate between the ports and the domain types. Nothing here
//! knows about a concrete registry.

mod binder;
mod callbacks;
mod component_gate;
mod context;
mod dependency;
mod dispatcher;

pub use callbacks::{CallbackSlots, Callbacks, Slot};
pub use component_gate::{ComponentGate, GateGuard};
pub use context::DependencyContext;
pub use dependency::{ServiceDependency, interface_name_of};
pub use dispatcher::{Dispatcher, snapshot_properties};
