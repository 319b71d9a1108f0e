//! Reference service registry for svcbind.
//!
//! Holds provider registrations, matches them against dependencies using
//! LDAP-style filters and version ranges, and delivers add/modify/remove
//! events to each dependency in order.
#![deny(unused_crate_dependencies)]

mod entry;
pub mod filter;
mod registry;
pub mod version;

pub use entry::EventTap;
pub use filter::{Filter, FilterParseError, MAX_FILTER_DEPTH, SubstringPattern};
pub use registry::{
    DependencyInfo, OBJECT_CLASS, RegistryError, ServiceRegistration, ServiceRegistry,
};
pub use version::{Bound, Version, VersionParseError, VersionRange};
