//! Registration introspection port.
//!
//! Used at dispatch time to copy a provider's live properties into a
//! snapshot. The lookup never hands out the live table itself.

use crate::domain::{ServiceId, ServiceReference};
use crate::ports::PropertyError;

/// Handle to a live registration resolved from a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationHandle(pub ServiceId);

/// Resolves references and enumerates registration properties.
pub trait RegistrationLookup: Send + Sync {
    /// Resolve a reference; `None` once the registration is gone.
    fn registration(&self, reference: &ServiceReference) -> Option<RegistrationHandle>;

    /// Copy out the registration's properties, in unspecified order.
    fn properties(
        &self,
        registration: &RegistrationHandle,
    ) -> Result<Vec<(String, String)>, PropertyError>;
}

/// Lookup that resolves nothing; every snapshot is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLookup;

impl RegistrationLookup for NoopLookup {
    fn registration(&self, _reference: &ServiceReference) -> Option<RegistrationHandle> {
        None
    }

    fn properties(
        &self,
        registration: &RegistrationHandle,
    ) -> Result<Vec<(String, String)>, PropertyError> {
        Err(PropertyError::Unregistered(registration.0))
    }
}
