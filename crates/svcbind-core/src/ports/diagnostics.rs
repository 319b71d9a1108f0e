//! Non-fatal diagnostic channel.
//!
//! Configuration mistakes and dispatch failures are reported here instead of
//! being returned, so fluent configuration chains and event delivery keep
//! going.

use crate::ports::DependencyError;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Sink for errors that degrade behavior but must not abort it.
pub trait DiagnosticSink: Send + Sync {
    /// Report an error for the dependency labelled `dependency`.
    fn report(&self, dependency: &str, error: &DependencyError);
}

/// Default sink: logs through `tracing` at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&self, dependency: &str, error: &DependencyError) {
        warn!(dependency, %error, "Service dependency diagnostic");
    }
}

/// Sink that keeps every report, for tests and embedding hosts that surface
/// diagnostics themselves.
#[derive(Debug, Clone, Default)]
pub struct CollectingDiagnostics {
    reports: Arc<Mutex<Vec<(String, DependencyError)>>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// All reports so far, oldest first.
    pub fn reports(&self) -> Vec<(String, DependencyError)> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for CollectingDiagnostics {
    fn report(&self, dependency: &str, error: &DependencyError) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((dependency.to_string(), error.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_diagnostics_does_not_panic() {
        TracingDiagnostics.report(
            "Echo",
            &DependencyError::Configuration("bad filter".to_string()),
        );
    }

    #[test]
    fn test_collecting_diagnostics_shares_state_across_clones() {
        let sink = CollectingDiagnostics::new();
        let clone = sink.clone();
        clone.report("Echo", &DependencyError::InvalidState("set_filter"));

        assert_eq!(sink.len(), 1);
        let (dependency, error) = &sink.reports()[0];
        assert_eq!(dependency, "Echo");
        assert_eq!(error, &DependencyError::InvalidState("set_filter"));
    }

    #[test]
    fn test_arc_sink() {
        let sink: Arc<dyn DiagnosticSink> = Arc::new(TracingDiagnostics);
        sink.report("Echo", &DependencyError::Configuration("x".to_string()));
    }
}
