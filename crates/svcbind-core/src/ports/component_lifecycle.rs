//! Component lifecycle port used by the suspend strategy.

/// The part of a component's activation state machine a dependency needs.
///
/// `suspend` must return only once the component has stopped serving
/// (in-flight work drained, new work held back). Every `suspend` is paired
/// with exactly one `resume` on the same thread.
pub trait ComponentLifecycle: Send + Sync {
    fn suspend(&self);
    fn resume(&self);
}

/// Lifecycle for dependencies that are not attached to a running component.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLifecycle;

impl ComponentLifecycle for NoopLifecycle {
    fn suspend(&self) {}

    fn resume(&self) {}
}
