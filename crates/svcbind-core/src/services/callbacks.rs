//! Callback configuration for a dependency.
//!
//! However the callbacks are supplied (a single "set" callback, an add/remove
//! pair, with or without properties, or bound to a component instance), they
//! normalize to the same three optional slots. Each slot receives the
//! provider (absent only for an unbinding "set") and a property snapshot.

use crate::domain::PropertySnapshot;
use std::fmt;
use std::sync::{Arc, Weak};

/// One normalized callback slot.
pub type Slot<P> = Arc<dyn Fn(Option<P>, PropertySnapshot) + Send + Sync>;

/// The three slots a dependency dispatches to.
pub struct CallbackSlots<P> {
    /// Called with the current best match whenever it changes, `None` when
    /// the last match disappears.
    pub on_set: Option<Slot<P>>,
    /// Called for every provider that starts matching.
    pub on_add: Option<Slot<P>>,
    /// Called for every provider that stops matching.
    pub on_remove: Option<Slot<P>>,
}

impl<P> Default for CallbackSlots<P> {
    fn default() -> Self {
        Self {
            on_set: None,
            on_add: None,
            on_remove: None,
        }
    }
}

impl<P> Clone for CallbackSlots<P> {
    fn clone(&self) -> Self {
        Self {
            on_set: self.on_set.clone(),
            on_add: self.on_add.clone(),
            on_remove: self.on_remove.clone(),
        }
    }
}

impl<P> fmt::Debug for CallbackSlots<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSlots")
            .field("on_set", &self.on_set.is_some())
            .field("on_add", &self.on_add.is_some())
            .field("on_remove", &self.on_remove.is_some())
            .finish()
    }
}

/// Callback configuration accepted by
/// [`ServiceDependency::set_callbacks`](super::ServiceDependency::set_callbacks).
///
/// Setting callbacks again replaces all three slots.
///
/// # Example
///
/// ```ignore
/// dep.set_callbacks(Callbacks::on_add_remove(
///     |echo: Arc<dyn Echo>| println!("added {}", echo.name()),
///     |echo: Arc<dyn Echo>| println!("removed {}", echo.name()),
/// ));
/// ```
pub struct Callbacks<P> {
    slots: CallbackSlots<P>,
}

impl<P> Clone for Callbacks<P> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
        }
    }
}

impl<P> fmt::Debug for Callbacks<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callbacks").field(&self.slots).finish()
    }
}

impl<P: Send + Sync + 'static> Callbacks<P> {
    /// Use already-normalized slots.
    pub const fn from_slots(slots: CallbackSlots<P>) -> Self {
        Self { slots }
    }

    /// Track the best match only.
    pub fn on_set<F>(set: F) -> Self
    where
        F: Fn(Option<P>) + Send + Sync + 'static,
    {
        Self::on_set_with_properties(move |provider, _props| set(provider))
    }

    /// Track the best match only, with its properties.
    pub fn on_set_with_properties<F>(set: F) -> Self
    where
        F: Fn(Option<P>, PropertySnapshot) + Send + Sync + 'static,
    {
        Self {
            slots: CallbackSlots {
                on_set: Some(Arc::new(set)),
                ..CallbackSlots::default()
            },
        }
    }

    /// Observe every matching provider as it appears and disappears.
    pub fn on_add_remove<A, R>(add: A, remove: R) -> Self
    where
        A: Fn(P) + Send + Sync + 'static,
        R: Fn(P) + Send + Sync + 'static,
    {
        Self::on_add_remove_with_properties(
            move |provider, _props| add(provider),
            move |provider, _props| remove(provider),
        )
    }

    /// Observe every matching provider with its properties.
    pub fn on_add_remove_with_properties<A, R>(add: A, remove: R) -> Self
    where
        A: Fn(P, PropertySnapshot) + Send + Sync + 'static,
        R: Fn(P, PropertySnapshot) + Send + Sync + 'static,
    {
        Self {
            slots: CallbackSlots {
                on_set: None,
                on_add: Some(present(add)),
                on_remove: Some(present(remove)),
            },
        }
    }

    /// Bind a component method as the set callback.
    ///
    /// The component is held weakly, so a dependency owned by its component
    /// does not keep it alive; once the component is dropped the slot does
    /// nothing.
    pub fn bound_set<C>(component: &Arc<C>, set: fn(&C, Option<P>)) -> Self
    where
        C: Send + Sync + 'static,
    {
        let weak = Arc::downgrade(component);
        Self::on_set(move |provider| with_component(&weak, |c| set(c, provider)))
    }

    /// Bind a component method taking properties as the set callback.
    pub fn bound_set_with_properties<C>(
        component: &Arc<C>,
        set: fn(&C, Option<P>, PropertySnapshot),
    ) -> Self
    where
        C: Send + Sync + 'static,
    {
        let weak = Arc::downgrade(component);
        Self::on_set_with_properties(move |provider, props| {
            with_component(&weak, |c| set(c, provider, props));
        })
    }

    /// Bind component methods as add/remove callbacks.
    pub fn bound_add_remove<C>(component: &Arc<C>, add: fn(&C, P), remove: fn(&C, P)) -> Self
    where
        C: Send + Sync + 'static,
    {
        let add_ref = Arc::downgrade(component);
        let remove_ref = Arc::downgrade(component);
        Self::on_add_remove(
            move |provider| with_component(&add_ref, |c| add(c, provider)),
            move |provider| with_component(&remove_ref, |c| remove(c, provider)),
        )
    }

    /// Bind component methods taking properties as add/remove callbacks.
    pub fn bound_add_remove_with_properties<C>(
        component: &Arc<C>,
        add: fn(&C, P, PropertySnapshot),
        remove: fn(&C, P, PropertySnapshot),
    ) -> Self
    where
        C: Send + Sync + 'static,
    {
        let add_ref = Arc::downgrade(component);
        let remove_ref = Arc::downgrade(component);
        Self::on_add_remove_with_properties(
            move |provider, props| with_component(&add_ref, |c| add(c, provider, props)),
            move |provider, props| with_component(&remove_ref, |c| remove(c, provider, props)),
        )
    }

    pub fn into_slots(self) -> CallbackSlots<P> {
        self.slots
    }
}

/// Adapt a callback that always expects a provider to the slot shape.
fn present<P, F>(f: F) -> Slot<P>
where
    F: Fn(P, PropertySnapshot) + Send + Sync + 'static,
{
    Arc::new(move |provider: Option<P>, props| {
        if let Some(provider) = provider {
            f(provider, props);
        }
    })
}

fn with_component<C>(weak: &Weak<C>, f: impl FnOnce(&C)) {
    if let Some(component) = weak.upgrade() {
        f(&component);
    }
}
