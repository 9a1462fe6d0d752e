#![forbid(unsafe_code)]

//! Selector subscriptions: derived values with change detection.
//!
//! # Design
//!
//! A [`Selection<T, S>`] pairs one listener identity with a selector
//! `Fn(&T) -> S` and the last accepted derived value. It registers exactly
//! one listener for its whole lifetime. The selector and the consumer's
//! change hook live in cells inside a stable shared record, so replacing
//! either never re-registers and the registry always calls the latest logic
//! under the same id.
//!
//! On every notification the selector runs against the new store value and
//! the candidate is compared to the held value with `PartialEq`. Derived
//! `PartialEq` is structural, so a selector that builds a fresh `Vec` or
//! struct with the same contents does not signal a change.
//!
//! # Invariants
//!
//! 1. The held value equals `selector(v)` for the latest store value `v`
//!    that produced a change (or the value at subscription time).
//! 2. `changes()` increments exactly once per accepted change.
//! 3. After [`unsubscribe`](Selection::unsubscribe) or drop, the selector
//!    and hook are never invoked by the store again.
//!
//! # Failure Modes
//!
//! - **Impure selector**: results that depend on state outside the store
//!   are only re-evaluated on store mutations, so they can go stale.
//! - **Panicking selector or hook**: handled by the store's
//!   [`FailurePolicy`](crate::FailurePolicy); the held value is left as it
//!   was before the failing evaluation.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::id::ListenerId;
use crate::store::{Store, StoreInner};

type SelectorFn<T, S> = Rc<dyn Fn(&T) -> S>;
type ChangeHook<S> = Rc<dyn Fn(&S)>;

struct SelectionState<T, S> {
    selector: RefCell<SelectorFn<T, S>>,
    current: RefCell<S>,
    changes: Cell<u64>,
    dirty: Cell<bool>,
    on_change: RefCell<Option<ChangeHook<S>>>,
}

impl<T, S: Clone + PartialEq> SelectionState<T, S> {
    fn derive(&self, value: &T) -> S {
        let selector = self.selector.borrow().clone();
        selector(value)
    }

    /// Store `candidate` if it differs from the held value and fire the
    /// change hook. Returns whether it changed.
    fn accept(&self, candidate: S) -> bool {
        {
            let mut current = self.current.borrow_mut();
            if *current == candidate {
                return false;
            }
            *current = candidate;
        }
        self.changes.set(self.changes.get() + 1);
        self.dirty.set(true);

        let hook = self.on_change.borrow().clone();
        if let Some(hook) = hook {
            let value = self.current.borrow().clone();
            hook(&value);
        }
        true
    }
}

/// A consumer's view of a store through a selector.
///
/// Created by [`Store::select`]. Dropping it unsubscribes.
pub struct Selection<T, S> {
    id: ListenerId,
    state: Rc<SelectionState<T, S>>,
    store: Weak<StoreInner<T>>,
    active: bool,
}

impl<T, S: fmt::Debug> fmt::Debug for Selection<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("id", &self.id)
            .field("current", &*self.state.current.borrow())
            .field("changes", &self.state.changes.get())
            .field("active", &self.active)
            .finish()
    }
}

impl<T, S> Selection<T, S>
where
    T: Clone + 'static,
    S: Clone + PartialEq + 'static,
{
    pub(crate) fn attach(store: &Store<T>, selector: impl Fn(&T) -> S + 'static) -> Self {
        let selector: SelectorFn<T, S> = Rc::new(selector);
        let initial = store.with(|value| selector(value));
        let state = Rc::new(SelectionState {
            selector: RefCell::new(selector),
            current: RefCell::new(initial),
            changes: Cell::new(0),
            dirty: Cell::new(false),
            on_change: RefCell::new(None),
        });

        let weak = Rc::downgrade(&state);
        let id = store.insert_listener(Rc::new(move |value: &T| {
            if let Some(state) = weak.upgrade() {
                let candidate = state.derive(value);
                if state.accept(candidate) {
                    trace!("selection changed");
                }
            }
        }));
        debug!(listener = %id, "selection attached");

        Self {
            id,
            state,
            store: store.downgrade(),
            active: true,
        }
    }

    /// Current derived value.
    #[must_use]
    pub fn get(&self) -> S {
        self.state.current.borrow().clone()
    }

    /// Run `f` on a snapshot of the current derived value. No borrow is
    /// held while `f` runs, so `f` may mutate the store.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let value = self.get();
        f(&value)
    }

    /// Number of change signals so far.
    #[must_use]
    pub fn changes(&self) -> u64 {
        self.state.changes.get()
    }

    /// Whether the value changed since the last [`take_dirty`](Self::take_dirty).
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state.dirty.get()
    }

    /// Read and clear the dirty flag. Render loops call this once per frame.
    pub fn take_dirty(&self) -> bool {
        self.state.dirty.replace(false)
    }

    /// Install the consumer's change hook, replacing any previous one. The
    /// hook receives the new derived value after each accepted change.
    pub fn on_change(&self, hook: impl Fn(&S) + 'static) {
        *self.state.on_change.borrow_mut() = Some(Rc::new(hook));
    }

    /// Remove the change hook.
    pub fn clear_on_change(&self) {
        self.state.on_change.borrow_mut().take();
    }

    /// Swap the selector in place, keeping the same listener identity, and
    /// re-evaluate it against the current store value. Returns whether the
    /// derived value changed.
    pub fn set_selector(&self, selector: impl Fn(&T) -> S + 'static) -> bool {
        *self.state.selector.borrow_mut() = Rc::new(selector);
        let Some(store) = self.live_store() else {
            return false;
        };
        let candidate = store.with(|value| self.state.derive(value));
        self.state.accept(candidate)
    }

    /// Listener identity.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Whether the selection is still registered with a live store.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.live_store()
            .is_some_and(|store| store.is_registered(self.id))
    }

    /// Stop observing. Returns whether a listener was removed; repeated
    /// calls are no-ops.
    pub fn unsubscribe(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        let removed = self
            .store
            .upgrade()
            .is_some_and(|store| store.unregister(self.id));
        if removed {
            debug!(listener = %self.id, "selection detached");
        }
        removed
    }

    fn live_store(&self) -> Option<Rc<StoreInner<T>>> {
        if self.active { self.store.upgrade() } else { None }
    }
}

impl<T, S> Drop for Selection<T, S> {
    fn drop(&mut self) {
        if self.active {
            self.active = false;
            if let Some(store) = self.store.upgrade() {
                store.unregister(self.id);
            }
        }
    }
}
