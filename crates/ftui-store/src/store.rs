#![forbid(unsafe_code)]

//! The observable store: one mutable value plus a listener registry.
//!
//! # Design
//!
//! [`Store<T>`] keeps its value, registry and bookkeeping in shared,
//! reference-counted storage. Cloning a store hands out another handle to
//! the same state, which is how a provider exposes itself to consumers (see
//! [`Scope`](crate::Scope)). The provider lifetime ends with the last handle.
//!
//! Every mutation runs a notification pass synchronously before returning.
//! The store notifies on every mutation, equal writes included; change
//! detection is the job of each [`Selection`].
//!
//! # Performance
//!
//! | Operation        | Complexity                    |
//! |------------------|-------------------------------|
//! | `get_store()`    | O(1) + clone of `T`           |
//! | `set_store()`    | O(L) where L = listeners      |
//! | `register`       | O(log L)                      |
//! | `unregister`     | O(log L)                      |
//!
//! # Failure Modes
//!
//! - **Re-entrant mutation**: a listener calling `set_store` during a pass is
//!   queued (default) or rejected, per [`ReentrancyPolicy`]. Queued mutations
//!   are applied FIFO after the active pass, each with its own pass.
//! - **Runaway feedback**: listeners that keep mutating in response to their
//!   own notifications are cut off after `max_drain` queued mutations.
//! - **Listener panic**: isolated or aborting, per [`FailurePolicy`].

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, debug_span, error, trace};

use crate::config::{FailurePolicy, ReentrancyPolicy, StoreConfig};
use crate::error::{Result, StoreError};
use crate::id::ListenerId;
use crate::patch::Patch;
use crate::registry::{Callback, ListenerRegistry};
use crate::selector::Selection;

type Mutation<T> = Box<dyn FnOnce(&mut T)>;

/// Cumulative counters for a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Notification passes run.
    pub passes: u64,
    /// Individual listener invocations.
    pub listener_calls: u64,
    /// Listener invocations that panicked.
    pub listener_failures: u64,
    /// Listeners skipped because they were removed mid-pass.
    pub stale_skips: u64,
    /// Mutations deferred because a pass was active.
    pub deferred_mutations: u64,
    /// Deferred mutations dropped by the drain limit or an aborted pass.
    pub discarded_mutations: u64,
}

pub(crate) struct StoreInner<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    registry: RefCell<ListenerRegistry<T>>,
    config: StoreConfig,
    notifying: Cell<bool>,
    pending: RefCell<VecDeque<Mutation<T>>>,
    stats: Cell<StoreStats>,
}

impl<T> StoreInner<T> {
    pub(crate) fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.value.borrow())
    }

    pub(crate) fn unregister(&self, id: ListenerId) -> bool {
        // Drop the slot after the borrow ends: a callback may own guards
        // that unregister themselves.
        let removed = self.registry.borrow_mut().unregister(id);
        let found = removed.is_some();
        drop(removed);
        if found {
            debug!(listener = %id, "listener unregistered");
        }
        found
    }

    pub(crate) fn is_registered(&self, id: ListenerId) -> bool {
        self.registry.borrow().contains(id)
    }

    fn discard_pending(&self) -> usize {
        let dropped: Vec<_> = self.pending.borrow_mut().drain(..).collect();
        let count = dropped.len();
        drop(dropped);
        self.bump_stats(|s| s.discarded_mutations += count as u64);
        count
    }

    fn bump_stats(&self, f: impl FnOnce(&mut StoreStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl<T> Drop for StoreInner<T> {
    fn drop(&mut self) {
        let listeners = self.registry.get_mut().clear();
        debug!(
            listeners = listeners.len(),
            version = self.version.get(),
            "store dropped"
        );
    }
}

/// Marks a pass as active and clears the mark even if a mutation closure
/// unwinds. Deferred mutations queued behind a panicking one are dropped so
/// they cannot leak into the next unrelated mutation.
struct PassGuard<'a, T>(&'a StoreInner<T>);

impl<'a, T> PassGuard<'a, T> {
    fn enter(inner: &'a StoreInner<T>) -> Self {
        inner.notifying.set(true);
        Self(inner)
    }
}

impl<T> Drop for PassGuard<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let discarded = self.0.discard_pending();
            if discarded > 0 {
                error!(discarded, "pending mutations dropped after panicking mutation");
            }
        }
        self.0.notifying.set(false);
    }
}

/// A shared store holding one value and its change listeners.
///
/// # Invariants
///
/// 1. `get_store()` reflects the most recently applied mutation.
/// 2. Every applied mutation runs exactly one pass over the listeners live
///    when the pass starts, and `version` increments by exactly 1.
/// 3. At most one notification pass is active at a time.
/// 4. A listener unregistered before or during a pass is not invoked by it.
///
/// # Example
///
/// ```
/// use ftui_store::Store;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Form {
///     value: String,
/// }
///
/// let store = Store::new(Form { value: "value".into() });
/// let selection = store.select(|form: &Form| form.value.clone());
/// assert_eq!(selection.get(), "value");
///
/// store.set_store(Form { value: "new".into() }).unwrap();
/// assert_eq!(selection.get(), "new");
/// assert_eq!(selection.changes(), 1);
/// ```
pub struct Store<T> {
    inner: Rc<StoreInner<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .field("listeners", &self.inner.registry.borrow().len())
            .field("notifying", &self.inner.notifying.get())
            .finish()
    }
}

impl<T: Clone + 'static> Store<T> {
    /// Create a store with the default configuration.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_config(value, StoreConfig::default())
    }

    /// Create a store with an explicit configuration.
    #[must_use]
    pub fn with_config(value: T, config: StoreConfig) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                value: RefCell::new(value),
                version: Cell::new(0),
                registry: RefCell::new(ListenerRegistry::new(config.duplicates)),
                config,
                notifying: Cell::new(false),
                pending: RefCell::new(VecDeque::new()),
                stats: Cell::new(StoreStats::default()),
            }),
        }
    }

    /// Current value (cloned).
    #[must_use]
    pub fn get_store(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value without cloning.
    ///
    /// Do not mutate the store from inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    /// Merge `patch` into the value and notify every listener.
    ///
    /// # Errors
    ///
    /// See [`update`](Self::update).
    pub fn set_store<P>(&self, patch: P) -> Result<()>
    where
        T: Patch<P>,
        P: 'static,
    {
        self.mutate(Box::new(move |value: &mut T| value.apply(patch)))
    }

    /// Mutate the value in place and notify every listener.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ReentrantMutation`] when called from a listener under
    ///   [`ReentrancyPolicy::Reject`].
    /// - [`StoreError::ListenerPanicked`] when a listener panics under
    ///   [`FailurePolicy::Abort`].
    /// - [`StoreError::DrainLimitExceeded`] when queued re-entrant mutations
    ///   exceed the configured limit.
    pub fn update(&self, f: impl FnOnce(&mut T) + 'static) -> Result<()> {
        self.mutate(Box::new(f))
    }

    /// Register `callback` under `id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateListener`] if `id` is live and the duplicate
    /// policy is [`DuplicatePolicy::Reject`](crate::DuplicatePolicy::Reject).
    pub fn register_listener(
        &self,
        id: ListenerId,
        callback: impl Fn(&T) + 'static,
    ) -> Result<()> {
        let callback: Callback<T> = Rc::new(callback);
        let replaced = self.inner.registry.borrow_mut().register(id, callback)?;
        drop(replaced);
        debug!(listener = %id, "listener registered");
        Ok(())
    }

    /// Remove the listener registered under `id`. Returns whether one was
    /// removed; absent ids are a no-op.
    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.inner.unregister(id)
    }

    /// Register `callback` under a fresh id and return a guard that
    /// unregisters it on drop.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let id = self.inner.registry.borrow_mut().insert_vacant(Rc::new(callback));
        debug!(listener = %id, "listener subscribed");
        Subscription::new(id, Rc::downgrade(&self.inner))
    }

    /// Start observing a value derived from the store.
    ///
    /// The selector should be a pure function of the store value. The
    /// returned [`Selection`] only signals when the derived value changes
    /// by `PartialEq`.
    pub fn select<S, F>(&self, selector: F) -> Selection<T, S>
    where
        S: Clone + PartialEq + 'static,
        F: Fn(&T) -> S + 'static,
    {
        Selection::attach(self, selector)
    }

    /// Allocate a listener id for use with [`register_listener`](Self::register_listener).
    /// The id is not live at the time of the call.
    #[must_use]
    pub fn next_listener_id(&self) -> ListenerId {
        self.inner.registry.borrow().vacant_id()
    }

    /// Whether `id` is currently registered.
    #[must_use]
    pub fn is_registered(&self, id: ListenerId) -> bool {
        self.inner.is_registered(id)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    /// Number of applied mutations.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Whether a notification pass is running.
    #[must_use]
    pub fn is_notifying(&self) -> bool {
        self.inner.notifying.get()
    }

    /// Cumulative counters.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.inner.stats.get()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub(crate) fn downgrade(&self) -> Weak<StoreInner<T>> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn insert_listener(&self, callback: Callback<T>) -> ListenerId {
        self.inner.registry.borrow_mut().insert_vacant(callback)
    }

    fn mutate(&self, mutation: Mutation<T>) -> Result<()> {
        let inner = &self.inner;
        if inner.notifying.get() {
            return match inner.config.reentrancy {
                ReentrancyPolicy::Reject => {
                    debug!("re-entrant mutation rejected");
                    Err(StoreError::ReentrantMutation)
                }
                ReentrancyPolicy::Queue => {
                    inner.pending.borrow_mut().push_back(mutation);
                    inner.bump_stats(|s| s.deferred_mutations += 1);
                    trace!(
                        queued = inner.pending.borrow().len(),
                        "re-entrant mutation deferred"
                    );
                    Ok(())
                }
            };
        }

        let _guard = PassGuard::enter(self.inner.as_ref());
        self.apply_and_notify(mutation)?;

        let mut drained = 0usize;
        loop {
            let next = inner.pending.borrow_mut().pop_front();
            let Some(next) = next else {
                break;
            };
            if drained >= inner.config.max_drain {
                inner.pending.borrow_mut().push_front(next);
                let discarded = self.inner.discard_pending();
                error!(
                    limit = inner.config.max_drain,
                    discarded, "re-entrant mutation drain limit exceeded"
                );
                return Err(StoreError::DrainLimitExceeded {
                    limit: inner.config.max_drain,
                    discarded,
                });
            }
            drained += 1;
            self.apply_and_notify(next)?;
        }
        Ok(())
    }

    fn apply_and_notify(&self, mutation: Mutation<T>) -> Result<()> {
        let inner = &self.inner;
        let value = {
            let mut value = inner.value.borrow_mut();
            mutation(&mut *value);
            value.clone()
        };
        let version = inner.version.get() + 1;
        inner.version.set(version);

        let snapshot = inner.registry.borrow().snapshot();
        let _span = debug_span!("store_notify", version, listeners = snapshot.len()).entered();
        let outcome = snapshot.run(&value, inner.config.failures);
        trace!(
            invoked = outcome.invoked,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "notification pass complete"
        );

        inner.bump_stats(|s| {
            s.passes += 1;
            s.listener_calls += outcome.invoked as u64;
            s.listener_failures += outcome.failed as u64;
            s.stale_skips += outcome.skipped as u64;
        });

        match outcome.aborted {
            Some((id, message)) => {
                debug_assert_eq!(inner.config.failures, FailurePolicy::Abort);
                let discarded = self.inner.discard_pending();
                if discarded > 0 {
                    debug!(discarded, "pending mutations dropped after aborted pass");
                }
                Err(StoreError::ListenerPanicked { id, message })
            }
            None => Ok(()),
        }
    }

}

/// RAII guard for a listener registered with [`Store::subscribe`].
///
/// Dropping the guard unregisters the listener. The guard holds only a weak
/// reference, so it never keeps the store alive.
pub struct Subscription {
    id: ListenerId,
    detach: Option<Box<dyn FnOnce() -> bool>>,
}

impl Subscription {
    fn new<T: 'static>(id: ListenerId, store: Weak<StoreInner<T>>) -> Self {
        Self {
            id,
            detach: Some(Box::new(move || {
                store.upgrade().is_some_and(|inner| inner.unregister(id))
            })),
        }
    }

    /// Identity of the guarded listener.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Whether [`unsubscribe`](Self::unsubscribe) has not run yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.detach.is_some()
    }

    /// Unregister now. Returns whether a listener was removed; repeated
    /// calls are no-ops.
    pub fn unsubscribe(&mut self) -> bool {
        self.detach.take().is_some_and(|detach| detach())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicatePolicy;

    #[derive(Debug, Clone, PartialEq)]
    struct Form {
        value: String,
    }

    fn form(value: &str) -> Form {
        Form {
            value: value.to_string(),
        }
    }

    fn counting(store: &Store<Form>) -> (Rc<Cell<u32>>, Subscription) {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let sub = store.subscribe(move |_| c.set(c.get() + 1));
        (count, sub)
    }

    #[test]
    fn read_after_write() {
        let store = Store::new(form("value"));
        assert_eq!(store.get_store(), form("value"));
        store.set_store(form("new")).unwrap();
        assert_eq!(store.get_store(), form("new"));
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn update_in_place() {
        let store = Store::new(vec![1, 2]);
        store.update(|v| v.push(3)).unwrap();
        assert_eq!(store.with(|v| v.len()), 3);
    }

    #[test]
    fn equal_write_still_notifies() {
        let store = Store::new(form("same"));
        let (count, _sub) = counting(&store);
        store.set_store(form("same")).unwrap();
        store.set_store(form("same")).unwrap();
        assert_eq!(count.get(), 2);
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn listeners_see_new_value_and_store_agrees() {
        let store = Store::new(form("a"));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let handle = store.clone();
        let _sub = store.subscribe(move |f: &Form| {
            s.borrow_mut().push((f.value.clone(), handle.get_store().value));
        });
        store.set_store(form("b")).unwrap();
        assert_eq!(*seen.borrow(), vec![("b".to_string(), "b".to_string())]);
    }

    #[test]
    fn register_unregister_by_id() {
        let store = Store::new(form("a"));
        let id = store.next_listener_id();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        store
            .register_listener(id, move |_| c.set(c.get() + 1))
            .unwrap();
        assert!(store.is_registered(id));

        store.set_store(form("b")).unwrap();
        assert!(store.unregister_listener(id));
        assert!(!store.unregister_listener(id));
        store.set_store(form("c")).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn duplicate_registration_rejected() {
        let store = Store::new(form("a"));
        let id = store.next_listener_id();
        store.register_listener(id, |_| {}).unwrap();
        assert_eq!(
            store.register_listener(id, |_| {}),
            Err(StoreError::DuplicateListener(id))
        );
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn duplicate_registration_replaces_when_configured() {
        let config = StoreConfig::default().with_duplicates(DuplicatePolicy::Replace);
        let store = Store::with_config(form("a"), config);
        let id = store.next_listener_id();
        let hits = Rc::new(RefCell::new(Vec::new()));
        let h1 = Rc::clone(&hits);
        let h2 = Rc::clone(&hits);
        store.register_listener(id, move |_| h1.borrow_mut().push(1)).unwrap();
        store.register_listener(id, move |_| h2.borrow_mut().push(2)).unwrap();
        store.set_store(form("b")).unwrap();
        assert_eq!(*hits.borrow(), vec![2]);
    }

    #[test]
    fn subscription_drop_unsubscribes() {
        let store = Store::new(form("a"));
        let (count, sub) = counting(&store);
        store.set_store(form("b")).unwrap();
        drop(sub);
        store.set_store(form("c")).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn subscription_unsubscribe_idempotent() {
        let store = Store::new(form("a"));
        let (_, mut sub) = counting(&store);
        assert!(sub.is_active());
        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        assert!(!sub.is_active());
    }

    #[test]
    fn subscription_outlives_store() {
        let store = Store::new(form("a"));
        let (_, mut sub) = counting(&store);
        drop(store);
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn unregister_mid_pass_prevents_call() {
        let store = Store::new(form("a"));
        // Lower id, so it runs before the victim.
        let killer = store.next_listener_id();
        let victim = store.next_listener_id();
        let victim_hits = Rc::new(Cell::new(0));

        let handle = store.clone();
        store
            .register_listener(killer, move |_| {
                handle.unregister_listener(victim);
            })
            .unwrap();
        let v = Rc::clone(&victim_hits);
        store
            .register_listener(victim, move |_| v.set(v.get() + 1))
            .unwrap();

        store.set_store(form("b")).unwrap();
        assert_eq!(victim_hits.get(), 0);
        assert_eq!(store.stats().stale_skips, 1);
    }

    #[test]
    fn reentrant_mutation_is_queued_and_drained() {
        let store = Store::new(0u32);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _log = store.subscribe(move |v: &u32| s.borrow_mut().push(*v));

        let handle = store.clone();
        let _bump = store.subscribe(move |v: &u32| {
            if *v < 3 {
                handle.set_store(*v + 1).unwrap();
                // Deferred: the value is unchanged until this pass ends.
                assert_eq!(handle.get_store(), *v);
            }
        });

        store.set_store(1u32).unwrap();
        assert_eq!(store.get_store(), 3);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
        assert_eq!(store.stats().passes, 3);
        assert_eq!(store.stats().deferred_mutations, 2);
        assert!(!store.is_notifying());
    }

    #[test]
    fn reentrant_mutation_rejected_when_configured() {
        let config = StoreConfig::default().with_reentrancy(ReentrancyPolicy::Reject);
        let store = Store::with_config(0u32, config);
        let result = Rc::new(RefCell::new(None));
        let r = Rc::clone(&result);
        let handle = store.clone();
        let _sub = store.subscribe(move |_| {
            *r.borrow_mut() = Some(handle.set_store(99u32));
        });
        store.set_store(1u32).unwrap();
        assert_eq!(
            result.borrow_mut().take(),
            Some(Err(StoreError::ReentrantMutation))
        );
        assert_eq!(store.get_store(), 1);
    }

    #[test]
    fn drain_limit_stops_feedback_loop() {
        let config = StoreConfig::default().with_max_drain(5);
        let store = Store::with_config(0u32, config);
        let handle = store.clone();
        let sub = store.subscribe(move |v: &u32| {
            let _ = handle.set_store(*v + 1);
        });
        let err = store.set_store(1u32).unwrap_err();
        assert_eq!(
            err,
            StoreError::DrainLimitExceeded {
                limit: 5,
                discarded: 1
            }
        );
        assert_eq!(store.get_store(), 6);
        assert!(!store.is_notifying());

        // The store is usable again afterwards.
        drop(sub);
        store.set_store(100u32).unwrap();
        assert_eq!(store.get_store(), 100);
    }

    #[test]
    fn isolated_panic_does_not_starve_siblings() {
        let store = Store::new(form("a"));
        let _bad = store.subscribe(|_| panic!("listener failure"));
        let (count, _good) = counting(&store);
        store.set_store(form("b")).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(store.stats().listener_failures, 1);
    }

    #[test]
    fn aborting_panic_reports_error() {
        let config = StoreConfig::default().with_failures(FailurePolicy::Abort);
        let store = Store::with_config(form("a"), config);
        // Lower id, so its write-back is queued before the panic.
        let handle = store.clone();
        let writer = store.subscribe(move |f: &Form| {
            if f.value == "b" {
                handle.set_store(form("queued")).unwrap();
            }
        });
        let bad = store.subscribe(|_| panic!("listener failure"));
        let err = store.set_store(form("b")).unwrap_err();
        assert_eq!(
            err,
            StoreError::ListenerPanicked {
                id: bad.id(),
                message: "listener failure".to_string()
            }
        );
        // The mutation itself was applied; the queued write-back was not.
        assert_eq!(store.get_store(), form("b"));
        assert_eq!(store.stats().deferred_mutations, 1);
        assert_eq!(store.stats().discarded_mutations, 1);
        assert_eq!(store.stats().passes, 1);
        assert!(!store.is_notifying());
        drop(writer);
    }

    #[test]
    fn panicking_deferred_mutation_drops_rest_of_queue() {
        let store = Store::new(0u32);
        let handle = store.clone();
        let queued = Rc::new(Cell::new(false));
        let q = Rc::clone(&queued);
        let sub = store.subscribe(move |_| {
            if !q.replace(true) {
                handle.update(|_| panic!("bad mutation")).unwrap();
                handle.update(|v| *v = 100).unwrap();
            }
        });

        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.set_store(1u32)
        }));
        assert!(unwound.is_err());
        assert!(!store.is_notifying());
        assert_eq!(store.get_store(), 1);
        assert_eq!(store.stats().discarded_mutations, 1);

        store.set_store(5u32).unwrap();
        assert_eq!(store.get_store(), 5);
        drop(sub);
    }

    #[test]
    fn listener_can_subscribe_during_pass() {
        let store = Store::new(0u32);
        let late = Rc::new(RefCell::new(Vec::new()));
        let holder: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let handle = store.clone();
        let l = Rc::clone(&late);
        let h = Rc::clone(&holder);
        let _sub = store.subscribe(move |_| {
            if h.borrow().is_none() {
                let l = Rc::clone(&l);
                *h.borrow_mut() = Some(handle.subscribe(move |v: &u32| l.borrow_mut().push(*v)));
            }
        });

        store.set_store(1u32).unwrap();
        // Not part of the snapshot for the pass that added it.
        assert!(late.borrow().is_empty());
        store.set_store(2u32).unwrap();
        assert_eq!(*late.borrow(), vec![2]);
    }

    #[test]
    fn debug_format() {
        let store = Store::new(42u32);
        let dbg = format!("{store:?}");
        assert!(dbg.contains("Store"));
        assert!(dbg.contains("42"));
        assert!(dbg.contains("listeners"));
    }
}
