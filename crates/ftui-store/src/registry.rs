#![forbid(unsafe_code)]

//! Listener registry and notification passes.
//!
//! # Design
//!
//! The registry maps a [`ListenerId`] to a reference-counted slot holding the
//! callback and an `active` flag. A notification pass starts by taking a
//! [`Snapshot`] of the live slots, so listeners added or removed while the
//! pass runs never invalidate the iteration. Removal clears the slot's flag
//! synchronously, and the pass checks that flag right before each call, so a
//! listener removed mid-pass is not invoked even though the snapshot still
//! holds its slot.
//!
//! # Invariants
//!
//! 1. At most one live slot per id.
//! 2. `unregister` of an absent id is a no-op.
//! 3. A deactivated slot is never invoked again.
//! 4. Listener order is unspecified (currently ascending id).
//!
//! # Failure Modes
//!
//! - **Listener panic**: caught per call. With [`FailurePolicy::Isolate`] the
//!   panic is logged and the pass continues; with [`FailurePolicy::Abort`] the
//!   pass stops and the panic is reported in [`PassOutcome::aborted`].

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::config::{DuplicatePolicy, FailurePolicy};
use crate::error::{Result, StoreError};
use crate::id::ListenerId;

/// Shared listener callback.
pub type Callback<T> = Rc<dyn Fn(&T)>;

/// One registered listener.
pub struct ListenerSlot<T> {
    id: ListenerId,
    callback: Callback<T>,
    active: Cell<bool>,
}

impl<T> ListenerSlot<T> {
    fn new(id: ListenerId, callback: Callback<T>) -> Self {
        Self {
            id,
            callback,
            active: Cell::new(true),
        }
    }

    /// Identity this slot was registered under.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Whether the slot can still be invoked.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    fn deactivate(&self) {
        self.active.set(false);
    }
}

impl<T> fmt::Debug for ListenerSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSlot")
            .field("id", &self.id)
            .field("active", &self.active.get())
            .finish_non_exhaustive()
    }
}

/// Mapping from listener identity to callback.
pub struct ListenerRegistry<T> {
    slots: BTreeMap<ListenerId, Rc<ListenerSlot<T>>>,
    duplicates: DuplicatePolicy,
}

impl<T> fmt::Debug for ListenerRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.slots.len())
            .field("duplicates", &self.duplicates)
            .finish()
    }
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}

impl<T> ListenerRegistry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new(duplicates: DuplicatePolicy) -> Self {
        Self {
            slots: BTreeMap::new(),
            duplicates,
        }
    }

    /// Register `callback` under `id`, honouring the duplicate policy.
    ///
    /// On [`DuplicatePolicy::Replace`] the previous slot is deactivated and
    /// returned so the caller can drop it outside any borrow of the registry.
    pub fn register(
        &mut self,
        id: ListenerId,
        callback: Callback<T>,
    ) -> Result<Option<Rc<ListenerSlot<T>>>> {
        if self.slots.contains_key(&id) && self.duplicates == DuplicatePolicy::Reject {
            debug!(listener = %id, "duplicate listener id rejected");
            return Err(StoreError::DuplicateListener(id));
        }
        let replaced = self.insert(id, callback);
        if replaced.is_some() {
            debug!(listener = %id, "listener callback replaced");
        }
        Ok(replaced)
    }

    /// Allocate an id that is not live in this registry. Callers can
    /// register arbitrary ids (see [`ListenerId::from_raw`]), so a fresh id
    /// may already be taken.
    #[must_use]
    pub fn vacant_id(&self) -> ListenerId {
        loop {
            let id = ListenerId::fresh();
            if !self.slots.contains_key(&id) {
                return id;
            }
        }
    }

    /// Register `callback` under a vacant id and return that id.
    pub(crate) fn insert_vacant(&mut self, callback: Callback<T>) -> ListenerId {
        let id = self.vacant_id();
        self.slots.insert(id, Rc::new(ListenerSlot::new(id, callback)));
        id
    }

    fn insert(&mut self, id: ListenerId, callback: Callback<T>) -> Option<Rc<ListenerSlot<T>>> {
        let replaced = self
            .slots
            .insert(id, Rc::new(ListenerSlot::new(id, callback)));
        if let Some(old) = &replaced {
            old.deactivate();
        }
        replaced
    }

    /// Remove the listener registered under `id`. Returns the removed slot,
    /// or `None` if nothing was registered.
    pub fn unregister(&mut self, id: ListenerId) -> Option<Rc<ListenerSlot<T>>> {
        let removed = self.slots.remove(&id);
        if let Some(slot) = &removed {
            slot.deactivate();
        }
        removed
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: ListenerId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Registered ids.
    pub fn ids(&self) -> impl Iterator<Item = ListenerId> + '_ {
        self.slots.keys().copied()
    }

    /// Capture the current listener set for one notification pass.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<T> {
        Snapshot {
            slots: self.slots.values().cloned().collect(),
        }
    }

    /// Deactivate and drop every slot.
    pub fn clear(&mut self) -> Vec<Rc<ListenerSlot<T>>> {
        let slots = std::mem::take(&mut self.slots);
        slots
            .into_values()
            .inspect(|slot| slot.deactivate())
            .collect()
    }
}

/// The listener set captured at the start of a notification pass.
pub struct Snapshot<T> {
    slots: Vec<Rc<ListenerSlot<T>>>,
}

impl<T> fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("listeners", &self.slots.len())
            .finish()
    }
}

impl<T> Snapshot<T> {
    /// Number of captured listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Invoke every captured listener that is still active.
    ///
    /// No registry borrow is held here, so listeners are free to register,
    /// unregister, or read the store.
    pub fn run(&self, value: &T, failures: FailurePolicy) -> PassOutcome {
        let mut outcome = PassOutcome::default();
        for slot in &self.slots {
            if !slot.is_active() {
                outcome.skipped += 1;
                continue;
            }
            outcome.invoked += 1;
            let callback = Rc::clone(&slot.callback);
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(value))) {
                let message = panic_message(payload.as_ref());
                outcome.failed += 1;
                match failures {
                    FailurePolicy::Isolate => {
                        warn!(listener = %slot.id, %message, "listener panicked; continuing pass");
                    }
                    FailurePolicy::Abort => {
                        warn!(listener = %slot.id, %message, "listener panicked; aborting pass");
                        outcome.aborted = Some((slot.id, message));
                        break;
                    }
                }
            }
        }
        outcome
    }
}

/// Counters for one notification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutcome {
    /// Listeners called.
    pub invoked: usize,
    /// Listeners removed after the snapshot was taken.
    pub skipped: usize,
    /// Listeners that panicked.
    pub failed: usize,
    /// Listener that stopped the pass under [`FailurePolicy::Abort`].
    pub aborted: Option<(ListenerId, String)>,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
