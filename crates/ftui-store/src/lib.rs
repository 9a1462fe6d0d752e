#![forbid(unsafe_code)]

//! Selector-filtered observable store for FrankenTUI component trees.
//!
//! A provider owns one [`Store<T>`]: a single mutable value plus a registry
//! of change listeners. Consumers observe the store through a
//! [`Selection`], which derives a sub-value with a pure selector and only
//! signals when that derived value changes.
//!
//! - [`Store`]: value, listener registry, synchronous notification passes.
//! - [`Selection`]: derived value with `PartialEq` change detection.
//! - [`Subscription`]: RAII guard for a raw listener.
//! - [`Scope`]: explicit, tree-shaped context for handing stores to
//!   descendants.
//!
//! # Architecture
//!
//! Everything is single-threaded (`Rc` and interior mutability). A
//! mutation applies to the value, then runs one notification pass over a
//! snapshot of the registry. Listeners may read the store, register or
//! unregister listeners, or mutate the store again; re-entrant mutations are
//! queued and applied after the active pass (see [`ReentrancyPolicy`]).
//!
//! # Invariants
//!
//! 1. `get_store()` after a completed `set_store(v)` returns the merged `v`.
//! 2. Each applied mutation notifies every listener live at the start of its
//!    pass exactly once, all with the same value.
//! 3. A listener removed before or during a pass is not invoked by it.
//! 4. A selection signals at most once per mutation, and only when its
//!    derived value differs by `PartialEq`.
//!
//! # Example
//!
//! ```
//! use ftui_store::{Scope, Store};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Form {
//!     value: String,
//!     touched: bool,
//! }
//!
//! let root = Scope::root();
//! root.provide(Store::new(Form { value: "value".into(), touched: false }));
//!
//! // Somewhere deeper in the tree.
//! let store = root.child().expect_store::<Form>().unwrap();
//! let value = store.select(|form: &Form| form.value.clone());
//! let renders = Rc::new(Cell::new(0));
//! let r = Rc::clone(&renders);
//! value.on_change(move |_| r.set(r.get() + 1));
//!
//! store.update(|form| form.touched = true).unwrap();
//! assert_eq!(renders.get(), 0);
//!
//! store.update(|form| form.value = "new".into()).unwrap();
//! assert_eq!(value.get(), "new");
//! assert_eq!(renders.get(), 1);
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod patch;
pub mod registry;
pub mod scope;
pub mod selector;
pub mod store;

pub use config::{DuplicatePolicy, FailurePolicy, ReentrancyPolicy, StoreConfig};
pub use error::{Result, StoreError};
pub use id::ListenerId;
pub use patch::Patch;
pub use registry::{ListenerRegistry, PassOutcome};
pub use scope::Scope;
pub use selector::Selection;
pub use store::{Store, StoreStats, Subscription};
