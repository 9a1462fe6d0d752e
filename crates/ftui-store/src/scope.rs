#![forbid(unsafe_code)]

//! Explicit context passing for stores.
//!
//! A [`Scope`] is a node in a parent-linked chain. A provider calls
//! [`provide`](Scope::provide) on its scope; any descendant scope can look
//! the store up by value type with [`store`](Scope::store) without threading
//! it through every intermediate component. The nearest provider wins, so a
//! child scope can shadow its ancestors.
//!
//! ```
//! use ftui_store::{Scope, Store};
//!
//! let root = Scope::root();
//! root.provide(Store::new(String::from("value")));
//!
//! let leaf = root.child().child();
//! let store = leaf.expect_store::<String>().unwrap();
//! assert_eq!(store.get_store(), "value");
//! ```

use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{Result, StoreError};
use crate::store::Store;

struct ScopeInner {
    parent: Option<Scope>,
    depth: usize,
    provided: RefCell<HashMap<TypeId, Box<dyn Any>>>,
}

/// A node in the context chain.
///
/// Cloning a scope yields another handle to the same node.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("depth", &self.inner.depth)
            .field("provided", &self.inner.provided.borrow().len())
            .finish()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::root()
    }
}

impl Scope {
    /// Create a scope with no parent.
    #[must_use]
    pub fn root() -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                parent: None,
                depth: 0,
                provided: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Create a child scope that inherits every provider of `self`.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                parent: Some(self.clone()),
                depth: self.inner.depth + 1,
                provided: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Distance from the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.inner.depth
    }

    /// Parent scope, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Scope> {
        self.inner.parent.as_ref()
    }

    /// Make `store` available to this scope and its descendants. Returns
    /// the store this scope previously provided for `T`, if any.
    pub fn provide<T: Clone + 'static>(&self, store: Store<T>) -> Option<Store<T>> {
        self.inner
            .provided
            .borrow_mut()
            .insert(TypeId::of::<Store<T>>(), Box::new(store))
            .and_then(|old| old.downcast::<Store<T>>().ok())
            .map(|old| *old)
    }

    /// Stop providing `T` from this scope. Ancestors are unaffected.
    pub fn revoke<T: Clone + 'static>(&self) -> Option<Store<T>> {
        self.inner
            .provided
            .borrow_mut()
            .remove(&TypeId::of::<Store<T>>())
            .and_then(|old| old.downcast::<Store<T>>().ok())
            .map(|old| *old)
    }

    /// Whether this scope itself (not an ancestor) provides `T`.
    #[must_use]
    pub fn provides<T: Clone + 'static>(&self) -> bool {
        self.inner
            .provided
            .borrow()
            .contains_key(&TypeId::of::<Store<T>>())
    }

    /// Nearest store for `T` in this scope or its ancestors.
    #[must_use]
    pub fn store<T: Clone + 'static>(&self) -> Option<Store<T>> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            let found = current
                .inner
                .provided
                .borrow()
                .get(&TypeId::of::<Store<T>>())
                .and_then(|any| any.downcast_ref::<Store<T>>())
                .cloned();
            if found.is_some() {
                return found;
            }
            scope = current.parent();
        }
        None
    }

    /// Like [`store`](Self::store), but reports a missing provider as an
    /// error.
    ///
    /// # Errors
    ///
    /// [`StoreError::MissingProvider`] when no ancestor provides `T`.
    pub fn expect_store<T: Clone + 'static>(&self) -> Result<Store<T>> {
        self.store::<T>().ok_or(StoreError::MissingProvider {
            type_name: type_name::<T>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_ancestors() {
        let root = Scope::root();
        root.provide(Store::new(1u32));
        let leaf = root.child().child().child();
        assert_eq!(leaf.depth(), 3);
        assert_eq!(leaf.store::<u32>().unwrap().get_store(), 1);
        assert!(!leaf.provides::<u32>());
        assert!(root.provides::<u32>());
    }

    #[test]
    fn handles_share_state() {
        let root = Scope::root();
        let store = Store::new(String::from("a"));
        root.provide(store.clone());
        let found = root.child().expect_store::<String>().unwrap();
        found.set_store(String::from("b")).unwrap();
        assert_eq!(store.get_store(), "b");
    }

    #[test]
    fn child_shadows_parent() {
        let root = Scope::root();
        root.provide(Store::new(1u32));
        let child = root.child();
        child.provide(Store::new(2u32));
        assert_eq!(child.child().store::<u32>().unwrap().get_store(), 2);
        assert_eq!(root.store::<u32>().unwrap().get_store(), 1);

        child.revoke::<u32>();
        assert_eq!(child.store::<u32>().unwrap().get_store(), 1);
    }

    #[test]
    fn provide_returns_previous() {
        let root = Scope::root();
        assert!(root.provide(Store::new(1u32)).is_none());
        let old = root.provide(Store::new(2u32)).unwrap();
        assert_eq!(old.get_store(), 1);
    }

    #[test]
    fn types_are_independent() {
        let root = Scope::root();
        root.provide(Store::new(1u32));
        root.provide(Store::new(String::from("s")));
        assert_eq!(root.store::<u32>().unwrap().get_store(), 1);
        assert_eq!(root.store::<String>().unwrap().get_store(), "s");
        assert!(root.store::<i64>().is_none());
    }

    #[test]
    fn missing_provider_error() {
        let scope = Scope::root().child();
        let err = scope.expect_store::<u64>().unwrap_err();
        assert_eq!(err, StoreError::MissingProvider { type_name: "u64" });
    }
}
