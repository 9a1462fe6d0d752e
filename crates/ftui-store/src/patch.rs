#![forbid(unsafe_code)]

//! Merging updates into a store value.
//!
//! [`Store::set_store`](crate::Store::set_store) accepts any `P` for which the
//! store value implements [`Patch<P>`]. Every type patches itself by plain
//! replacement; records that want field-level merges implement `Patch` for a
//! dedicated patch type:
//!
//! ```
//! use ftui_store::{Patch, Store};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Form {
//!     name: String,
//!     email: String,
//! }
//!
//! #[derive(Default)]
//! struct FormPatch {
//!     name: Option<String>,
//!     email: Option<String>,
//! }
//!
//! impl Patch<FormPatch> for Form {
//!     fn apply(&mut self, patch: FormPatch) {
//!         if let Some(name) = patch.name {
//!             self.name = name;
//!         }
//!         if let Some(email) = patch.email {
//!             self.email = email;
//!         }
//!     }
//! }
//!
//! let store = Store::new(Form { name: "a".into(), email: "a@x".into() });
//! store
//!     .set_store(FormPatch { name: Some("b".into()), ..Default::default() })
//!     .unwrap();
//! assert_eq!(store.get_store().name, "b");
//! assert_eq!(store.get_store().email, "a@x");
//! ```

/// An update that can be merged into `Self`.
pub trait Patch<P> {
    /// Merge `patch` into `self`.
    fn apply(&mut self, patch: P);
}

impl<T> Patch<T> for T {
    fn apply(&mut self, patch: T) {
        *self = patch;
    }
}
