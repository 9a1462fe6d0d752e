#![forbid(unsafe_code)]

//! Listener identity tokens.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counter. Ids are never reused, so two live subscriptions
/// can only share an id if a caller registers one explicitly twice.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocate a fresh id.
    #[must_use]
    pub fn fresh() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw value. Intended for tests and for callers that manage
    /// their own id space.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
