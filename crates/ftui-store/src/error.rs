#![forbid(unsafe_code)]

//! Error type for store operations.

use std::fmt;

use crate::id::ListenerId;

/// Errors surfaced by [`Store`](crate::Store) and [`Scope`](crate::Scope).
///
/// Normal reads and writes never fail. Every variant here corresponds to a
/// policy decision in [`StoreConfig`](crate::StoreConfig) or a missing
/// provider lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A listener was registered under an id that is already live and the
    /// duplicate policy is [`DuplicatePolicy::Reject`](crate::DuplicatePolicy::Reject).
    DuplicateListener(ListenerId),
    /// A mutation was issued from inside a notification pass while the
    /// re-entrancy policy is [`ReentrancyPolicy::Reject`](crate::ReentrancyPolicy::Reject).
    ReentrantMutation,
    /// Queued re-entrant mutations kept producing more mutations past the
    /// configured drain limit. The remaining queue was discarded.
    DrainLimitExceeded {
        /// Configured `max_drain`.
        limit: usize,
        /// Number of queued mutations that were dropped.
        discarded: usize,
    },
    /// A listener panicked and the failure policy is
    /// [`FailurePolicy::Abort`](crate::FailurePolicy::Abort).
    ListenerPanicked {
        /// Listener that panicked.
        id: ListenerId,
        /// Panic payload rendered as text.
        message: String,
    },
    /// No enclosing scope provides a store of the requested type.
    MissingProvider {
        /// `std::any::type_name` of the requested store value.
        type_name: &'static str,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateListener(id) => write!(f, "listener {id} is already registered"),
            Self::ReentrantMutation => {
                write!(f, "store mutated from inside a notification pass")
            }
            Self::DrainLimitExceeded { limit, discarded } => write!(
                f,
                "re-entrant mutation drain exceeded {limit} mutations ({discarded} discarded)"
            ),
            Self::ListenerPanicked { id, message } => {
                write!(f, "listener {id} panicked: {message}")
            }
            Self::MissingProvider { type_name } => {
                write!(f, "no store provider for {type_name} in scope")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
