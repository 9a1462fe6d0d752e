#![forbid(unsafe_code)]

//! Store configuration and policy switches.
//!
//! Every policy has a default that favours robustness: duplicate ids are
//! rejected, listener panics are isolated, and re-entrant mutations are
//! queued. [`StoreConfig::from_env`] lets an application flip these without
//! recompiling.
//!
//! # Environment Variables
//!
//! | Variable                 | Values                | Default   |
//! |--------------------------|-----------------------|-----------|
//! | `FTUI_STORE_REENTRANCY`  | `queue`, `reject`     | `queue`   |
//! | `FTUI_STORE_DUPLICATES`  | `reject`, `replace`   | `reject`  |
//! | `FTUI_STORE_FAILURES`    | `isolate`, `abort`    | `isolate` |
//! | `FTUI_STORE_MAX_DRAIN`   | positive integer      | `1024`    |

use std::fmt;

/// Environment variable selecting [`ReentrancyPolicy`].
pub const ENV_REENTRANCY: &str = "FTUI_STORE_REENTRANCY";
/// Environment variable selecting [`DuplicatePolicy`].
pub const ENV_DUPLICATES: &str = "FTUI_STORE_DUPLICATES";
/// Environment variable selecting [`FailurePolicy`].
pub const ENV_FAILURES: &str = "FTUI_STORE_FAILURES";
/// Environment variable overriding [`StoreConfig::max_drain`].
pub const ENV_MAX_DRAIN: &str = "FTUI_STORE_MAX_DRAIN";

const DEFAULT_MAX_DRAIN: usize = 1024;

/// What happens when the store is mutated from inside a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReentrancyPolicy {
    /// Defer the mutation until the active pass finishes, then apply it and
    /// run a fresh pass. At most one pass is active at a time.
    #[default]
    Queue,
    /// Refuse the mutation with [`StoreError::ReentrantMutation`](crate::StoreError::ReentrantMutation).
    Reject,
}

/// What happens when a listener is registered under a live id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Refuse with [`StoreError::DuplicateListener`](crate::StoreError::DuplicateListener).
    #[default]
    Reject,
    /// Silently replace the previous callback (upsert).
    Replace,
}

/// What happens when a listener panics during a notification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the panic and keep notifying the remaining listeners.
    #[default]
    Isolate,
    /// Stop the pass and report [`StoreError::ListenerPanicked`](crate::StoreError::ListenerPanicked).
    Abort,
}

/// Configuration for a [`Store`](crate::Store).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Re-entrant mutation handling.
    pub reentrancy: ReentrancyPolicy,
    /// Duplicate listener id handling.
    pub duplicates: DuplicatePolicy,
    /// Listener panic handling.
    pub failures: FailurePolicy,
    /// Maximum queued mutations drained by one outermost mutation.
    pub max_drain: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            reentrancy: ReentrancyPolicy::default(),
            duplicates: DuplicatePolicy::default(),
            failures: FailurePolicy::default(),
            max_drain: DEFAULT_MAX_DRAIN,
        }
    }
}

impl StoreConfig {
    /// Set the re-entrancy policy.
    #[must_use]
    pub fn with_reentrancy(mut self, policy: ReentrancyPolicy) -> Self {
        self.reentrancy = policy;
        self
    }

    /// Set the duplicate id policy.
    #[must_use]
    pub fn with_duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    /// Set the listener failure policy.
    #[must_use]
    pub fn with_failures(mut self, policy: FailurePolicy) -> Self {
        self.failures = policy;
        self
    }

    /// Set the drain limit. Clamped to at least 1.
    #[must_use]
    pub fn with_max_drain(mut self, max_drain: usize) -> Self {
        self.max_drain = max_drain.max(1);
        self
    }

    /// Build a config from the process environment, ignoring invalid values.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_env_with_diagnostics(get_env).config
    }

    /// Build a config from a key lookup and report every rejected value.
    pub fn from_env_with_diagnostics<F>(get_env: F) -> EnvConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let mut warnings = Vec::new();

        if let Some(raw) = get_env(ENV_REENTRANCY) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "queue" => config.reentrancy = ReentrancyPolicy::Queue,
                "reject" => config.reentrancy = ReentrancyPolicy::Reject,
                _ => warnings.push(ConfigWarning::new(
                    ENV_REENTRANCY,
                    raw,
                    "expected queue|reject",
                )),
            }
        }

        if let Some(raw) = get_env(ENV_DUPLICATES) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "reject" => config.duplicates = DuplicatePolicy::Reject,
                "replace" => config.duplicates = DuplicatePolicy::Replace,
                _ => warnings.push(ConfigWarning::new(
                    ENV_DUPLICATES,
                    raw,
                    "expected reject|replace",
                )),
            }
        }

        if let Some(raw) = get_env(ENV_FAILURES) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "isolate" => config.failures = FailurePolicy::Isolate,
                "abort" => config.failures = FailurePolicy::Abort,
                _ => warnings.push(ConfigWarning::new(
                    ENV_FAILURES,
                    raw,
                    "expected isolate|abort",
                )),
            }
        }

        if let Some(raw) = get_env(ENV_MAX_DRAIN) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.max_drain = n,
                _ => warnings.push(ConfigWarning::new(
                    ENV_MAX_DRAIN,
                    raw,
                    "expected positive integer",
                )),
            }
        }

        EnvConfig { config, warnings }
    }
}

/// Result of [`StoreConfig::from_env_with_diagnostics`].
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Effective configuration.
    pub config: StoreConfig,
    /// Values that were present but rejected.
    pub warnings: Vec<ConfigWarning>,
}

/// An environment value that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// Variable name.
    pub key: &'static str,
    /// Raw value found.
    pub value: String,
    /// What was expected instead.
    pub message: &'static str,
}

impl ConfigWarning {
    fn new(key: &'static str, value: impl Into<String>, message: &'static str) -> Self {
        Self {
            key,
            value: value.into(),
            message,
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.key, self.value, self.message)
    }
}
