//! Action results and the batch results map.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Mapping from identity tag (`category.name.function`) to the outcome of
/// that record's invocation. Created empty at the start of a batch, grows
/// monotonically while the batch runs, and is discarded once the batch's
/// report has been produced. Batch-scoped by construction: independent
/// batches share no state and may run in parallel.
pub type ResultsMap = FxHashMap<String, ActionOutcome>;

/// The outcome of one action invocation.
///
/// `changes` empty means the action applied no effect; `result` false means
/// it failed. Keys beyond the core three are passed through in `extra`
/// (the executor also stamps timing metadata there).
///
/// # Examples
///
/// ```
/// use converge::outcome::ActionOutcome;
/// use serde_json::json;
///
/// let noop = ActionOutcome::ok("already converged");
/// assert!(noop.result);
/// assert!(noop.unchanged());
///
/// let applied = ActionOutcome::ok("installed")
///     .with_change("new", json!("nginx-1.24"));
/// assert!(!applied.unchanged());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// What the action changed; empty when nothing was applied.
    #[serde(default)]
    pub changes: Map<String, Value>,
    /// Whether the invocation succeeded.
    #[serde(default)]
    pub result: bool,
    /// Human-readable summary from the action.
    #[serde(default)]
    pub comment: String,
    /// Additional keys carried through from the action verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActionOutcome {
    /// A successful outcome with no changes.
    #[must_use]
    pub fn ok(comment: impl Into<String>) -> Self {
        Self {
            result: true,
            comment: comment.into(),
            ..Self::default()
        }
    }

    /// A failed outcome with no changes.
    #[must_use]
    pub fn failed(comment: impl Into<String>) -> Self {
        Self {
            result: false,
            comment: comment.into(),
            ..Self::default()
        }
    }

    /// Adds one entry to `changes`.
    #[must_use]
    pub fn with_change(mut self, key: impl Into<String>, value: Value) -> Self {
        self.changes.insert(key.into(), value);
        self
    }

    /// `true` when the invocation applied no effect.
    #[must_use]
    pub fn unchanged(&self) -> bool {
        self.changes.is_empty()
    }
}
