//! Module registry contract and parameter schemas.
//!
//! The engine never populates the registry; it consumes a read-only catalog
//! of pluggable actions through [`ModuleRegistry`]. Each action statically
//! declares its signature as a [`ParamSpec`] (ordered parameter names, with
//! defaults for trailing parameters) so the validator and the call binder can
//! work without any runtime reflection.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;

use crate::outcome::ActionOutcome;

/// Conventional function name of a category's reactive entry point.
///
/// When a watched dependency reports changes but the watching action itself
/// is a no-op, the executor re-invokes `<category>.watcher` with the same
/// argument-binding contract as the declared function.
pub const WATCHER_FUNCTION: &str = "watcher";

/// One declared parameter: a name and an optional default value.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    name: String,
    default: Option<Value>,
}

impl Param {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Statically declared signature of an action function.
///
/// Parameters are ordered; defaults conventionally occupy the trailing
/// positions. Every parameter without a default must be present on the
/// record that invokes the action.
///
/// # Examples
///
/// ```
/// use converge::registry::ParamSpec;
/// use serde_json::json;
///
/// let spec = ParamSpec::new()
///     .required("name")
///     .optional("ensure", json!("present"));
///
/// assert_eq!(spec.len(), 2);
/// assert_eq!(spec.required_names().collect::<Vec<_>>(), vec!["name"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamSpec {
    params: Vec<Param>,
}

impl ParamSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter with no default; callers must always supply it.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Appends a parameter with a declared default value.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, default: Value) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: Some(default),
        });
        self
    }

    /// Declared parameters in positional order.
    pub fn params(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    /// Names of parameters without declared defaults.
    pub fn required_names(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|p| p.default.is_none())
            .map(|p| p.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// An executable action exposed by a module.
///
/// Actions receive the positional argument list produced by
/// [`crate::binder::bind`] against their own [`ParamSpec`] and return a
/// result-shaped [`ActionOutcome`]. Invocation is awaited sequentially and is
/// otherwise opaque to the engine; an action is free to perform arbitrary
/// I/O.
#[async_trait]
pub trait Action: Send + Sync {
    /// The statically declared signature this action is bound against.
    fn spec(&self) -> &ParamSpec;

    /// Applies the action with arguments in declared parameter order.
    async fn apply(&self, args: Vec<Value>) -> ActionOutcome;
}

/// Read-only lookup from `(category, function)` to an executable action.
pub trait ModuleRegistry: Send + Sync {
    fn lookup(&self, category: &str, function: &str) -> Option<Arc<dyn Action>>;

    /// Whether `category.function` is registered.
    fn contains(&self, category: &str, function: &str) -> bool {
        self.lookup(category, function).is_some()
    }
}

/// Adapter turning a plain closure into an [`Action`].
///
/// Handy for embedders and tests; long-lived modules usually implement
/// [`Action`] directly.
///
/// # Examples
///
/// ```
/// use converge::outcome::ActionOutcome;
/// use converge::registry::{FnAction, ParamSpec};
/// use serde_json::json;
///
/// let ensure = FnAction::new(
///     ParamSpec::new().required("name").optional("version", json!("latest")),
///     |args| ActionOutcome::ok(format!("{} already at {}", args[0], args[1])),
/// );
/// ```
pub struct FnAction {
    spec: ParamSpec,
    handler: Box<dyn Fn(Vec<Value>) -> ActionOutcome + Send + Sync>,
}

impl FnAction {
    pub fn new(
        spec: ParamSpec,
        handler: impl Fn(Vec<Value>) -> ActionOutcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            spec,
            handler: Box::new(handler),
        }
    }
}

#[async_trait]
impl Action for FnAction {
    fn spec(&self) -> &ParamSpec {
        &self.spec
    }

    async fn apply(&self, args: Vec<Value>) -> ActionOutcome {
        (self.handler)(args)
    }
}

/// Map-backed [`ModuleRegistry`] keyed by `category.function`.
#[derive(Default)]
pub struct InMemoryRegistry {
    actions: FxHashMap<String, Arc<dyn Action>>,
}

impl InMemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action under `category.function`, replacing any
    /// previous registration.
    pub fn register(&mut self, category: &str, function: &str, action: impl Action + 'static) {
        self.actions
            .insert(format!("{category}.{function}"), Arc::new(action));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl ModuleRegistry for InMemoryRegistry {
    fn lookup(&self, category: &str, function: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(&format!("{category}.{function}")).cloned()
    }
}
