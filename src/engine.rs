//! Batch entry point: validate, compile, validate again, execute.

use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;

use crate::compiler::compile;
use crate::executor::Executor;
use crate::outcome::ResultsMap;
use crate::record::ActionRecord;
use crate::registry::ModuleRegistry;
use crate::validator::{ValidationError, validate_document, validate_records};

/// The state engine: compiles desired-state documents and runs them through
/// the dependency-aware executor against one module registry.
///
/// # Examples
///
/// ```
/// use converge::engine::StateEngine;
/// use converge::outcome::ActionOutcome;
/// use converge::registry::{FnAction, InMemoryRegistry, ParamSpec};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let mut registry = InMemoryRegistry::new();
/// registry.register(
///     "pkg",
///     "ensure",
///     FnAction::new(ParamSpec::new().required("name"), |args| {
///         ActionOutcome::ok("installed").with_change("new", args[0].clone())
///     }),
/// );
///
/// let engine = StateEngine::new(Arc::new(registry));
/// let doc = json!({"nginx": {"pkg": ["ensure"]}});
/// let results = engine.compile_and_run(&doc).await.map_err(|errs| {
///     errs.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
/// })?;
/// assert!(results["pkg.nginx.ensure"].result);
/// # Ok(())
/// # }
/// ```
pub struct StateEngine {
    registry: Arc<dyn ModuleRegistry>,
    executor: Executor,
}

impl StateEngine {
    #[must_use]
    pub fn new(registry: Arc<dyn ModuleRegistry>) -> Self {
        let executor = Executor::new(Arc::clone(&registry));
        Self { registry, executor }
    }

    /// Compiles a document into a fully validated batch.
    ///
    /// Returns every outstanding error at once rather than the first one, so
    /// callers can report a complete picture to the operator.
    pub fn compile_validated(&self, doc: &Value) -> Result<Vec<ActionRecord>, Vec<ValidationError>> {
        let errors = validate_document(doc);
        if !errors.is_empty() {
            return Err(errors);
        }
        let records = compile(doc);
        let errors = validate_records(&records, self.registry.as_ref());
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(records)
    }

    /// Validates, compiles, and executes one desired-state document.
    ///
    /// The gate is all-or-nothing: no action function is invoked unless the
    /// entire batch passes static validation. A completed batch may still
    /// contain failed outcomes; those are visible per tag in the results
    /// map, not as an `Err`.
    #[instrument(skip_all)]
    pub async fn compile_and_run(&self, doc: &Value) -> Result<ResultsMap, Vec<ValidationError>> {
        let records = self.compile_validated(doc)?;
        tracing::debug!(records = records.len(), "batch validated; executing");
        self.executor
            .run_batch(&records)
            .await
            .map_err(|err| vec![err])
    }
}
