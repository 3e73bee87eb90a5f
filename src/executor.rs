//! Dependency-aware execution of compiled batches.
//!
//! The executor walks the requisite graph iteratively: requisite references
//! are resolved against the batch up front, in-degrees computed, and a ready
//! queue processed in compiled order. Records left unprocessed at the end
//! form a cycle and fail the batch before anything runs. Within the walk two
//! edge semantics apply:
//!
//! - `require` (hard): a failed dependency produces a synthetic failure for
//!   the dependent without invoking it; siblings are unaffected.
//! - `watch` (reactive): a changed dependency triggers the category's
//!   `watcher` handler when the watching record's own invocation was a
//!   no-op. When both are present on a record, `require` semantics win and
//!   `watch` is ignored.
//!
//! The two paths deliberately aggregate differently: `require` by type
//! priority, `watch` by encounter order. Unifying them would change results
//! for mixed-status batches.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use crate::binder::bind;
use crate::outcome::{ActionOutcome, ResultsMap};
use crate::record::{ActionRecord, RequisiteRef};
use crate::registry::{ModuleRegistry, WATCHER_FUNCTION};
use crate::report::log_outcome;
use crate::validator::ValidationError;

/// Comment attached to the synthetic failure stored for a record whose hard
/// requisites did not all succeed.
pub const REQUIREMENTS_FAILED: &str = "one or more requirements failed";

/// Computes a topological execution order over the batch's requisite graph.
///
/// Both `require` and `watch` references contribute edges. The ready queue
/// is seeded and drained in compiled (sorted) order, so the result is
/// deterministic for a given batch. Records left with unsatisfied in-degree
/// form a cycle and are reported by tag.
pub(crate) fn execution_order(records: &[ActionRecord]) -> Result<Vec<usize>, ValidationError> {
    let mut indegree = vec![0usize; records.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    for (i, record) in records.iter().enumerate() {
        for req in record.require.iter().chain(record.watch.iter()) {
            for (j, dep) in records.iter().enumerate() {
                // A self-match counts as an edge so that a record requiring
                // itself surfaces as a cycle instead of hanging.
                if req.matches(dep) {
                    dependents[j].push(i);
                    indegree[i] += 1;
                }
            }
        }
    }

    let mut ready: VecDeque<usize> = (0..records.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(records.len());
    while let Some(i) = ready.pop_front() {
        order.push(i);
        for &dependent in &dependents[i] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.push_back(dependent);
            }
        }
    }

    if order.len() != records.len() {
        let mut tags: Vec<String> = records
            .iter()
            .enumerate()
            .filter(|(i, _)| indegree[*i] > 0)
            .map(|(_, record)| record.tag())
            .collect();
        tags.sort();
        return Err(ValidationError::RequisiteCycle { tags });
    }
    Ok(order)
}

/// Runs compiled batches against a module registry.
///
/// Holds no per-batch state: the results map lives on the call stack of
/// [`run_batch`](Self::run_batch), so one executor may serve concurrent
/// batches.
pub struct Executor {
    registry: Arc<dyn ModuleRegistry>,
}

impl Executor {
    #[must_use]
    pub fn new(registry: Arc<dyn ModuleRegistry>) -> Self {
        Self { registry }
    }

    /// Executes every record of a compiled batch, honoring requisite edges,
    /// and returns one outcome per identity tag.
    ///
    /// Records are processed sequentially in a topological order of the
    /// requisite graph; a cycle fails the whole batch before any action is
    /// invoked. Each stored outcome is stamped with `run_index`,
    /// `start_time`, and `duration_ms` in its `extra` keys.
    #[instrument(skip_all, fields(batch_len = records.len()))]
    pub async fn run_batch(
        &self,
        records: &[ActionRecord],
    ) -> Result<ResultsMap, ValidationError> {
        let order = execution_order(records)?;
        let mut results = ResultsMap::default();
        for (run_index, index) in order.into_iter().enumerate() {
            let record = &records[index];
            let tag = record.tag();
            tracing::debug!(%tag, run_index, "resolving record");

            let mut outcome = self.resolve(record, records, &results).await;
            outcome
                .extra
                .insert("run_index".into(), json!(run_index as u64));
            log_outcome(&tag, &record.name, &outcome);
            results.insert(tag, outcome);
        }
        Ok(results)
    }

    /// Settles one record's requisites against the results gathered so far
    /// and produces its outcome.
    async fn resolve(
        &self,
        record: &ActionRecord,
        records: &[ActionRecord],
        results: &ResultsMap,
    ) -> ActionOutcome {
        // A watch on a category without a registered watcher degrades to a
        // hard require: the reactive redirect would have nowhere to go, but
        // the ordering and failure gating still apply.
        let mut require = record.require.clone();
        let mut watch = record.watch.clone();
        if !watch.is_empty() && !self.registry.contains(&record.category, WATCHER_FUNCTION) {
            tracing::debug!(
                category = %record.category,
                "no watcher registered; folding watch into require"
            );
            require.append(&mut watch);
        }

        if !require.is_empty() {
            if requirement_failed(&require, records, results) {
                return ActionOutcome::failed(REQUIREMENTS_FAILED);
            }
            return self.invoke(record, &record.function).await;
        }

        if !watch.is_empty() {
            let outcome = self.invoke(record, &record.function).await;
            if watch_triggered(&watch, records, results) && outcome.unchanged() {
                tracing::debug!(tag = %record.tag(), "watched change with no-op; redirecting to watcher");
                return self.invoke(record, WATCHER_FUNCTION).await;
            }
            return outcome;
        }

        self.invoke(record, &record.function).await
    }

    /// Binds and invokes `<record.category>.<function>`, leaving the record
    /// untouched; the watch redirect passes the alternate handler name here
    /// instead of rewriting the record.
    async fn invoke(&self, record: &ActionRecord, function: &str) -> ActionOutcome {
        let Some(action) = self.registry.lookup(&record.category, function) else {
            return ActionOutcome::failed(format!(
                "action '{}.{}' was not found",
                record.category, function
            ));
        };
        let args = match bind(record, action.spec()) {
            Ok(args) => args,
            Err(err) => return ActionOutcome::failed(err.to_string()),
        };

        let started = Utc::now();
        let clock = Instant::now();
        let mut outcome = action.apply(args).await;
        outcome
            .extra
            .insert("start_time".into(), json!(started.to_rfc3339()));
        outcome.extra.insert(
            "duration_ms".into(),
            json!(u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX)),
        );
        outcome
    }
}

/// Hard-requisite aggregation: with dependencies already executed, any
/// resolved requisite that failed fails the dependent. References matching
/// zero records contribute nothing.
fn requirement_failed(
    require: &[RequisiteRef],
    records: &[ActionRecord],
    results: &ResultsMap,
) -> bool {
    for req in require {
        for dep in records.iter().filter(|r| req.matches(r)) {
            if let Some(outcome) = results.get(&dep.tag())
                && !outcome.result
            {
                return true;
            }
        }
    }
    false
}

/// Reactive aggregation: scan requisites in encounter order and stop at the
/// first watched record that reported changes.
fn watch_triggered(watch: &[RequisiteRef], records: &[ActionRecord], results: &ResultsMap) -> bool {
    for req in watch {
        for dep in records.iter().filter(|r| req.matches(r)) {
            if let Some(outcome) = results.get(&dep.tag())
                && !outcome.unchanged()
            {
                return true;
            }
        }
    }
    false
}
