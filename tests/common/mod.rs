//! Shared helpers for integration tests: registries whose actions count
//! their invocations and record execution order.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use converge::outcome::ActionOutcome;
use converge::registry::{FnAction, ParamSpec};
use serde_json::Value;

/// Journal of invocations, in execution order, shared across actions.
pub type CallLog = Arc<Mutex<Vec<String>>>;

#[must_use]
pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[must_use]
pub fn logged_calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// An action that records `label` into the log and returns a fixed outcome.
pub fn recording_action(label: &str, log: &CallLog, outcome: ActionOutcome) -> FnAction {
    let label = label.to_string();
    let log = Arc::clone(log);
    FnAction::new(ParamSpec::new().required("name"), move |_| {
        log.lock().unwrap().push(label.clone());
        outcome.clone()
    })
}

/// An action that counts invocations and returns a fixed outcome.
pub fn counting_action(
    spec: ParamSpec,
    outcome: ActionOutcome,
) -> (FnAction, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let action = FnAction::new(spec, move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        outcome.clone()
    });
    (action, calls)
}

/// An action computing its outcome from the bound arguments.
pub fn pure_action(
    spec: ParamSpec,
    f: impl Fn(&[Value]) -> ActionOutcome + Send + Sync + 'static,
) -> FnAction {
    FnAction::new(spec, move |args| f(&args))
}
