//! End-to-end batches through the engine: validation gating, requisite
//! semantics, and the reactive watch path.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{call_log, counting_action, logged_calls, pure_action, recording_action};
use converge::engine::StateEngine;
use converge::outcome::ActionOutcome;
use converge::registry::{InMemoryRegistry, ParamSpec};
use converge::validator::ValidationError;
use serde_json::json;

#[tokio::test]
async fn validation_gate_blocks_the_whole_batch() {
    let mut registry = InMemoryRegistry::new();
    let (action, calls) = counting_action(
        ParamSpec::new().required("name"),
        ActionOutcome::ok("installed"),
    );
    registry.register("pkg", "ensure", action);

    // The pkg declaration is fine; the svc declaration references an
    // unregistered action. Nothing at all may run.
    let engine = StateEngine::new(Arc::new(registry));
    let doc = json!({
        "pkgA": {"pkg": ["ensure"]},
        "svcA": {"svc": ["running"]},
    });

    let errors = engine.compile_and_run(&doc).await.unwrap_err();
    assert_eq!(
        errors,
        vec![ValidationError::UnknownAction {
            callable: "svc.running".into(),
            provenance: None,
        }]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn run_lists_without_functions_fail_instead_of_converging_empty() {
    let mut registry = InMemoryRegistry::new();
    let (pkg, pkg_calls) = counting_action(
        ParamSpec::new().required("name"),
        ActionOutcome::ok("installed"),
    );
    let (svc, _) = counting_action(
        ParamSpec::new().required("name"),
        ActionOutcome::ok("started"),
    );
    registry.register("pkg", "ensure", pkg);
    registry.register("svc", "running", svc);

    // Parameter mappings only; no run-list names a function. This must be
    // a validation error, not an empty batch that reports success.
    let engine = StateEngine::new(Arc::new(registry));
    let doc = json!({
        "pkgA": {"pkg": [{"ensure": "installed"}]},
        "svcA": {"svc": [{"running": true, "require": [{"pkg": "pkgA"}]}]},
    });

    let errors = engine.compile_and_run(&doc).await.unwrap_err();
    assert_eq!(
        errors,
        vec![
            ValidationError::NoFunctionDeclared {
                target: "pkgA".into(),
                category: "pkg".into(),
                provenance: None,
            },
            ValidationError::NoFunctionDeclared {
                target: "svcA".into(),
                category: "svc".into(),
                provenance: None,
            },
        ]
    );
    assert_eq!(pkg_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn require_failure_propagates_without_invoking_the_dependent() {
    let mut registry = InMemoryRegistry::new();
    let (pkg, _) = counting_action(
        ParamSpec::new().required("name"),
        ActionOutcome::failed("package repo unreachable"),
    );
    let (svc, svc_calls) = counting_action(
        ParamSpec::new().required("name"),
        ActionOutcome::ok("started"),
    );
    registry.register("pkg", "ensure", pkg);
    registry.register("svc", "running", svc);

    let engine = StateEngine::new(Arc::new(registry));
    let doc = json!({
        "pkgA": {"pkg": ["ensure"]},
        "svcA": {"svc": ["running", {"require": [{"pkg": "pkgA"}]}]},
    });

    let results = engine.compile_and_run(&doc).await.unwrap();
    let dependent = &results["svc.svcA.running"];
    assert!(!dependent.result);
    assert!(dependent.unchanged());
    assert_eq!(dependent.comment, "one or more requirements failed");
    assert_eq!(svc_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sibling_unaffected_by_a_requisite_failure_still_runs() {
    let mut registry = InMemoryRegistry::new();
    let (pkg, _) = counting_action(
        ParamSpec::new().required("name"),
        ActionOutcome::failed("nope"),
    );
    let (svc, svc_calls) = counting_action(
        ParamSpec::new().required("name"),
        ActionOutcome::ok("started"),
    );
    registry.register("pkg", "ensure", pkg);
    registry.register("svc", "running", svc);

    let engine = StateEngine::new(Arc::new(registry));
    let doc = json!({
        "pkgA": {"pkg": ["ensure"]},
        "svcA": {"svc": ["running", {"require": [{"pkg": "pkgA"}]}]},
        "svcB": {"svc": ["running"]},
    });

    let results = engine.compile_and_run(&doc).await.unwrap();
    assert!(!results["svc.svcA.running"].result);
    assert!(results["svc.svcB.running"].result);
    // Only the independent sibling was invoked.
    assert_eq!(svc_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn watch_redirects_to_the_watcher_on_a_noop() {
    let mut registry = InMemoryRegistry::new();
    registry.register(
        "file",
        "managed",
        pure_action(ParamSpec::new().required("name"), |_| {
            ActionOutcome::ok("rewrote config").with_change("diff", json!("-a\n+b"))
        }),
    );
    // The service is already running: its own invocation is a no-op.
    let (running, running_calls) = counting_action(
        ParamSpec::new().required("name"),
        ActionOutcome::ok("already running"),
    );
    let (watcher, watcher_calls) = counting_action(
        ParamSpec::new().required("name"),
        ActionOutcome::ok("service restarted").with_change("restarted", json!(true)),
    );
    registry.register("svc", "running", running);
    registry.register("svc", "watcher", watcher);

    let engine = StateEngine::new(Arc::new(registry));
    let doc = json!({
        "web.conf": {"file": ["managed"]},
        "web": {"svc": ["running", {"watch": [{"file": "web.conf"}]}]},
    });

    let results = engine.compile_and_run(&doc).await.unwrap();
    // The declared function ran first, then the watcher; the stored
    // outcome is the watcher's.
    assert_eq!(running_calls.load(Ordering::SeqCst), 1);
    assert_eq!(watcher_calls.load(Ordering::SeqCst), 1);
    let stored = &results["svc.web.running"];
    assert_eq!(stored.comment, "service restarted");
    assert_eq!(stored.changes.get("restarted"), Some(&json!(true)));
}

#[tokio::test]
async fn watch_without_changes_skips_the_watcher() {
    let mut registry = InMemoryRegistry::new();
    registry.register(
        "file",
        "managed",
        pure_action(ParamSpec::new().required("name"), |_| {
            ActionOutcome::ok("config already correct")
        }),
    );
    let (running, _) = counting_action(
        ParamSpec::new().required("name"),
        ActionOutcome::ok("already running"),
    );
    let (watcher, watcher_calls) = counting_action(
        ParamSpec::new().required("name"),
        ActionOutcome::ok("service restarted"),
    );
    registry.register("svc", "running", running);
    registry.register("svc", "watcher", watcher);

    let engine = StateEngine::new(Arc::new(registry));
    let doc = json!({
        "web.conf": {"file": ["managed"]},
        "web": {"svc": ["running", {"watch": [{"file": "web.conf"}]}]},
    });

    let results = engine.compile_and_run(&doc).await.unwrap();
    assert_eq!(watcher_calls.load(Ordering::SeqCst), 0);
    assert_eq!(results["svc.web.running"].comment, "already running");
}

#[tokio::test]
async fn watch_result_with_own_changes_is_kept() {
    let mut registry = InMemoryRegistry::new();
    registry.register(
        "file",
        "managed",
        pure_action(ParamSpec::new().required("name"), |_| {
            ActionOutcome::ok("rewrote config").with_change("diff", json!("-a\n+b"))
        }),
    );
    registry.register(
        "svc",
        "running",
        pure_action(ParamSpec::new().required("name"), |_| {
            ActionOutcome::ok("started").with_change("started", json!(true))
        }),
    );
    let (watcher, watcher_calls) = counting_action(
        ParamSpec::new().required("name"),
        ActionOutcome::ok("service restarted"),
    );
    registry.register("svc", "watcher", watcher);

    let engine = StateEngine::new(Arc::new(registry));
    let doc = json!({
        "web.conf": {"file": ["managed"]},
        "web": {"svc": ["running", {"watch": [{"file": "web.conf"}]}]},
    });

    let results = engine.compile_and_run(&doc).await.unwrap();
    // The action itself did something; no redirect.
    assert_eq!(watcher_calls.load(Ordering::SeqCst), 0);
    assert_eq!(results["svc.web.running"].comment, "started");
}

#[tokio::test]
async fn watch_degrades_to_require_without_a_registered_watcher() {
    let mut registry = InMemoryRegistry::new();
    registry.register(
        "file",
        "managed",
        pure_action(ParamSpec::new().required("name"), |_| {
            ActionOutcome::failed("permission denied")
        }),
    );
    let (running, running_calls) = counting_action(
        ParamSpec::new().required("name"),
        ActionOutcome::ok("already running"),
    );
    registry.register("svc", "running", running);

    let engine = StateEngine::new(Arc::new(registry));
    let doc = json!({
        "web.conf": {"file": ["managed"]},
        "web": {"svc": ["running", {"watch": [{"file": "web.conf"}]}]},
    });

    let results = engine.compile_and_run(&doc).await.unwrap();
    // No svc.watcher exists, so the watch acts as a hard require and the
    // failed dependency gates the service without invoking it.
    assert_eq!(running_calls.load(Ordering::SeqCst), 0);
    let stored = &results["svc.web.running"];
    assert!(!stored.result);
    assert_eq!(stored.comment, "one or more requirements failed");
}

#[tokio::test]
async fn require_takes_precedence_over_watch() {
    let mut registry = InMemoryRegistry::new();
    registry.register(
        "file",
        "managed",
        pure_action(ParamSpec::new().required("name"), |_| {
            ActionOutcome::ok("rewrote").with_change("diff", json!("x"))
        }),
    );
    let (running, _) = counting_action(
        ParamSpec::new().required("name"),
        ActionOutcome::ok("already running"),
    );
    let (watcher, watcher_calls) = counting_action(
        ParamSpec::new().required("name"),
        ActionOutcome::ok("restarted"),
    );
    registry.register("svc", "running", running);
    registry.register("svc", "watcher", watcher);

    let engine = StateEngine::new(Arc::new(registry));
    let doc = json!({
        "web.conf": {"file": ["managed"]},
        "web": {
            "svc": ["running", {
                "require": [{"file": "web.conf"}],
                "watch": [{"file": "web.conf"}],
            }]
        },
    });

    let results = engine.compile_and_run(&doc).await.unwrap();
    // With require present, watch is ignored: no reactive redirect even
    // though the watched file changed and the service was a no-op.
    assert_eq!(watcher_calls.load(Ordering::SeqCst), 0);
    assert_eq!(results["svc.web.running"].comment, "already running");
}

#[tokio::test]
async fn requisite_ordering_runs_dependencies_first() {
    let mut registry = InMemoryRegistry::new();
    let log = call_log();
    registry.register(
        "pkg",
        "ensure",
        recording_action(
            "pkg.pkgA.ensure",
            &log,
            ActionOutcome::ok("installed").with_change("new", json!("pkgA")),
        ),
    );
    registry.register(
        "svc",
        "running",
        recording_action("svc.svcA.running", &log, ActionOutcome::ok("started")),
    );

    let engine = StateEngine::new(Arc::new(registry));
    let doc = json!({
        "pkgA": {"pkg": [{"ensure": "installed"}, "ensure"]},
        "svcA": {"svc": [{"running": true, "require": [{"pkg": "pkgA"}]}, "running"]},
    });

    let results = engine.compile_and_run(&doc).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.contains_key("pkg.pkgA.ensure"));
    assert!(results.contains_key("svc.svcA.running"));
    assert_eq!(
        logged_calls(&log),
        vec!["pkg.pkgA.ensure".to_string(), "svc.svcA.running".to_string()]
    );
}

#[tokio::test]
async fn rerunning_a_requisite_free_batch_is_idempotent() {
    let mut registry = InMemoryRegistry::new();
    registry.register(
        "pkg",
        "ensure",
        pure_action(
            ParamSpec::new()
                .required("name")
                .optional("version", json!("latest")),
            |args| {
                ActionOutcome::ok(format!("{} at {}", args[0], args[1]))
                    .with_change("installed", args[0].clone())
            },
        ),
    );

    let engine = StateEngine::new(Arc::new(registry));
    let doc = json!({
        "tools": {"pkg": ["ensure", {"names": ["git", "curl"]}]}
    });

    let first = engine.compile_and_run(&doc).await.unwrap();
    let second = engine.compile_and_run(&doc).await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first.keys().collect::<Vec<_>>().len(), second.len());
    for (tag, outcome) in &first {
        let rerun = &second[tag];
        // Timing metadata differs between runs; the result payload must not.
        assert_eq!(outcome.changes, rerun.changes);
        assert_eq!(outcome.result, rerun.result);
        assert_eq!(outcome.comment, rerun.comment);
    }
}

#[tokio::test]
async fn outcomes_carry_execution_metadata() {
    let mut registry = InMemoryRegistry::new();
    registry.register(
        "pkg",
        "ensure",
        pure_action(ParamSpec::new().required("name"), |_| {
            ActionOutcome::ok("present")
        }),
    );

    let engine = StateEngine::new(Arc::new(registry));
    let doc = json!({"a": {"pkg": ["ensure"]}, "b": {"pkg": ["ensure"]}});

    let results = engine.compile_and_run(&doc).await.unwrap();
    let mut run_indexes: Vec<u64> = results
        .values()
        .map(|o| o.extra["run_index"].as_u64().unwrap())
        .collect();
    run_indexes.sort_unstable();
    assert_eq!(run_indexes, vec![0, 1]);
    for outcome in results.values() {
        assert!(outcome.extra.contains_key("start_time"));
        assert!(outcome.extra.contains_key("duration_ms"));
    }
}

#[tokio::test]
async fn duplicate_declarations_fail_before_execution() {
    let mut registry = InMemoryRegistry::new();
    let (action, calls) = counting_action(
        ParamSpec::new().required("name"),
        ActionOutcome::ok("installed"),
    );
    registry.register("pkg", "ensure", action);

    let engine = StateEngine::new(Arc::new(registry));
    // Fan-out to a name that collides with a sibling target declaration.
    let doc = json!({
        "git": {"pkg": ["ensure"]},
        "tools": {"pkg": ["ensure", {"names": ["git"]}]},
    });

    let errors = engine.compile_and_run(&doc).await.unwrap_err();
    assert_eq!(
        errors,
        vec![ValidationError::DuplicateTag {
            tag: "pkg.git.ensure".into()
        }]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
