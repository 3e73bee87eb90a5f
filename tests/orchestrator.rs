//! Full pipeline: routing document → render + merge → engine batch.

mod common;

use std::sync::Arc;

use common::pure_action;
use converge::engine::StateEngine;
use converge::orchestrator::{OrchestrationError, Renderer, TargetMatcher, assemble, resolve_top};
use converge::outcome::ActionOutcome;
use converge::registry::{InMemoryRegistry, ParamSpec};
use serde_json::{Value, json};

struct HostMatcher {
    host: &'static str,
}

impl TargetMatcher for HostMatcher {
    fn confirm(&self, expression: &str) -> bool {
        expression == "*" || expression == self.host
    }
}

struct FixtureRenderer;

impl Renderer for FixtureRenderer {
    fn render(&self, id: &str) -> Result<Option<Value>, OrchestrationError> {
        match id {
            "base/common" => Ok(Some(json!({
                "git": {"pkg": ["ensure"]}
            }))),
            "base/web" => Ok(Some(json!({
                "nginx": {
                    "pkg": ["ensure"],
                    "svc": ["running", {"require": [{"pkg": "nginx"}]}],
                }
            }))),
            "base/empty" => Ok(None),
            other => Err(OrchestrationError::Render {
                id: other.to_string(),
                reason: "unknown document".into(),
            }),
        }
    }
}

fn registry() -> InMemoryRegistry {
    let mut registry = InMemoryRegistry::new();
    registry.register(
        "pkg",
        "ensure",
        pure_action(ParamSpec::new().required("name"), |args| {
            ActionOutcome::ok("installed").with_change("new", args[0].clone())
        }),
    );
    registry.register(
        "svc",
        "running",
        pure_action(ParamSpec::new().required("name"), |_| {
            ActionOutcome::ok("started")
        }),
    );
    registry
}

#[tokio::test]
async fn routed_documents_converge_end_to_end() {
    let top = json!({
        "base": {
            "*": ["base/common", "base/empty"],
            "web-01": ["base/web"],
            "db-01": ["base/db"],
        }
    });

    let ids = resolve_top(&top, &HostMatcher { host: "web-01" }).unwrap();
    assert_eq!(ids, vec!["base/common", "base/empty", "base/web"]);

    let doc = assemble(&ids, &FixtureRenderer).unwrap();
    let engine = StateEngine::new(Arc::new(registry()));
    let results = engine.compile_and_run(&doc).await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results["pkg.git.ensure"].result);
    assert!(results["pkg.nginx.ensure"].result);
    assert!(results["svc.nginx.running"].result);
}

#[tokio::test]
async fn provenance_flows_into_validation_messages() {
    let ids = vec!["base/web".to_string()];
    let doc = assemble(&ids, &FixtureRenderer).unwrap();

    // A registry missing svc.running: the error should name the source
    // document the declaration came from.
    let mut registry = InMemoryRegistry::new();
    registry.register(
        "pkg",
        "ensure",
        pure_action(ParamSpec::new().required("name"), |_| {
            ActionOutcome::ok("installed")
        }),
    );
    let engine = StateEngine::new(Arc::new(registry));

    let errors = engine.compile_and_run(&doc).await.unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "action 'svc.running' was not found (declared in 'base/web')"
    );
}

#[tokio::test]
async fn render_failures_stop_assembly() {
    let ids = vec!["base/unknown".to_string()];
    let err = assemble(&ids, &FixtureRenderer).unwrap_err();
    assert!(matches!(err, OrchestrationError::Render { id, .. } if id == "base/unknown"));
}
