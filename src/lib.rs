//! # Converge: Declarative State Compiler & Dependency-Aware Executor
//!
//! Converge takes a description of the *desired state* of a machine, a
//! nested document mapping named targets to module/function invocations with
//! parameters, and determines which actions must run, in what order, and
//! executes them while honoring explicit `require` (hard) and `watch`
//! (reactive) relationships between actions.
//!
//! ## Core Concepts
//!
//! - **Desired-state document**: dynamic JSON mapping targets to action
//!   declarations, produced upstream by a renderer
//! - **Action record**: one compiled, directly executable unit of work,
//!   identified by its `category.name.function` tag
//! - **Module registry**: read-only catalog of pluggable actions, each with
//!   a statically declared parameter signature
//! - **Executor**: iterative topological walk of the requisite graph with
//!   fail-fast `require` propagation and reactive `watch` redirects
//!
//! ## Quick Start
//!
//! ```
//! use converge::engine::StateEngine;
//! use converge::outcome::ActionOutcome;
//! use converge::registry::{FnAction, InMemoryRegistry, ParamSpec};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = InMemoryRegistry::new();
//! registry.register(
//!     "pkg",
//!     "ensure",
//!     FnAction::new(ParamSpec::new().required("name"), |args| {
//!         ActionOutcome::ok("installed").with_change("new", args[0].clone())
//!     }),
//! );
//! registry.register(
//!     "svc",
//!     "running",
//!     FnAction::new(ParamSpec::new().required("name"), |_| {
//!         ActionOutcome::ok("service started")
//!     }),
//! );
//!
//! let engine = StateEngine::new(Arc::new(registry));
//! let doc = json!({
//!     "nginx": {
//!         "pkg": ["ensure"],
//!         "svc": ["running", {"require": [{"pkg": "nginx"}]}],
//!     }
//! });
//!
//! let results = engine
//!     .compile_and_run(&doc)
//!     .await
//!     .expect("document validates");
//! assert!(results["pkg.nginx.ensure"].result);
//! assert!(results["svc.nginx.running"].result);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Validation failures are values, not faults: [`StateEngine::compile_and_run`]
//! returns `Err(Vec<ValidationError>)` before any action is invoked, and a
//! completed batch reports per-action failures inside the results map. The
//! only batch-level runtime error is a requisite cycle, which is also caught
//! statically by [`validator::validate_records`].
//!
//! [`StateEngine::compile_and_run`]: engine::StateEngine::compile_and_run
//! [`ValidationError`]: validator::ValidationError
//!
//! ## Module Guide
//!
//! - [`document`] - Desired-state document model and reserved keys
//! - [`record`] - Compiled action records and requisite references
//! - [`registry`] - Module registry contract and parameter signatures
//! - [`outcome`] - Action results and the batch results map
//! - [`validator`] - Structural validation of documents and records
//! - [`compiler`] - Flattening documents into sorted record batches
//! - [`binder`] - Named-to-positional argument binding
//! - [`executor`] - Dependency-aware batch execution
//! - [`report`] - Log-friendly outcome rendering
//! - [`engine`] - The validate → compile → execute entry point
//! - [`orchestrator`] - Routing/rendering interface boundary
//! - [`telemetry`] - Tracing subscriber setup

pub mod binder;
pub mod compiler;
pub mod document;
pub mod engine;
pub mod executor;
pub mod orchestrator;
pub mod outcome;
pub mod record;
pub mod registry;
pub mod report;
pub mod telemetry;
pub mod validator;
