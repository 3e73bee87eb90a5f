//! Upstream glue: resolving which documents apply to a host and merging
//! them into one desired-state document.
//!
//! The engine core knows nothing about routing or rendering; this module
//! defines the interface boundary. A routing ("top") document maps
//! environments to match expressions to document-id lists; a
//! [`TargetMatcher`] decides which expressions apply to the current host,
//! and a [`Renderer`] turns a document id into desired-state data. The
//! assembled result feeds [`crate::engine::StateEngine::compile_and_run`].

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::document::SOURCE_KEY;

/// Errors raised while resolving or assembling documents for a host.
#[derive(Clone, Debug, PartialEq, Error, Diagnostic)]
pub enum OrchestrationError {
    /// The routing document does not have the environment → expression →
    /// document-list shape.
    #[error("routing document must map environments to match expressions to document lists")]
    #[diagnostic(code(converge::orchestrate::top_shape))]
    TopShape,

    /// The renderer failed for a document id.
    #[error("failed to render document '{id}': {reason}")]
    #[diagnostic(code(converge::orchestrate::render))]
    Render { id: String, reason: String },

    /// Two source documents declare the same target identifier; merging
    /// them would silently drop one declaration.
    #[error("target '{target}' is declared by both '{first}' and '{second}'")]
    #[diagnostic(code(converge::orchestrate::duplicate_target))]
    DuplicateTarget {
        target: String,
        first: String,
        second: String,
    },
}

/// Turns a source document id into desired-state data.
///
/// `Ok(None)` means the document rendered empty (a legal no-op), as opposed
/// to a render failure.
pub trait Renderer: Send + Sync {
    fn render(&self, id: &str) -> Result<Option<Value>, OrchestrationError>;
}

/// Decides whether a routing-document match expression applies to the
/// current host. Expression syntax (globs, node groups, grains) is the
/// implementer's concern.
pub trait TargetMatcher: Send + Sync {
    fn confirm(&self, expression: &str) -> bool;
}

/// Resolves the routing document to the list of document ids that apply to
/// the current host, in routing-document order and deduplicated.
pub fn resolve_top(
    top: &Value,
    matcher: &dyn TargetMatcher,
) -> Result<Vec<String>, OrchestrationError> {
    let Some(environments) = top.as_object() else {
        return Err(OrchestrationError::TopShape);
    };
    let mut ids: Vec<String> = Vec::new();
    for (environment, matches) in environments {
        let Some(matches) = matches.as_object() else {
            return Err(OrchestrationError::TopShape);
        };
        for (expression, documents) in matches {
            if !matcher.confirm(expression) {
                continue;
            }
            tracing::debug!(%environment, %expression, "match expression confirmed");
            let Some(documents) = documents.as_array() else {
                return Err(OrchestrationError::TopShape);
            };
            for doc in documents {
                if let Some(id) = doc.as_str()
                    && !ids.iter().any(|existing| existing == id)
                {
                    ids.push(id.to_string());
                }
            }
        }
    }
    Ok(ids)
}

/// Renders each document id and merges the results into one desired-state
/// document, tagging every target body with its originating document under
/// the reserved provenance key.
pub fn assemble(ids: &[String], renderer: &dyn Renderer) -> Result<Value, OrchestrationError> {
    let mut merged = Map::new();
    let mut origin: FxHashMap<String, String> = FxHashMap::default();
    for id in ids {
        let Some(rendered) = renderer.render(id)? else {
            tracing::debug!(%id, "document rendered empty");
            continue;
        };
        let Some(targets) = rendered.as_object() else {
            return Err(OrchestrationError::Render {
                id: id.clone(),
                reason: "rendered document is not a mapping".into(),
            });
        };
        for (target, body) in targets {
            if let Some(first) = origin.get(target) {
                return Err(OrchestrationError::DuplicateTarget {
                    target: target.clone(),
                    first: first.clone(),
                    second: id.clone(),
                });
            }
            let mut body = body.clone();
            if let Some(body) = body.as_object_mut() {
                body.entry(SOURCE_KEY.to_string()).or_insert(json!(id));
            }
            origin.insert(target.clone(), id.clone());
            merged.insert(target.clone(), body);
        }
    }
    Ok(Value::Object(merged))
}
