//! Structural validation of documents and compiled records.
//!
//! Validation is two-phase and entirely static: [`validate_document`] does
//! shallow shape checks on the raw desired-state document, and
//! [`validate_records`] checks every compiled record against the module
//! registry's declared signatures, enforces identity-tag uniqueness, and
//! rejects requisite cycles. Errors are plain values; nothing here panics or
//! raises, and no action is ever invoked while any error is outstanding.

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::executor::execution_order;
use crate::record::ActionRecord;
use crate::registry::ModuleRegistry;

/// A structural or schema problem found before execution.
///
/// Any non-empty list of these aborts the whole batch; there is no partial
/// execution of the valid subset.
#[derive(Clone, Debug, PartialEq, Error, Diagnostic)]
pub enum ValidationError {
    /// The desired-state document is not a mapping at the top level.
    #[error("desired-state document must be a mapping of target identifiers to bodies")]
    #[diagnostic(code(converge::validate::document_shape))]
    DocumentNotMapping,

    /// A target body is not a mapping of categories to run-lists.
    #[error("target '{target}' must map action categories to run-lists")]
    #[diagnostic(code(converge::validate::body_shape))]
    BodyNotMapping { target: String },

    /// A run-list is not a sequence.
    #[error("run-list for '{target}.{category}' must be a sequence")]
    #[diagnostic(code(converge::validate::run_list_shape))]
    RunListNotSequence { target: String, category: String },

    /// A run-list entry is neither a function name nor a parameter mapping.
    #[error("entry in run-list for '{target}.{category}' must be a function name or a parameter mapping")]
    #[diagnostic(code(converge::validate::run_entry_shape))]
    RunEntryShape { target: String, category: String },

    /// A run-list carries parameters but never names a function, so nothing
    /// would compile from it.
    #[error(
        "no function declared in run-list for '{target}.{category}'{}",
        .provenance.as_deref().map(|s| format!(" (declared in '{s}')")).unwrap_or_default()
    )]
    #[diagnostic(
        code(converge::validate::no_function),
        help("Add a bare function name string to the run-list.")
    )]
    NoFunctionDeclared {
        target: String,
        category: String,
        provenance: Option<String>,
    },

    /// A compiled record is missing one of its required fields.
    #[error("missing \"{field}\" data")]
    #[diagnostic(code(converge::validate::missing_field))]
    MissingField { field: &'static str },

    /// The record references a callable absent from the registry.
    #[error(
        "action '{callable}' was not found{}",
        .provenance.as_deref().map(|s| format!(" (declared in '{s}')")).unwrap_or_default()
    )]
    #[diagnostic(
        code(converge::validate::unknown_action),
        help("Check the category and function spelling against the module catalog.")
    )]
    UnknownAction {
        callable: String,
        provenance: Option<String>,
    },

    /// A required parameter of the declared signature is not bound.
    #[error("missing parameter {parameter} for {callable}")]
    #[diagnostic(code(converge::validate::missing_parameter))]
    MissingParameter { parameter: String, callable: String },

    /// Two declarations compiled to the same identity tag; their results
    /// would silently overwrite each other.
    #[error("duplicate identity tag '{tag}' compiled from more than one declaration")]
    #[diagnostic(
        code(converge::validate::duplicate_tag),
        help("Rename one declaration so category.name.function is unique within the batch.")
    )]
    DuplicateTag { tag: String },

    /// The requisite graph contains a cycle.
    #[error("requisite cycle detected among: {}", .tags.join(", "))]
    #[diagnostic(
        code(converge::validate::requisite_cycle),
        help("Remove one require/watch edge from the listed records to break the cycle.")
    )]
    RequisiteCycle { tags: Vec<String> },
}

/// Shallow shape check of the raw desired-state document.
///
/// Deep validation of action records happens after compilation in
/// [`validate_records`]; this rejects documents the compiler could not walk
/// meaningfully, plus run-lists that would compile to nothing because they
/// never name a function.
#[must_use]
pub fn validate_document(doc: &Value) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let Some(targets) = doc.as_object() else {
        errors.push(ValidationError::DocumentNotMapping);
        return errors;
    };
    for (target, body) in targets {
        if crate::document::is_reserved(target) {
            continue;
        }
        let Some(body) = body.as_object() else {
            errors.push(ValidationError::BodyNotMapping {
                target: target.clone(),
            });
            continue;
        };
        let provenance = crate::document::provenance(body).map(str::to_string);
        for (category, run_list) in body {
            if crate::document::is_reserved(category) {
                continue;
            }
            let Some(entries) = run_list.as_array() else {
                errors.push(ValidationError::RunListNotSequence {
                    target: target.clone(),
                    category: category.clone(),
                });
                continue;
            };
            for entry in entries {
                if !matches!(entry, Value::String(_) | Value::Object(_)) {
                    errors.push(ValidationError::RunEntryShape {
                        target: target.clone(),
                        category: category.clone(),
                    });
                }
            }
            // Parameter mappings alone compile to nothing; a run-list must
            // name at least one function.
            if !entries.iter().any(Value::is_string) {
                errors.push(ValidationError::NoFunctionDeclared {
                    target: target.clone(),
                    category: category.clone(),
                    provenance: provenance.clone(),
                });
            }
        }
    }
    errors
}

/// Checks one compiled record against the registry's declared signature.
pub fn validate_record(
    record: &ActionRecord,
    registry: &dyn ModuleRegistry,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if record.category.is_empty() {
        errors.push(ValidationError::MissingField { field: "category" });
    }
    if record.function.is_empty() {
        errors.push(ValidationError::MissingField { field: "function" });
    }
    if record.name.is_empty() {
        errors.push(ValidationError::MissingField { field: "name" });
    }
    if !errors.is_empty() {
        return errors;
    }

    let Some(action) = registry.lookup(&record.category, &record.function) else {
        errors.push(ValidationError::UnknownAction {
            callable: record.callable(),
            provenance: record.provenance.clone(),
        });
        return errors;
    };

    for required in action.spec().required_names() {
        if !record.binds(required) {
            errors.push(ValidationError::MissingParameter {
                parameter: required.to_string(),
                callable: record.callable(),
            });
        }
    }
    errors
}

/// Validates a whole compiled batch.
///
/// Concatenates per-record schema errors, then adds batch-level checks:
/// identity-tag uniqueness and requisite-cycle detection.
pub fn validate_records(
    records: &[ActionRecord],
    registry: &dyn ModuleRegistry,
) -> Vec<ValidationError> {
    let mut errors: Vec<ValidationError> = records
        .iter()
        .flat_map(|record| validate_record(record, registry))
        .collect();

    let mut seen = rustc_hash::FxHashSet::default();
    for record in records {
        let tag = record.tag();
        if !seen.insert(tag.clone()) {
            errors.push(ValidationError::DuplicateTag { tag });
        }
    }

    if let Err(cycle) = execution_order(records) {
        errors.push(cycle);
    }
    errors
}
