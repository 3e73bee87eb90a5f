//! Desired-state document model ("high data").
//!
//! A desired-state document is a dynamic [`serde_json::Value`] mapping from
//! target identifier to a target body. A body maps action-category names to
//! run-lists; a run-list entry is either a bare function name or a parameter
//! mapping that is merged into every record compiled for that target/category.
//!
//! The document format is deliberately untyped: it is produced upstream by a
//! renderer merging arbitrary source documents, so the shape is enforced by
//! [`crate::validator::validate_document`] rather than by the type system.
//!
//! # Reserved keys
//!
//! - Category keys starting with [`RESERVED_PREFIX`] carry document-level
//!   metadata and are skipped by the compiler.
//! - [`SOURCE_KEY`] on a target body records which source document declared
//!   the target (provenance for error messages).
//! - [`NAMES_KEY`] inside a parameter mapping fans one declaration out into
//!   one record per listed name.
//! - [`REQUIRE_KEY`] / [`WATCH_KEY`] hold requisite references and are lifted
//!   out of the parameter set during compilation.

use serde_json::{Map, Value};

/// Prefix marking metadata keys that the compiler must not treat as
/// action categories.
pub const RESERVED_PREFIX: &str = "__";

/// Body key carrying the identifier of the source document that declared
/// the target.
pub const SOURCE_KEY: &str = "__source__";

/// Parameter-mapping key triggering fan-out: one record per listed name.
pub const NAMES_KEY: &str = "names";

/// Parameter-mapping key holding hard requisite references.
pub const REQUIRE_KEY: &str = "require";

/// Parameter-mapping key holding reactive requisite references.
pub const WATCH_KEY: &str = "watch";

/// Returns `true` for keys reserved for document-level metadata.
#[must_use]
pub fn is_reserved(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

/// Extracts the provenance tag from a target body, if present.
#[must_use]
pub fn provenance(body: &Map<String, Value>) -> Option<&str> {
    body.get(SOURCE_KEY).and_then(Value::as_str)
}
