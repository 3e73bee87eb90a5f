//! Compiled action records ("low chunks") and requisite references.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A reference from one record to another target's declared action(s).
///
/// Requisite references identify records by equality of `category` and
/// `name`, not by full identity tag, so a single reference may match zero,
/// one, or several records in a batch (e.g. after `names` fan-out).
///
/// In document form a requisite is a single-entry mapping:
/// `{"pkg": "nginx"}` references every compiled record with category `pkg`
/// and name `nginx`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequisiteRef {
    /// Action category of the referenced record(s).
    pub category: String,
    /// Target name of the referenced record(s).
    pub target: String,
}

impl RequisiteRef {
    pub fn new(category: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            target: target.into(),
        }
    }

    /// Parses the document form: a single-entry `{category: target}` mapping.
    ///
    /// Returns `None` for anything else; shape problems in requisite lists
    /// are reported by the validator, not here.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        if map.len() != 1 {
            return None;
        }
        let (category, target) = map.iter().next()?;
        Some(Self::new(category.clone(), target.as_str()?))
    }

    /// Whether this reference selects the given record.
    #[must_use]
    pub fn matches(&self, record: &ActionRecord) -> bool {
        record.category == self.category && record.name == self.target
    }
}

/// One compiled, directly executable unit of work.
///
/// Records are produced once per batch by [`crate::compiler::compile`] and
/// are read-only afterwards: the reactive watch redirect builds a fresh
/// invocation against the alternate handler instead of rewriting `function`
/// in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Action-category name (`pkg`, `svc`, ...).
    pub category: String,
    /// Function of the category to invoke.
    pub function: String,
    /// Target name; defaults to the declaring target identifier unless
    /// overridden by `names` fan-out.
    pub name: String,
    /// Identifier of the source document that declared this record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
    /// Hard requisites: referenced records must have succeeded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require: Vec<RequisiteRef>,
    /// Reactive requisites: changes in referenced records trigger the
    /// category's `watcher` handler when this record itself is a no-op.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watch: Vec<RequisiteRef>,
    /// Category-specific parameters merged from the run-list.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl ActionRecord {
    /// Builds the base record for a `(target, category)` pair.
    #[must_use]
    pub fn base(
        category: impl Into<String>,
        name: impl Into<String>,
        provenance: Option<String>,
    ) -> Self {
        Self {
            category: category.into(),
            function: String::new(),
            name: name.into(),
            provenance,
            require: Vec::new(),
            watch: Vec::new(),
            params: Map::new(),
        }
    }

    /// Identity tag: `<category>.<name>.<function>`, the key into the
    /// results map. Uniqueness within a batch is enforced by
    /// [`crate::validator::validate_records`].
    #[must_use]
    pub fn tag(&self) -> String {
        format!("{}.{}.{}", self.category, self.name, self.function)
    }

    /// Fully qualified callable: `<category>.<function>`.
    #[must_use]
    pub fn callable(&self) -> String {
        format!("{}.{}", self.category, self.function)
    }

    /// Sort key for deterministic default iteration order. This is not the
    /// dependency-resolution order; requisite edges constrain execution.
    #[must_use]
    pub fn sort_key(&self) -> String {
        format!("{}{}{}", self.category, self.name, self.function)
    }

    /// Whether `key` is bound by this record when mapping parameters onto a
    /// declared signature. The record's own `name` is always bindable.
    #[must_use]
    pub fn binds(&self, key: &str) -> bool {
        key == "name" || self.params.contains_key(key)
    }

    /// The value bound for `key`, cloned for positional argument lists.
    #[must_use]
    pub fn bound_value(&self, key: &str) -> Option<Value> {
        if key == "name" {
            return Some(Value::String(self.name.clone()));
        }
        self.params.get(key).cloned()
    }
}
