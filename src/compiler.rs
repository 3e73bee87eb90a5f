//! Compilation of desired-state documents into flat action records.

use serde_json::Value;

use crate::document::{self, NAMES_KEY, REQUIRE_KEY, WATCH_KEY};
use crate::record::{ActionRecord, RequisiteRef};

/// Flattens a desired-state document into an ordered list of action records.
///
/// For every non-reserved `(target, body)` pair and every non-reserved
/// `(category, run-list)` within it, a base record is built from the target
/// name, the body's provenance tag, and the merged parameter mappings of the
/// run-list. Bare strings in the run-list select which functions of the
/// category run; a `names` list fans the declaration out into one record per
/// `(name, function)` pair, each inheriting the shared parameters with
/// `name` overridden.
///
/// The returned list is sorted by `category + name + function`. That order is
/// a deterministic default iteration order only; requisite edges decide the
/// actual execution order.
///
/// Shape problems are not reported here. [`validate_document`] runs before
/// compilation and [`validate_records`] after it; anything unparseable in
/// between is skipped.
///
/// [`validate_document`]: crate::validator::validate_document
/// [`validate_records`]: crate::validator::validate_records
///
/// # Examples
///
/// ```
/// use converge::compiler::compile;
/// use serde_json::json;
///
/// let doc = json!({
///     "web": {
///         "pkg": ["ensure", {"names": ["nginx", "certbot"]}],
///     }
/// });
/// let records = compile(&doc);
/// let tags: Vec<_> = records.iter().map(|r| r.tag()).collect();
/// assert_eq!(tags, vec!["pkg.certbot.ensure", "pkg.nginx.ensure"]);
/// ```
#[must_use]
pub fn compile(doc: &Value) -> Vec<ActionRecord> {
    let mut records = Vec::new();
    let Some(targets) = doc.as_object() else {
        return records;
    };
    for (target, body) in targets {
        if document::is_reserved(target) {
            continue;
        }
        let Some(body) = body.as_object() else {
            continue;
        };
        let provenance = document::provenance(body).map(str::to_string);
        for (category, run_list) in body {
            if document::is_reserved(category) {
                continue;
            }
            let Some(entries) = run_list.as_array() else {
                continue;
            };

            let mut functions: Vec<String> = Vec::new();
            let mut names: Vec<String> = Vec::new();
            let mut base = ActionRecord::base(category.clone(), target.clone(), provenance.clone());

            for entry in entries {
                match entry {
                    Value::String(function) => {
                        if !functions.contains(function) {
                            functions.push(function.clone());
                        }
                    }
                    Value::Object(params) => {
                        for (key, value) in params {
                            match key.as_str() {
                                NAMES_KEY => collect_names(value, &mut names),
                                REQUIRE_KEY => base.require.extend(parse_requisites(value)),
                                WATCH_KEY => base.watch.extend(parse_requisites(value)),
                                _ => {
                                    base.params.insert(key.clone(), value.clone());
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }

            if names.is_empty() {
                for function in &functions {
                    let mut record = base.clone();
                    record.function = function.clone();
                    records.push(record);
                }
            } else {
                for name in &names {
                    for function in &functions {
                        let mut record = base.clone();
                        record.name = name.clone();
                        record.function = function.clone();
                        records.push(record);
                    }
                }
            }
        }
    }
    records.sort_by_key(ActionRecord::sort_key);
    records
}

fn collect_names(value: &Value, names: &mut Vec<String>) {
    let Some(list) = value.as_array() else {
        return;
    };
    for entry in list {
        if let Some(name) = entry.as_str()
            && !names.iter().any(|n| n == name)
        {
            names.push(name.to_string());
        }
    }
}

fn parse_requisites(value: &Value) -> Vec<RequisiteRef> {
    let Some(list) = value.as_array() else {
        tracing::warn!("requisite declaration is not a sequence; ignoring");
        return Vec::new();
    };
    list.iter()
        .filter_map(|entry| {
            let parsed = RequisiteRef::from_value(entry);
            if parsed.is_none() {
                tracing::warn!(?entry, "malformed requisite reference; ignoring");
            }
            parsed
        })
        .collect()
}
