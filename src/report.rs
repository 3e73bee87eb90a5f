//! Log-friendly rendering of action outcomes.
//!
//! Purely observational: formatting never influences control flow and must
//! not fail the batch.

use serde_json::{Map, Value};

use crate::outcome::ActionOutcome;

/// Renders one outcome into a log message.
///
/// Empty `changes` reports a no-op. Two structured change shapes are
/// recognized: a unified-diff string under `diff`, and a collection of
/// `{old, new}` value pairs keyed by item. Anything else falls back to a
/// generic rendering of the changes mapping.
///
/// # Examples
///
/// ```
/// use converge::outcome::ActionOutcome;
/// use converge::report::format_outcome;
/// use serde_json::json;
///
/// let noop = ActionOutcome::ok("");
/// assert_eq!(format_outcome("nginx", &noop), "no changes for nginx");
///
/// let upgraded = ActionOutcome::ok("done")
///     .with_change("nginx", json!({"old": "1.22", "new": "1.24"}));
/// assert_eq!(
///     format_outcome("nginx", &upgraded),
///     "made the following changes:\n'nginx' changed from '1.22' to '1.24'\n"
/// );
/// ```
#[must_use]
pub fn format_outcome(name: &str, outcome: &ActionOutcome) -> String {
    if outcome.changes.is_empty() {
        return format!("no changes for {name}");
    }

    if let Some(Value::String(diff)) = outcome.changes.get("diff") {
        return format!("file changed:\n{diff}");
    }

    if let Some(pairs) = as_old_new_pairs(&outcome.changes) {
        let mut msg = String::from("made the following changes:\n");
        for (item, old, new) in pairs {
            msg.push_str(&format!(
                "'{item}' changed from '{}' to '{}'\n",
                render_side(old),
                render_side(new)
            ));
        }
        return msg;
    }

    Value::Object(outcome.changes.clone()).to_string()
}

/// Routes the rendered message to the info sink on success and the error
/// sink on failure.
pub fn log_outcome(tag: &str, name: &str, outcome: &ActionOutcome) {
    let msg = format_outcome(name, outcome);
    if outcome.result {
        tracing::info!(%tag, "{msg}");
    } else {
        tracing::error!(%tag, "{msg}");
    }
}

/// Matches the before/after shape: every change value is a mapping carrying
/// both `old` and `new`.
fn as_old_new_pairs(changes: &Map<String, Value>) -> Option<Vec<(&str, &Value, &Value)>> {
    changes
        .iter()
        .map(|(item, entry)| {
            let entry = entry.as_object()?;
            Some((item.as_str(), entry.get("old")?, entry.get("new")?))
        })
        .collect()
}

/// Empty values read as "absent"; explicit booleans and nulls are shown
/// verbatim so "disabled" is not mistaken for "removed".
fn render_side(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) if s.is_empty() => "absent".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(a) if a.is_empty() => "absent".to_string(),
        Value::Object(o) if o.is_empty() => "absent".to_string(),
        other => other.to_string(),
    }
}
