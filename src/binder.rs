//! Named-to-positional argument binding against a declared signature.

use serde_json::Value;

use crate::record::ActionRecord;
use crate::registry::ParamSpec;
use crate::validator::ValidationError;

/// Maps a record's parameters onto the positional argument list required by
/// an action's declared signature.
///
/// Walking the declared parameters in order: a key bound by the record wins,
/// a declared default fills the gap otherwise, and a parameter with neither
/// is an error. The validator guarantees required parameters are present for
/// records that reached execution, so the error arm only fires when callers
/// bind against a signature the record was never validated for.
///
/// # Examples
///
/// ```
/// use converge::binder::bind;
/// use converge::record::ActionRecord;
/// use converge::registry::ParamSpec;
/// use serde_json::json;
///
/// let spec = ParamSpec::new()
///     .required("name")
///     .optional("ensure", json!("present"))
///     .optional("reload", json!(false));
///
/// let mut record = ActionRecord::base("pkg", "nginx", None);
/// record.function = "ensure".into();
/// record.params.insert("reload".into(), json!(true));
///
/// let args = bind(&record, &spec).unwrap();
/// assert_eq!(args, vec![json!("nginx"), json!("present"), json!(true)]);
/// ```
pub fn bind(record: &ActionRecord, spec: &ParamSpec) -> Result<Vec<Value>, ValidationError> {
    let mut args = Vec::with_capacity(spec.len());
    for param in spec.params() {
        if let Some(value) = record.bound_value(param.name()) {
            args.push(value);
        } else if let Some(default) = param.default() {
            args.push(default.clone());
        } else {
            return Err(ValidationError::MissingParameter {
                parameter: param.name().to_string(),
                callable: record.callable(),
            });
        }
    }
    Ok(args)
}
