//! Magic-variable substitution in query documents.
//!
//! Rule fragments may carry `@@name` placeholders in string leaves (for
//! example `{ "owner": "@@uid" }`). During enforcement each placeholder is
//! replaced by the value bound to `name` in the caller's variable bag.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::Document;

/// Prefix marking a string leaf as a magic-variable token.
pub const MAGIC_VAR_PREFIX: &str = "@@";

/// Values substituted for `@@name` tokens during enforcement.
pub type VarBag = HashMap<String, Value>;

/// Replace `@@name` string leaves with the values bound in `vars`.
///
/// Objects and arrays are walked recursively; every other leaf passes
/// through untouched. A token with no binding in the bag is left as-is, so
/// a missed substitution stays visible in the emitted query instead of
/// silently turning into null.
pub fn inject_magic_vars(doc: &Document, vars: &VarBag) -> Document {
    doc.iter()
        .map(|(key, value)| (key.clone(), inject_value(value, vars)))
        .collect()
}

fn inject_value(value: &Value, vars: &VarBag) -> Value {
    match value {
        Value::String(s) => match s.strip_prefix(MAGIC_VAR_PREFIX) {
            Some(name) => vars.get(name).cloned().unwrap_or_else(|| value.clone()),
            None => value.clone(),
        },
        Value::Object(map) => Value::Object(inject_magic_vars(map, vars)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| inject_value(item, vars)).collect())
        }
        _ => value.clone(),
    }
}
