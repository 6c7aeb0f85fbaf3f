//! Merging of partial update and insert documents.
//!
//! Update documents follow the document-store operator algebra: either bare
//! `field: value` assignments (an implicit `$set`) or `$`-prefixed operators
//! carrying `field: argument` objects. Merging is per-field last-writer-wins
//! across fragments, so the most specific fragment forces its value.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::Document;
use crate::errors::RuleError;

/// Update operators recognized by the merger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum UpdateOp {
    Set,
    Inc,
    Min,
    Max,
    Mul,
    CurrentDate,
}

impl UpdateOp {
    fn parse(key: &str) -> Option<Self> {
        match key {
            "$set" => Some(UpdateOp::Set),
            "$inc" => Some(UpdateOp::Inc),
            "$min" => Some(UpdateOp::Min),
            "$max" => Some(UpdateOp::Max),
            "$mul" => Some(UpdateOp::Mul),
            "$currentDate" => Some(UpdateOp::CurrentDate),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            UpdateOp::Set => "$set",
            UpdateOp::Inc => "$inc",
            UpdateOp::Min => "$min",
            UpdateOp::Max => "$max",
            UpdateOp::Mul => "$mul",
            UpdateOp::CurrentDate => "$currentDate",
        }
    }
}

/// Merge update fragments left to right into a single update document.
///
/// Each fragment must be entirely bare-form or entirely dollar-form. A later
/// fragment's entry for a field replaces any earlier entry for that field,
/// even across different operators: a `$inc` on `x` after a `$set` on `x`
/// leaves only the `$inc`.
pub fn merge_update<'a, I>(fragments: I) -> Result<Document, RuleError>
where
    I: IntoIterator<Item = &'a Document>,
{
    // field → (operator, argument), last writer wins
    let mut fields: HashMap<String, (UpdateOp, Value)> = HashMap::new();

    for fragment in fragments {
        let dollar = fragment.keys().any(|k| k.starts_with('$'));
        let bare = fragment.keys().any(|k| !k.starts_with('$'));
        if dollar && bare {
            return Err(RuleError::MixedUpdateForms);
        }

        for (key, value) in fragment {
            if !key.starts_with('$') {
                fields.insert(key.clone(), (UpdateOp::Set, value.clone()));
                continue;
            }
            if key == "$comment" {
                continue;
            }
            let op = UpdateOp::parse(key)
                .ok_or_else(|| RuleError::UnknownOperator(key.clone()))?;
            let args = value
                .as_object()
                .ok_or_else(|| RuleError::OperatorShape(key.clone()))?;
            for (field, argument) in args {
                fields.insert(field.clone(), (op, argument.clone()));
            }
        }
    }

    // regroup the flat field table by operator
    let mut merged = Document::new();
    for (field, (op, argument)) in fields {
        let entry = merged
            .entry(op.as_str())
            .or_insert_with(|| Value::Object(Document::new()));
        if let Value::Object(args) = entry {
            args.insert(field, argument);
        }
    }

    Ok(merged)
}

/// Shallow-merge insert documents; later fragments overwrite earlier keys.
pub fn merge_insert<'a, I>(fragments: I) -> Document
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut merged = Document::new();
    for fragment in fragments {
        for (key, value) in fragment {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_merge_update_empty() {
        let merged = merge_update([]).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn test_merge_update_lifts_bare_fields() {
        let a = doc(json!({ "name": "n", "age": 3 }));
        let merged = merge_update([&a]).unwrap();
        assert_eq!(
            Value::Object(merged),
            json!({ "$set": { "name": "n", "age": 3 } })
        );
    }

    #[test]
    fn test_merge_update_last_writer_wins_same_operator() {
        let a = doc(json!({ "$set": { "role": "guest", "name": "n" } }));
        let b = doc(json!({ "$set": { "role": "admin" } }));
        let merged = merge_update([&a, &b]).unwrap();
        assert_eq!(
            Value::Object(merged),
            json!({ "$set": { "role": "admin", "name": "n" } })
        );
    }

    #[test]
    fn test_merge_update_last_writer_wins_across_operators() {
        let a = doc(json!({ "$set": { "x": 1 } }));
        let b = doc(json!({ "$inc": { "x": 5 } }));
        let merged = merge_update([&a, &b]).unwrap();
        assert_eq!(Value::Object(merged), json!({ "$inc": { "x": 5 } }));

        let c = doc(json!({ "$max": { "x": 9 } }));
        let merged = merge_update([&a, &b, &c]).unwrap();
        assert_eq!(Value::Object(merged), json!({ "$max": { "x": 9 } }));
    }

    #[test]
    fn test_merge_update_mixed_forms_rejected() {
        let mixed = doc(json!({ "$set": { "x": 1 }, "y": 2 }));
        let err = merge_update([&mixed]).unwrap_err();
        assert!(matches!(err, RuleError::MixedUpdateForms));
    }

    #[test]
    fn test_merge_update_comment_ignored_but_counts_as_dollar() {
        let a = doc(json!({ "$comment": "audit", "$set": { "x": 1 } }));
        let merged = merge_update([&a]).unwrap();
        assert_eq!(Value::Object(merged), json!({ "$set": { "x": 1 } }));

        // $comment alongside a bare field is still a mixed document
        let mixed = doc(json!({ "$comment": "audit", "x": 1 }));
        let err = merge_update([&mixed]).unwrap_err();
        assert!(matches!(err, RuleError::MixedUpdateForms));
    }

    #[test]
    fn test_merge_update_unknown_operator() {
        let a = doc(json!({ "$rename": { "a": "b" } }));
        let err = merge_update([&a]).unwrap_err();
        assert!(matches!(err, RuleError::UnknownOperator(op) if op == "$rename"));
    }

    #[test]
    fn test_merge_update_operator_needs_object() {
        let a = doc(json!({ "$inc": 3 }));
        let err = merge_update([&a]).unwrap_err();
        assert!(matches!(err, RuleError::OperatorShape(op) if op == "$inc"));
    }

    #[test]
    fn test_merge_update_all_operators_accepted() {
        let a = doc(json!({
            "$set": { "a": 1 },
            "$inc": { "b": 2 },
            "$min": { "c": 3 },
            "$max": { "d": 4 },
            "$mul": { "e": 5 },
            "$currentDate": { "f": true }
        }));
        let merged = merge_update([&a]).unwrap();
        assert_eq!(
            Value::Object(merged),
            json!({
                "$set": { "a": 1 },
                "$inc": { "b": 2 },
                "$min": { "c": 3 },
                "$max": { "d": 4 },
                "$mul": { "e": 5 },
                "$currentDate": { "f": true }
            })
        );
    }

    #[test]
    fn test_merge_insert_shallow_override() {
        let a = doc(json!({ "a": 1, "b": 2 }));
        let b = doc(json!({ "b": 9, "c": 3 }));
        let merged = merge_insert([&a, &b]);
        assert_eq!(Value::Object(merged), json!({ "a": 1, "b": 9, "c": 3 }));
    }

    #[test]
    fn test_merge_insert_empty() {
        assert!(merge_insert([]).is_empty());
    }
}
