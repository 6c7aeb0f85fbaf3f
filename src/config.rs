use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

/// A nested query or rule-fragment document.
pub type Document = Map<String, Value>;

/// Subject key → rule fragment.
///
/// A JSON `null` fragment is an explicit deny for that subject; an absent
/// key means the subject contributes no rule. `BTreeMap` keeps subject and
/// group iteration deterministic, which deny precedence relies on.
pub type SubjectMap = BTreeMap<String, Option<Document>>;

/// Raw rule configuration as supplied by the rule store.
///
/// Both sections may be empty or absent; unknown top-level keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesConfig {
    /// Group name → member uids.
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
    /// Table name → per-operation subject maps.
    #[serde(default)]
    pub rules: BTreeMap<String, TableConfig>,
}

/// Per-table rule sections, one subject map per query kind.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableConfig {
    #[serde(default)]
    pub find: SubjectMap,
    #[serde(default)]
    pub count: SubjectMap,
    #[serde(default)]
    pub remove: SubjectMap,
    #[serde(default)]
    pub insert: SubjectMap,
    #[serde(default)]
    pub update: UpdateConfig,
}

/// The update operation carries two independent rule tables: `filter`
/// restricts which rows an update may touch, `update` restricts which
/// fields it may set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateConfig {
    #[serde(default)]
    pub filter: SubjectMap,
    #[serde(default)]
    pub update: SubjectMap,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_full_config() {
        let cfg: RulesConfig = serde_json::from_value(json!({
            "groups": { "admins": ["u1", "u2"] },
            "rules": {
                "posts": {
                    "find": { "g:admins": { "tenant": "T" }, "s:anonymous": null },
                    "update": {
                        "filter": { "default": { "owner": "@@uid" } },
                        "update": { "g:admins": { "$set": { "role": "admin" } } }
                    }
                }
            }
        }))
        .unwrap();

        assert_eq!(cfg.groups["admins"], vec!["u1", "u2"]);
        let posts = &cfg.rules["posts"];
        assert!(posts.find["g:admins"].is_some());
        // null fragment deserializes to the explicit-deny marker
        assert!(posts.find["s:anonymous"].is_none());
        assert!(posts.update.filter.contains_key("default"));
        assert!(posts.update.update.contains_key("g:admins"));
    }

    #[test]
    fn test_absent_sections_default_empty() {
        let cfg: RulesConfig = serde_json::from_value(json!({
            "rules": { "posts": { "find": {} } }
        }))
        .unwrap();

        assert!(cfg.groups.is_empty());
        let posts = &cfg.rules["posts"];
        assert!(posts.count.is_empty());
        assert!(posts.update.filter.is_empty());
        assert!(posts.update.update.is_empty());
    }

    #[test]
    fn test_unknown_top_level_keys_ignored() {
        let cfg: RulesConfig = serde_json::from_value(json!({
            "groups": {},
            "version": 3,
            "comment": "ignored"
        }))
        .unwrap();
        assert!(cfg.rules.is_empty());
    }

    #[test]
    fn test_non_object_fragment_rejected() {
        let result = serde_json::from_value::<RulesConfig>(json!({
            "rules": { "posts": { "find": { "default": "not-a-document" } } }
        }));
        assert!(result.is_err());
    }
}
