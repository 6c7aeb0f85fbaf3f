//! Compilation of raw rule configurations into the immutable [`Rules`] object.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::{RulesConfig, SubjectMap, TableConfig};
use crate::errors::RuleError;
use crate::merge::merge_update;
use crate::types::{QueryKind, QueryRules, RuleEntry, Rules, TableRules, UserState};

/// Compile a serialized JSON rule set.
pub fn compile_raw_rules(raw: &[u8]) -> Result<Rules, RuleError> {
    let cfg: RulesConfig = serde_json::from_slice(raw)?;
    compile(cfg)
}

/// Compile an already-deserialized rule set value.
pub fn compile_rules(value: Value) -> Result<Rules, RuleError> {
    let cfg: RulesConfig = serde_json::from_value(value)?;
    compile(cfg)
}

fn compile(cfg: RulesConfig) -> Result<Rules, RuleError> {
    let mut user_groups: HashMap<String, Vec<String>> = HashMap::new();

    // cfg.groups is a BTreeMap, so each uid's group list accumulates in
    // sorted group-name order. Which group deny fires first depends on it.
    for (group, members) in &cfg.groups {
        if group.is_empty() {
            return Err(RuleError::Config("empty group name in `groups`".into()));
        }
        for uid in members {
            if uid.is_empty() {
                return Err(RuleError::Config(format!(
                    "empty member name in group `{group}`"
                )));
            }
            user_groups
                .entry(uid.clone())
                .or_default()
                .push(group.clone());
        }
    }

    let mut rules = HashMap::new();
    for (table, table_cfg) in &cfg.rules {
        rules.insert(table.clone(), compile_table(&cfg, table, table_cfg)?);
    }

    let compiled = Rules { user_groups, rules };

    tracing::info!(
        groups = cfg.groups.len(),
        users = compiled.user_groups.len(),
        tables = compiled.rules.len(),
        "Compiled rule set"
    );

    Ok(compiled)
}

fn compile_table(
    cfg: &RulesConfig,
    table: &str,
    table_cfg: &TableConfig,
) -> Result<TableRules, RuleError> {
    let mut by_kind = HashMap::new();
    by_kind.insert(QueryKind::Find, compile_query_rules(cfg, &table_cfg.find)?);
    by_kind.insert(QueryKind::Count, compile_query_rules(cfg, &table_cfg.count)?);
    by_kind.insert(
        QueryKind::Remove,
        compile_query_rules(cfg, &table_cfg.remove)?,
    );
    by_kind.insert(
        QueryKind::Insert,
        compile_query_rules(cfg, &table_cfg.insert)?,
    );
    // the update filter side lives alongside find/count/remove/insert;
    // the update document side is kept separate
    by_kind.insert(
        QueryKind::Update,
        compile_query_rules(cfg, &table_cfg.update.filter)?,
    );

    let update_rules = compile_query_rules(cfg, &table_cfg.update.update)?;
    validate_update_rules(table, &update_rules)?;

    Ok(TableRules {
        rules: by_kind,
        update_rules,
    })
}

fn compile_query_rules(cfg: &RulesConfig, subjects: &SubjectMap) -> Result<QueryRules, RuleError> {
    let mut query_rules = QueryRules::default();

    for (subject, fragment) in subjects {
        let entry = match fragment {
            Some(doc) => RuleEntry::Allow(doc.clone()),
            None => RuleEntry::Deny,
        };

        if let Some(group) = subject.strip_prefix("g:") {
            if group.is_empty() {
                return Err(RuleError::Config("empty group name in subject key".into()));
            }
            if !cfg.groups.contains_key(group) {
                return Err(RuleError::Config(format!("`{group}`: unknown group")));
            }
            query_rules.group_rules.insert(group.to_string(), entry);
        } else if let Some(uid) = subject.strip_prefix("u:") {
            if uid.is_empty() {
                return Err(RuleError::Config("empty user name in subject key".into()));
            }
            query_rules.user_rules.insert(uid.to_string(), entry);
        } else if let Some(state) = subject.strip_prefix("s:") {
            let state = UserState::parse(state)
                .ok_or_else(|| RuleError::Config(format!("invalid user state `{state}`")))?;
            query_rules.user_state_rules.insert(state, entry);
        } else if subject == "default" {
            query_rules.default_rules = Some(entry);
        } else {
            return Err(RuleError::Config(format!(
                "`{subject}`: invalid enforce subject"
            )));
        }
    }

    Ok(query_rules)
}

/// Trial-merge every update-side fragment so operator shape errors surface
/// at compile time instead of during enforcement.
fn validate_update_rules(table: &str, rules: &QueryRules) -> Result<(), RuleError> {
    let states = rules
        .user_state_rules
        .iter()
        .map(|(state, entry)| (format!("s:{state}"), entry));
    let groups = rules
        .group_rules
        .iter()
        .map(|(group, entry)| (format!("g:{group}"), entry));
    let users = rules
        .user_rules
        .iter()
        .map(|(uid, entry)| (format!("u:{uid}"), entry));
    let default = rules
        .default_rules
        .iter()
        .map(|entry| ("default".to_string(), entry));

    for (subject, entry) in states.chain(groups).chain(users).chain(default) {
        if let RuleEntry::Allow(fragment) = entry {
            merge_update([fragment]).map_err(|source| RuleError::UpdateRule {
                table: table.to_string(),
                subject,
                source: Box::new(source),
            })?;
        }
    }

    Ok(())
}
