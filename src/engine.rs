//! Rule selection and query enforcement.
//!
//! The three enforcement operations are pure: they read the compiled
//! [`Rules`] object, rewrite the caller's query, and touch nothing else.
//! Downstream query execution needs no further authorization logic — a
//! rule-injected filter cannot match disallowed rows, and a rule-injected
//! update or insert cannot set disallowed fields.

use serde_json::Value;

use crate::config::Document;
use crate::errors::RuleError;
use crate::merge::{merge_insert, merge_update};
use crate::types::{QueryKind, QueryRules, RuleEntry, Rules, UserState};
use crate::vars::{inject_magic_vars, VarBag};

impl Rules {
    /// Conjoin the applicable rule fragments into the caller's filter.
    ///
    /// An unknown table or kind, or a selection that contributes nothing,
    /// returns the filter unchanged (open privilege). Otherwise the result
    /// is `{ "$and": [fragment…, filter] }` with the caller's filter always
    /// last, so policy clauses cannot be shadowed by the caller's own
    /// `$and` structure.
    ///
    /// With `kind == QueryKind::Update` this consults the update *filter*
    /// rules — the ones restricting which rows an update may touch. The
    /// field-mutation rules are applied by [`Rules::enforce_on_update`].
    pub fn enforce_on_filter(
        &self,
        filter: Document,
        table: &str,
        uid: &str,
        user_state: &str,
        vars: &VarBag,
        kind: QueryKind,
    ) -> Result<Document, RuleError> {
        let Some(query_rules) = self.query_rules(table, kind) else {
            return Ok(filter);
        };

        let selected = self.rules_to_apply(query_rules, uid, user_state)?;
        if selected.is_empty() {
            return Ok(filter);
        }

        let mut clauses: Vec<Value> = selected
            .into_iter()
            .map(|fragment| Value::Object(inject_magic_vars(fragment, vars)))
            .collect();
        clauses.push(Value::Object(filter));

        let mut combined = Document::new();
        combined.insert("$and".to_string(), Value::Array(clauses));
        Ok(combined)
    }

    /// Merge the applicable field-mutation fragments into the caller's
    /// update document.
    ///
    /// The rule-derived document is merged *after* the caller's, so rule
    /// clauses overwrite colliding caller clauses field by field.
    pub fn enforce_on_update(
        &self,
        update: Document,
        table: &str,
        uid: &str,
        user_state: &str,
        vars: &VarBag,
    ) -> Result<Document, RuleError> {
        let Some(table_rules) = self.rules.get(table) else {
            return Ok(update);
        };

        let selected = self.rules_to_apply(&table_rules.update_rules, uid, user_state)?;
        if selected.is_empty() {
            return Ok(update);
        }

        let rule_update = merge_update(selected)?;
        let injected = inject_magic_vars(&rule_update, vars);
        merge_update([&update, &injected])
    }

    /// Merge the applicable insert fragments over the caller's document,
    /// overwriting conflicting caller fields.
    pub fn enforce_on_insert(
        &self,
        insert: Document,
        table: &str,
        uid: &str,
        user_state: &str,
        vars: &VarBag,
    ) -> Result<Document, RuleError> {
        let Some(query_rules) = self.query_rules(table, QueryKind::Insert) else {
            return Ok(insert);
        };

        let selected = self.rules_to_apply(query_rules, uid, user_state)?;
        if selected.is_empty() {
            return Ok(insert);
        }

        let injected = inject_magic_vars(&merge_insert(selected), vars);
        Ok(merge_insert([&insert, &injected]))
    }

    fn query_rules(&self, table: &str, kind: QueryKind) -> Option<&QueryRules> {
        self.rules.get(table)?.rules.get(&kind)
    }

    /// Ordered rule fragments applying to `(uid, user_state)`: the state
    /// tier first, then each of the user's groups in their stored order,
    /// then the user tier, then — only if nothing contributed — default.
    ///
    /// An explicit deny at any tier fails the whole call immediately, even
    /// when earlier tiers already contributed allow fragments. A tier with
    /// no matching entry contributes nothing.
    fn rules_to_apply<'a>(
        &self,
        query_rules: &'a QueryRules,
        uid: &str,
        user_state: &str,
    ) -> Result<Vec<&'a Document>, RuleError> {
        let mut selected = Vec::new();

        // state rule; unknown wire values mean no state rule applies
        if let Some(state) = UserState::parse(user_state) {
            match query_rules.user_state_rules.get(&state) {
                Some(RuleEntry::Deny) => return Err(RuleError::DenyState(state.to_string())),
                Some(RuleEntry::Allow(fragment)) => selected.push(fragment),
                None => {}
            }
        }

        // group rules
        if let Some(groups) = self.user_groups.get(uid) {
            for group in groups {
                match query_rules.group_rules.get(group) {
                    Some(RuleEntry::Deny) => return Err(RuleError::DenyGroup(group.clone())),
                    Some(RuleEntry::Allow(fragment)) => selected.push(fragment),
                    None => {}
                }
            }
        }

        // user rule
        match query_rules.user_rules.get(uid) {
            Some(RuleEntry::Deny) => return Err(RuleError::DenyUser),
            Some(RuleEntry::Allow(fragment)) => selected.push(fragment),
            None => {}
        }

        // default applies only when no other tier contributed
        if selected.is_empty() {
            match &query_rules.default_rules {
                Some(RuleEntry::Deny) => return Err(RuleError::DenyDefault),
                Some(RuleEntry::Allow(fragment)) => selected.push(fragment),
                None => {}
            }
        }

        Ok(selected)
    }
}
