use std::collections::HashMap;
use std::fmt;

use crate::config::Document;

/// The kind of document query a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Insert,
    Update,
    Find,
    Remove,
    Count,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryKind::Insert => "insert",
            QueryKind::Update => "update",
            QueryKind::Find => "find",
            QueryKind::Remove => "remove",
            QueryKind::Count => "count",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication lifecycle state of the acting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserState {
    Anonymous,
    LoggedIn,
    /// Signed up, awaiting confirmation.
    SignUp,
    /// Manually pre-registered by a developer.
    PreRegister,
    Disabled,
}

impl UserState {
    /// Parse a wire value, case-insensitively. Anything outside the five
    /// defined states yields `None`, which enforcement treats as "no state
    /// rule applies".
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "anonymous" => Some(UserState::Anonymous),
            "logged_in" => Some(UserState::LoggedIn),
            "sign_up" => Some(UserState::SignUp),
            "pre_register" => Some(UserState::PreRegister),
            "disabled" => Some(UserState::Disabled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserState::Anonymous => "anonymous",
            UserState::LoggedIn => "logged_in",
            UserState::SignUp => "sign_up",
            UserState::PreRegister => "pre_register",
            UserState::Disabled => "disabled",
        }
    }
}

impl fmt::Display for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One subject's compiled contribution: a fragment to conjoin or merge into
/// the caller's query, or an explicit refusal of the whole operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleEntry {
    Allow(Document),
    Deny,
}

/// Compiled rules for a single query kind on a single table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRules {
    /// group name → entry
    pub(crate) group_rules: HashMap<String, RuleEntry>,
    /// uid → entry
    pub(crate) user_rules: HashMap<String, RuleEntry>,
    /// user state → entry
    pub(crate) user_state_rules: HashMap<UserState, RuleEntry>,
    /// Catch-all, consulted only when no other tier contributed.
    pub(crate) default_rules: Option<RuleEntry>,
}

/// Compiled rules for a single table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRules {
    /// Per-kind rules; for `QueryKind::Update` these are the filter-side
    /// rules restricting which rows an update may touch.
    pub(crate) rules: HashMap<QueryKind, QueryRules>,
    /// Fragments merged into the update document itself, restricting which
    /// fields an update may set.
    pub(crate) update_rules: QueryRules,
}

/// Fully compiled rule set. Immutable after compilation — configuration
/// changes produce a fresh `Rules` object that replaces this one wholesale
/// in the [`RulesManager`](crate::manager::RulesManager).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rules {
    /// uid → group names, each list in sorted group-name order. The order
    /// decides which group rule (and which group deny) applies first.
    pub(crate) user_groups: HashMap<String, Vec<String>>,
    /// table name → compiled table rules
    pub(crate) rules: HashMap<String, TableRules>,
}
