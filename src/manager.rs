//! Process-wide registry of compiled rule sets, keyed by database id.

use std::sync::Arc;

use dashmap::DashMap;

use crate::types::Rules;

/// Concurrent `database id → compiled rules` map.
///
/// Replacing an entry swaps the whole `Arc`, so a concurrent
/// [`get`](RulesManager::get) observes either the previous or the next rule
/// set, never a torn one. Enforcement calls in flight keep their `Arc` alive
/// until they finish. Lives for the process lifetime; no teardown.
#[derive(Debug, Default)]
pub struct RulesManager {
    rules: DashMap<String, Arc<Rules>>,
}

impl RulesManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current rules for `db_id`, if any have been installed.
    pub fn get(&self, db_id: &str) -> Option<Arc<Rules>> {
        self.rules.get(db_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Install `rules` for `db_id`, replacing any previous rule set.
    pub fn set(&self, db_id: impl Into<String>, rules: Arc<Rules>) {
        let db_id = db_id.into();
        tracing::info!(%db_id, "Installed rule set");
        self.rules.insert(db_id, rules);
    }
}
