//! Manual overrides keyed by item identifier.
//!
//! Overrides are buffered and only reach an item's assigned collections on
//! an explicit [`OverrideLog::apply`].

use std::collections::BTreeMap;

use curator_core::{Item, join_list, split_list};
use tracing::{debug, info};

/// Pending manual assignments: item identifier → override text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideLog {
    entries: BTreeMap<String, String>,
}

impl OverrideLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer every non-blank `Manual` cell.
    pub fn from_manual(items: &[Item]) -> Self {
        let mut log = Self::new();
        for item in items {
            if !item.uid.is_empty() && !item.manual.trim().is_empty() {
                log.record(&item.uid, &item.manual);
            }
        }
        log
    }

    /// Record (or replace) the override for an item.
    pub fn record(&mut self, uid: &str, value: &str) {
        self.entries.insert(uid.to_string(), value.to_string());
    }

    /// Pending override text for an item, as recorded.
    pub fn get(&self, uid: &str) -> Option<&str> {
        self.entries.get(uid).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write buffered overrides into assigned collections.
    ///
    /// Returns the new item set and how many items changed. Override text is
    /// normalised to the stored list form: split on `,`/`;`, trimmed,
    /// duplicates dropped in first-seen order.
    pub fn apply(&self, items: &[Item]) -> (Vec<Item>, usize) {
        let mut changed = 0;
        let out = items
            .iter()
            .map(|item| {
                let mut out = item.clone();
                if let Some(value) = self.get(&item.uid) {
                    let normalized = normalize_override(value);
                    if normalized != item.assigned {
                        debug!(uid = %item.uid, assigned = %normalized, "applied manual override");
                        out.assigned = normalized;
                        changed += 1;
                    }
                }
                out
            })
            .collect();
        info!(pending = self.len(), changed, "manual overrides applied");
        (out, changed)
    }
}

fn normalize_override(value: &str) -> String {
    let mut names: Vec<String> = Vec::new();
    for name in split_list(value) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    join_list(&names)
}
