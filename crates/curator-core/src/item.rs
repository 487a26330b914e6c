//! Liked items and platform collections as they live in the workbook.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::text::split_list;

/// A liked item collected from the platform, plus its annotation fields.
///
/// The identity and text fields (`uid`, `name`, `description`, `tags`,
/// `author`) are refreshed on every collect. Everything else is annotation
/// state that survives re-collection by matching on `uid`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub uid: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub author: String,
    /// Free-text override typed by a human; copied to `assigned` only on apply.
    pub manual: String,
    /// Tag and rule hits from the last matching run, comma-joined.
    pub suggested: String,
    /// Fuzzy hits from the last matching run as `name:score`, comma-joined.
    pub fuzzy: String,
    /// Collections this item should belong to, comma-joined.
    pub assigned: String,
    pub notes: String,
    pub push_sent: bool,
    /// ISO 8601 timestamp string.
    pub pushed_at: String,
    /// Columns the workbook carries that Curator does not interpret.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Item {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Assigned collection names, split on `,` or `;`.
    pub fn assigned_list(&self) -> Vec<String> {
        split_list(&self.assigned)
    }

    pub fn has_assignment(&self) -> bool {
        !self.assigned_list().is_empty()
    }

    /// Copy every annotation field from `previous`, leaving identity and text intact.
    pub fn inherit_annotations(&mut self, previous: &Item) {
        self.manual.clone_from(&previous.manual);
        self.suggested.clone_from(&previous.suggested);
        self.fuzzy.clone_from(&previous.fuzzy);
        self.assigned.clone_from(&previous.assigned);
        self.notes.clone_from(&previous.notes);
        self.push_sent = previous.push_sent;
        self.pushed_at.clone_from(&previous.pushed_at);
        for (k, v) in &previous.extra {
            self.extra.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
}

/// A curated collection on the platform and the items it already holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub uid: String,
    pub name: String,
    pub slug: Option<String>,
    /// Identifiers of member items.
    pub members: Vec<String>,
}

impl CollectionRecord {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, item_uid: &str) -> bool {
        self.members.iter().any(|m| m == item_uid)
    }
}
