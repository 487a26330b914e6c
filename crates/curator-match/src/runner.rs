//! Runs matching and the assignment policy across a whole item set.
//!
//! Both entry points are pure: they take the items by reference and return
//! a new annotated set, so a caller can drop the result without harm.
//!
//! An item with a non-empty assignment keeps it (and its notes) unless the
//! run is told to overwrite. Suggestions and fuzzy diagnostics are always
//! refreshed.

use curator_core::Item;
use tracing::{debug, info};

use crate::policy::{PolicyNote, policy_assign};
use crate::signals::{MatchSignals, collect_signals};
use crate::terms::Terms;

/// Counts from one assignment run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignStats {
    pub total: usize,
    /// Items written with a non-empty assignment this run.
    pub assigned: usize,
    /// Items whose prior assignment was left untouched.
    pub preserved: usize,
    /// Items with a single-assignment collision note.
    pub collisions: usize,
    /// Items left unassigned with a fuzzy candidate note.
    pub fuzzy_only: usize,
}

/// Result of [`run_auto_assign`].
#[derive(Debug, Clone)]
pub struct AssignOutcome {
    pub items: Vec<Item>,
    pub stats: AssignStats,
}

/// Collect signals for an item from its own fields.
pub fn item_signals(item: &Item, terms: &Terms) -> MatchSignals {
    collect_signals(&item.name, &item.description, &item.tags, terms)
}

/// Refresh suggestions and apply the policy to every item.
///
/// With `overwrite == false`, items that already carry an assignment keep
/// their assigned collections and notes. Running twice without overwrite is
/// therefore a no-op on those two fields.
pub fn run_auto_assign(items: &[Item], terms: &Terms, overwrite: bool) -> AssignOutcome {
    let mut stats = AssignStats {
        total: items.len(),
        ..Default::default()
    };

    let items = items
        .iter()
        .map(|item| {
            let signals = item_signals(item, terms);
            let mut out = with_diagnostics(item, &signals);

            if item.has_assignment() && !overwrite {
                stats.preserved += 1;
                return out;
            }

            let result = policy_assign(&signals, terms);
            if !result.assigned.is_empty() {
                stats.assigned += 1;
            }
            for note in &result.notes {
                match note {
                    PolicyNote::Collision(names) => {
                        stats.collisions += 1;
                        debug!(uid = %item.uid, collections = ?names, "single-assignment collision");
                    }
                    PolicyNote::HighFuzzyCandidate { .. } => stats.fuzzy_only += 1,
                }
            }
            out.assigned = result.assigned_cell();
            out.notes = result.notes_cell();
            out
        })
        .collect();

    info!(
        total = stats.total,
        assigned = stats.assigned,
        preserved = stats.preserved,
        collisions = stats.collisions,
        fuzzy_only = stats.fuzzy_only,
        overwrite,
        "auto-assign complete"
    );

    AssignOutcome { items, stats }
}

/// Recompute suggestions and fuzzy diagnostics only.
///
/// Assigned collections and notes are never touched.
pub fn refresh_suggestions(items: &[Item], terms: &Terms) -> Vec<Item> {
    let out: Vec<Item> = items
        .iter()
        .map(|item| with_diagnostics(item, &item_signals(item, terms)))
        .collect();
    let suggested = out.iter().filter(|i| !i.suggested.is_empty()).count();
    info!(total = out.len(), suggested, "suggestions refreshed");
    out
}

fn with_diagnostics(item: &Item, signals: &MatchSignals) -> Item {
    let mut out = item.clone();
    out.suggested = signals.suggested_cell();
    out.fuzzy = signals.fuzzy_cell();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TERMS: &str = r#"
single_assignment_collections: [hands, feet, gauntlets]
negative_terms: [nsfw]
collections:
  robots:
    include_terms: [robot, mech]
    tag_terms: [robot]
  hands:
    include_terms: [hand]
    tag_terms: [hand]
  feet:
    include_terms: [foot]
    tag_terms: [foot]
  gauntlets:
    include_terms: [gauntlet]
"#;

    fn terms() -> Terms {
        Terms::from_yaml_str(TERMS).unwrap()
    }

    fn item(uid: &str, name: &str, tags: &[&str]) -> Item {
        let mut i = Item::new(uid, name);
        i.tags = tags.iter().map(|s| s.to_string()).collect();
        i
    }

    #[test]
    fn assigns_on_tag_and_token() {
        let items = vec![item("u1", "Mech Unit", &["robot"])];
        let out = run_auto_assign(&items, &terms(), false);
        let i = &out.items[0];
        assert_eq!(i.assigned, "robots");
        assert_eq!(i.suggested, "robots");
        assert_eq!(i.fuzzy, "robots:100");
        assert_eq!(i.notes, "");
        assert_eq!(out.stats.assigned, 1);
    }

    #[test]
    fn tag_only_is_suggested_not_assigned() {
        let items = vec![item("u1", "Unit Seven", &["ROBOT-X", "robot"])];
        let t = Terms::from_yaml_str(
            "collections:\n  robots:\n    include_terms: [android]\n    tag_terms: [robot]\n",
        )
        .unwrap();
        let out = run_auto_assign(&items, &t, false);
        let i = &out.items[0];
        assert_eq!(i.suggested, "robots");
        assert_eq!(i.assigned, "");
        assert_eq!(i.fuzzy, "");
    }

    #[test]
    fn collision_leaves_item_for_review() {
        let items = vec![item("u1", "Hand and foot pack", &["hand", "foot"])];
        let out = run_auto_assign(&items, &terms(), false);
        let i = &out.items[0];
        assert_eq!(i.assigned, "");
        assert!(i.notes.contains("hands") && i.notes.contains("feet"));
        assert_eq!(i.suggested, "feet, hands");
        assert_eq!(out.stats.collisions, 1);
    }

    #[test]
    fn existing_assignment_is_preserved_without_overwrite() {
        let mut it = item("u1", "Left hand", &["hand"]);
        it.assigned = "gauntlets".into();
        it.notes = "checked by hand".into();
        let out = run_auto_assign(&[it], &terms(), false);
        let i = &out.items[0];
        assert_eq!(i.assigned, "gauntlets");
        assert_eq!(i.notes, "checked by hand");
        // Suggestions still reflect current signals.
        assert_eq!(i.suggested, "hands");
        assert_eq!(out.stats.preserved, 1);
        assert_eq!(out.stats.assigned, 0);
    }

    #[test]
    fn overwrite_replaces_existing_assignment() {
        let mut it = item("u1", "Left hand", &["hand"]);
        it.assigned = "gauntlets".into();
        it.notes = "old".into();
        let out = run_auto_assign(&[it], &terms(), true);
        let i = &out.items[0];
        assert_eq!(i.assigned, "hands");
        assert_eq!(i.notes, "");
    }

    #[test]
    fn negative_term_clears_everything() {
        let items = vec![item("u1", "NSFW robot hand", &["robot", "hand"])];
        let out = run_auto_assign(&items, &terms(), true);
        let i = &out.items[0];
        assert_eq!(i.suggested, "");
        assert_eq!(i.fuzzy, "");
        assert_eq!(i.assigned, "");
        assert_eq!(i.notes, "");
    }

    #[test]
    fn second_run_without_overwrite_is_a_no_op() {
        let items = vec![
            item("u1", "Mech Unit", &["robot"]),
            item("u2", "Hand and foot pack", &["hand", "foot"]),
            item("u3", "A gauntlett", &[]),
            item("u4", "Teapot", &[]),
        ];
        let t = terms();
        let first = run_auto_assign(&items, &t, false).items;
        let second = run_auto_assign(&first, &t, false).items;
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.assigned, b.assigned, "{}", a.uid);
            assert_eq!(a.notes, b.notes, "{}", a.uid);
        }
    }

    #[test]
    fn inputs_are_not_mutated() {
        let items = vec![item("u1", "Mech Unit", &["robot"])];
        let before = items.clone();
        let _ = run_auto_assign(&items, &terms(), true);
        assert_eq!(items, before);
    }

    #[test]
    fn malformed_item_does_not_abort_batch() {
        let items = vec![
            Item::new("", ""),
            item("u2", "Mech Unit", &["robot"]),
        ];
        let out = run_auto_assign(&items, &terms(), false);
        assert_eq!(out.items.len(), 2);
        assert_eq!(out.items[0].assigned, "");
        assert_eq!(out.items[1].assigned, "robots");
    }

    #[test]
    fn refresh_never_touches_assignment() {
        let mut it = item("u1", "Mech Unit", &["robot"]);
        it.assigned = "".into();
        it.notes = "keep me".into();
        let out = refresh_suggestions(&[it], &terms());
        assert_eq!(out[0].assigned, "");
        assert_eq!(out[0].notes, "keep me");
        assert_eq!(out[0].suggested, "robots");
    }
}
