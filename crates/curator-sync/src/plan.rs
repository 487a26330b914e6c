//! Turning assignments into platform mutations, and running them.
//!
//! Planning is pure. [`execute`] is the only place that talks to the
//! platform, and a failed operation never stops the rest of the batch.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, SecondsFormat, Utc};
use curator_core::{CollectionRecord, DataShapeError, Item};
use tracing::{debug, error, info, warn};

use crate::platform::CollectionPlatform;

/// One "add item to collection" call.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PushOp {
    pub collection_uid: String,
    pub collection_name: String,
    pub item_uid: String,
}

/// Everything a push would do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushPlan {
    pub ops: Vec<PushOp>,
    /// `(item uid, collection name)` pairs naming no known collection.
    pub unknown: Vec<(String, String)>,
}

impl PushPlan {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Outcome of running a batch of operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub planned: usize,
    pub succeeded: usize,
    pub failed: Vec<(PushOp, String)>,
    pub dry_run: bool,
}

/// Collection lookup by name: exact first, then case-insensitive.
pub struct NameIndex<'a> {
    exact: HashMap<&'a str, &'a CollectionRecord>,
    folded: HashMap<String, &'a CollectionRecord>,
}

impl<'a> NameIndex<'a> {
    pub fn new(collections: &'a [CollectionRecord]) -> Self {
        let mut exact = HashMap::new();
        let mut folded = HashMap::new();
        for c in collections {
            if exact.contains_key(c.name.as_str()) {
                warn!(collection = %c.name, uid = %c.uid, "duplicate collection name; using the first");
                continue;
            }
            exact.insert(c.name.as_str(), c);
            folded.entry(c.name.to_lowercase()).or_insert(c);
        }
        Self { exact, folded }
    }

    pub fn get(&self, name: &str) -> Option<&'a CollectionRecord> {
        self.exact
            .get(name)
            .copied()
            .or_else(|| self.folded.get(&name.to_lowercase()).copied())
    }
}

/// Plan the additions needed so every item sits in its assigned collections.
///
/// Items already in a collection produce no operation. Assigned names that
/// match no collection are collected in [`PushPlan::unknown`] and skipped.
pub fn plan_push(items: &[Item], collections: &[CollectionRecord]) -> PushPlan {
    let index = NameIndex::new(collections);
    let members: HashMap<&str, BTreeSet<&str>> = collections
        .iter()
        .map(|c| (c.uid.as_str(), c.members.iter().map(String::as_str).collect()))
        .collect();

    let mut plan = PushPlan::default();
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();

    for item in items.iter().filter(|i| i.has_assignment()) {
        if item.uid.is_empty() {
            let err = DataShapeError::MissingField {
                item: item.name.clone(),
                field: "uid".into(),
            };
            warn!(error = %err, "skipping assigned item without identifier");
            continue;
        }
        for name in item.assigned_list() {
            let Some(collection) = index.get(&name) else {
                warn!(item = %item.uid, collection = %name, "assigned collection not found; skipping");
                plan.unknown.push((item.uid.clone(), name));
                continue;
            };
            let already = members
                .get(collection.uid.as_str())
                .is_some_and(|m| m.contains(item.uid.as_str()));
            if already {
                continue;
            }
            if seen.insert((collection.uid.clone(), item.uid.clone())) {
                plan.ops.push(PushOp {
                    collection_uid: collection.uid.clone(),
                    collection_name: collection.name.clone(),
                    item_uid: item.uid.clone(),
                });
            }
        }
    }

    info!(
        ops = plan.ops.len(),
        unknown = plan.unknown.len(),
        "planned push"
    );
    plan
}

/// Operations copying every member of `drop` into `keep`.
///
/// Nothing is removed from `drop` and no collection is deleted.
pub fn plan_merge(keep: &CollectionRecord, drop: &CollectionRecord) -> Vec<PushOp> {
    if keep.uid == drop.uid {
        return Vec::new();
    }
    let mut seen = BTreeSet::new();
    let ops: Vec<PushOp> = drop
        .members
        .iter()
        .filter(|m| !keep.contains(m) && seen.insert(m.as_str()))
        .map(|m| PushOp {
            collection_uid: keep.uid.clone(),
            collection_name: keep.name.clone(),
            item_uid: m.clone(),
        })
        .collect();
    info!(keep = %keep.name, drop = %drop.name, ops = ops.len(), "planned merge");
    ops
}

/// Run `ops` against the platform, or only count them on a dry run.
pub async fn execute<P>(platform: &P, ops: &[PushOp], dry_run: bool) -> PushReport
where
    P: CollectionPlatform + ?Sized,
{
    let mut report = PushReport {
        planned: ops.len(),
        dry_run,
        ..Default::default()
    };

    if ops.is_empty() {
        info!("no operations to send");
        return report;
    }
    if dry_run {
        info!(ops = ops.len(), "dry run: nothing sent");
        return report;
    }

    info!(ops = ops.len(), "sending operations");
    for (i, op) in ops.iter().enumerate() {
        match platform
            .add_item_to_collection(&op.collection_uid, &op.item_uid)
            .await
        {
            Ok(()) => {
                report.succeeded += 1;
                debug!(
                    n = i + 1,
                    of = ops.len(),
                    item = %op.item_uid,
                    collection = %op.collection_name,
                    "added"
                );
            }
            Err(e) => {
                error!(
                    item = %op.item_uid,
                    collection = %op.collection_name,
                    error = %e,
                    "failed to add item to collection"
                );
                report.failed.push((op.clone(), e.to_string()));
            }
        }
    }

    info!(
        succeeded = report.succeeded,
        failed = report.failed.len(),
        "push complete"
    );
    report
}

/// Record push state on items after a real run.
///
/// An item is marked when it has assignments, every assigned name resolved,
/// and none of its operations failed. Items that needed no operations are
/// marked only if not already marked, so their timestamp is not refreshed.
/// Dry runs mark nothing. Returns the new item set and the number marked.
pub fn mark_pushed(
    items: &[Item],
    plan: &PushPlan,
    report: &PushReport,
    now: DateTime<Utc>,
) -> (Vec<Item>, usize) {
    if report.dry_run {
        return (items.to_vec(), 0);
    }

    let stamp = now.to_rfc3339_opts(SecondsFormat::Secs, false);
    let with_ops: BTreeSet<&str> = plan.ops.iter().map(|op| op.item_uid.as_str()).collect();
    let unresolved: BTreeSet<&str> = plan.unknown.iter().map(|(uid, _)| uid.as_str()).collect();
    let failed: BTreeSet<&str> = report
        .failed
        .iter()
        .map(|(op, _)| op.item_uid.as_str())
        .collect();

    let mut marked = 0;
    let out = items
        .iter()
        .map(|item| {
            let mut out = item.clone();
            let uid = item.uid.as_str();
            let eligible = !uid.is_empty()
                && item.has_assignment()
                && !unresolved.contains(uid)
                && !failed.contains(uid);
            if eligible && (with_ops.contains(uid) || !item.push_sent) {
                out.push_sent = true;
                out.pushed_at.clone_from(&stamp);
                marked += 1;
            }
            out
        })
        .collect();

    debug!(marked, "recorded push state");
    (out, marked)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::platform::testing::{FakePlatform, collection};

    fn assigned(uid: &str, assigned: &str) -> Item {
        let mut i = Item::new(uid, uid);
        i.assigned = assigned.into();
        i
    }

    fn cols() -> Vec<CollectionRecord> {
        vec![
            collection("c1", "robots", &["u1"]),
            collection("c2", "hands", &[]),
        ]
    }

    fn op(c: &str, name: &str, item: &str) -> PushOp {
        PushOp {
            collection_uid: c.into(),
            collection_name: name.into(),
            item_uid: item.into(),
        }
    }

    #[test]
    fn plan_skips_existing_membership() {
        let items = vec![
            assigned("u1", "robots, hands"),
            assigned("u2", "robots"),
            assigned("u3", ""),
        ];
        let plan = plan_push(&items, &cols());
        assert_eq!(
            plan.ops,
            vec![
                op("c2", "hands", "u1"),
                op("c1", "robots", "u2"),
            ]
        );
        assert!(plan.unknown.is_empty());
    }

    #[test]
    fn plan_reports_unknown_collections() {
        let items = vec![assigned("u2", "robots; ghosts")];
        let plan = plan_push(&items, &cols());
        assert_eq!(plan.ops.len(), 1);
        assert_eq!(plan.unknown, vec![("u2".to_string(), "ghosts".to_string())]);
    }

    #[test]
    fn plan_dedups_and_folds_case() {
        let items = vec![assigned("u2", "Robots, robots"), assigned("u2", "ROBOTS")];
        let plan = plan_push(&items, &cols());
        assert_eq!(plan.ops, vec![op("c1", "robots", "u2")]);
    }

    #[test]
    fn name_index_folds_unicode_case() {
        let cols = vec![collection("c1", "Éclairs", &[]), collection("c2", "robots", &[])];
        let index = NameIndex::new(&cols);
        assert_eq!(index.get("Éclairs").map(|c| c.uid.as_str()), Some("c1"));
        assert_eq!(index.get("éclairs").map(|c| c.uid.as_str()), Some("c1"));
        assert_eq!(index.get("ROBOTS").map(|c| c.uid.as_str()), Some("c2"));
        assert!(index.get("ghosts").is_none());
    }

    #[test]
    fn plan_skips_items_without_uid() {
        let items = vec![assigned("", "robots")];
        assert!(plan_push(&items, &cols()).is_empty());
    }

    #[test]
    fn merge_moves_only_missing_members() {
        let keep = collection("c1", "gauntlets", &["u1"]);
        let drop = collection("c2", "gauntlet", &["u1", "u2", "u2", "u3"]);
        let ops = plan_merge(&keep, &drop);
        let items: Vec<&str> = ops.iter().map(|o| o.item_uid.as_str()).collect();
        assert_eq!(items, vec!["u2", "u3"]);
        assert!(ops.iter().all(|o| o.collection_uid == "c1"));
        assert!(plan_merge(&keep, &keep).is_empty());
    }

    #[tokio::test]
    async fn dry_run_sends_nothing() {
        let platform = FakePlatform::default();
        let ops = vec![op("c1", "robots", "u2")];
        let report = execute(&platform, &ops, true).await;
        assert_eq!(report.planned, 1);
        assert_eq!(report.succeeded, 0);
        assert!(report.dry_run);
        assert!(platform.added().is_empty());
    }

    #[tokio::test]
    async fn failure_does_not_abort_batch() {
        let mut platform = FakePlatform::default();
        platform.reject.insert(("c1".into(), "u2".into()));
        let ops = vec![
            op("c1", "robots", "u2"),
            op("c2", "hands", "u3"),
            op("c1", "robots", "u4"),
        ];
        let report = execute(&platform, &ops, false).await;
        assert_eq!(report.planned, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, ops[0]);
        assert!(report.failed[0].1.contains("403"));
        assert_eq!(
            platform.added(),
            vec![
                ("c2".to_string(), "u3".to_string()),
                ("c1".to_string(), "u4".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn marks_only_fully_pushed_items() {
        let mut platform = FakePlatform::default();
        platform.reject.insert(("c2".into(), "u3".into()));

        let mut already = assigned("u1", "robots");
        already.push_sent = true;
        already.pushed_at = "2026-01-01T00:00:00+00:00".into();
        let items = vec![
            already,
            assigned("u2", "robots"),
            assigned("u3", "robots, hands"),
            assigned("u4", "ghosts"),
            assigned("u5", ""),
        ];
        let plan = plan_push(&items, &cols());
        let report = execute(&platform, &plan.ops, false).await;

        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        let (out, marked) = mark_pushed(&items, &plan, &report, now);
        assert_eq!(marked, 1);
        assert_eq!(out[0].pushed_at, "2026-01-01T00:00:00+00:00");
        assert!(out[1].push_sent);
        assert_eq!(out[1].pushed_at, "2026-10-19T08:30:00+00:00");
        assert!(!out[2].push_sent, "one op failed");
        assert!(!out[3].push_sent, "unknown collection");
        assert!(!out[4].push_sent, "nothing assigned");
    }

    #[tokio::test]
    async fn satisfied_items_marked_once() {
        let platform = FakePlatform::default();
        let items = vec![assigned("u1", "robots")];
        let plan = plan_push(&items, &cols());
        assert!(plan.is_empty());
        let report = execute(&platform, &plan.ops, false).await;
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        let (out, marked) = mark_pushed(&items, &plan, &report, now);
        assert_eq!(marked, 1);
        assert!(out[0].push_sent);
    }

    #[tokio::test]
    async fn dry_run_marks_nothing() {
        let platform = FakePlatform::default();
        let items = vec![assigned("u2", "robots")];
        let plan = plan_push(&items, &cols());
        let report = execute(&platform, &plan.ops, true).await;
        let (out, marked) = mark_pushed(&items, &plan, &report, Utc::now());
        assert_eq!(marked, 0);
        assert_eq!(out, items);
    }
}
