//! CSV-backed workbook for liked items and collections.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use csv::StringRecord;
use curator_core::columns::{collections as coll_cols, liked};
use curator_core::{CollectionRecord, DataShapeError, Item, join_list, split_list, split_tags};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::StoreError;

/// Liked-items sheet inside the workbook directory.
pub const LIKED_FILE: &str = "liked_items.csv";
/// Collections sheet inside the workbook directory.
pub const COLLECTIONS_FILE: &str = "collections.csv";

/// Everything the workbook holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    pub items: Vec<Item>,
    pub collections: Vec<CollectionRecord>,
}

/// Workbook rooted at a data directory.
///
/// Assumes a single writer. Each sheet is replaced atomically, but two
/// concurrent read-compute-write cycles can still lose one side's update.
pub struct WorkbookStore {
    dir: PathBuf,
}

impl WorkbookStore {
    /// Open a workbook directory, creating it if needed.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        if dir.exists() && !dir.is_dir() {
            return Err(StoreError::Other(format!(
                "workbook path {} is not a directory",
                dir.display()
            )));
        }
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn liked_path(&self) -> PathBuf {
        self.dir.join(LIKED_FILE)
    }

    fn collections_path(&self) -> PathBuf {
        self.dir.join(COLLECTIONS_FILE)
    }

    /// Whether a liked-items sheet has been written yet.
    pub fn exists(&self) -> bool {
        self.liked_path().exists()
    }

    /// Load both sheets.
    ///
    /// The liked sheet must exist. A missing collections sheet reads as empty.
    pub fn read(&self) -> Result<Workbook, StoreError> {
        let liked_path = self.liked_path();
        if !liked_path.exists() {
            return Err(StoreError::WorkbookNotFound(liked_path));
        }
        let items = read_items(&liked_path)?;

        let collections_path = self.collections_path();
        let collections = if collections_path.exists() {
            read_collections(&collections_path)?
        } else {
            warn!(path = %collections_path.display(), "no collections sheet; treating as empty");
            Vec::new()
        };

        info!(
            items = items.len(),
            collections = collections.len(),
            "loaded workbook"
        );
        Ok(Workbook { items, collections })
    }

    /// Replace both sheets with `workbook`.
    pub fn write(&self, workbook: &Workbook) -> Result<(), StoreError> {
        self.write_items(&workbook.items)?;
        self.write_collections(&workbook.collections)?;
        info!(
            items = workbook.items.len(),
            collections = workbook.collections.len(),
            dir = %self.dir.display(),
            "wrote workbook"
        );
        Ok(())
    }

    /// Write a freshly collected workbook, keeping annotations from the
    /// current one. Returns what was written.
    pub fn save_collected(&self, fresh: Workbook) -> Result<Workbook, StoreError> {
        let items = if self.exists() {
            let previous = read_items(&self.liked_path())?;
            carry_annotations(&previous, fresh.items)
        } else {
            fresh.items
        };
        let merged = Workbook {
            items,
            collections: fresh.collections,
        };
        self.write(&merged)?;
        Ok(merged)
    }

    fn write_items(&self, items: &[Item]) -> Result<(), StoreError> {
        let extra_cols: BTreeSet<&str> = items
            .iter()
            .flat_map(|i| i.extra.keys().map(String::as_str))
            .collect();

        let mut header: Vec<&str> = liked::ALL.to_vec();
        header.extend(extra_cols.iter().copied());

        self.replace_sheet(&self.liked_path(), &header, |w| {
            for item in items {
                let mut row: Vec<String> = vec![
                    item.uid.clone(),
                    item.name.clone(),
                    item.author.clone(),
                    item.description.clone(),
                    join_list(&item.tags),
                    item.manual.clone(),
                    item.suggested.clone(),
                    item.fuzzy.clone(),
                    item.assigned.clone(),
                    item.notes.clone(),
                    item.push_sent.to_string(),
                    item.pushed_at.clone(),
                ];
                for col in &extra_cols {
                    row.push(item.extra.get(*col).cloned().unwrap_or_default());
                }
                w.write_record(&row)?;
            }
            Ok(())
        })
    }

    fn write_collections(&self, collections: &[CollectionRecord]) -> Result<(), StoreError> {
        self.replace_sheet(&self.collections_path(), coll_cols::ALL, |w| {
            for c in collections {
                w.write_record([
                    c.name.clone(),
                    c.uid.clone(),
                    c.slug.clone().unwrap_or_default(),
                    c.member_count().to_string(),
                    join_list(&c.members),
                ])?;
            }
            Ok(())
        })
    }

    /// Write a sheet to a temp file in the workbook directory, then rename
    /// it over the old one.
    fn replace_sheet<F>(&self, path: &Path, header: &[&str], rows: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut csv::Writer<&mut std::fs::File>) -> Result<(), StoreError>,
    {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut w = csv::Writer::from_writer(tmp.as_file_mut());
            w.write_record(header)?;
            rows(&mut w)?;
            w.flush()?;
        }
        tmp.persist(path)?;
        Ok(())
    }
}

/// Merge freshly collected items with annotations from a previous workbook.
///
/// Fresh items inherit every annotation field from the previous item with the
/// same identifier. Previous items missing from the fresh set are kept after
/// the fresh ones: rows leave the workbook only when someone removes them.
pub fn carry_annotations(previous: &[Item], fresh: Vec<Item>) -> Vec<Item> {
    let by_uid: HashMap<&str, &Item> = previous
        .iter()
        .filter(|i| !i.uid.is_empty())
        .map(|i| (i.uid.as_str(), i))
        .collect();

    let mut carried = 0usize;
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut out: Vec<Item> = fresh
        .into_iter()
        .map(|mut item| {
            if let Some(prev) = by_uid.get(item.uid.as_str()) {
                item.inherit_annotations(prev);
                carried += 1;
            }
            seen.insert(item.uid.clone());
            item
        })
        .collect();

    let retained: Vec<Item> = previous
        .iter()
        .filter(|i| !seen.contains(&i.uid))
        .cloned()
        .collect();
    let retained_count = retained.len();
    out.extend(retained);

    info!(
        fresh = out.len() - retained_count,
        carried,
        retained = retained_count,
        "merged collected items with workbook annotations"
    );
    out
}

// ── Sheet reading ──

/// Header lookup for one sheet that reports each missing column once.
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(header: &StringRecord) -> Self {
        let index = header
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_string(), i))
            .collect();
        Self { index }
    }

    fn find(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|n| self.index.get(*n).copied())
    }

    /// Look up a column, logging a data-shape warning when it is absent.
    fn require(&self, sheet: &str, names: &[&str]) -> Option<usize> {
        let found = self.find(names);
        if found.is_none() {
            let err = DataShapeError::MissingColumn {
                sheet: sheet.to_string(),
                column: names[0].to_string(),
            };
            warn!(error = %err, "column treated as empty");
        }
        found
    }
}

fn cell(record: &StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| record.get(i)).unwrap_or("").to_string()
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|f| f.trim().is_empty())
}

fn parse_flag(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1"
    )
}

fn read_items(path: &Path) -> Result<Vec<Item>, StoreError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let header = reader.headers()?.clone();
    let cols = Columns::new(&header);
    let sheet = liked::SHEET;

    let uid = cols.require(sheet, &[liked::UID]);
    let name = cols.require(sheet, &[liked::NAME, liked::NAME_ALIAS]);
    let author = cols.find(&[liked::AUTHOR]);
    let description = cols.require(sheet, &[liked::DESCRIPTION]);
    let tags = cols.require(sheet, &[liked::TAGS]);
    let manual = cols.find(&[liked::MANUAL]);
    let suggested = cols.find(&[liked::SUGGESTED]);
    let fuzzy = cols.find(&[liked::FUZZY]);
    let assigned = cols.require(sheet, &[liked::ASSIGNED]);
    let notes = cols.find(&[liked::NOTES]);
    let push_sent = cols.find(&[liked::PUSH_SENT]);
    let pushed_at = cols.find(&[liked::PUSHED_AT]);

    let extra_cols: Vec<(usize, String)> = header
        .iter()
        .enumerate()
        .map(|(i, h)| (i, h.trim().to_string()))
        .filter(|(_, h)| {
            !h.is_empty() && !liked::ALL.contains(&h.as_str()) && h != liked::NAME_ALIAS
        })
        .collect();

    let mut items = Vec::new();
    for record in reader.records() {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        let mut item = Item {
            uid: cell(&record, uid).trim().to_string(),
            name: cell(&record, name),
            description: cell(&record, description),
            tags: split_tags(&cell(&record, tags)),
            author: cell(&record, author),
            manual: cell(&record, manual),
            suggested: cell(&record, suggested),
            fuzzy: cell(&record, fuzzy),
            assigned: cell(&record, assigned),
            notes: cell(&record, notes),
            push_sent: parse_flag(&cell(&record, push_sent)),
            pushed_at: cell(&record, pushed_at),
            extra: BTreeMap::new(),
        };
        for (i, h) in &extra_cols {
            item.extra.insert(h.clone(), cell(&record, Some(*i)));
        }
        if item.uid.is_empty() {
            let err = DataShapeError::MissingField {
                item: item.name.clone(),
                field: liked::UID.to_string(),
            };
            warn!(error = %err, "item kept without identifier");
        }
        items.push(item);
    }
    Ok(items)
}

fn read_collections(path: &Path) -> Result<Vec<CollectionRecord>, StoreError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let cols = Columns::new(reader.headers()?);
    let sheet = coll_cols::SHEET;

    let name = cols.require(sheet, &[coll_cols::NAME]);
    let uid = cols.require(sheet, &[coll_cols::UID]);
    let slug = cols.find(&[coll_cols::SLUG]);
    let members = cols.find(&[coll_cols::MODEL_UIDS]);

    let mut collections = Vec::new();
    for record in reader.records() {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        let slug = cell(&record, slug);
        collections.push(CollectionRecord {
            uid: cell(&record, uid).trim().to_string(),
            name: cell(&record, name).trim().to_string(),
            slug: (!slug.is_empty()).then_some(slug),
            members: split_list(&cell(&record, members)),
        });
    }
    Ok(collections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_item(uid: &str) -> Item {
        let mut i = Item::new(uid, format!("Model {uid}"));
        i.description = "A robot, with \"quotes\"\nand a newline".into();
        i.tags = vec!["robot".into(), "scifi".into()];
        i.author = "someone".into();
        i
    }

    fn sample_collection() -> CollectionRecord {
        CollectionRecord {
            uid: "c1".into(),
            name: "robots".into(),
            slug: Some("robots".into()),
            members: vec!["u1".into(), "u2".into()],
        }
    }

    #[test]
    fn read_missing_workbook_errors() {
        let tmp = TempDir::new().unwrap();
        let store = WorkbookStore::open(tmp.path()).unwrap();
        assert!(!store.exists());
        assert!(matches!(store.read(), Err(StoreError::WorkbookNotFound(_))));
    }

    #[test]
    fn open_rejects_a_file_path() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("not_a_dir");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(WorkbookStore::open(&file), Err(StoreError::Other(_))));
    }

    #[test]
    fn write_then_read_preserves_everything() {
        let tmp = TempDir::new().unwrap();
        let store = WorkbookStore::open(&tmp.path().join("data")).unwrap();

        let mut item = sample_item("u1");
        item.assigned = "robots".into();
        item.notes = "Single-assignment collision: feet, hands".into();
        item.push_sent = true;
        item.pushed_at = "2026-10-19T12:00:00+00:00".into();
        item.extra.insert("Rating".into(), "5".into());

        let wb = Workbook {
            items: vec![item, sample_item("u2")],
            collections: vec![sample_collection()],
        };
        store.write(&wb).unwrap();

        let back = store.read().unwrap();
        assert_eq!(back.items[0], wb.items[0]);
        // Second item had no extra column value; it reads back as empty.
        assert_eq!(back.items[1].extra["Rating"], "");
        assert_eq!(back.collections, wb.collections);
    }

    #[test]
    fn legacy_name_column_and_missing_columns() {
        let tmp = TempDir::new().unwrap();
        let store = WorkbookStore::open(tmp.path()).unwrap();
        std::fs::write(
            tmp.path().join(LIKED_FILE),
            "Model UID,Name,Tags,My Column\nu1,Mecha Unit,\"robot, scifi\",kept\n,,,\n",
        )
        .unwrap();

        let wb = store.read().unwrap();
        assert_eq!(wb.items.len(), 1, "blank rows are skipped");
        let item = &wb.items[0];
        assert_eq!(item.name, "Mecha Unit");
        assert_eq!(item.tags, vec!["robot", "scifi"]);
        assert_eq!(item.description, "");
        assert_eq!(item.assigned, "");
        assert!(!item.push_sent);
        assert_eq!(item.extra["My Column"], "kept");
        assert!(wb.collections.is_empty());
    }

    #[test]
    fn push_flag_parsing() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn collections_without_slug_or_members() {
        let tmp = TempDir::new().unwrap();
        let store = WorkbookStore::open(tmp.path()).unwrap();
        std::fs::write(tmp.path().join(LIKED_FILE), "Model UID\n").unwrap();
        std::fs::write(
            tmp.path().join(COLLECTIONS_FILE),
            "Collection Name,Collection UID\nrobots,c1\n",
        )
        .unwrap();
        let wb = store.read().unwrap();
        assert!(wb.items.is_empty());
        assert_eq!(wb.collections[0].slug, None);
        assert!(wb.collections[0].members.is_empty());
    }

    #[test]
    fn carry_annotations_by_uid() {
        let mut prev = sample_item("u1");
        prev.assigned = "robots".into();
        prev.manual = "mechs".into();
        let gone = sample_item("u9");

        let mut fresh1 = sample_item("u1");
        fresh1.name = "Renamed".into();
        let fresh2 = sample_item("u2");

        let out = carry_annotations(&[prev, gone], vec![fresh1, fresh2]);
        let uids: Vec<&str> = out.iter().map(|i| i.uid.as_str()).collect();
        assert_eq!(uids, vec!["u1", "u2", "u9"]);
        assert_eq!(out[0].name, "Renamed");
        assert_eq!(out[0].assigned, "robots");
        assert_eq!(out[0].manual, "mechs");
        assert_eq!(out[1].assigned, "");
    }

    #[test]
    fn save_collected_keeps_manual_work() {
        let tmp = TempDir::new().unwrap();
        let store = WorkbookStore::open(tmp.path()).unwrap();

        let mut first = sample_item("u1");
        first.assigned = "robots".into();
        store
            .write(&Workbook {
                items: vec![first],
                collections: vec![],
            })
            .unwrap();

        let written = store
            .save_collected(Workbook {
                items: vec![sample_item("u1"), sample_item("u2")],
                collections: vec![sample_collection()],
            })
            .unwrap();
        assert_eq!(written.items[0].assigned, "robots");

        let back = store.read().unwrap();
        assert_eq!(back.items.len(), 2);
        assert_eq!(back.items[0].assigned, "robots");
        assert_eq!(back.collections.len(), 1);
    }

    #[test]
    fn rewrite_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let store = WorkbookStore::open(tmp.path()).unwrap();
        let wb = Workbook {
            items: vec![sample_item("u1")],
            collections: vec![sample_collection()],
        };
        store.write(&wb).unwrap();
        store.write(&wb).unwrap();
        let mut names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![COLLECTIONS_FILE, LIKED_FILE]);
    }
}
