//! Subcommand bodies: load the workbook, run the core, write back.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use curator_core::CollectionRecord;
use curator_match::terms::TermsSummary;
use curator_match::{
    AssignStats, OverrideLog, TermReport, Terms, find_similar_collections, refresh_suggestions,
    run_auto_assign, unassigned_report,
};
use curator_store::{Workbook, WorkbookStore};
use curator_sync::{
    NameIndex, PlatformClient, PushPlan, PushReport, execute, fetch_collections, fetch_library,
    mark_pushed, plan_merge, plan_push,
};
use tracing::{info, warn};

/// Runtime settings resolved from flags and environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub terms: PathBuf,
    pub api_base: String,
    pub token: Option<String>,
    pub min_post_interval: Duration,
}

pub struct CollectStats {
    pub items: usize,
    pub collections: usize,
    pub elapsed_secs: f64,
}

pub struct MatchStats {
    pub total: usize,
    pub suggested: usize,
    pub fuzzy: usize,
}

pub struct ManualStats {
    pub pending: usize,
    pub changed: usize,
}

pub struct PushOutcome {
    pub plan: PushPlan,
    pub report: PushReport,
    pub marked: usize,
}

pub struct MergeOutcome {
    pub report: PushReport,
}

/// A pair of look-alike collection names with their score.
pub type NamedPair = (String, String, u8);

fn open_store(settings: &Settings) -> Result<WorkbookStore> {
    WorkbookStore::open(&settings.data_dir)
        .with_context(|| format!("opening workbook at {}", settings.data_dir.display()))
}

fn read_workbook(store: &WorkbookStore) -> Result<Workbook> {
    store
        .read()
        .with_context(|| format!("reading workbook in {}", store.dir().display()))
}

fn write_workbook(store: &WorkbookStore, workbook: &Workbook) -> Result<()> {
    store
        .write(workbook)
        .with_context(|| format!("writing workbook in {}", store.dir().display()))
}

fn load_terms(path: &Path) -> Result<Terms> {
    Terms::load(path).with_context(|| format!("loading term configuration {}", path.display()))
}

fn client(settings: &Settings) -> Result<PlatformClient> {
    let token = settings
        .token
        .as_deref()
        .ok_or_else(|| anyhow!("no API token: pass --token or set CURATOR_TOKEN"))?;
    PlatformClient::new(&settings.api_base, token, settings.min_post_interval)
        .context("building platform client")
}

/// Pull likes and collections, then merge them into the workbook.
pub async fn collect(settings: &Settings) -> Result<CollectStats> {
    let start = Instant::now();
    let store = open_store(settings)?;
    let platform = client(settings)?;

    eprintln!("  Fetching likes and collections from {}", settings.api_base);
    let library = fetch_library(&platform)
        .await
        .context("fetching from platform")?;
    eprintln!(
        "  Got {} liked items, {} collections",
        library.items.len(),
        library.collections.len()
    );

    let written = store
        .save_collected(Workbook {
            items: library.items,
            collections: library.collections,
        })
        .context("saving collected workbook")?;

    Ok(CollectStats {
        items: written.items.len(),
        collections: written.collections.len(),
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}

/// Recompute suggestion columns without touching assignments.
pub fn refresh(settings: &Settings) -> Result<MatchStats> {
    let terms = load_terms(&settings.terms)?;
    let store = open_store(settings)?;
    let mut workbook = read_workbook(&store)?;

    workbook.items = refresh_suggestions(&workbook.items, &terms);
    write_workbook(&store, &workbook)?;

    Ok(MatchStats {
        total: workbook.items.len(),
        suggested: workbook.items.iter().filter(|i| !i.suggested.is_empty()).count(),
        fuzzy: workbook.items.iter().filter(|i| !i.fuzzy.is_empty()).count(),
    })
}

pub fn auto_assign(settings: &Settings, overwrite: bool) -> Result<AssignStats> {
    let terms = load_terms(&settings.terms)?;
    let store = open_store(settings)?;
    let mut workbook = read_workbook(&store)?;

    let outcome = run_auto_assign(&workbook.items, &terms, overwrite);
    workbook.items = outcome.items;
    write_workbook(&store, &workbook)?;
    Ok(outcome.stats)
}

pub fn apply_manual(settings: &Settings) -> Result<ManualStats> {
    let store = open_store(settings)?;
    let mut workbook = read_workbook(&store)?;

    let log = OverrideLog::from_manual(&workbook.items);
    let (items, changed) = log.apply(&workbook.items);
    if changed > 0 {
        workbook.items = items;
        write_workbook(&store, &workbook)?;
    }
    Ok(ManualStats {
        pending: log.len(),
        changed,
    })
}

/// Collections to plan against: live membership when a token is available,
/// otherwise (dry runs only) the workbook's last snapshot.
async fn current_collections(
    settings: &Settings,
    workbook: &Workbook,
    dry_run: bool,
) -> Result<(Option<PlatformClient>, Vec<CollectionRecord>)> {
    if settings.token.is_none() && dry_run {
        warn!("no API token; planning against the workbook's collection snapshot");
        return Ok((None, workbook.collections.clone()));
    }
    let platform = client(settings)?;
    let collections = fetch_collections(&platform)
        .await
        .context("fetching collections")?;
    Ok((Some(platform), collections))
}

pub async fn push(settings: &Settings, dry_run: bool) -> Result<PushOutcome> {
    let store = open_store(settings)?;
    let mut workbook = read_workbook(&store)?;

    let (platform, collections) = current_collections(settings, &workbook, dry_run).await?;
    let plan = plan_push(&workbook.items, &collections);

    let report = match &platform {
        Some(p) => execute(p, &plan.ops, dry_run).await,
        None => PushReport {
            planned: plan.ops.len(),
            dry_run: true,
            ..Default::default()
        },
    };

    let (items, marked) = mark_pushed(&workbook.items, &plan, &report, Utc::now());
    if marked > 0 {
        workbook.items = items;
        write_workbook(&store, &workbook)?;
    }
    info!(marked, "push state recorded");

    Ok(PushOutcome {
        plan,
        report,
        marked,
    })
}

pub fn report(settings: &Settings, top: usize) -> Result<TermReport> {
    let store = open_store(settings)?;
    let workbook = read_workbook(&store)?;
    Ok(unassigned_report(&workbook.items, top))
}

pub fn similar(settings: &Settings, threshold: u8) -> Result<Vec<NamedPair>> {
    let store = open_store(settings)?;
    let workbook = read_workbook(&store)?;
    let names: Vec<&str> = workbook
        .collections
        .iter()
        .map(|c| c.name.as_str())
        .collect();

    Ok(find_similar_collections(&names, threshold)
        .into_iter()
        .map(|p| (names[p.left].to_string(), names[p.right].to_string(), p.score))
        .collect())
}

fn find_collection<'a>(index: &NameIndex<'a>, name: &str) -> Result<&'a CollectionRecord> {
    index
        .get(name)
        .ok_or_else(|| anyhow!("no collection named '{name}'"))
}

/// Copy members of `drop` into `keep`. Neither collection is deleted.
pub async fn merge(
    settings: &Settings,
    keep: &str,
    drop: &str,
    dry_run: bool,
) -> Result<MergeOutcome> {
    let store = open_store(settings)?;
    let workbook = read_workbook(&store)?;
    let (platform, collections) = current_collections(settings, &workbook, dry_run).await?;

    let index = NameIndex::new(&collections);
    let keep_col = find_collection(&index, keep)?;
    let drop_col = find_collection(&index, drop)?;
    if keep_col.uid == drop_col.uid {
        bail!("'{keep}' and '{drop}' are the same collection");
    }

    let ops = plan_merge(keep_col, drop_col);
    let report = match &platform {
        Some(p) => execute(p, &ops, dry_run).await,
        None => PushReport {
            planned: ops.len(),
            dry_run: true,
            ..Default::default()
        },
    };
    Ok(MergeOutcome { report })
}

pub fn terms_summary(settings: &Settings) -> Result<TermsSummary> {
    Ok(load_terms(&settings.terms)?.summary())
}
