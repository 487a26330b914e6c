//! Human-readable summaries printed after each subcommand.
//!
//! Every function returns the text instead of printing it.

use std::fmt::Write;
use std::path::Path;

use curator_match::terms::TermsSummary;
use curator_match::{AssignStats, TermReport};
use curator_sync::PushReport;

use crate::commands::{CollectStats, ManualStats, MatchStats, MergeOutcome, NamedPair, PushOutcome};

/// Failures listed in full before the rest are summarised.
const MAX_LISTED_FAILURES: usize = 10;

pub fn collect_summary(stats: &CollectStats) -> String {
    format!(
        "Collected {} liked items and {} collections in {:.1}s",
        stats.items, stats.collections, stats.elapsed_secs
    )
}

pub fn match_summary(stats: &MatchStats) -> String {
    format!(
        "Matched {} items: {} with suggestions, {} with fuzzy candidates",
        stats.total, stats.suggested, stats.fuzzy
    )
}

pub fn assign_summary(stats: &AssignStats) -> String {
    format!(
        "Auto-assign: {} items, {} assigned, {} kept as-is, {} collisions, {} fuzzy-only",
        stats.total, stats.assigned, stats.preserved, stats.collisions, stats.fuzzy_only
    )
}

pub fn manual_summary(stats: &ManualStats) -> String {
    if stats.pending == 0 {
        return "No Manual entries to apply".to_string();
    }
    format!(
        "Applied Manual to Assigned: {} entries, {} rows changed",
        stats.pending, stats.changed
    )
}

fn report_lines(out: &mut String, report: &PushReport) {
    if report.dry_run {
        let _ = writeln!(out, "Dry run: {} operations planned, none sent", report.planned);
        return;
    }
    let _ = writeln!(
        out,
        "Sent {} of {} operations, {} failed",
        report.succeeded,
        report.planned,
        report.failed.len()
    );
    for (op, err) in report.failed.iter().take(MAX_LISTED_FAILURES) {
        let _ = writeln!(
            out,
            "  failed: {} -> {}: {}",
            op.item_uid, op.collection_name, err
        );
    }
    if report.failed.len() > MAX_LISTED_FAILURES {
        let _ = writeln!(
            out,
            "  ... and {} more",
            report.failed.len() - MAX_LISTED_FAILURES
        );
    }
}

pub fn push_summary(outcome: &PushOutcome) -> String {
    let mut out = String::new();
    if outcome.plan.is_empty() {
        out.push_str("No assignments to push\n");
    } else {
        report_lines(&mut out, &outcome.report);
    }
    if !outcome.plan.unknown.is_empty() {
        let _ = writeln!(
            out,
            "{} assignments name unknown collections and were skipped",
            outcome.plan.unknown.len()
        );
    }
    let _ = write!(out, "{} items marked as pushed", outcome.marked);
    out
}

pub fn merge_summary(keep: &str, drop: &str, outcome: &MergeOutcome) -> String {
    let mut out = format!("Merge '{drop}' into '{keep}'\n");
    if outcome.report.planned == 0 {
        out.push_str("Nothing to move");
    } else {
        report_lines(&mut out, &outcome.report);
        out.push_str("Collections were not deleted");
    }
    out
}

pub fn term_report(report: &TermReport) -> String {
    let mut out = format!("Unassigned items: {}\n", report.unassigned);
    if report.candidates.is_empty() {
        return out;
    }
    out.push_str("Top candidate terms:\n");
    let width = report
        .candidates
        .iter()
        .map(|(t, _)| t.len())
        .max()
        .unwrap_or(0);
    for (term, count) in &report.candidates {
        let _ = writeln!(out, "  {term:<width$}  {count}");
    }
    out
}

pub fn similar_pairs(pairs: &[NamedPair], threshold: u8) -> String {
    if pairs.is_empty() {
        return format!("No collection names at or above {threshold}% similarity\n");
    }
    let mut out = String::new();
    for (left, right, score) in pairs {
        let _ = writeln!(out, "{score:>3}  {left}  ~  {right}");
    }
    out
}

pub fn terms_summary(path: &Path, s: &TermsSummary) -> String {
    let mut out = format!("{}\n", path.display());
    let _ = writeln!(out, "  collections:        {}", s.collections);
    let _ = writeln!(out, "  single-assignment:  {}", s.single_assignment);
    let _ = writeln!(out, "  negative terms:     {}", s.negative_terms);
    let _ = writeln!(
        out,
        "  include/tag/exclude terms: {}/{}/{}",
        s.include_terms, s.tag_terms, s.exclude_terms
    );
    out
}
