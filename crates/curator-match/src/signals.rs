//! Per-item evidence: which collections an item's text points at, and how.

use std::collections::{BTreeMap, BTreeSet};

use curator_core::{join_list, normalize_text, tokenize};

use crate::fuzzy::partial_ratio;
use crate::terms::Terms;

/// Evidence gathered for one item in one run. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSignals {
    /// Collections whose tag terms intersect the item's tags.
    pub tag_hits: BTreeSet<String>,
    /// Collections with an include term present as a whole token.
    pub rule_hits: BTreeSet<String>,
    /// Collection → best include-term fuzzy score, for scores at or above threshold.
    pub fuzzy_hits: BTreeMap<String, u8>,
}

impl MatchSignals {
    pub fn is_empty(&self) -> bool {
        self.tag_hits.is_empty() && self.rule_hits.is_empty() && self.fuzzy_hits.is_empty()
    }

    /// Union of tag and rule hits, sorted.
    pub fn suggested(&self) -> Vec<&str> {
        self.tag_hits
            .union(&self.rule_hits)
            .map(String::as_str)
            .collect()
    }

    /// Suggested collections as the workbook stores them.
    pub fn suggested_cell(&self) -> String {
        join_list(&self.suggested())
    }

    /// Fuzzy hits as `name:score`, sorted by collection name.
    pub fn fuzzy_cell(&self) -> String {
        let rendered: Vec<String> = self
            .fuzzy_hits
            .iter()
            .map(|(name, score)| format!("{name}:{score}"))
            .collect();
        join_list(&rendered)
    }
}

/// Collect match evidence for one item against every collection rule.
pub fn collect_signals(
    name: &str,
    description: &str,
    tags: &[String],
    terms: &Terms,
) -> MatchSignals {
    let joined_tags = tags.join(",");
    let text = normalize_text(&[name, description, &joined_tags]);
    let mut signals = MatchSignals::default();

    // A negative term vetoes every rule, so there is nothing to evaluate.
    if terms.negative.iter().any(|t| text.contains(t.as_str())) {
        return signals;
    }

    let tokens = tokenize(&text);
    let tag_set: BTreeSet<String> = tags.iter().map(|t| t.to_lowercase()).collect();

    for (collection, rule) in &terms.collections {
        if rule.exclude.iter().any(|t| text.contains(t.as_str())) {
            continue;
        }

        if rule.tags.iter().any(|t| tag_set.contains(t)) {
            signals.tag_hits.insert(collection.clone());
        }

        if rule.include.iter().any(|t| tokens.contains(t.as_str())) {
            signals.rule_hits.insert(collection.clone());
        }

        // No include terms means no fuzzy evidence, even at threshold 0.
        let best = rule
            .include
            .iter()
            .map(|t| partial_ratio(t, &text))
            .max();
        if let Some(score) = best
            && score >= rule.fuzzy_threshold
        {
            signals.fuzzy_hits.insert(collection.clone(), score);
        }
    }

    signals
}
