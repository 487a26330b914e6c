//! Consensus assignment policy.
//!
//! Turns [`MatchSignals`] into the collections an item is assigned to.
//! Each signal type (tag, rule, fuzzy) casts one vote for a collection. A
//! collection is assigned with two or more votes, or with a fuzzy score of
//! at least [`STRONG_FUZZY_SCORE`] on its own.
//!
//! Single-assignment collections are mutually exclusive. When more than one
//! of them would be assigned to the same item, none of them is: the item is
//! left for a human with a collision note. Nothing is tie-broken.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use curator_core::join_list;

use crate::signals::MatchSignals;
use crate::terms::Terms;

/// Fuzzy score that assigns a collection without any other evidence.
pub const STRONG_FUZZY_SCORE: u8 = 95;

/// Votes needed to assign a collection without strong fuzzy evidence.
pub const MIN_VOTES: usize = 2;

/// A diagnostic attached to an item's assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyNote {
    /// Several single-assignment collections triggered; all were dropped.
    Collision(Vec<String>),
    /// Nothing assigned, but this collection was the closest fuzzy match.
    HighFuzzyCandidate { collection: String, score: u8 },
}

impl fmt::Display for PolicyNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collision(names) => {
                write!(f, "Single-assignment collision: {}", join_list(names))
            }
            Self::HighFuzzyCandidate { collection, score } => {
                write!(f, "High fuzzy candidate: {collection} ({score})")
            }
        }
    }
}

/// Final assignment for one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyResult {
    /// Assigned collection names, sorted.
    pub assigned: Vec<String>,
    /// Notes in the order they were raised.
    pub notes: Vec<PolicyNote>,
}

impl PolicyResult {
    /// Assigned collections as the workbook stores them.
    pub fn assigned_cell(&self) -> String {
        join_list(&self.assigned)
    }

    /// Notes joined with `"; "`.
    pub fn notes_cell(&self) -> String {
        self.notes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn has_collision(&self) -> bool {
        self.notes
            .iter()
            .any(|n| matches!(n, PolicyNote::Collision(_)))
    }
}

/// Apply the consensus policy to one item's signals.
pub fn policy_assign(signals: &MatchSignals, terms: &Terms) -> PolicyResult {
    let votes = tally_votes(signals);

    let mut assigned: BTreeSet<String> = votes
        .iter()
        .filter(|(name, count)| {
            **count >= MIN_VOTES
                || signals
                    .fuzzy_hits
                    .get(**name)
                    .is_some_and(|s| *s >= STRONG_FUZZY_SCORE)
        })
        .map(|(name, _)| (*name).to_string())
        .collect();

    let mut notes = Vec::new();

    let colliding: Vec<String> = assigned
        .iter()
        .filter(|c| terms.is_single_assignment(c))
        .cloned()
        .collect();
    if colliding.len() > 1 {
        for c in &colliding {
            assigned.remove(c);
        }
        notes.push(PolicyNote::Collision(colliding));
    }

    if assigned.is_empty()
        && let Some((collection, score)) = top_fuzzy(signals)
    {
        notes.push(PolicyNote::HighFuzzyCandidate {
            collection: collection.to_string(),
            score,
        });
    }

    PolicyResult {
        assigned: assigned.into_iter().collect(),
        notes,
    }
}

/// One vote per signal type a collection appears in.
fn tally_votes(signals: &MatchSignals) -> BTreeMap<&str, usize> {
    let mut votes: BTreeMap<&str, usize> = BTreeMap::new();
    let voters = signals
        .tag_hits
        .iter()
        .chain(&signals.rule_hits)
        .chain(signals.fuzzy_hits.keys());
    for name in voters {
        *votes.entry(name.as_str()).or_default() += 1;
    }
    votes
}

/// Highest fuzzy score; ties go to the alphabetically first collection.
fn top_fuzzy(signals: &MatchSignals) -> Option<(&str, u8)> {
    let mut best: Option<(&str, u8)> = None;
    for (name, &score) in &signals.fuzzy_hits {
        if best.is_none_or(|(_, b)| score > b) {
            best = Some((name.as_str(), score));
        }
    }
    best
}
