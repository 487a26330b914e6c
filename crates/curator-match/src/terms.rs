//! Term configuration: the declarative rule set that drives matching.
//!
//! The YAML document looks like:
//!
//! ```yaml
//! single_assignment_collections: [hands, feet]
//! negative_terms: [nsfw]
//! collections:
//!   robots:
//!     include_terms: [robot, mech]
//!     tag_terms: [robot]
//!     exclude_terms: [toy]
//!     fuzzy_threshold: 88
//! ```
//!
//! Every key is optional. Terms are case-insensitive and stored lowercased;
//! collection names and single-assignment names are kept verbatim.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::ConfigError;

/// Threshold used when a collection does not set `fuzzy_threshold`.
pub const DEFAULT_FUZZY_THRESHOLD: u8 = 88;

/// Matching rules for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRule {
    /// Whole-token terms searched in name/description/tags; also fuzzy-matched.
    pub include: BTreeSet<String>,
    /// Terms compared against the item's tag list exactly.
    pub tags: BTreeSet<String>,
    /// Substrings that veto this collection for an item.
    pub exclude: BTreeSet<String>,
    /// Minimum fuzzy score (0–100) that counts as a hit.
    pub fuzzy_threshold: u8,
}

impl Default for CollectionRule {
    fn default() -> Self {
        Self {
            include: BTreeSet::new(),
            tags: BTreeSet::new(),
            exclude: BTreeSet::new(),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

/// The full rule set: collection name → rule, plus global term sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Terms {
    /// Collections that are mutually exclusive for any one item.
    pub single: BTreeSet<String>,
    /// Any of these in an item's text suppresses all rules for that item.
    pub negative: BTreeSet<String>,
    pub collections: BTreeMap<String, CollectionRule>,
}

/// Summary statistics for a [`Terms`] set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermsSummary {
    pub collections: usize,
    pub single_assignment: usize,
    pub negative_terms: usize,
    pub include_terms: usize,
    pub tag_terms: usize,
    pub exclude_terms: usize,
}

// ── Document shape ──

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TermsDocument {
    single_assignment_collections: Option<Vec<String>>,
    negative_terms: Option<Vec<String>>,
    collections: Option<BTreeMap<String, Option<RuleDocument>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RuleDocument {
    include_terms: Option<Vec<String>>,
    tag_terms: Option<Vec<String>>,
    exclude_terms: Option<Vec<String>>,
    fuzzy_threshold: Option<i64>,
}

impl Terms {
    /// Read and parse a term configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let terms = Self::from_yaml_str(&text)?;
        let s = terms.summary();
        debug!(
            path = %path.display(),
            collections = s.collections,
            single_assignment = s.single_assignment,
            negative_terms = s.negative_terms,
            "loaded term configuration"
        );
        Ok(terms)
    }

    /// Parse a term configuration from YAML text.
    ///
    /// An empty document yields an empty configuration.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let doc: Option<TermsDocument> = serde_yaml::from_str(text)?;
        Self::from_document(doc.unwrap_or_default())
    }

    fn from_document(doc: TermsDocument) -> Result<Self, ConfigError> {
        let single: BTreeSet<String> = doc
            .single_assignment_collections
            .unwrap_or_default()
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let negative = lowered(doc.negative_terms);

        let mut collections = BTreeMap::new();
        for (name, rule) in doc.collections.unwrap_or_default() {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "collection name must not be blank".into(),
                ));
            }
            let rule = rule.unwrap_or_default();
            let fuzzy_threshold = match rule.fuzzy_threshold {
                None => DEFAULT_FUZZY_THRESHOLD,
                Some(t) => u8::try_from(t).ok().filter(|t| *t <= 100).ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "collection '{name}': fuzzy_threshold {t} is outside 0-100"
                    ))
                })?,
            };
            collections.insert(
                name,
                CollectionRule {
                    include: lowered(rule.include_terms),
                    tags: lowered(rule.tag_terms),
                    exclude: lowered(rule.exclude_terms),
                    fuzzy_threshold,
                },
            );
        }

        for name in &single {
            if !collections.contains_key(name) {
                warn!(collection = %name, "single-assignment collection has no rule");
            }
        }

        Ok(Self {
            single,
            negative,
            collections,
        })
    }

    pub fn is_single_assignment(&self, collection: &str) -> bool {
        self.single.contains(collection)
    }

    /// Summary statistics.
    pub fn summary(&self) -> TermsSummary {
        let rules = self.collections.values();
        TermsSummary {
            collections: self.collections.len(),
            single_assignment: self.single.len(),
            negative_terms: self.negative.len(),
            include_terms: rules.clone().map(|r| r.include.len()).sum(),
            tag_terms: rules.clone().map(|r| r.tags.len()).sum(),
            exclude_terms: rules.map(|r| r.exclude.len()).sum(),
        }
    }
}

fn lowered(terms: Option<Vec<String>>) -> BTreeSet<String> {
    terms
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}
