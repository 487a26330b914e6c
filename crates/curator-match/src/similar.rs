//! Near-duplicate collection names.
//!
//! Advisory only: nothing here changes collections. Merging is a separate,
//! explicitly confirmed step.

use tracing::debug;

use crate::fuzzy::ratio;

/// Default minimum similarity for two names to be reported.
pub const DEFAULT_SIMILARITY_THRESHOLD: u8 = 90;

/// Two collection names that look alike, by index into the input list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimilarPair {
    pub left: usize,
    pub right: usize,
    pub score: u8,
}

/// Every pair of names whose case-insensitive similarity meets `threshold`.
///
/// Each unordered pair appears once with `left < right`. Sorted by score
/// descending, then by index.
pub fn find_similar_collections<S: AsRef<str>>(names: &[S], threshold: u8) -> Vec<SimilarPair> {
    let lowered: Vec<String> = names.iter().map(|n| n.as_ref().to_lowercase()).collect();
    let mut pairs = Vec::new();

    for (i, a) in lowered.iter().enumerate() {
        for (j, b) in lowered.iter().enumerate().skip(i + 1) {
            let score = ratio(a, b);
            if score >= threshold {
                pairs.push(SimilarPair {
                    left: i,
                    right: j,
                    score,
                });
            }
        }
    }

    // Stable sort keeps index order among equal scores.
    pairs.sort_by(|a, b| b.score.cmp(&a.score));
    debug!(names = names.len(), pairs = pairs.len(), threshold, "similar collections");
    pairs
}
