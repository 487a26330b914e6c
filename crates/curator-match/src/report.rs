//! What is still unassigned, and which words might make good new terms.

use std::collections::BTreeMap;

use curator_core::Item;

/// Tokens shorter than this are ignored in names and descriptions.
const MIN_TEXT_TOKEN_LEN: usize = 4;
/// Tags shorter than this are ignored.
const MIN_TAG_LEN: usize = 3;

/// Unassigned items and the most common words among them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermReport {
    pub unassigned: usize,
    /// `(term, count)`, most frequent first, ties alphabetical.
    pub candidates: Vec<(String, usize)>,
}

/// Count unassigned items and rank candidate terms from their text and tags.
pub fn unassigned_report(items: &[Item], top_n: usize) -> TermReport {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut unassigned = 0;

    for item in items.iter().filter(|i| !i.has_assignment()) {
        unassigned += 1;

        let text = format!("{} {}", item.name, item.description).to_lowercase();
        let cleaned: String = text
            .chars()
            .map(|c| {
                if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                    c
                } else {
                    ' '
                }
            })
            .collect();
        for token in cleaned.split_whitespace() {
            if token.chars().count() >= MIN_TEXT_TOKEN_LEN {
                *counts.entry(token.to_string()).or_default() += 1;
            }
        }

        for tag in &item.tags {
            let tag = tag.trim().to_lowercase();
            if tag.chars().count() >= MIN_TAG_LEN {
                *counts.entry(tag).or_default() += 1;
            }
        }
    }

    let mut candidates: Vec<(String, usize)> = counts.into_iter().collect();
    // BTreeMap order is alphabetical; a stable sort keeps it among ties.
    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    candidates.truncate(top_n);

    TermReport {
        unassigned,
        candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, desc: &str, tags: &[&str], assigned: &str) -> Item {
        let mut i = Item::new(name, name);
        i.description = desc.into();
        i.tags = tags.iter().map(|s| s.to_string()).collect();
        i.assigned = assigned.into();
        i
    }

    #[test]
    fn counts_only_unassigned() {
        let items = vec![
            item("Dragon Head", "", &[], ""),
            item("Dragon Tail", "", &[], "dragons"),
            item("Blue dragon", "", &[], " "),
        ];
        let r = unassigned_report(&items, 10);
        assert_eq!(r.unassigned, 2);
        assert_eq!(r.candidates[0], ("dragon".to_string(), 2));
    }

    #[test]
    fn short_tokens_and_punctuation_dropped() {
        let items = vec![item("The cat's hat", "low-poly", &["cat", "ab", " Fur "], "")];
        let r = unassigned_report(&items, 10);
        let terms: Vec<&str> = r.candidates.iter().map(|(t, _)| t.as_str()).collect();
        // "low-poly" splits into "low" and "poly"; only "poly" is long enough.
        assert_eq!(terms, vec!["cat", "fur", "poly"]);
    }

    #[test]
    fn ranked_by_count_then_alphabetically() {
        let items = vec![
            item("zeta alpha", "", &[], ""),
            item("zeta beta", "", &[], ""),
            item("alpha", "", &[], ""),
        ];
        let r = unassigned_report(&items, 2);
        assert_eq!(
            r.candidates,
            vec![("alpha".to_string(), 2), ("zeta".to_string(), 2)]
        );
    }

    #[test]
    fn empty_items() {
        assert_eq!(unassigned_report(&[], 5), TermReport::default());
    }
}
