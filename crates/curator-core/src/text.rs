//! Text normalisation shared by matching and reporting.
//!
//! Matching never looks at raw item text. Name, description and tags are
//! folded into one normalised string first:
//!
//! - lowercase
//! - anything other than ASCII letters, digits, `_`, `-` or whitespace
//!   becomes a space
//! - runs of whitespace collapse to one space, ends trimmed
//!
//! Tokens are the whitespace-separated words of that string.

use std::collections::BTreeSet;

/// Normalise and join text fragments for matching.
///
/// Fragments are joined with a space before normalising, so
/// `normalize_text(&["Mecha Unit", "", "robot,scifi"])` gives
/// `"mecha unit robot scifi"`.
pub fn normalize_text(parts: &[&str]) -> String {
    let joined = parts.join(" ").to_lowercase();
    let mut out = String::with_capacity(joined.len());
    let mut pending_space = false;

    for c in joined.chars() {
        let keep = c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-';
        if keep {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            // Whitespace and stripped characters both end the current word.
            pending_space = true;
        }
    }

    out
}

/// Whitespace tokens of an already-normalised string.
pub fn tokenize(normalized: &str) -> BTreeSet<&str> {
    normalized.split_whitespace().collect()
}

/// Split a human-edited list cell on `,` or `;`, trimming blanks.
pub fn split_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a tag cell. Tags are comma-separated only.
pub fn split_tags(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join list values the way the workbook stores them.
pub fn join_list<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ")
}
