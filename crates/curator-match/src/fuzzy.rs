//! Integer similarity scores (0–100) built on normalised Levenshtein distance.
//!
//! [`partial_ratio`] is the substring-tolerant variant used for matching
//! include terms against a whole item description: the shorter string is
//! slid across the longer one and the best window wins.

/// Similarity of two strings, 0–100.
pub fn ratio(a: &str, b: &str) -> u8 {
    to_score(strsim::normalized_levenshtein(a, b))
}

/// Best similarity of the shorter string against any window of the longer.
///
/// Windows are every equal-length run of characters in the longer string,
/// plus the shorter runs that overhang either end. A literal substring
/// scores 100. An empty side scores 0 unless both are empty.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let (short, short_len, long, long_len) = if a_len <= b_len {
        (a, a_len, b, b_len)
    } else {
        (b, b_len, a, a_len)
    };

    if short_len == 0 {
        return if long_len == 0 { 100 } else { 0 };
    }
    if long.contains(short) {
        return 100;
    }

    let chars: Vec<char> = long.chars().collect();
    let mut best = 0u8;
    let mut consider = |window: &[char]| {
        let window: String = window.iter().collect();
        best = best.max(ratio(short, &window));
        best == 100
    };

    // Overhanging the start.
    for k in 1..short_len {
        if consider(&chars[..k]) {
            return 100;
        }
    }
    // Full-length windows.
    for start in 0..=(long_len - short_len) {
        if consider(&chars[start..start + short_len]) {
            return 100;
        }
    }
    // Overhanging the end.
    for k in (1..short_len).rev() {
        if consider(&chars[long_len - k..]) {
            return 100;
        }
    }

    best
}

fn to_score(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}
